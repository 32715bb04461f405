use serde_json::Value;
use tracing::debug;

/// Structured data decoded from a document's leading frontmatter block.
pub type Frontmatter = serde_json::Map<String, Value>;

/// Decodes a raw YAML frontmatter block.
///
/// Malformed YAML, or YAML whose top level is not a mapping, yields an empty mapping.
/// Frontmatter problems never fail a document.
pub fn decode_frontmatter(raw: &str) -> Frontmatter {
    match serde_yaml::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => map,
        Ok(Value::Null) => Frontmatter::new(),
        Ok(other) => {
            debug!("Ignoring frontmatter that is not a mapping: {other}");
            Frontmatter::new()
        }
        Err(e) => {
            debug!("Ignoring malformed frontmatter: {e}");
            Frontmatter::new()
        }
    }
}
