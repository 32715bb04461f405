//! Resolution of the configured directory roots.
//!
//! [`Paths`] turns a set of optional, possibly relative [`PathOverrides`] into absolute
//! directory paths. Every resolved directory ends with a path separator so that string
//! prefix operations on source paths are well-defined. Resolution is pure path algebra:
//! nothing here touches the filesystem.

use std::ffi::OsString;
use std::path::{Component, MAIN_SEPARATOR, MAIN_SEPARATOR_STR, Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const DEFAULT_ASSETS_DIR: &str = "assets";
pub const DEFAULT_COMPONENTS_DIR: &str = "src/components";
pub const DEFAULT_CONTENT_DIR: &str = "content";
pub const DEFAULT_DECLARATIONS_DIR: &str = "src/markdoc";

/// Optional per-role directory overrides, as read from configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathOverrides {
    pub assets: Option<PathBuf>,
    pub components: Option<PathBuf>,
    pub content: Option<PathBuf>,
    pub declarations: Option<PathBuf>,
}

/// Fully resolved directory roots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Paths {
    base: PathBuf,
    assets: PathBuf,
    components: PathBuf,
    content: PathBuf,
    declarations: PathBuf,
}

impl Paths {
    /// Resolves the overrides against the current working directory.
    pub fn resolve(overrides: &PathOverrides) -> std::io::Result<Self> {
        let cwd = std::env::current_dir()?;
        Ok(Self::resolve_from(&cwd, overrides))
    }

    /// Resolves the overrides against an explicit base directory.
    ///
    /// Absolute overrides are used as given, only gaining a trailing separator. Relative
    /// overrides and defaults are joined onto `base` and `.`/`..` segments collapsed.
    pub fn resolve_from(base: &Path, overrides: &PathOverrides) -> Self {
        let resolve = |value: &Option<PathBuf>, default: &str| {
            let value = value.as_deref().unwrap_or(Path::new(default));
            resolve_dir(base, value)
        };

        Paths {
            base: base.to_path_buf(),
            assets: resolve(&overrides.assets, DEFAULT_ASSETS_DIR),
            components: resolve(&overrides.components, DEFAULT_COMPONENTS_DIR),
            content: resolve(&overrides.content, DEFAULT_CONTENT_DIR),
            declarations: resolve(&overrides.declarations, DEFAULT_DECLARATIONS_DIR),
        }
    }

    /// The project base directory, used as the anchor for document identifiers.
    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn assets(&self) -> &Path {
        &self.assets
    }

    pub fn components(&self) -> &Path {
        &self.components
    }

    /// The directory containing the source documents.
    pub fn content(&self) -> &Path {
        &self.content
    }

    pub fn declarations(&self) -> &Path {
        &self.declarations
    }
}

fn resolve_dir(base: &Path, value: &Path) -> PathBuf {
    let mut dir: OsString = if value.is_absolute() {
        value.as_os_str().to_os_string()
    } else {
        normalize(&base.join(value)).into_os_string()
    };
    if !dir.to_string_lossy().ends_with(MAIN_SEPARATOR) {
        dir.push(MAIN_SEPARATOR_STR);
    }
    PathBuf::from(dir)
}

/// Lexically removes `.` and `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> PathBuf {
        PathBuf::from("/work/site")
    }

    #[test]
    fn test_defaults() {
        let paths = Paths::resolve_from(&base(), &PathOverrides::default());

        assert_eq!(paths.base(), Path::new("/work/site"));
        assert_eq!(paths.assets().as_os_str(), "/work/site/assets/");
        assert_eq!(paths.components().as_os_str(), "/work/site/src/components/");
        assert_eq!(paths.content().as_os_str(), "/work/site/content/");
        assert_eq!(paths.declarations().as_os_str(), "/work/site/src/markdoc/");
    }

    #[test]
    fn test_relative_overrides_are_normalized() {
        let overrides = PathOverrides {
            assets: Some("./media".into()),
            components: Some("./src/ui".into()),
            content: Some("docs/../pages".into()),
            declarations: Some("./src/tags/".into()),
        };
        let paths = Paths::resolve_from(&base(), &overrides);

        assert_eq!(paths.assets().as_os_str(), "/work/site/media/");
        assert_eq!(paths.components().as_os_str(), "/work/site/src/ui/");
        assert_eq!(paths.content().as_os_str(), "/work/site/pages/");
        assert_eq!(paths.declarations().as_os_str(), "/work/site/src/tags/");
    }

    #[test]
    fn test_absolute_override_used_as_is() {
        let overrides = PathOverrides {
            assets: Some("/absolute/path/to/assets".into()),
            ..Default::default()
        };
        let paths = Paths::resolve_from(&base(), &overrides);

        assert_eq!(paths.assets().as_os_str(), "/absolute/path/to/assets/");
    }

    #[test]
    fn test_absolute_override_keeps_parent_segments() {
        let overrides = PathOverrides {
            content: Some("/srv/site/../shared/content/".into()),
            ..Default::default()
        };
        let paths = Paths::resolve_from(&base(), &overrides);

        assert_eq!(paths.content().as_os_str(), "/srv/site/../shared/content/");
    }

    #[test]
    fn test_partial_overrides_keep_other_defaults() {
        let overrides = PathOverrides {
            content: Some("./my-content".into()),
            ..Default::default()
        };
        let paths = Paths::resolve_from(&base(), &overrides);

        assert_eq!(paths.content().as_os_str(), "/work/site/my-content/");
        assert_eq!(paths.assets().as_os_str(), "/work/site/assets/");
        assert_eq!(paths.components().as_os_str(), "/work/site/src/components/");
        assert_eq!(paths.declarations().as_os_str(), "/work/site/src/markdoc/");
    }

    #[test]
    fn test_every_directory_ends_with_separator() {
        let overrides = PathOverrides {
            assets: Some("media".into()),
            components: Some("components".into()),
            content: Some("/".into()),
            declarations: Some("declarations".into()),
        };
        let paths = Paths::resolve_from(&base(), &overrides);

        for dir in [paths.assets(), paths.components(), paths.content(), paths.declarations()] {
            assert!(dir.to_string_lossy().ends_with('/'), "{} lacks a trailing separator", dir.display());
        }
        assert_eq!(paths.content().as_os_str(), "/");
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let overrides = PathOverrides {
            content: Some("docs".into()),
            ..Default::default()
        };
        assert_eq!(
            Paths::resolve_from(&base(), &overrides),
            Paths::resolve_from(&base(), &overrides)
        );
    }

    #[test]
    fn test_overrides_deserialize_from_partial_json() {
        let overrides: PathOverrides = serde_json::from_str(r#"{ "content": "./docs" }"#).unwrap();
        assert_eq!(overrides.content, Some(PathBuf::from("./docs")));
        assert_eq!(overrides.assets, None);
    }
}
