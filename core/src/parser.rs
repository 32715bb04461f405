//! Conversion of source text into a [`Tree`].
//!
//! The catalog only depends on the [`Parser`] trait. [`MarkdownParser`] is the default
//! implementation, built on `pulldown-cmark` with YAML-style metadata blocks enabled so
//! that a leading `---` block ends up in [`Tree::frontmatter`].

use pulldown_cmark::{
    CodeBlockKind, CowStr, Event, HeadingLevel, Options, Parser as EventParser, Tag, TagEnd,
    TextMergeStream,
};
use thiserror::Error;

use crate::tree::{Node, NodeKind, Tree};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Unbalanced markup: {0}")]
    Unbalanced(String),

    #[error("Invalid content: {0}")]
    Invalid(String),
}

/// Turns source text into a content tree.
pub trait Parser: Send + Sync {
    fn parse(&self, text: &str) -> Result<Tree, ParseError>;
}

/// CommonMark (plus GFM extensions) parser.
#[derive(Debug, Clone)]
pub struct MarkdownParser {
    options: Options,
}

impl MarkdownParser {
    pub fn new() -> Self {
        let options: Options = [
            Options::ENABLE_GFM,
            Options::ENABLE_TABLES,
            Options::ENABLE_FOOTNOTES,
            Options::ENABLE_STRIKETHROUGH,
            Options::ENABLE_TASKLISTS,
            Options::ENABLE_HEADING_ATTRIBUTES,
            Options::ENABLE_YAML_STYLE_METADATA_BLOCKS,
        ]
        .into_iter()
        .collect();

        MarkdownParser { options }
    }
}

impl Default for MarkdownParser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser for MarkdownParser {
    fn parse(&self, text: &str) -> Result<Tree, ParseError> {
        let events = TextMergeStream::new(EventParser::new_ext(text, self.options));

        let mut stack = vec![Node::new(NodeKind::Document)];
        let mut frontmatter: Option<String> = None;
        let mut in_metadata = false;

        for event in events {
            match event {
                Event::Start(Tag::MetadataBlock(_)) => {
                    in_metadata = true;
                    frontmatter.get_or_insert_with(String::new);
                }
                Event::End(TagEnd::MetadataBlock(_)) => in_metadata = false,
                Event::Text(text) if in_metadata => {
                    frontmatter.get_or_insert_with(String::new).push_str(&text);
                }
                Event::Start(tag) => stack.push(node_for_tag(tag)),
                Event::End(tag) => match stack.pop() {
                    Some(node) if !stack.is_empty() => push_child(&mut stack, node),
                    _ => return Err(ParseError::Unbalanced(format!("unexpected end of {tag:?}"))),
                },
                Event::Text(text) => push_child(&mut stack, Node::leaf(NodeKind::Text, text.into_string())),
                Event::Code(text) => push_child(&mut stack, Node::leaf(NodeKind::Code, text.into_string())),
                Event::Html(html) | Event::InlineHtml(html) => {
                    push_child(&mut stack, Node::leaf(NodeKind::Html, html.into_string()))
                }
                Event::InlineMath(math) => push_child(
                    &mut stack,
                    Node::leaf(NodeKind::Math, math.into_string()).with_attribute("display", false),
                ),
                Event::DisplayMath(math) => push_child(
                    &mut stack,
                    Node::leaf(NodeKind::Math, math.into_string()).with_attribute("display", true),
                ),
                Event::FootnoteReference(label) => push_child(
                    &mut stack,
                    Node::new(NodeKind::FootnoteReference).with_attribute("label", label.into_string()),
                ),
                Event::TaskListMarker(checked) => push_child(
                    &mut stack,
                    Node::new(NodeKind::TaskListMarker).with_attribute("checked", checked),
                ),
                Event::SoftBreak => push_child(&mut stack, Node::new(NodeKind::SoftBreak)),
                Event::HardBreak => push_child(&mut stack, Node::new(NodeKind::HardBreak)),
                Event::Rule => push_child(&mut stack, Node::new(NodeKind::Rule)),
            }
        }

        match (stack.pop(), stack.len()) {
            (Some(root), 0) => Ok(Tree { root, frontmatter }),
            (_, unclosed) => Err(ParseError::Unbalanced(format!(
                "{} unclosed element(s) at end of input",
                unclosed + 1
            ))),
        }
    }
}

fn push_child(stack: &mut [Node], node: Node) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    }
}

fn node_for_tag(tag: Tag<'_>) -> Node {
    match tag {
        Tag::Paragraph => Node::new(NodeKind::Paragraph),
        Tag::Heading { level, id, classes, .. } => {
            let mut node = Node::new(NodeKind::Heading).with_attribute("level", heading_level(level));
            if let Some(id) = id {
                node = node.with_attribute("id", id.into_string());
            }
            if !classes.is_empty() {
                let classes: Vec<String> = classes.into_iter().map(CowStr::into_string).collect();
                node = node.with_attribute("classes", classes);
            }
            node
        }
        Tag::BlockQuote(_) => Node::new(NodeKind::BlockQuote),
        Tag::CodeBlock(kind) => {
            let node = Node::new(NodeKind::CodeBlock);
            match kind {
                CodeBlockKind::Fenced(language) if !language.is_empty() => {
                    node.with_attribute("language", language.into_string())
                }
                _ => node,
            }
        }
        Tag::HtmlBlock => Node::new(NodeKind::HtmlBlock),
        Tag::List(start) => {
            let node = Node::new(NodeKind::List).with_attribute("ordered", start.is_some());
            match start {
                Some(start) => node.with_attribute("start", start),
                None => node,
            }
        }
        Tag::Item => Node::new(NodeKind::Item),
        Tag::FootnoteDefinition(label) => {
            Node::new(NodeKind::FootnoteDefinition).with_attribute("label", label.into_string())
        }
        Tag::Table(_) => Node::new(NodeKind::Table),
        Tag::TableHead => Node::new(NodeKind::TableHead),
        Tag::TableRow => Node::new(NodeKind::TableRow),
        Tag::TableCell => Node::new(NodeKind::TableCell),
        Tag::Emphasis => Node::new(NodeKind::Emphasis),
        Tag::Strong => Node::new(NodeKind::Strong),
        Tag::Strikethrough => Node::new(NodeKind::Strikethrough),
        Tag::Link { dest_url, title, .. } => with_title(
            Node::new(NodeKind::Link).with_attribute("href", dest_url.into_string()),
            title,
        ),
        Tag::Image { dest_url, title, .. } => with_title(
            Node::new(NodeKind::Image).with_attribute("src", dest_url.into_string()),
            title,
        ),
        _ => Node::new(NodeKind::Other),
    }
}

fn with_title(node: Node, title: CowStr<'_>) -> Node {
    if title.is_empty() {
        node
    } else {
        node.with_attribute("title", title.into_string())
    }
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn parse(text: &str) -> Tree {
        MarkdownParser::new().parse(text).unwrap()
    }

    #[test]
    fn test_frontmatter_block_is_extracted() {
        let tree = parse("---\ntitle: Intro\n---\n\n# Hello\n\nBody text.\n");

        let frontmatter = tree.frontmatter.as_deref().unwrap();
        assert!(frontmatter.contains("title: Intro"));

        // The block is not part of the content tree
        let text = tree.root.text_content();
        assert!(!text.contains("title"));
        assert!(text.contains("Hello"));
    }

    #[test]
    fn test_no_frontmatter() {
        let tree = parse("Just a paragraph.\n");
        assert_eq!(tree.frontmatter, None);
        assert_eq!(tree.root.children.len(), 1);
        assert_eq!(tree.root.children[0].kind, NodeKind::Paragraph);
    }

    #[test]
    fn test_heading_levels_and_nesting() {
        let tree = parse("# One\n\n## Two *emphasis*\n");
        let headings = tree.root.find_nodes(|node| node.kind == NodeKind::Heading);

        assert_eq!(headings.len(), 2);
        assert_eq!(headings[0].attribute("level"), Some(&Value::from(1)));
        assert_eq!(headings[1].attribute("level"), Some(&Value::from(2)));
        assert_eq!(headings[1].text_content(), "Two emphasis");
        assert!(headings[1].children.iter().any(|node| node.kind == NodeKind::Emphasis));
    }

    #[test]
    fn test_links_and_code_blocks_carry_attributes() {
        let tree = parse("[docs](https://example.com \"Docs\")\n\n```rust\nfn main() {}\n```\n");

        let links = tree.root.find_nodes(|node| node.kind == NodeKind::Link);
        assert_eq!(links[0].attribute("href"), Some(&Value::from("https://example.com")));
        assert_eq!(links[0].attribute("title"), Some(&Value::from("Docs")));

        let code = tree.root.find_nodes(|node| node.kind == NodeKind::CodeBlock);
        assert_eq!(code[0].attribute("language"), Some(&Value::from("rust")));
    }

    #[test]
    fn test_parsing_is_deterministic() {
        let text = "---\ntitle: Same\n---\n\n# Heading\n\n- a\n- b\n";
        assert_eq!(parse(text), parse(text));
    }
}
