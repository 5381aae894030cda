//! HTML converter.
//!
//! The document is parsed with `scraper` and its body walked depth-first into
//! [`Node`]s, one rule per tag. Unknown tags contribute their children.

use chrono::Utc;
use docmd_core::markdown::{strip_extension, tidy, truncate_chars};
use docmd_core::{
    render, ConversionResult, Converted, Converter, EmphasisKind, Metadata, Node, Result,
    SourceFile,
};
use regex::Regex;
use scraper::{ElementRef, Html, Node as DomNode};
use serde_json::Value;
use std::sync::LazyLock;

pub const FAILURE_PREFIX: &str = "HTML 转换失败";

/// Characters of a `data:` image source kept in the output.
pub const DATA_URI_PREVIEW_CHARS: usize = 100;

static WHITESPACE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Tags whose content never reaches the output.
const DROPPED_TAGS: &[&str] = &[
    "script", "style", "noscript", "head", "template", "title", "meta", "link",
];

/// Container tags that separate their content from surrounding text.
const BLOCK_CONTAINERS: &[&str] = &[
    "div", "section", "article", "main", "header", "footer", "nav", "aside", "figure",
    "figcaption", "form", "fieldset", "address", "details", "summary", "dl", "dt", "dd", "li",
    "center",
];

/// Knobs that differ between web pages and converted Word documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkOptions {
    /// Shorten `data:` image sources to a preview.
    pub truncate_data_uris: bool,
    /// Alt text for images without one.
    pub default_alt: &'static str,
}

impl WalkOptions {
    pub const WEB: WalkOptions = WalkOptions {
        truncate_data_uris: true,
        default_alt: "image",
    };

    pub const WORD: WalkOptions = WalkOptions {
        truncate_data_uris: false,
        default_alt: "图片",
    };
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self::WEB
    }
}

fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_REGEX.replace_all(text, " ").into_owned()
}

fn descendants_named<'a>(el: ElementRef<'a>, name: &'a str) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    el.descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .filter(move |e| e.value().name() == name)
}

fn child_elements<'a>(el: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    el.children().filter_map(ElementRef::wrap)
}

fn element_text(el: ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<String>()).trim().to_string()
}

fn attr<'a>(el: ElementRef<'a>, name: &str) -> Option<&'a str> {
    el.value().attr(name).map(str::trim).filter(|v| !v.is_empty())
}

/// Whether a node sequence has anything to show.
fn has_content(nodes: &[Node]) -> bool {
    nodes.iter().any(|n| match n {
        Node::Image { src, .. } => !src.is_empty(),
        Node::LineBreak => false,
        other => !other.plain_text().trim().is_empty() || matches!(other, Node::Rule | Node::PageBreak),
    })
}

/// Group runs of inline nodes into paragraphs so they do not merge with
/// neighbouring blocks.
fn blockify(nodes: Vec<Node>) -> Vec<Node> {
    let mut out = Vec::new();
    let mut inline = Vec::new();

    for node in nodes {
        if node.is_inline() {
            inline.push(node);
            continue;
        }
        if has_content(&inline) {
            out.push(Node::paragraph(std::mem::take(&mut inline)));
        }
        inline.clear();
        out.push(node);
    }
    if has_content(&inline) {
        out.push(Node::paragraph(inline));
    }

    out
}

/// Push a media link, separated from a preceding inline node by a space.
fn push_spaced(out: &mut Vec<Node>, node: Node) {
    let glued = match out.last() {
        Some(Node::Text { text, .. }) => !text.ends_with(char::is_whitespace),
        Some(last) => last.is_inline() && !matches!(last, Node::LineBreak),
        None => false,
    };
    if glued {
        out.push(Node::text(" "));
    }
    out.push(node);
}

/// Tree walker carrying the options for one document.
struct Walker {
    options: WalkOptions,
}

impl Walker {
    fn children(&self, el: ElementRef<'_>) -> Vec<Node> {
        let mut out = Vec::new();

        for child in el.children() {
            match child.value() {
                DomNode::Text(text) => {
                    let collapsed = collapse_whitespace(text);
                    if collapsed.is_empty() {
                        continue;
                    }
                    let after_space = matches!(
                        out.last(),
                        Some(Node::Text { text, .. }) if text.ends_with(' ')
                    );
                    let collapsed = if after_space {
                        collapsed.trim_start().to_string()
                    } else {
                        collapsed
                    };
                    if !collapsed.is_empty() {
                        out.push(Node::text(collapsed));
                    }
                }
                DomNode::Element(_) => {
                    if let Some(child_el) = ElementRef::wrap(child) {
                        self.element(child_el, &mut out);
                    }
                }
                _ => {}
            }
        }

        out
    }

    fn element(&self, el: ElementRef<'_>, out: &mut Vec<Node>) {
        let tag = el.value().name();

        if DROPPED_TAGS.contains(&tag) {
            return;
        }

        match tag {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = tag[1..].parse().unwrap_or(1);
                out.push(Node::Heading {
                    level,
                    children: self.children(el),
                });
            }
            "p" => {
                let children = self.children(el);
                if has_content(&children) {
                    out.push(Node::paragraph(children));
                }
            }
            "strong" | "b" => out.push(self.emphasis(EmphasisKind::Bold, el)),
            "em" | "i" => out.push(self.emphasis(EmphasisKind::Italic, el)),
            "u" | "ins" => out.push(self.emphasis(EmphasisKind::Underline, el)),
            "s" | "strike" | "del" => out.push(self.emphasis(EmphasisKind::Strikethrough, el)),
            "ul" | "ol" => {
                let items = child_elements(el)
                    .filter(|li| li.value().name() == "li")
                    .map(|li| self.children(li))
                    .collect();
                out.push(Node::List {
                    ordered: tag == "ol",
                    items,
                });
            }
            "table" => {
                if let Some(table) = self.table(el) {
                    out.push(table);
                }
            }
            "img" => {
                if let Some(image) = self.image(el) {
                    out.push(image);
                }
            }
            "a" => out.push(Node::Link {
                href: attr(el, "href").map(str::to_string),
                children: self.children(el),
            }),
            "blockquote" => out.push(Node::Blockquote(blockify(self.children(el)))),
            "code" => out.push(Node::InlineCode(element_text(el))),
            "pre" => out.push(Node::CodeBlock {
                language: code_language(el),
                code: el.text().collect(),
            }),
            "br" => out.push(Node::LineBreak),
            "hr" => out.push(Node::Rule),
            "video" | "audio" => {
                let src = attr(el, "src")
                    .or_else(|| descendants_named(el, "source").find_map(|s| attr(s, "src")));
                if let Some(src) = src {
                    push_spaced(
                        out,
                        Node::Link {
                            href: Some(src.to_string()),
                            children: vec![Node::text(format!("{}: {}", tag, src))],
                        },
                    );
                }
            }
            "iframe" => {
                if let Some(src) = attr(el, "src") {
                    let title = attr(el, "title").unwrap_or("Embedded content");
                    push_spaced(
                        out,
                        Node::Link {
                            href: Some(src.to_string()),
                            children: vec![Node::text(title)],
                        },
                    );
                }
            }
            _ if BLOCK_CONTAINERS.contains(&tag) => {
                let children = self.children(el);
                if has_content(&children) {
                    out.extend(blockify(children));
                }
            }
            _ => out.extend(self.children(el)),
        }
    }

    fn emphasis(&self, kind: EmphasisKind, el: ElementRef<'_>) -> Node {
        Node::Emphasis {
            kind,
            children: self.children(el),
        }
    }

    fn table(&self, el: ElementRef<'_>) -> Option<Node> {
        let rows: Vec<Vec<String>> = descendants_named(el, "tr")
            .map(|tr| {
                child_elements(tr)
                    .filter(|c| matches!(c.value().name(), "td" | "th"))
                    .map(element_text)
                    .collect::<Vec<_>>()
            })
            .filter(|cells| !cells.is_empty())
            .collect();

        if rows.iter().all(|r| r.iter().all(String::is_empty)) {
            return None;
        }
        Some(Node::Table { rows })
    }

    fn image(&self, el: ElementRef<'_>) -> Option<Node> {
        let src = attr(el, "src")?;
        let src = if self.options.truncate_data_uris && src.starts_with("data:") {
            format!("{}...", truncate_chars(src, DATA_URI_PREVIEW_CHARS))
        } else {
            src.to_string()
        };

        Some(Node::Image {
            alt: attr(el, "alt").unwrap_or(self.options.default_alt).to_string(),
            src,
            title: attr(el, "title").map(str::to_string),
        })
    }
}

/// Language named by a `language-*` class on a `pre` or its inner `code`.
fn code_language(pre: ElementRef<'_>) -> Option<String> {
    std::iter::once(pre)
        .chain(descendants_named(pre, "code"))
        .filter_map(|e| e.value().attr("class"))
        .flat_map(str::split_whitespace)
        .find_map(|class| class.strip_prefix("language-"))
        .filter(|lang| !lang.is_empty())
        .map(str::to_string)
}

fn body_of(document: &Html) -> ElementRef<'_> {
    let root = document.root_element();
    descendants_named(root, "body").next().unwrap_or(root)
}

/// Parse HTML and build the node sequence for its body.
pub fn html_to_nodes(html: &str, options: WalkOptions) -> Vec<Node> {
    let document = Html::parse_document(html);
    let walker = Walker { options };
    blockify(walker.children(body_of(&document)))
}

/// Text of the first `<title>` element, if it is non-blank.
pub fn document_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let title = descendants_named(document.root_element(), "title")
        .next()
        .map(element_text)?;
    (!title.is_empty()).then_some(title)
}

/// Render HTML to Markdown, prefixing `# title` unless the body already
/// starts with a level-one heading.
pub fn html_to_markdown(html: &str, fallback_title: &str) -> String {
    let body = render(&html_to_nodes(html, WalkOptions::WEB));
    if body.starts_with("# ") {
        return body;
    }

    let title = document_title(html).unwrap_or_else(|| fallback_title.to_string());
    tidy(&format!("# {}\n\n{}", title, body))
}

/// Converter for `.html` and `.htm` files.
pub struct HtmlConverter;

impl HtmlConverter {
    pub fn new() -> Self {
        Self
    }

    fn run(&self, file: &dyn SourceFile) -> Result<Converted> {
        let html = file.read_text()?;
        let fallback = strip_extension(file.name(), &["html", "htm"]);
        let markdown = html_to_markdown(&html, &fallback);

        let mut metadata = Metadata::new();
        metadata.insert("originalLength".into(), Value::from(html.chars().count()));
        metadata.insert("markdownLength".into(), Value::from(markdown.chars().count()));

        Ok(Converted::new(markdown, metadata))
    }
}

impl Default for HtmlConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl Converter for HtmlConverter {
    fn convert(&self, file: &dyn SourceFile) -> ConversionResult {
        let converted_at = Utc::now();
        ConversionResult::from_outcome(file.name(), converted_at, FAILURE_PREFIX, self.run(file))
    }
}
