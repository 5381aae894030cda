//! Markdown rendering of a [`Node`] tree.
//!
//! Block nodes become blocks separated by one blank line; consecutive inline
//! nodes at block level are gathered into a paragraph. The result is passed
//! through [`markdown::tidy`].

use crate::document::{Node, StyleSet};
use crate::heuristics::heading_level_for_style;
use crate::markdown;

/// Render a node sequence to tidied Markdown.
pub fn render(nodes: &[Node]) -> String {
    markdown::tidy(&render_blocks(nodes).join("\n\n"))
}

fn render_blocks(nodes: &[Node]) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut idx = 0;

    while idx < nodes.len() {
        let node = &nodes[idx];

        if node.is_inline() {
            let end = run_end(nodes, idx, Node::is_inline);
            push_nonblank(&mut blocks, paragraph_text(&nodes[idx..end]));
            idx = end;
            continue;
        }

        if let Node::ListItem { .. } = node {
            let end = run_end(nodes, idx, |n| matches!(n, Node::ListItem { .. }));
            let lines: Vec<String> = nodes[idx..end]
                .iter()
                .filter_map(|item| match item {
                    Node::ListItem { depth, children } => {
                        let text = paragraph_text(children);
                        (!text.is_empty()).then(|| format!("{}- {}", "  ".repeat(*depth), text))
                    }
                    _ => None,
                })
                .collect();
            push_nonblank(&mut blocks, lines.join("\n"));
            idx = end;
            continue;
        }

        push_nonblank(&mut blocks, render_block(node));
        idx += 1;
    }

    blocks
}

fn run_end(nodes: &[Node], start: usize, pred: impl Fn(&Node) -> bool) -> usize {
    nodes[start..]
        .iter()
        .position(|n| !pred(n))
        .map_or(nodes.len(), |offset| start + offset)
}

fn push_nonblank(blocks: &mut Vec<String>, block: String) {
    if !block.trim().is_empty() {
        blocks.push(block);
    }
}

fn render_block(node: &Node) -> String {
    match node {
        Node::Heading { level, children } => {
            let text = paragraph_text(children);
            if text.is_empty() {
                String::new()
            } else {
                markdown::heading(*level, &text.replace('\n', " "))
            }
        }
        Node::Paragraph { style, children } => {
            let text = paragraph_text(children);
            match style.as_deref().and_then(heading_level_for_style) {
                Some(level) if !text.is_empty() => {
                    markdown::heading(level, &text.replace('\n', " "))
                }
                _ => text,
            }
        }
        Node::List { ordered, items } => render_list(*ordered, items, 0).join("\n"),
        Node::Table { rows } => markdown::table(rows).trim_end().to_string(),
        Node::CodeBlock { language, code } => format!(
            "```{}\n{}\n```",
            language.as_deref().unwrap_or(""),
            code.trim_end_matches('\n')
        ),
        Node::Blockquote(children) => render_blocks(children)
            .join("\n\n")
            .lines()
            .map(|line| {
                if line.is_empty() {
                    ">".to_string()
                } else {
                    format!("> {}", line)
                }
            })
            .collect::<Vec<_>>()
            .join("\n"),
        Node::PageBreak | Node::Rule => "---".to_string(),
        inline => paragraph_text(std::slice::from_ref(inline)),
    }
}

fn render_list(ordered: bool, items: &[Vec<Node>], indent: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let pad = " ".repeat(indent);

    for (number, item) in items.iter().enumerate() {
        let mut text_nodes = Vec::new();
        let mut nested = Vec::new();
        for node in item {
            match node {
                Node::List { ordered, items } => nested.extend(render_list(*ordered, items, indent + 2)),
                other => text_nodes.push(other.clone()),
            }
        }

        let text = inline_text(&text_nodes).split_whitespace().collect::<Vec<_>>().join(" ");
        if !text.is_empty() {
            let marker = if ordered {
                format!("{}.", number + 1)
            } else {
                "-".to_string()
            };
            lines.push(format!("{}{} {}", pad, marker, text));
        }
        lines.extend(nested);
    }

    lines
}

/// Inline text with each line trimmed and surrounding blank lines removed.
fn paragraph_text(nodes: &[Node]) -> String {
    inline_text(nodes)
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn inline_text(nodes: &[Node]) -> String {
    nodes.iter().map(render_inline).collect()
}

fn render_inline(node: &Node) -> String {
    match node {
        Node::Text { text, style } => apply_style(text, *style),
        Node::Emphasis { kind, children } => apply_style(&inline_text(children), kind.style()),
        Node::Link { href, children } => {
            let text = inline_text(children).trim().to_string();
            match href.as_deref().filter(|h| !h.is_empty()) {
                Some(href) if text.is_empty() => format!("[{}]({})", href, href),
                Some(href) => format!("[{}]({})", text, href),
                None => text,
            }
        }
        Node::Image { alt, src, title } => {
            if src.is_empty() {
                String::new()
            } else {
                match title {
                    Some(title) => format!("![{}]({} \"{}\")", alt, src, title),
                    None => format!("![{}]({})", alt, src),
                }
            }
        }
        Node::InlineCode(code) => {
            if code.contains('`') {
                format!("`` {} ``", code)
            } else {
                format!("`{}`", code)
            }
        }
        Node::LineBreak => "\n".to_string(),
        Node::Heading { children, .. }
        | Node::Paragraph { children, .. }
        | Node::ListItem { children, .. }
        | Node::Blockquote(children) => inline_text(children),
        Node::CodeBlock { code, .. } => code.clone(),
        Node::List { .. } | Node::Table { .. } | Node::PageBreak | Node::Rule => String::new(),
    }
}

/// Wrap the non-blank core of `text` in the markers for `style`, keeping
/// surrounding whitespace outside. Blank text is returned unchanged.
fn apply_style(text: &str, style: StyleSet) -> String {
    let core = text.trim();
    if core.is_empty() || style.is_empty() {
        return text.to_string();
    }

    let start = text.len() - text.trim_start().len();
    let lead = &text[..start];
    let trail = &text[start + core.len()..];

    let mut wrapped = core.to_string();
    if style.contains(StyleSet::UNDERLINE) {
        wrapped = format!("<u>{}</u>", wrapped);
    }
    if style.contains(StyleSet::STRIKETHROUGH) {
        wrapped = format!("~~{}~~", wrapped);
    }
    if style.contains(StyleSet::ITALIC) {
        wrapped = format!("*{}*", wrapped);
    }
    if style.contains(StyleSet::BOLD) {
        wrapped = format!("**{}**", wrapped);
    }

    format!("{}{}{}", lead, wrapped, trail)
}
