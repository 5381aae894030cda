//! The structural node tree shared by the HTML and RTF converters.
//!
//! A tree is built by one parse pass and consumed by one render pass
//! ([`crate::render`]); nothing edits it in between.

use bitflags::bitflags;

bitflags! {
    /// Inline character formatting in effect for a run of text.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct StyleSet: u8 {
        const BOLD = 1;
        const ITALIC = 1 << 1;
        const UNDERLINE = 1 << 2;
        const STRIKETHROUGH = 1 << 3;
    }
}

/// Kind of an explicit emphasis wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmphasisKind {
    Bold,
    Italic,
    Underline,
    Strikethrough,
}

impl EmphasisKind {
    pub fn style(self) -> StyleSet {
        match self {
            Self::Bold => StyleSet::BOLD,
            Self::Italic => StyleSet::ITALIC,
            Self::Underline => StyleSet::UNDERLINE,
            Self::Strikethrough => StyleSet::STRIKETHROUGH,
        }
    }
}

/// One node of the intermediate document tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Heading {
        level: usize,
        children: Vec<Node>,
    },
    /// A paragraph; `style` is the source style name, if any (RTF `\sN`).
    Paragraph {
        style: Option<String>,
        children: Vec<Node>,
    },
    Text {
        text: String,
        style: StyleSet,
    },
    Emphasis {
        kind: EmphasisKind,
        children: Vec<Node>,
    },
    /// A nested list; each item is a sequence of nodes.
    List {
        ordered: bool,
        items: Vec<Vec<Node>>,
    },
    /// A flat list paragraph at the given nesting depth (0-based).
    ListItem {
        depth: usize,
        children: Vec<Node>,
    },
    Table {
        rows: Vec<Vec<String>>,
    },
    Image {
        alt: String,
        src: String,
        title: Option<String>,
    },
    /// A hyperlink; without `href` only the text survives.
    Link {
        href: Option<String>,
        children: Vec<Node>,
    },
    InlineCode(String),
    CodeBlock {
        language: Option<String>,
        code: String,
    },
    Blockquote(Vec<Node>),
    LineBreak,
    PageBreak,
    Rule,
}

impl Node {
    /// Unstyled text.
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text {
            text: text.into(),
            style: StyleSet::empty(),
        }
    }

    pub fn styled(text: impl Into<String>, style: StyleSet) -> Self {
        Node::Text {
            text: text.into(),
            style,
        }
    }

    pub fn paragraph(children: Vec<Node>) -> Self {
        Node::Paragraph {
            style: None,
            children,
        }
    }

    /// Whether the node flows inside a paragraph rather than forming a block.
    pub fn is_inline(&self) -> bool {
        matches!(
            self,
            Node::Text { .. }
                | Node::Emphasis { .. }
                | Node::Link { .. }
                | Node::Image { .. }
                | Node::InlineCode(_)
                | Node::LineBreak
        )
    }

    /// Concatenated text content, ignoring formatting.
    pub fn plain_text(&self) -> String {
        match self {
            Node::Text { text, .. } | Node::InlineCode(text) => text.clone(),
            Node::CodeBlock { code, .. } => code.clone(),
            Node::Image { alt, .. } => alt.clone(),
            Node::LineBreak => "\n".to_string(),
            Node::Heading { children, .. }
            | Node::Paragraph { children, .. }
            | Node::Emphasis { children, .. }
            | Node::ListItem { children, .. }
            | Node::Link { children, .. }
            | Node::Blockquote(children) => children.iter().map(Node::plain_text).collect(),
            Node::List { items, .. } => items
                .iter()
                .map(|item| item.iter().map(Node::plain_text).collect::<String>())
                .collect::<Vec<_>>()
                .join("\n"),
            Node::Table { rows } => rows
                .iter()
                .map(|r| r.join(" "))
                .collect::<Vec<_>>()
                .join("\n"),
            Node::PageBreak | Node::Rule => String::new(),
        }
    }
}
