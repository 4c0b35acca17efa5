use serde::Serialize;

/// Owned snapshot of one element taken at extraction time.
///
/// Snapshots outlive the parsed document they came from, so a catalog can be shared
/// and swapped freely while the parser's tree is dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Section {
    pub tag: String,
    /// Visible text with each text node trimmed, concatenated without separators.
    pub text: String,
    /// Raw concatenated text with U+00A0 removed, trimmed.
    pub plain_text: String,
    /// Stripped text of the first `table` inside the first descendant `td`.
    pub caption: Option<String>,
    /// Descendant element tag names, document order, excluding this element.
    pub tags: Vec<String>,
    pub html: String,
    pub inner_html: String,
}

impl Section {
    pub fn is_row(&self) -> bool {
        self.tag.eq_ignore_ascii_case("tr")
    }

    pub fn caption(&self) -> Option<&str> {
        self.caption.as_deref().filter(|c| !c.is_empty())
    }
}

/// One child of a container, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Node {
    Comment(String),
    Text(String),
    Element(Section),
}

impl Node {
    pub fn is_comment(&self) -> bool {
        matches!(self, Node::Comment(_))
    }

    pub fn is_blank_text(&self) -> bool {
        matches!(self, Node::Text(t) if t.trim().is_empty())
    }

    pub fn comment_text(&self) -> Option<&str> {
        match self {
            Node::Comment(c) => Some(c.trim()),
            _ => None,
        }
    }

    pub fn as_element(&self) -> Option<&Section> {
        match self {
            Node::Element(s) => Some(s),
            _ => None,
        }
    }
}

/// A candidate row from the document being updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentRow {
    /// Index of the container (in configured order) the row came from.
    pub container: usize,
    /// Index among the container's direct rows, counted before empty rows are dropped.
    pub position: usize,
    pub section: Section,
}

impl ContentRow {
    pub fn same_content(&self, other: &ContentRow) -> bool {
        self.section.inner_html.trim() == other.section.inner_html.trim()
    }
}
