use crate::{Error, Result};
use serde::Serialize;
use std::fmt;

pub const START_SUFFIX: &str = " START";
pub const END_SUFFIX: &str = " END";

/// Label bounding a template group header.
pub const GROUP_LABEL: &str = "TEMPLATE GROUP TITLE";
/// Label bounding the three-row spacer block that names the next template.
pub const SPACER_LABEL: &str = "TEMPLATE SPACER";
/// Annotation comment that sits inside a group header.
pub const MARK_HEADERS: &str = "MARK HEADERS";
/// Any comment containing this (case-insensitive) marks the next row as filler.
pub const DUMMY_SPACING: &str = "DUMMY SPACING";

/// A named boundary: `LABEL START` / `LABEL END` comment text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DelimiterMarker {
    label: String,
}

impl DelimiterMarker {
    pub fn new(label: &str) -> Result<Self> {
        let label = label.trim();
        if label.is_empty() {
            return Err(Error::InvalidLabel(
                "delimiter label cannot be empty or whitespace".to_string(),
            ));
        }
        Ok(Self {
            label: label.to_string(),
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn start_text(&self) -> String {
        format!("{}{START_SUFFIX}", self.label)
    }

    pub fn end_text(&self) -> String {
        format!("{}{END_SUFFIX}", self.label)
    }

    /// Full comment markup for the START boundary, e.g. `<!-- HI START -->`.
    pub fn start_comment(&self) -> String {
        format!("<!-- {} -->", self.start_text())
    }

    pub fn end_comment(&self) -> String {
        format!("<!-- {} -->", self.end_text())
    }

    /// True when a comment's trimmed text is this marker's START text.
    ///
    /// Extra spaces before the suffix are tolerated (`HI  START`).
    pub fn is_start(&self, comment: &str) -> bool {
        strip_start(comment.trim()) == Some(self.label.as_str())
    }

    pub fn is_end(&self, comment: &str) -> bool {
        strip_end(comment.trim()) == Some(self.label.as_str())
    }
}

impl fmt::Display for DelimiterMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// Label of a START comment (`"HI START"` -> `"HI"`), if the text carries the suffix.
pub fn strip_start(text: &str) -> Option<&str> {
    text.strip_suffix(START_SUFFIX).map(str::trim_end)
}

pub fn strip_end(text: &str) -> Option<&str> {
    text.strip_suffix(END_SUFFIX).map(str::trim_end)
}

pub fn is_dummy_spacing(comment: &str) -> bool {
    comment.to_uppercase().contains(DUMMY_SPACING)
}
