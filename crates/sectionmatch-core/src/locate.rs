//! Finding "the same" row again after the target document has been re-parsed.
//!
//! Element identity does not survive a reparse, so a row is looked up by its recorded
//! `(container, position)` first and accepted only if its content still matches; otherwise
//! the first content-equal row in document order wins.

use crate::node::ContentRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Located<'a> {
    ByIndex(&'a ContentRow),
    ByContent(&'a ContentRow),
}

impl<'a> Located<'a> {
    pub fn row(&self) -> &'a ContentRow {
        match *self {
            Located::ByIndex(r) | Located::ByContent(r) => r,
        }
    }

    pub fn method(&self) -> &'static str {
        match self {
            Located::ByIndex(_) => "index",
            Located::ByContent(_) => "content",
        }
    }
}

pub fn locate<'a>(rows: &'a [ContentRow], wanted: &ContentRow) -> Option<Located<'a>> {
    let by_index = rows
        .iter()
        .find(|r| r.container == wanted.container && r.position == wanted.position)
        .filter(|r| r.same_content(wanted));
    if let Some(r) = by_index {
        return Some(Located::ByIndex(r));
    }
    rows.iter()
        .find(|r| r.same_content(wanted))
        .map(Located::ByContent)
}
