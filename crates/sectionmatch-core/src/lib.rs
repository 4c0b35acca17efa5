//! Backend-agnostic model and algorithms for `sectionmatch`.
//!
//! Nothing in this crate touches the filesystem or an HTML parser. Callers hand in
//! already-flattened container nodes (`Node`) and extracted rows (`ContentRow`);
//! `sectionmatch-local` does that for real documents.

pub mod catalog;
pub mod compare;
pub mod locate;
pub mod marker;
pub mod node;
pub mod rank;
pub mod scan;

pub use catalog::{Catalog, TemplateGroup, TemplateUnit};
pub use compare::{structure_similarity, text_similarity};
pub use locate::{locate, Located};
pub use marker::DelimiterMarker;
pub use node::{ContentRow, Node, Section};
pub use rank::{rank, MatchRecord, RankParams, RankedRow, ScoreMode};
pub use scan::{scan_container, SpacerPolicy};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid label: {0}")]
    InvalidLabel(String),
    #[error("invalid template: {0}")]
    InvalidTemplate(String),
    #[error("invalid template group: {0}")]
    InvalidGroup(String),
    #[error("invalid comparison mode: {0}")]
    InvalidMode(String),
    #[error("invalid selector: {0}")]
    InvalidSelector(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("container not found: {0}")]
    ContainerNotFound(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
