//! `sectionmatch` crate (library surface).
//!
//! The primary entrypoint for end users is the `sectionmatch` binary. This library module
//! re-exports the model/algorithm crate and the document crate under stable names so
//! embedders do not depend on internal crate layout.

pub use sectionmatch_core as core;
pub use sectionmatch_local as local;
