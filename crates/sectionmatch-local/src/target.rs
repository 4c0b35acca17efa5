//! Candidate rows from the document being updated.

use crate::snapshot::{direct_rows, section_of, select_first};
use crate::{read_document, ContainerConfig};
use sectionmatch_core::{locate, ContentRow, Error, Result};
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default)]
pub struct RowExtractor {
    config: ContainerConfig,
}

/// A previously extracted row found again in a freshly parsed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relocated {
    pub row: ContentRow,
    /// `index` or `content`.
    pub located_by: &'static str,
}

impl RowExtractor {
    pub fn new(config: ContainerConfig) -> Self {
        Self { config }
    }

    pub fn extract_file(&self, path: &Path) -> Result<Vec<ContentRow>> {
        let html = read_document(path)?;
        self.extract_html(&html)
    }

    /// Direct rows of each configured container, in container then document order.
    ///
    /// Rows whose stripped text is empty are dropped; positions are counted before that.
    pub fn extract_html(&self, html: &str) -> Result<Vec<ContentRow>> {
        let doc = html_scraper::Html::parse_document(html);
        let mut rows = Vec::new();
        let mut found = 0usize;

        for (container, cfg) in self.config.containers.iter().enumerate() {
            let Some(table) = select_first(&doc, &cfg.selector)? else {
                warn!(selector = %cfg.selector, "target container not found");
                continue;
            };
            found += 1;
            let before = rows.len();
            for (position, tr) in direct_rows(table).into_iter().enumerate() {
                let section = section_of(tr);
                if section.text.is_empty() {
                    continue;
                }
                rows.push(ContentRow {
                    container,
                    position,
                    section,
                });
            }
            debug!(selector = %cfg.selector, rows = rows.len() - before, "extracted target rows");
        }

        if found == 0 {
            return Err(Error::ContainerNotFound(self.config.selectors().join(", ")));
        }
        Ok(rows)
    }

    /// Re-read `path` and find `wanted` again, by position first and content second.
    pub fn relocate(&self, path: &Path, wanted: &ContentRow) -> Result<Relocated> {
        let rows = self.extract_file(path)?;
        let found = locate(&rows, wanted).ok_or_else(|| {
            Error::NotFound(format!(
                "row {}:{} no longer present in {}",
                wanted.container,
                wanted.position,
                path.display()
            ))
        })?;
        Ok(Relocated {
            row: found.row().clone(),
            located_by: found.method(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn doc(main_rows: &str, footer_rows: &str) -> String {
        format!(
            "<html><body><div><center><div>\
             <table>{main_rows}</table><table>{footer_rows}</table>\
             </div></center></div></body></html>"
        )
    }

    #[test]
    fn keeps_positions_of_non_empty_rows() {
        let html = doc(
            "<tr><td>Hello ther</td></tr><tr><td>&nbsp;</td></tr><tr><td><b>Dear</b> Madam</td></tr>",
            "<tr><td>Terms</td></tr>",
        );
        let rows = RowExtractor::default().extract_html(&html).unwrap();
        let got: Vec<_> = rows
            .iter()
            .map(|r| (r.container, r.position, r.section.text.as_str()))
            .collect();
        assert_eq!(
            got,
            vec![(0, 0, "Hello ther"), (0, 2, "DearMadam"), (1, 0, "Terms")]
        );
    }

    #[test]
    fn nested_table_rows_are_not_candidates() {
        let html = doc(
            "<tr><td><table><tr><td>inner</td></tr></table></td></tr>",
            "",
        );
        let rows = RowExtractor::default().extract_html(&html).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].section.text, "inner");
        assert_eq!(rows[0].position, 0);
    }

    #[test]
    fn no_container_is_an_error() {
        let err = RowExtractor::default()
            .extract_html("<html><body><p>x</p></body></html>")
            .unwrap_err();
        assert!(matches!(err, Error::ContainerNotFound(_)));
    }

    proptest::proptest! {
        #[test]
        fn positions_survive_blank_row_filtering(
            cells in proptest::collection::vec(
                proptest::option::of("[a-z]{1,6}( [a-z]{1,6}){0,3}"),
                0..12,
            ),
        ) {
            let main: String = cells
                .iter()
                .map(|c| format!("<tr><td>{}</td></tr>", c.as_deref().unwrap_or("&nbsp;")))
                .collect();
            let rows = RowExtractor::default().extract_html(&doc(&main, "")).unwrap();
            let want: Vec<(usize, String)> = cells
                .iter()
                .enumerate()
                .filter_map(|(i, c)| c.clone().map(|t| (i, t)))
                .collect();
            let got: Vec<(usize, String)> = rows
                .into_iter()
                .map(|r| (r.position, r.section.text))
                .collect();
            proptest::prop_assert_eq!(got, want);
        }
    }

    #[test]
    fn relocate_after_the_document_shifted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("target.html");
        let extractor = RowExtractor::default();

        fs::write(&path, doc("<tr><td>a</td></tr><tr><td>b</td></tr>", "")).unwrap();
        let rows = extractor.extract_file(&path).unwrap();
        let b = rows[1].clone();

        let same = extractor.relocate(&path, &b).unwrap();
        assert_eq!(same.located_by, "index");
        assert_eq!(same.row.position, 1);

        fs::write(
            &path,
            doc("<tr><td>new</td></tr><tr><td>a</td></tr><tr><td>b</td></tr>", ""),
        )
        .unwrap();
        let moved = extractor.relocate(&path, &b).unwrap();
        assert_eq!(moved.located_by, "content");
        assert_eq!(moved.row.position, 2);

        fs::write(&path, doc("<tr><td>a</td></tr>", "")).unwrap();
        assert!(matches!(
            extractor.relocate(&path, &b),
            Err(Error::NotFound(_))
        ));
    }
}
