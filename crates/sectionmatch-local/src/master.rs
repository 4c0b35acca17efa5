//! Building a `Catalog` from a master template document.

use crate::snapshot::{container_nodes, select_first};
use crate::{read_document, ContainerConfig};
use sectionmatch_core::{scan_container, Catalog, Error, Result, SpacerPolicy};
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default)]
pub struct MasterScanner {
    config: ContainerConfig,
}

impl MasterScanner {
    pub fn new(config: ContainerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    pub fn scan_file(&self, path: &Path) -> Result<Catalog> {
        let html = read_document(path)?;
        self.scan_html(&html)
    }

    /// Scan every configured container in order and concatenate their groups.
    ///
    /// A container the document lacks is skipped with a warning; it is an error only when
    /// none of them is present.
    pub fn scan_html(&self, html: &str) -> Result<Catalog> {
        let doc = html_scraper::Html::parse_document(html);
        let mut groups = Vec::new();
        let mut found = 0usize;

        for container in &self.config.containers {
            let Some(table) = select_first(&doc, &container.selector)? else {
                warn!(selector = %container.selector, "master container not found");
                continue;
            };
            found += 1;
            let policy = if container.spacer_blocks {
                SpacerPolicy::Expected
            } else {
                SpacerPolicy::Absent
            };
            let nodes = container_nodes(table);
            let scanned = scan_container(&nodes, policy);
            debug!(
                selector = %container.selector,
                nodes = nodes.len(),
                groups = scanned.len(),
                "scanned master container"
            );
            groups.extend(scanned);
        }

        if found == 0 {
            return Err(Error::ContainerNotFound(self.config.selectors().join(", ")));
        }
        let catalog = Catalog::new(groups);
        info!(
            groups = catalog.groups().len(),
            templates = catalog.unit_count(),
            "master catalog built"
        );
        Ok(catalog)
    }
}
