use sectionmatch_core::{Catalog, Error, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{debug, info};

pub mod master;
pub mod snapshot;
pub mod target;

pub use master::MasterScanner;
pub use target::{Relocated, RowExtractor};

/// Main content table of the house layout; templates there carry spacer blocks.
pub const MAIN_TABLE_SELECTOR: &str = "html > body > div > center > div > table:nth-of-type(1)";
/// Footer table of the house layout; templates there are named by their START label.
pub const FOOTER_TABLE_SELECTOR: &str = "html > body > div > center > div > table:nth-of-type(2)";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    pub selector: String,
    /// Whether templates in this container are preceded by a `TEMPLATE SPACER` block.
    pub spacer_blocks: bool,
}

/// Which tables of a document hold catalogued or candidate rows, in scan order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerConfig {
    pub containers: Vec<Container>,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self::new(MAIN_TABLE_SELECTOR, FOOTER_TABLE_SELECTOR)
    }
}

impl ContainerConfig {
    pub fn new(main: &str, footer: &str) -> Self {
        Self {
            containers: vec![
                Container {
                    selector: main.to_string(),
                    spacer_blocks: true,
                },
                Container {
                    selector: footer.to_string(),
                    spacer_blocks: false,
                },
            ],
        }
    }

    pub fn selectors(&self) -> Vec<&str> {
        self.containers.iter().map(|c| c.selector.as_str()).collect()
    }
}

/// Read a document as UTF-8; a missing path is `NotFound`, other failures are `Io`.
pub fn read_document(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(Error::NotFound(path.display().to_string()));
    }
    let bytes = fs::read(path)?;
    String::from_utf8(bytes)
        .map_err(|e| Error::Parse(format!("{} is not valid UTF-8: {e}", path.display())))
}

/// Hex SHA-256 of the document text.
pub fn fingerprint(html: &str) -> String {
    let mut h = Sha256::new();
    h.update(html.as_bytes());
    hex::encode(h.finalize())
}

#[derive(Debug, Clone, Default)]
struct Loaded {
    catalog: Arc<Catalog>,
    fingerprint: Option<String>,
}

/// The current catalog, replaced wholesale when the master document changes.
///
/// Readers keep whatever `Arc<Catalog>` they took; a reload never mutates it.
/// Reloads run one at a time, so the catalog swapped in last comes from the last read.
#[derive(Debug, Default)]
pub struct CatalogStore {
    inner: RwLock<Loaded>,
    reload: Mutex<()>,
}

impl CatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Arc<Catalog> {
        let g = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&g.catalog)
    }

    /// Fingerprint of the master document the current catalog was built from.
    pub fn fingerprint(&self) -> Option<String> {
        let g = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        g.fingerprint.clone()
    }

    pub fn replace(&self, catalog: Catalog, fingerprint: Option<String>) {
        let mut g = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *g = Loaded {
            catalog: Arc::new(catalog),
            fingerprint,
        };
    }

    /// Rescan `path` unless its content matches the last successful load.
    ///
    /// Returns whether the catalog was replaced. On error the previous catalog stays current.
    pub fn reload_if_changed(&self, scanner: &MasterScanner, path: &Path) -> Result<bool> {
        let _reloading = self.reload.lock().unwrap_or_else(PoisonError::into_inner);
        let html = read_document(path)?;
        let fp = fingerprint(&html);
        if self.fingerprint().as_deref() == Some(fp.as_str()) {
            debug!(path = %path.display(), "master unchanged; keeping catalog");
            return Ok(false);
        }
        let catalog = scanner.scan_html(&html)?;
        info!(
            path = %path.display(),
            templates = catalog.unit_count(),
            "catalog reloaded"
        );
        self.replace(catalog, Some(fp));
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn master(name: &str) -> String {
        format!(
            r#"<html><body><div><center><div><table>
<!-- TEMPLATE GROUP TITLE START -->
<!-- MARK HEADERS -->
<tr><td><table><tr><td>Greeting</td></tr></table></td></tr>
<!-- TEMPLATE GROUP TITLE END -->
<!-- TEMPLATE SPACER START -->
<tr><td>{name}</td></tr>
<!-- TEMPLATE SPACER END -->
<!-- HI START -->
<tr><td>Hello there</td></tr>
<!-- HI END -->
</table></div></center></div></body></html>"#
        )
    }

    #[test]
    fn default_config_scans_main_then_footer() {
        let cfg = ContainerConfig::default();
        assert_eq!(
            cfg.selectors(),
            vec![MAIN_TABLE_SELECTOR, FOOTER_TABLE_SELECTOR]
        );
        assert!(cfg.containers[0].spacer_blocks);
        assert!(!cfg.containers[1].spacer_blocks);
    }

    #[test]
    fn read_document_distinguishes_missing_from_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read_document(&dir.path().join("nope.html")),
            Err(Error::NotFound(_))
        ));

        let bad = dir.path().join("bad.html");
        fs::write(&bad, [0xff, 0xfe, 0x00]).unwrap();
        assert!(matches!(read_document(&bad), Err(Error::Parse(_))));

        // A directory exists but cannot be read as a file.
        assert!(matches!(read_document(dir.path()), Err(Error::Io(_))));
    }

    #[test]
    fn fingerprint_is_stable_hex() {
        let a = fingerprint("<p>x</p>");
        assert_eq!(a.len(), 64);
        assert_eq!(a, fingerprint("<p>x</p>"));
        assert_ne!(a, fingerprint("<p>y</p>"));
    }

    #[test]
    fn store_reloads_only_on_change_and_keeps_old_snapshots() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("master.html");
        let scanner = MasterScanner::default();
        let store = CatalogStore::new();
        assert!(store.current().is_empty());
        assert!(store.fingerprint().is_none());

        fs::write(&path, master("Hi")).unwrap();
        assert!(store.reload_if_changed(&scanner, &path).unwrap());
        assert!(!store.reload_if_changed(&scanner, &path).unwrap());
        let before = store.current();
        assert_eq!(before.units(None).next().unwrap().1.name(), "Hi");

        fs::write(&path, master("Hello")).unwrap();
        assert!(store.reload_if_changed(&scanner, &path).unwrap());
        assert_eq!(store.current().units(None).next().unwrap().1.name(), "Hello");
        // The snapshot taken earlier is untouched.
        assert_eq!(before.units(None).next().unwrap().1.name(), "Hi");
    }

    #[test]
    fn failed_reload_keeps_current_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("master.html");
        let scanner = MasterScanner::default();
        let store = CatalogStore::new();

        fs::write(&path, master("Hi")).unwrap();
        store.reload_if_changed(&scanner, &path).unwrap();
        let fp = store.fingerprint();

        fs::write(&path, "<html><body><p>no tables</p></body></html>").unwrap();
        assert!(matches!(
            store.reload_if_changed(&scanner, &path),
            Err(Error::ContainerNotFound(_))
        ));
        assert_eq!(store.fingerprint(), fp);
        assert_eq!(store.current().unit_count(), 1);
    }

    #[test]
    fn concurrent_reloads_scan_once_and_settle_on_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("master.html");
        let scanner = MasterScanner::default();
        let store = CatalogStore::new();
        fs::write(&path, master("Hi")).unwrap();

        let (store, scanner, path) = (&store, &scanner, path.as_path());
        let reloaded = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| s.spawn(move || store.reload_if_changed(scanner, path).unwrap()))
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|r| *r)
                .count()
        });
        assert_eq!(reloaded, 1);
        assert_eq!(
            store.fingerprint().as_deref(),
            Some(fingerprint(&master("Hi")).as_str())
        );
        assert_eq!(store.current().unit_count(), 1);
    }

    #[test]
    fn store_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CatalogStore>();
        assert_send_sync::<Arc<Catalog>>();
    }
}
