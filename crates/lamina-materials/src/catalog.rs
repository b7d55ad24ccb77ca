//! External refractive-index catalogs.
//!
//! A catalog addresses materials by a `shelf|book|page` triple, in the
//! manner of the refractiveindex.info database. The resolver only needs the
//! [`CatalogLookup`] capability; how a catalog fetches or caches its data is
//! its own business.
//!
//! Two implementations are provided:
//! - [`InMemoryCatalog`]: providers registered programmatically.
//! - [`DirectoryCatalog`]: a local tree `root/<shelf>/<book>/<page>.yml`.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use crate::document::load_document;
use crate::provider::{MaterialError, MaterialProvider};
use crate::resolver::MaterialRef;

/// Catalog address of a material.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CatalogKey {
    pub shelf: String,
    pub book: String,
    pub page: String,
}

impl CatalogKey {
    pub fn new(shelf: impl Into<String>, book: impl Into<String>, page: impl Into<String>) -> Self {
        Self {
            shelf: shelf.into(),
            book: book.into(),
            page: page.into(),
        }
    }
}

impl fmt::Display for CatalogKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{}", self.shelf, self.book, self.page)
    }
}

impl FromStr for CatalogKey {
    type Err = MaterialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('|').map(str::trim).collect();
        match parts.as_slice() {
            [shelf, book, page] if !shelf.is_empty() && !book.is_empty() && !page.is_empty() => {
                Ok(Self::new(*shelf, *book, *page))
            }
            _ => Err(MaterialError::Catalog(format!(
                "invalid catalog id '{}', expected 'shelf|book|page'",
                s
            ))),
        }
    }
}

/// Optical constants returned by a catalog lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CatalogSample {
    pub n: f64,
    pub k: f64,
    pub range_min_nm: f64,
    pub range_max_nm: f64,
}

/// A search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub id: CatalogKey,
    pub display_name: String,
}

/// Capability consumed by the resolver for catalog-backed materials.
pub trait CatalogLookup: Send + Sync {
    /// Optical constants of `key` at `wavelength_nm`.
    fn lookup(&self, key: &CatalogKey, wavelength_nm: f64) -> Result<CatalogSample, MaterialError>;

    /// Valid wavelength range of `key` (nm).
    fn wavelength_range(&self, key: &CatalogKey) -> Result<(f64, f64), MaterialError>;

    /// Materials whose book or page matches `query` (case-insensitive).
    fn search_by_name(&self, query: &str) -> Vec<CatalogEntry>;
}

fn sample(provider: &dyn MaterialProvider, wavelength_nm: f64) -> Result<CatalogSample, MaterialError> {
    let index = provider.refractive_index(wavelength_nm)?;
    let (range_min_nm, range_max_nm) = provider.wavelength_range();
    Ok(CatalogSample {
        n: index.re,
        k: index.im,
        range_min_nm,
        range_max_nm,
    })
}

fn matches(query: &str, key: &CatalogKey, display_name: &str) -> bool {
    let q = query.to_lowercase();
    !q.is_empty()
        && (key.book.to_lowercase().contains(&q)
            || key.page.to_lowercase().contains(&q)
            || display_name.to_lowercase().contains(&q))
}

struct CatalogItem {
    display_name: String,
    provider: Arc<dyn MaterialProvider>,
}

/// Catalog backed by providers registered in memory.
#[derive(Default)]
pub struct InMemoryCatalog {
    items: BTreeMap<CatalogKey, CatalogItem>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        key: CatalogKey,
        display_name: impl Into<String>,
        provider: Arc<dyn MaterialProvider>,
    ) {
        self.items.insert(
            key,
            CatalogItem {
                display_name: display_name.into(),
                provider,
            },
        );
    }

    fn get(&self, key: &CatalogKey) -> Result<&CatalogItem, MaterialError> {
        self.items
            .get(key)
            .ok_or_else(|| MaterialError::NotFound(key.to_string()))
    }
}

impl CatalogLookup for InMemoryCatalog {
    fn lookup(&self, key: &CatalogKey, wavelength_nm: f64) -> Result<CatalogSample, MaterialError> {
        sample(self.get(key)?.provider.as_ref(), wavelength_nm)
    }

    fn wavelength_range(&self, key: &CatalogKey) -> Result<(f64, f64), MaterialError> {
        Ok(self.get(key)?.provider.wavelength_range())
    }

    fn search_by_name(&self, query: &str) -> Vec<CatalogEntry> {
        self.items
            .iter()
            .filter(|(key, item)| matches(query, key, &item.display_name))
            .map(|(key, item)| CatalogEntry {
                id: key.clone(),
                display_name: item.display_name.clone(),
            })
            .collect()
    }
}

/// Catalog reading material documents from a local directory tree.
///
/// Documents are parsed on first use and kept for the catalog's lifetime.
pub struct DirectoryCatalog {
    root: PathBuf,
    loaded: Mutex<HashMap<CatalogKey, Arc<dyn MaterialProvider>>>,
}

impl DirectoryCatalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            loaded: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn page_path(&self, key: &CatalogKey) -> PathBuf {
        self.root
            .join(&key.shelf)
            .join(&key.book)
            .join(format!("{}.yml", key.page))
    }

    fn provider(&self, key: &CatalogKey) -> Result<Arc<dyn MaterialProvider>, MaterialError> {
        let mut loaded = self
            .loaded
            .lock()
            .map_err(|_| MaterialError::Catalog("catalog lock poisoned".into()))?;
        if let Some(provider) = loaded.get(key) {
            return Ok(Arc::clone(provider));
        }

        let path = self.page_path(key);
        if !path.is_file() {
            return Err(MaterialError::NotFound(format!(
                "{} ({} does not exist)",
                key,
                path.display()
            )));
        }
        let provider: Arc<dyn MaterialProvider> = match load_document(&path)? {
            MaterialRef::Tabulated(table) => table,
            MaterialRef::Formula(formula) => formula,
            other => {
                return Err(MaterialError::Catalog(format!(
                    "{} resolved to an unexpected reference {:?}",
                    key, other
                )))
            }
        };
        log::debug!("Loaded catalog page {} from {}", key, path.display());
        loaded.insert(key.clone(), Arc::clone(&provider));
        Ok(provider)
    }
}

impl CatalogLookup for DirectoryCatalog {
    fn lookup(&self, key: &CatalogKey, wavelength_nm: f64) -> Result<CatalogSample, MaterialError> {
        sample(self.provider(key)?.as_ref(), wavelength_nm)
    }

    fn wavelength_range(&self, key: &CatalogKey) -> Result<(f64, f64), MaterialError> {
        Ok(self.provider(key)?.wavelength_range())
    }

    fn search_by_name(&self, query: &str) -> Vec<CatalogEntry> {
        let mut hits = Vec::new();
        for shelf in sorted_entries(&self.root) {
            for book in sorted_entries(&shelf) {
                for page in sorted_entries(&book) {
                    if page.extension().and_then(|e| e.to_str()) != Some("yml") {
                        continue;
                    }
                    let name = |p: &Path| {
                        p.file_stem()
                            .map(|s| s.to_string_lossy().into_owned())
                            .unwrap_or_default()
                    };
                    let key = CatalogKey::new(name(&shelf), name(&book), name(&page));
                    let display_name = format!("{} - {}", key.book, key.page);
                    if matches(query, &key, &display_name) {
                        hits.push(CatalogEntry {
                            id: key,
                            display_name,
                        });
                    }
                }
            }
        }
        hits
    }
}

/// Directory children in name order; unreadable directories yield nothing.
fn sorted_entries(dir: &Path) -> Vec<PathBuf> {
    let Ok(read) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut paths: Vec<PathBuf> = read.filter_map(|e| e.ok().map(|e| e.path())).collect();
    paths.sort();
    paths
}
