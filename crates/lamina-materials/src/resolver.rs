//! Material references and the memoizing index resolver.
//!
//! A [`MaterialRef`] is decided once, when a material is declared: a fixed
//! index, a table, a dispersion formula or a catalog address. The
//! [`MaterialResolver`] turns a reference plus a wavelength into a complex
//! refractive index and remembers every answer until [`MaterialResolver::clear_cache`]
//! is called.

use std::collections::HashMap;
use std::sync::Arc;

use num_complex::Complex64;

use crate::catalog::{CatalogKey, CatalogLookup};
use crate::formula::FormulaMaterial;
use crate::provider::{complex_index, MaterialError, MaterialProvider};
use crate::tabulated::TabulatedMaterial;

/// Where a layer's optical constants come from.
#[derive(Debug, Clone)]
pub enum MaterialRef {
    /// Wavelength-independent index.
    Constant(Complex64),
    /// Interpolated `(λ, n, k)` table.
    Tabulated(Arc<TabulatedMaterial>),
    /// Closed-form dispersion formula.
    Formula(Arc<FormulaMaterial>),
    /// Entry of the resolver's catalog.
    Catalog(CatalogKey),
}

impl MaterialRef {
    /// Fixed `n + ik`, rejecting negative `k`.
    pub fn constant(n: f64, k: f64) -> Result<Self, MaterialError> {
        Ok(Self::Constant(complex_index(n, k, f64::NAN)?))
    }

    /// Short human-readable description.
    pub fn describe(&self) -> String {
        match self {
            Self::Constant(n) => format!("constant n={} k={}", n.re, n.im),
            Self::Tabulated(t) => format!("table {}", t.name()),
            Self::Formula(f) => format!("formula {} ({})", f.formula().kind.number(), f.name()),
            Self::Catalog(key) => format!("catalog {}", key),
        }
    }

    /// Identity used for memoization.
    ///
    /// Tables and formulas carry an id assigned at construction, so clones
    /// of a reference share cache entries while a rebuilt material never
    /// sees values computed for an earlier one.
    pub fn cache_key(&self) -> CacheKey {
        match self {
            Self::Constant(n) => CacheKey::Constant(n.re.to_bits(), n.im.to_bits()),
            Self::Tabulated(t) => CacheKey::Shared(t.id()),
            Self::Formula(f) => CacheKey::Shared(f.id()),
            Self::Catalog(key) => CacheKey::Catalog(key.clone()),
        }
    }
}

/// Identity of a [`MaterialRef`] inside the cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Constant(u64, u64),
    Shared(u64),
    Catalog(CatalogKey),
}

/// Memo table keyed by material identity and exact wavelength.
#[derive(Debug, Default)]
pub struct IndexCache {
    entries: HashMap<(CacheKey, u64), Complex64>,
    hits: u64,
    misses: u64,
}

impl IndexCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn get(&mut self, key: &(CacheKey, u64)) -> Option<Complex64> {
        let found = self.entries.get(key).copied();
        if found.is_some() {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
        found
    }

    fn insert(&mut self, key: (CacheKey, u64), value: Complex64) {
        self.entries.insert(key, value);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(hits, misses)` since the last clear.
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.hits = 0;
        self.misses = 0;
    }
}

/// Resolves material references to complex refractive indices.
#[derive(Default)]
pub struct MaterialResolver {
    catalog: Option<Arc<dyn CatalogLookup>>,
    cache: IndexCache,
}

impl MaterialResolver {
    /// Resolver without a catalog; catalog references fail with `NotFound`.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog(catalog: Arc<dyn CatalogLookup>) -> Self {
        Self {
            catalog: Some(catalog),
            cache: IndexCache::new(),
        }
    }

    pub fn catalog(&self) -> Option<&Arc<dyn CatalogLookup>> {
        self.catalog.as_ref()
    }

    pub fn cache(&self) -> &IndexCache {
        &self.cache
    }

    /// Complex index of `material` at `wavelength_nm`, memoized.
    ///
    /// # Errors
    /// Any [`MaterialError`] from the underlying source. Failures are not
    /// cached.
    pub fn resolve(
        &mut self,
        material: &MaterialRef,
        wavelength_nm: f64,
    ) -> Result<Complex64, MaterialError> {
        let key = (material.cache_key(), wavelength_nm.to_bits());
        if let Some(index) = self.cache.get(&key) {
            return Ok(index);
        }
        let index = self.resolve_uncached(material, wavelength_nm)?;
        self.cache.insert(key, index);
        Ok(index)
    }

    fn resolve_uncached(
        &self,
        material: &MaterialRef,
        wavelength_nm: f64,
    ) -> Result<Complex64, MaterialError> {
        match material {
            MaterialRef::Constant(n) => Ok(*n),
            MaterialRef::Tabulated(table) => table.refractive_index(wavelength_nm),
            MaterialRef::Formula(formula) => formula.refractive_index(wavelength_nm),
            MaterialRef::Catalog(key) => {
                let catalog = self.require_catalog(key)?;
                let (lo, hi) = catalog.wavelength_range(key)?;
                if lo.is_nan() || hi.is_nan() || lo > hi {
                    return Err(MaterialError::Catalog(format!(
                        "{}: invalid wavelength range [{}, {}] nm",
                        key, lo, hi
                    )));
                }
                // Flat extrapolation, same as tabulated data.
                let clamped = wavelength_nm.clamp(lo, hi);
                if clamped != wavelength_nm {
                    log::debug!(
                        "{}: {:.1} nm outside [{}, {}] nm, using boundary value",
                        key,
                        wavelength_nm,
                        lo,
                        hi
                    );
                }
                let sample = catalog.lookup(key, clamped)?;
                complex_index(sample.n, sample.k, wavelength_nm)
            }
        }
    }

    /// Valid wavelength range of `material` in nm; `None` when unbounded.
    pub fn valid_range(&self, material: &MaterialRef) -> Result<Option<(f64, f64)>, MaterialError> {
        let range = match material {
            MaterialRef::Constant(_) => return Ok(None),
            MaterialRef::Tabulated(table) => table.wavelength_range(),
            MaterialRef::Formula(formula) => formula.wavelength_range(),
            MaterialRef::Catalog(key) => self.require_catalog(key)?.wavelength_range(key)?,
        };
        if range.0 <= 0.0 && range.1.is_infinite() {
            Ok(None)
        } else {
            Ok(Some(range))
        }
    }

    /// Drop every memoized index.
    pub fn clear_cache(&mut self) {
        let (hits, misses) = self.cache.stats();
        log::debug!(
            "Clearing index cache ({} entries, {} hits, {} misses)",
            self.cache.len(),
            hits,
            misses
        );
        self.cache.clear();
    }

    fn require_catalog(&self, key: &CatalogKey) -> Result<&Arc<dyn CatalogLookup>, MaterialError> {
        self.catalog.as_ref().ok_or_else(|| {
            MaterialError::NotFound(format!("{} (no catalog configured)", key))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use approx::assert_abs_diff_eq;

    fn table() -> MaterialRef {
        MaterialRef::Tabulated(Arc::new(
            TabulatedMaterial::from_rows("t", &[(400.0, 1.5, 0.1), (700.0, 1.4, 0.0)]).unwrap(),
        ))
    }

    #[test]
    fn test_constant_ignores_wavelength() {
        let mut resolver = MaterialResolver::new();
        let m = MaterialRef::constant(2.0, 0.5).unwrap();
        assert_eq!(resolver.resolve(&m, 300.0).unwrap(), Complex64::new(2.0, 0.5));
        assert_eq!(resolver.resolve(&m, 1500.0).unwrap(), Complex64::new(2.0, 0.5));
        assert_eq!(resolver.valid_range(&m).unwrap(), None);
    }

    #[test]
    fn test_constant_rejects_gain() {
        assert!(matches!(
            MaterialRef::constant(1.5, -0.2),
            Err(MaterialError::NegativeExtinction { .. })
        ));
    }

    #[test]
    fn test_results_are_memoized_until_cleared() {
        let mut resolver = MaterialResolver::new();
        let m = table();
        let clone = m.clone();
        resolver.resolve(&m, 550.0).unwrap();
        resolver.resolve(&clone, 550.0).unwrap();
        resolver.resolve(&m, 600.0).unwrap();
        assert_eq!(resolver.cache().len(), 2);
        assert_eq!(resolver.cache().stats(), (1, 2));

        resolver.clear_cache();
        assert!(resolver.cache().is_empty());
    }

    #[test]
    fn test_tabulated_clamps_outside_range() {
        let mut resolver = MaterialResolver::new();
        let m = table();
        assert_eq!(resolver.resolve(&m, 350.0).unwrap(), Complex64::new(1.5, 0.1));
        assert_eq!(resolver.resolve(&m, 750.0).unwrap(), Complex64::new(1.4, 0.0));
        assert_eq!(resolver.valid_range(&m).unwrap(), Some((400.0, 700.0)));
    }

    #[test]
    fn test_catalog_lookup_clamps_to_range() {
        let mut catalog = InMemoryCatalog::new();
        let key = CatalogKey::new("main", "X", "Y");
        let formula = FormulaMaterial::new(
            "lin",
            crate::formula::DispersionFormula::new(
                crate::formula::FormulaKind::Cauchy,
                vec![1.0, 1.0, 1.0],
            )
            .unwrap(),
            Some((400.0, 800.0)),
        );
        catalog.insert(key.clone(), "X - Y", Arc::new(formula));

        let mut resolver = MaterialResolver::with_catalog(Arc::new(catalog));
        let m = MaterialRef::Catalog(key);
        assert_eq!(resolver.valid_range(&m).unwrap(), Some((400.0, 800.0)));

        // Cauchy n = 1 + λ(µm); below range it sticks at 400 nm.
        assert_abs_diff_eq!(resolver.resolve(&m, 600.0).unwrap().re, 1.6, epsilon = 1e-12);
        assert_abs_diff_eq!(resolver.resolve(&m, 200.0).unwrap().re, 1.4, epsilon = 1e-12);
        assert_abs_diff_eq!(resolver.resolve(&m, 1200.0).unwrap().re, 1.8, epsilon = 1e-12);
    }

    #[test]
    fn test_catalog_reference_without_catalog_fails() {
        let mut resolver = MaterialResolver::new();
        let m = MaterialRef::Catalog(CatalogKey::new("a", "b", "c"));
        assert!(matches!(resolver.resolve(&m, 500.0), Err(MaterialError::NotFound(_))));
        assert!(resolver.cache().is_empty());
    }

    #[test]
    fn test_rebuilt_tables_never_reuse_cached_values() {
        let mut resolver = MaterialResolver::new();
        for i in 0..200 {
            let n = 1.0 + 0.01 * i as f64;
            let m = MaterialRef::Tabulated(Arc::new(
                TabulatedMaterial::from_rows("t", &[(400.0, n, 0.0), (700.0, n, 0.0)]).unwrap(),
            ));
            assert_eq!(resolver.resolve(&m, 550.0).unwrap(), Complex64::new(n, 0.0));
        }
        assert_eq!(resolver.cache().len(), 200);
        assert_eq!(resolver.cache().stats(), (0, 200));
    }

    #[test]
    fn test_inverted_catalog_range_is_an_error() {
        let mut catalog = InMemoryCatalog::new();
        let key = CatalogKey::new("main", "KBr", "Li");
        let formula = FormulaMaterial::new(
            "KBr",
            crate::formula::DispersionFormula::new(crate::formula::FormulaKind::Cauchy, vec![1.5])
                .unwrap(),
            Some((200.0, 42.0)),
        );
        catalog.insert(key.clone(), "KBr - Li", Arc::new(formula));

        let mut resolver = MaterialResolver::with_catalog(Arc::new(catalog));
        assert!(matches!(
            resolver.resolve(&MaterialRef::Catalog(key), 550.0),
            Err(MaterialError::Catalog(_))
        ));
    }
}
