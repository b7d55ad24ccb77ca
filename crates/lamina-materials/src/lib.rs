//! # Lamina Materials
//!
//! Refractive-index data for thin-film calculations. Every data source
//! implements [`MaterialProvider`](provider::MaterialProvider), which returns
//! the complex index $\tilde{n} = n + ik$ at a wavelength in nanometres.
//!
//! ## Data sources
//!
//! | Source | Module |
//! |--------|--------|
//! | Tabulated $(\lambda, n, k)$ | [`tabulated`] |
//! | Dispersion formulas 1–9 | [`formula`] |
//! | refractiveindex.info YAML documents | [`document`] |
//! | External catalogs (`shelf|book|page`) | [`catalog`] |
//! | Built-in tables | [`library`] |
//!
//! Layers refer to their material through a
//! [`MaterialRef`](resolver::MaterialRef); the
//! [`MaterialResolver`](resolver::MaterialResolver) evaluates references
//! and memoizes the results per wavelength.
//!
//! ## Interpolation
//!
//! Tables are interpolated linearly ([`interp::LinearInterpolator`]) and
//! held flat at the boundary values outside their range.

pub mod catalog;
pub mod document;
pub mod formula;
pub mod interp;
pub mod library;
pub mod provider;
pub mod resolver;
pub mod tabulated;

pub use catalog::{CatalogKey, CatalogLookup, DirectoryCatalog, InMemoryCatalog};
pub use provider::{MaterialError, MaterialProvider};
pub use resolver::{MaterialRef, MaterialResolver};
