//! # Lamina Core
//!
//! Optical response of planar thin-film stacks. This crate turns a compact
//! filter description into a layer stack and computes its reflectance,
//! transmittance and absorptance spectra with the Transfer Matrix Method.
//!
//! ## Architecture
//!
//! ```text
//! filter text ──▶ FilterExpander ──▶ LayerStack
//!                                        │
//!      CalculationRequest ──▶ SpectrumCalculator ──▶ Spectrum
//!                                        │
//!                 MaterialResolver ◀── TransferMatrixEngine (per λ)
//! ```
//!
//! ## Modules
//!
//! - [`types`]: calculation requests, wavelength grids, polarization.
//! - [`stack`]: layer stacks and their invariants.
//! - [`filter`]: the filter mini-language, material and array tables.
//! - [`tmm`]: the single-wavelength transfer-matrix solver.
//! - [`spectrum`]: wavelength sweeps with progress and cancellation.
//! - [`worker`]: running a sweep on a background thread.

pub mod filter;
pub mod spectrum;
pub mod stack;
pub mod tmm;
pub mod types;
pub mod worker;

pub use filter::{ArrayDefinition, ArrayTable, ExpandError, FilterExpander, MaterialEntry, MaterialTable};
pub use spectrum::{CancelToken, Spectrum, SpectrumCalculator, SpectrumError};
pub use stack::{LayerEntry, LayerStack, StackError};
pub use tmm::{TmmError, TmmResult, TransferMatrixEngine};
pub use types::{CalculationRequest, Polarization, WavelengthGrid};
