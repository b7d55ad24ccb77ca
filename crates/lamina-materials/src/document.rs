//! refractiveindex.info-style YAML material documents.
//!
//! A document carries a `DATA` list of typed blocks:
//! ```yaml
//! DATA:
//!   - type: tabulated nk
//!     data: |
//!       0.30 1.487 0.0
//!       0.40 1.470 0.0
//!   - type: formula 1
//!     wavelength_range: 0.21 6.7
//!     coefficients: 0 0.6961663 0.0684043 0.4079426 0.1162414 0.8974794 9.896161
//! ```
//!
//! Supported block types are `tabulated nk`, `tabulated n`, `tabulated k`
//! and `formula 1`–`formula 9`. The first `n`-bearing block wins; a
//! `tabulated k` block is merged into it when present.

use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use crate::formula::{DispersionFormula, FormulaKind, FormulaMaterial};
use crate::provider::{to_nanometres, MaterialError};
use crate::resolver::MaterialRef;
use crate::tabulated::{ExtinctionTable, TabulatedMaterial};

#[derive(Debug, Deserialize)]
struct MaterialDocument {
    #[serde(rename = "DATA", default)]
    data: Vec<DataBlock>,
}

#[derive(Debug, Deserialize)]
struct DataBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Option<String>,
    #[serde(default)]
    coefficients: Option<Scalar>,
    #[serde(default)]
    wavelength_range: Option<Scalar>,
}

/// YAML may type a single-number field as a float rather than a string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Number(f64),
}

impl Scalar {
    fn numbers(&self, field: &str) -> Result<Vec<f64>, MaterialError> {
        match self {
            Self::Number(v) => Ok(vec![*v]),
            Self::Text(s) => s
                .split_whitespace()
                .map(|part| {
                    part.parse::<f64>().map_err(|_| {
                        MaterialError::Document(format!("invalid number '{}' in {}", part, field))
                    })
                })
                .collect(),
        }
    }
}

/// Load a material document from disk.
pub fn load_document(path: &Path) -> Result<MaterialRef, MaterialError> {
    let content = std::fs::read_to_string(path).map_err(|source| MaterialError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    parse_document(&name, &content)
}

/// Parse a material document into a resolved [`MaterialRef`].
pub fn parse_document(name: &str, content: &str) -> Result<MaterialRef, MaterialError> {
    let doc: MaterialDocument =
        serde_yaml::from_str(content).map_err(|e| MaterialError::Document(e.to_string()))?;

    let extinction = doc
        .data
        .iter()
        .find(|b| b.kind.trim() == "tabulated k")
        .map(|b| ExtinctionTable::parse(block_data(b)?))
        .transpose()?;

    for block in &doc.data {
        let kind = block.kind.trim();
        match kind {
            "tabulated nk" => {
                let mat = TabulatedMaterial::parse_nk(name, block_data(block)?)?;
                if extinction.is_some() {
                    log::warn!("{}: ignoring 'tabulated k' block next to 'tabulated nk'", name);
                }
                return Ok(MaterialRef::Tabulated(Arc::new(mat)));
            }
            "tabulated n" => {
                let n_table = TabulatedMaterial::parse_n(name, block_data(block)?)?;
                let mat = match &extinction {
                    Some(k_table) => merge_nk(name, &n_table, k_table)?,
                    None => n_table,
                };
                return Ok(MaterialRef::Tabulated(Arc::new(mat)));
            }
            _ if kind.starts_with("formula") => {
                let mat = parse_formula(name, block)?;
                let mat = match &extinction {
                    Some(k_table) => mat.with_extinction(k_table.clone()),
                    None => mat,
                };
                return Ok(MaterialRef::Formula(Arc::new(mat)));
            }
            "tabulated k" => {}
            other => log::debug!("{}: skipping unsupported data block '{}'", name, other),
        }
    }

    Err(MaterialError::DataError(format!(
        "no usable optical data in material document '{}'",
        name
    )))
}

fn block_data(block: &DataBlock) -> Result<&str, MaterialError> {
    block
        .data
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .ok_or_else(|| MaterialError::Document(format!("'{}' block has no data", block.kind)))
}

fn parse_formula(name: &str, block: &DataBlock) -> Result<FormulaMaterial, MaterialError> {
    let number: u32 = block
        .kind
        .trim()
        .trim_start_matches("formula")
        .trim()
        .parse()
        .map_err(|_| MaterialError::UnsupportedFormula(block.kind.clone()))?;
    let kind = FormulaKind::from_number(number)?;

    let coefficients = block
        .coefficients
        .as_ref()
        .ok_or_else(|| MaterialError::Document(format!("'{}' block has no coefficients", block.kind)))?
        .numbers("coefficients")?;
    let formula = DispersionFormula::new(kind, coefficients)?;

    let range_nm = match &block.wavelength_range {
        Some(range) => {
            let values = range.numbers("wavelength_range")?;
            if values.len() != 2 {
                return Err(MaterialError::Document(format!(
                    "wavelength_range must have two values, got {}",
                    values.len()
                )));
            }
            // The first bound decides the unit for both.
            let scale = to_nanometres(values[0]);
            let (lo, hi) = (values[0] * scale, values[1] * scale);
            if lo >= hi {
                return Err(MaterialError::Document(format!(
                    "wavelength_range {} {} is not increasing",
                    values[0], values[1]
                )));
            }
            Some((lo, hi))
        }
        None => None,
    };

    Ok(FormulaMaterial::new(name, formula, range_nm))
}

/// Combine an `n` table and a `k` table over the union of their wavelengths.
fn merge_nk(
    name: &str,
    n_table: &TabulatedMaterial,
    k_table: &ExtinctionTable,
) -> Result<TabulatedMaterial, MaterialError> {
    let mut wavelengths: Vec<f64> = n_table
        .wavelengths_nm()
        .iter()
        .chain(k_table.wavelengths_nm())
        .copied()
        .collect();
    wavelengths.sort_by(f64::total_cmp);
    wavelengths.dedup();

    let rows: Vec<(f64, f64, f64)> = wavelengths
        .into_iter()
        .map(|w| (w, n_table.nk(w).0, k_table.k(w)))
        .collect();
    TabulatedMaterial::from_rows(name, &rows)
}
