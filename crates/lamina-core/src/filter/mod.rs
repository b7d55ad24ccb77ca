//! Filter descriptions and their expansion into layer stacks.
//!
//! A filter is written as a product of labels, for example
//! `H*L*(H*L)^4*Cav*(L*H)^4`:
//!
//! - a **material label** names an entry of the [`MaterialTable`];
//! - an **array label** names an [`ArrayDefinition`], a reusable sequence of
//!   materials with per-position thicknesses;
//! - `(expr)^n` repeats `expr` `n` times;
//! - `*` concatenates.
//!
//! Text is parsed into a [`FilterExpr`] tree ([`parser`]) and then flattened
//! ([`expand`]) either fully, for calculation, or truncated, for display.

pub mod expand;
pub mod parser;

use std::collections::BTreeMap;

use lamina_materials::MaterialRef;
use thiserror::Error;

use crate::stack::StackError;

pub use expand::{DisplayLayer, ExpandedLayer, ExpansionMode, FilterExpander};
pub use parser::{parse, FilterExpr};

/// Longest accepted label.
pub const MAX_LABEL_LEN: usize = 16;

/// Errors raised while reading or expanding a filter.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExpandError {
    #[error("Undefined material or array '{0}'")]
    UndefinedReference(String),

    #[error("Defect material '{material}' cannot be used inside array '{array}'")]
    DefectInArray { array: String, material: String },

    #[error("Malformed expression at column {column}: {message}")]
    MalformedExpression { column: usize, message: String },

    #[error("Invalid array '{label}': {reason}")]
    InvalidArray { label: String, reason: String },

    #[error(transparent)]
    Stack(#[from] StackError),
}

impl ExpandError {
    pub(crate) fn malformed(column: usize, message: impl Into<String>) -> Self {
        Self::MalformedExpression {
            column,
            message: message.into(),
        }
    }
}

/// `true` for 1 to [`MAX_LABEL_LEN`] ASCII alphanumeric characters.
pub fn is_valid_label(label: &str) -> bool {
    !label.is_empty()
        && label.len() <= MAX_LABEL_LEN
        && label.chars().all(|c| c.is_ascii_alphanumeric())
}

fn check_label(label: &str) -> Result<(), ExpandError> {
    if is_valid_label(label) {
        Ok(())
    } else {
        Err(ExpandError::malformed(
            0,
            format!(
                "invalid label '{}' (1-{} letters or digits)",
                label, MAX_LABEL_LEN
            ),
        ))
    }
}

/// A user-declared material.
#[derive(Debug, Clone)]
pub struct MaterialEntry {
    /// Display name, e.g. the catalog page or file it came from.
    pub name: String,
    pub reference: MaterialRef,
    /// Defect (cavity) materials may only appear directly in filter text.
    pub is_defect: bool,
}

impl MaterialEntry {
    pub fn new(name: impl Into<String>, reference: MaterialRef) -> Self {
        Self {
            name: name.into(),
            reference,
            is_defect: false,
        }
    }

    pub fn defect(mut self) -> Self {
        self.is_defect = true;
        self
    }
}

/// Label → material lookup.
#[derive(Debug, Clone, Default)]
pub struct MaterialTable {
    entries: BTreeMap<String, MaterialEntry>,
}

impl MaterialTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace `label`.
    pub fn insert(&mut self, label: impl Into<String>, entry: MaterialEntry) -> Result<(), ExpandError> {
        let label = label.into();
        check_label(&label)?;
        self.entries.insert(label, entry);
        Ok(())
    }

    pub fn get(&self, label: &str) -> Option<&MaterialEntry> {
        self.entries.get(label)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.entries.contains_key(label)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &MaterialEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Named sequence of material labels.
///
/// Thickness overrides are keyed by position, so the same material can
/// carry different thicknesses at different places in the array.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayDefinition {
    pub label: String,
    pub layers: Vec<String>,
    pub thickness_overrides: BTreeMap<usize, f64>,
}

impl ArrayDefinition {
    /// Parse `A*B*Si` style layer text.
    pub fn parse(label: impl Into<String>, text: &str) -> Result<Self, ExpandError> {
        let label = label.into();
        check_label(&label)?;
        let layers = text
            .split('*')
            .map(|part| {
                let part = part.trim();
                check_label(part).map(|_| part.to_string())
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            label,
            layers,
            thickness_overrides: BTreeMap::new(),
        })
    }

    /// Set the thickness of the layer at `position`.
    pub fn with_thickness(mut self, position: usize, thickness_nm: f64) -> Self {
        self.thickness_overrides.insert(position, thickness_nm);
        self
    }

    pub fn thickness_at(&self, position: usize) -> Option<f64> {
        self.thickness_overrides.get(&position).copied()
    }
}

/// Label → array lookup.
#[derive(Debug, Clone, Default)]
pub struct ArrayTable {
    arrays: BTreeMap<String, ArrayDefinition>,
}

impl ArrayTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an array after checking it against `materials`.
    ///
    /// # Errors
    /// [`ExpandError::UndefinedReference`] for unknown layers,
    /// [`ExpandError::DefectInArray`] for defect materials and
    /// [`ExpandError::InvalidArray`] for bad thickness overrides.
    pub fn insert(
        &mut self,
        definition: ArrayDefinition,
        materials: &MaterialTable,
    ) -> Result<(), ExpandError> {
        if definition.layers.is_empty() {
            return Err(ExpandError::InvalidArray {
                label: definition.label,
                reason: "no layers".into(),
            });
        }
        for layer in &definition.layers {
            match materials.get(layer) {
                None => return Err(ExpandError::UndefinedReference(layer.clone())),
                Some(entry) if entry.is_defect => {
                    return Err(ExpandError::DefectInArray {
                        array: definition.label.clone(),
                        material: layer.clone(),
                    })
                }
                Some(_) => {}
            }
        }
        for (&position, &thickness) in &definition.thickness_overrides {
            if position >= definition.layers.len() {
                return Err(ExpandError::InvalidArray {
                    label: definition.label.clone(),
                    reason: format!(
                        "thickness given for position {} but the array has {} layers",
                        position,
                        definition.layers.len()
                    ),
                });
            }
            if !thickness.is_finite() || thickness < 0.0 {
                return Err(ExpandError::InvalidArray {
                    label: definition.label.clone(),
                    reason: format!("thickness {} nm at position {}", thickness, position),
                });
            }
        }
        self.arrays.insert(definition.label.clone(), definition);
        Ok(())
    }

    pub fn get(&self, label: &str) -> Option<&ArrayDefinition> {
        self.arrays.get(label)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ArrayDefinition)> {
        self.arrays.iter()
    }

    pub fn len(&self) -> usize {
        self.arrays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arrays.is_empty()
    }
}
