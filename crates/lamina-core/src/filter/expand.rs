//! Flattening of parsed filters into ordered layers.
//!
//! Calculation always uses the full expansion. Display expansion shares the
//! same walk but shows at most three copies of any group repeated more than
//! three times, followed by an [`DisplayLayer::Ellipsis`] marker.

use super::{parse, ArrayTable, ExpandError, FilterExpr, MaterialEntry, MaterialTable};
use crate::stack::{LayerEntry, LayerOrigin, LayerStack};

/// Thickness used for materials named directly in the filter and for array
/// positions without an override.
pub const DEFAULT_THICKNESS_NM: f64 = 100.0;

/// Copies of a group shown in display mode before the ellipsis.
const DISPLAY_REPEATS: u32 = 3;

/// Largest number of layers a filter may expand to.
pub const MAX_EXPANDED_LAYERS: u64 = 1_000_000;

/// How repetitions are expanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpansionMode {
    /// Every repetition is produced.
    Full,
    /// Groups repeated more than three times are truncated.
    Display,
}

/// One concrete layer of an expanded filter.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandedLayer {
    /// Material label.
    pub label: String,
    pub thickness_nm: f64,
    pub origin: LayerOrigin,
}

/// Item of a display listing.
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayLayer {
    Layer(ExpandedLayer),
    /// Stands in for the omitted copies of a long repetition.
    Ellipsis,
}

/// Expands filter text against a material table and an array table.
#[derive(Debug, Clone, Copy)]
pub struct FilterExpander<'a> {
    materials: &'a MaterialTable,
    arrays: &'a ArrayTable,
    default_thickness_nm: f64,
}

impl<'a> FilterExpander<'a> {
    pub fn new(materials: &'a MaterialTable, arrays: &'a ArrayTable) -> Self {
        Self {
            materials,
            arrays,
            default_thickness_nm: DEFAULT_THICKNESS_NM,
        }
    }

    pub fn with_default_thickness(mut self, thickness_nm: f64) -> Self {
        self.default_thickness_nm = thickness_nm;
        self
    }

    /// Full expansion of `text` between the `entrance` and `exit` media.
    ///
    /// # Errors
    /// Parse errors, unknown labels (including the media) and stack
    /// invariant violations. Nothing is evaluated before all of these pass.
    pub fn expand(&self, text: &str, entrance: &str, exit: &str) -> Result<LayerStack, ExpandError> {
        let items = self.flatten_text(text, ExpansionMode::Full)?;

        let mut interior = Vec::with_capacity(items.len());
        for item in items {
            // Full mode never emits an ellipsis.
            if let DisplayLayer::Layer(layer) = item {
                interior.push(self.to_entry(layer)?);
            }
        }

        let stack = LayerStack::between(self.medium(entrance)?, interior, self.medium(exit)?)?;
        log::debug!(
            "Expanded filter into {} layers ({:.1} nm total)",
            stack.interior().len(),
            stack.total_thickness_nm()
        );
        Ok(stack)
    }

    /// Truncated expansion of `text` for listing to a user.
    pub fn expand_for_display(&self, text: &str) -> Result<Vec<DisplayLayer>, ExpandError> {
        self.flatten_text(text, ExpansionMode::Display)
    }

    /// Full expansion of `text` as labelled layers, without media.
    pub fn expand_layers(&self, text: &str) -> Result<Vec<ExpandedLayer>, ExpandError> {
        let items = self.flatten_text(text, ExpansionMode::Full)?;
        Ok(items
            .into_iter()
            .filter_map(|item| match item {
                DisplayLayer::Layer(layer) => Some(layer),
                DisplayLayer::Ellipsis => None,
            })
            .collect())
    }

    /// Parse `text` and flatten it once its size is known to be bounded.
    fn flatten_text(&self, text: &str, mode: ExpansionMode) -> Result<Vec<DisplayLayer>, ExpandError> {
        let expr = parse(text)?;
        let size = self.expanded_len(&expr, mode);
        if size > MAX_EXPANDED_LAYERS {
            return Err(ExpandError::malformed(
                1,
                format!(
                    "filter expands to {} layers, more than the limit of {}",
                    size, MAX_EXPANDED_LAYERS
                ),
            ));
        }
        let mut items = Vec::with_capacity(size as usize);
        self.flatten(&expr, mode, &mut items)?;
        Ok(items)
    }

    /// Number of items `flatten` would emit, saturating at `u64::MAX`.
    ///
    /// Unknown labels count as one layer; `flatten` reports them.
    pub fn expanded_len(&self, expr: &FilterExpr, mode: ExpansionMode) -> u64 {
        match expr {
            FilterExpr::Sequence(items) => items
                .iter()
                .fold(0u64, |acc, item| acc.saturating_add(self.expanded_len(item, mode))),
            FilterExpr::Repeat { body, count } => {
                let body_len = self.expanded_len(body, mode);
                if mode == ExpansionMode::Display && *count > DISPLAY_REPEATS {
                    body_len.saturating_mul(DISPLAY_REPEATS as u64).saturating_add(1)
                } else {
                    body_len.saturating_mul(*count as u64)
                }
            }
            FilterExpr::Reference(label) => self
                .arrays
                .get(label)
                .map_or(1, |array| array.layers.len() as u64),
        }
    }

    /// Walk `expr` in order, appending layers to `out`.
    pub fn flatten(
        &self,
        expr: &FilterExpr,
        mode: ExpansionMode,
        out: &mut Vec<DisplayLayer>,
    ) -> Result<(), ExpandError> {
        match expr {
            FilterExpr::Sequence(items) => {
                for item in items {
                    self.flatten(item, mode, out)?;
                }
            }
            FilterExpr::Repeat { body, count } => {
                let truncated = mode == ExpansionMode::Display && *count > DISPLAY_REPEATS;
                let copies = if truncated { DISPLAY_REPEATS } else { *count };
                for _ in 0..copies {
                    self.flatten(body, mode, out)?;
                }
                if truncated {
                    out.push(DisplayLayer::Ellipsis);
                }
            }
            FilterExpr::Reference(label) => self.reference(label, out)?,
        }
        Ok(())
    }

    fn reference(&self, label: &str, out: &mut Vec<DisplayLayer>) -> Result<(), ExpandError> {
        // Arrays take precedence over materials with the same label.
        if let Some(array) = self.arrays.get(label) {
            for (position, material) in array.layers.iter().enumerate() {
                // Re-checked here: the material table may have changed since
                // the array was inserted.
                if self.require_material(material)?.is_defect {
                    return Err(ExpandError::DefectInArray {
                        array: array.label.clone(),
                        material: material.clone(),
                    });
                }
                out.push(DisplayLayer::Layer(ExpandedLayer {
                    label: material.clone(),
                    thickness_nm: array
                        .thickness_at(position)
                        .unwrap_or(self.default_thickness_nm),
                    origin: LayerOrigin::Array {
                        label: array.label.clone(),
                        position,
                    },
                }));
            }
            return Ok(());
        }

        self.require_material(label)?;
        out.push(DisplayLayer::Layer(ExpandedLayer {
            label: label.to_string(),
            thickness_nm: self.default_thickness_nm,
            origin: LayerOrigin::Filter,
        }));
        Ok(())
    }

    fn require_material(&self, label: &str) -> Result<&'a MaterialEntry, ExpandError> {
        self.materials
            .get(label)
            .ok_or_else(|| ExpandError::UndefinedReference(label.to_string()))
    }

    fn to_entry(&self, layer: ExpandedLayer) -> Result<LayerEntry, ExpandError> {
        let entry = self
            .materials
            .get(&layer.label)
            .ok_or_else(|| ExpandError::UndefinedReference(layer.label.clone()))?;
        Ok(
            LayerEntry::new(layer.label, entry.reference.clone(), layer.thickness_nm)
                .with_origin(layer.origin),
        )
    }

    fn medium(&self, label: &str) -> Result<LayerEntry, ExpandError> {
        let entry = self
            .materials
            .get(label)
            .ok_or_else(|| ExpandError::UndefinedReference(label.to_string()))?;
        Ok(LayerEntry::medium(label, entry.reference.clone()))
    }
}
