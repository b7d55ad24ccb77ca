//! Planar multilayer stacks.
//!
//! A [`LayerStack`] is an ordered list of layers from the entrance medium
//! (where light comes from) to the exit medium (substrate). Both media are
//! semi-infinite and carry zero thickness. Interior layers have a finite,
//! non-negative thickness in nanometres; a zero-thickness interior layer is
//! a bare interface.

use lamina_materials::MaterialRef;
use thiserror::Error;

/// Violations of the stack invariants.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StackError {
    #[error("A stack needs an entrance and an exit medium, got {0} layer(s)")]
    TooFewLayers(usize),

    #[error("Boundary medium '{label}' must have zero thickness, got {thickness_nm} nm")]
    BoundaryThickness { label: String, thickness_nm: f64 },

    #[error("Layer {index} ('{label}') has invalid thickness {thickness_nm} nm")]
    InvalidThickness {
        index: usize,
        label: String,
        thickness_nm: f64,
    },
}

/// Where an expanded layer came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerOrigin {
    /// Entrance or exit medium.
    Medium,
    /// Named directly in the filter text.
    Filter,
    /// Position `position` of array `label`.
    Array { label: String, position: usize },
}

/// One layer of a stack.
#[derive(Debug, Clone)]
pub struct LayerEntry {
    /// Material label as written by the user.
    pub label: String,
    pub material: MaterialRef,
    pub thickness_nm: f64,
    pub origin: LayerOrigin,
}

impl LayerEntry {
    pub fn new(label: impl Into<String>, material: MaterialRef, thickness_nm: f64) -> Self {
        Self {
            label: label.into(),
            material,
            thickness_nm,
            origin: LayerOrigin::Filter,
        }
    }

    /// Semi-infinite boundary medium.
    pub fn medium(label: impl Into<String>, material: MaterialRef) -> Self {
        Self {
            label: label.into(),
            material,
            thickness_nm: 0.0,
            origin: LayerOrigin::Medium,
        }
    }

    pub fn with_origin(mut self, origin: LayerOrigin) -> Self {
        self.origin = origin;
        self
    }
}

/// Validated, immutable multilayer.
#[derive(Debug, Clone)]
pub struct LayerStack {
    layers: Vec<LayerEntry>,
}

impl LayerStack {
    /// Build a stack from `[entrance, interior..., exit]`.
    pub fn new(layers: Vec<LayerEntry>) -> Result<Self, StackError> {
        if layers.len() < 2 {
            return Err(StackError::TooFewLayers(layers.len()));
        }
        let last = layers.len() - 1;
        for (index, layer) in layers.iter().enumerate() {
            if index == 0 || index == last {
                if layer.thickness_nm != 0.0 {
                    return Err(StackError::BoundaryThickness {
                        label: layer.label.clone(),
                        thickness_nm: layer.thickness_nm,
                    });
                }
            } else if !layer.thickness_nm.is_finite() || layer.thickness_nm < 0.0 {
                return Err(StackError::InvalidThickness {
                    index,
                    label: layer.label.clone(),
                    thickness_nm: layer.thickness_nm,
                });
            }
        }
        Ok(Self { layers })
    }

    /// Stack of `interior` layers between two media.
    pub fn between(
        entrance: LayerEntry,
        interior: Vec<LayerEntry>,
        exit: LayerEntry,
    ) -> Result<Self, StackError> {
        let mut layers = Vec::with_capacity(interior.len() + 2);
        layers.push(entrance);
        layers.extend(interior);
        layers.push(exit);
        Self::new(layers)
    }

    pub fn layers(&self) -> &[LayerEntry] {
        &self.layers
    }

    pub fn entrance(&self) -> &LayerEntry {
        &self.layers[0]
    }

    pub fn exit(&self) -> &LayerEntry {
        &self.layers[self.layers.len() - 1]
    }

    /// Layers between the two media.
    pub fn interior(&self) -> &[LayerEntry] {
        &self.layers[1..self.layers.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Sum of interior thicknesses (nm).
    pub fn total_thickness_nm(&self) -> f64 {
        self.interior().iter().map(|l| l.thickness_nm).sum()
    }

    /// First occurrence of every distinct material label, in stack order.
    pub fn distinct_materials(&self) -> Vec<(&str, &MaterialRef)> {
        let mut seen: Vec<(&str, &MaterialRef)> = Vec::new();
        for layer in &self.layers {
            if !seen.iter().any(|(label, _)| *label == layer.label) {
                seen.push((layer.label.as_str(), &layer.material));
            }
        }
        seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn air() -> MaterialRef {
        MaterialRef::constant(1.0, 0.0).unwrap()
    }

    fn glass() -> MaterialRef {
        MaterialRef::constant(1.5, 0.0).unwrap()
    }

    #[test]
    fn test_bare_interface_is_valid() {
        let stack =
            LayerStack::between(LayerEntry::medium("Air", air()), vec![], LayerEntry::medium("G", glass()))
                .unwrap();
        assert_eq!(stack.len(), 2);
        assert!(stack.interior().is_empty());
        assert_eq!(stack.total_thickness_nm(), 0.0);
    }

    #[test]
    fn test_single_layer_rejected() {
        let err = LayerStack::new(vec![LayerEntry::medium("Air", air())]).unwrap_err();
        assert_eq!(err, StackError::TooFewLayers(1));
    }

    #[test]
    fn test_boundary_must_be_semi_infinite() {
        let err = LayerStack::new(vec![
            LayerEntry::new("Air", air(), 10.0),
            LayerEntry::medium("G", glass()),
        ])
        .unwrap_err();
        assert!(matches!(err, StackError::BoundaryThickness { .. }));
    }

    #[test]
    fn test_negative_thickness_rejected() {
        let err = LayerStack::new(vec![
            LayerEntry::medium("Air", air()),
            LayerEntry::new("G", glass(), -5.0),
            LayerEntry::medium("Air", air()),
        ])
        .unwrap_err();
        assert!(matches!(err, StackError::InvalidThickness { index: 1, .. }));
    }

    #[test]
    fn test_zero_thickness_interior_allowed() {
        let stack = LayerStack::new(vec![
            LayerEntry::medium("Air", air()),
            LayerEntry::new("G", glass(), 0.0),
            LayerEntry::medium("Air", air()),
        ]);
        assert!(stack.is_ok());
    }

    #[test]
    fn test_distinct_materials_keeps_first_occurrence() {
        let stack = LayerStack::new(vec![
            LayerEntry::medium("Air", air()),
            LayerEntry::new("H", glass(), 50.0),
            LayerEntry::new("L", air(), 80.0),
            LayerEntry::new("H", glass(), 50.0),
            LayerEntry::medium("Sub", glass()),
        ])
        .unwrap();
        let labels: Vec<&str> = stack.distinct_materials().iter().map(|(l, _)| *l).collect();
        assert_eq!(labels, vec!["Air", "H", "L", "Sub"]);
        assert_eq!(stack.total_thickness_nm(), 180.0);
    }
}
