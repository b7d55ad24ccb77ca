//! Integration test: filter text expansion.
//!
//! Checks that repetition is plain concatenation, that display and
//! calculation expansion differ only in truncation, and that the array
//! rules (defects, per-position thicknesses, shadowing) hold.

use lamina_core::filter::{
    ArrayDefinition, ArrayTable, DisplayLayer, ExpandError, ExpandedLayer, FilterExpander,
    MaterialEntry, MaterialTable,
};
use lamina_core::stack::LayerOrigin;
use lamina_materials::MaterialRef;

fn constant(n: f64) -> MaterialRef {
    MaterialRef::constant(n, 0.0).unwrap()
}

fn materials() -> MaterialTable {
    let mut table = MaterialTable::new();
    for (label, n) in [("Air", 1.0), ("Sub", 1.52), ("A", 2.3), ("B", 1.45), ("Si", 3.9)] {
        table.insert(label, MaterialEntry::new(label, constant(n))).unwrap();
    }
    table
        .insert("Cav", MaterialEntry::new("cavity", constant(1.45)).defect())
        .unwrap();
    table
}

fn labels(layers: &[ExpandedLayer]) -> Vec<String> {
    layers.iter().map(|l| l.label.clone()).collect()
}

#[test]
fn test_repeat_equals_concatenation() {
    let materials = materials();
    let arrays = ArrayTable::new();
    let expander = FilterExpander::new(&materials, &arrays);

    let grouped = expander.expand_layers("(A*B)^3").unwrap();
    let literal = expander.expand_layers("A*B*A*B*A*B").unwrap();
    assert_eq!(grouped, literal);
    assert_eq!(labels(&grouped), vec!["A", "B", "A", "B", "A", "B"]);
}

#[test]
fn test_display_truncates_but_calculation_does_not() {
    let materials = materials();
    let arrays = ArrayTable::new();
    let expander = FilterExpander::new(&materials, &arrays);

    let full = expander.expand_layers("(A*B)^5").unwrap();
    assert_eq!(full.len(), 10);

    let shown = expander.expand_for_display("(A*B)^5").unwrap();
    let shown_labels: Vec<&str> = shown
        .iter()
        .map(|item| match item {
            DisplayLayer::Layer(l) => l.label.as_str(),
            DisplayLayer::Ellipsis => "...",
        })
        .collect();
    assert_eq!(shown_labels, vec!["A", "B", "A", "B", "A", "B", "..."]);

    // Shown layers are an exact prefix of the full expansion.
    for (item, layer) in shown.iter().zip(&full) {
        if let DisplayLayer::Layer(shown_layer) = item {
            assert_eq!(shown_layer, layer);
        }
    }

    let stack = expander.expand("(A*B)^5", "Air", "Sub").unwrap();
    assert_eq!(stack.interior().len(), 10);
}

#[test]
fn test_modes_agree_without_long_repeats() {
    let materials = materials();
    let arrays = ArrayTable::new();
    let expander = FilterExpander::new(&materials, &arrays);
    let text = "Si*(A*B)^2*Cav*(B*A)^3";

    let full = expander.expand_layers(text).unwrap();
    let shown: Vec<ExpandedLayer> = expander
        .expand_for_display(text)
        .unwrap()
        .into_iter()
        .map(|item| match item {
            DisplayLayer::Layer(l) => l,
            DisplayLayer::Ellipsis => panic!("unexpected ellipsis"),
        })
        .collect();
    assert_eq!(full, shown);
}

#[test]
fn test_nested_groups() {
    let materials = materials();
    let arrays = ArrayTable::new();
    let expander = FilterExpander::new(&materials, &arrays);
    let layers = expander.expand_layers("((A)^2*B)^2").unwrap();
    assert_eq!(labels(&layers), vec!["A", "A", "B", "A", "A", "B"]);
}

#[test]
fn test_whitespace_is_ignored() {
    let materials = materials();
    let arrays = ArrayTable::new();
    let expander = FilterExpander::new(&materials, &arrays);
    assert_eq!(
        expander.expand_layers("  ( A * B ) ^ 2 *Si ").unwrap(),
        expander.expand_layers("(A*B)^2*Si").unwrap()
    );
}

#[test]
fn test_array_thickness_by_position() {
    let materials = materials();
    let mut arrays = ArrayTable::new();
    arrays
        .insert(
            ArrayDefinition::parse("M", "A*B*A")
                .unwrap()
                .with_thickness(0, 20.0)
                .with_thickness(2, 70.0),
            &materials,
        )
        .unwrap();
    let expander = FilterExpander::new(&materials, &arrays).with_default_thickness(55.0);

    let stack = expander.expand("(M)^2*B", "Air", "Sub").unwrap();
    let thicknesses: Vec<f64> = stack.interior().iter().map(|l| l.thickness_nm).collect();
    assert_eq!(thicknesses, vec![20.0, 55.0, 70.0, 20.0, 55.0, 70.0, 55.0]);
    assert_eq!(
        stack.interior()[5].origin,
        LayerOrigin::Array {
            label: "M".into(),
            position: 2
        }
    );
    assert_eq!(stack.interior()[6].origin, LayerOrigin::Filter);
    assert_eq!(stack.entrance().label, "Air");
    assert_eq!(stack.exit().label, "Sub");
}

#[test]
fn test_arrays_shadow_materials() {
    let materials = materials();
    let mut arrays = ArrayTable::new();
    arrays
        .insert(ArrayDefinition::parse("A", "B*B").unwrap(), &materials)
        .unwrap();
    let expander = FilterExpander::new(&materials, &arrays);
    assert_eq!(labels(&expander.expand_layers("A").unwrap()), vec!["B", "B"]);
}

#[test]
fn test_defect_rules() {
    let materials = materials();
    let mut arrays = ArrayTable::new();

    let err = arrays
        .insert(ArrayDefinition::parse("M", "A*Cav*A").unwrap(), &materials)
        .unwrap_err();
    assert_eq!(
        err,
        ExpandError::DefectInArray {
            array: "M".into(),
            material: "Cav".into()
        }
    );

    let expander = FilterExpander::new(&materials, &arrays);
    let stack = expander.expand("(A*B)^4*Cav*(B*A)^4", "Air", "Sub").unwrap();
    assert_eq!(stack.interior().len(), 17);
}

#[test]
fn test_errors_abort_expansion() {
    let materials = materials();
    let arrays = ArrayTable::new();
    let expander = FilterExpander::new(&materials, &arrays);

    assert_eq!(
        expander.expand("A*Nope", "Air", "Sub").unwrap_err(),
        ExpandError::UndefinedReference("Nope".into())
    );
    assert!(matches!(
        expander.expand("(A*B^2", "Air", "Sub"),
        Err(ExpandError::MalformedExpression { .. })
    ));
    assert!(matches!(
        expander.expand_for_display("A;B"),
        Err(ExpandError::MalformedExpression { column: 2, .. })
    ));
    assert!(matches!(
        FilterExpander::new(&materials, &arrays)
            .with_default_thickness(-1.0)
            .expand("A", "Air", "Sub"),
        Err(ExpandError::Stack(_))
    ));
}
