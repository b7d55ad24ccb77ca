//! Built-in tabulated materials.
//!
//! A small set of common coating and substrate materials that can be used
//! without any data files:
//!
//! | Identifier | Material | Wavelength range | Source |
//! |-----------|----------|------------------|--------|
//! | `SiO2_Palik` | Fused silica | 300–1000 nm | Palik (1985), H. R. Philipp |
//! | `TiO2_Palik` | Rutile TiO₂ (ordinary ray) | 300–1000 nm | Palik (1985), D. F. Edwards |
//! | `Si_Aspnes` | Crystalline silicon | 400–1000 nm | Aspnes & Studna (1983) |
//! | `Au_JC` | Gold | 400–1000 nm | Johnson & Christy (1972) |
//!
//! Values are rounded selections from the published tables and are
//! interpolated linearly like any other tabulated material.

use std::sync::Arc;

use crate::provider::MaterialError;
use crate::resolver::MaterialRef;
use crate::tabulated::TabulatedMaterial;

/// Description of a built-in material.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinInfo {
    pub id: &'static str,
    pub description: &'static str,
    pub range_nm: (f64, f64),
}

const BUILTINS: &[BuiltinInfo] = &[
    BuiltinInfo {
        id: "SiO2_Palik",
        description: "Fused silica (Palik 1985)",
        range_nm: (300.0, 1000.0),
    },
    BuiltinInfo {
        id: "TiO2_Palik",
        description: "Rutile TiO2, ordinary ray (Palik 1985)",
        range_nm: (300.0, 1000.0),
    },
    BuiltinInfo {
        id: "Si_Aspnes",
        description: "Crystalline silicon (Aspnes & Studna 1983)",
        range_nm: (400.0, 1000.0),
    },
    BuiltinInfo {
        id: "Au_JC",
        description: "Gold (Johnson & Christy 1972)",
        range_nm: (400.0, 1000.0),
    },
];

/// All built-in materials.
pub fn list() -> &'static [BuiltinInfo] {
    BUILTINS
}

/// Look up a built-in material by identifier.
pub fn builtin(id: &str) -> Result<MaterialRef, MaterialError> {
    let rows: &[(f64, f64, f64)] = match id {
        "SiO2_Palik" => SIO2_PALIK,
        "TiO2_Palik" => TIO2_PALIK,
        "Si_Aspnes" => SI_ASPNES,
        "Au_JC" => AU_JC,
        other => {
            return Err(MaterialError::NotFound(format!(
                "no built-in material '{}' (available: {})",
                other,
                BUILTINS.iter().map(|b| b.id).collect::<Vec<_>>().join(", ")
            )))
        }
    };
    let table = TabulatedMaterial::from_rows(id, rows)?;
    Ok(MaterialRef::Tabulated(Arc::new(table)))
}

// (λ/nm, n, k), amorphous SiO₂
const SIO2_PALIK: &[(f64, f64, f64)] = &[
    (300.0, 1.487, 0.0),
    (320.0, 1.482, 0.0),
    (340.0, 1.478, 0.0),
    (360.0, 1.475, 0.0),
    (380.0, 1.473, 0.0),
    (400.0, 1.470, 0.0),
    (450.0, 1.4675, 0.0),
    (500.0, 1.462, 0.0),
    (550.0, 1.4595, 0.0),
    (600.0, 1.458, 0.0),
    (650.0, 1.4565, 0.0),
    (700.0, 1.455, 0.0),
    (750.0, 1.4535, 0.0),
    (800.0, 1.452, 0.0),
    (850.0, 1.451, 0.0),
    (900.0, 1.450, 0.0),
    (950.0, 1.449, 0.0),
    (1000.0, 1.448, 0.0),
];

// Rutile, absorption edge near 380 nm
const TIO2_PALIK: &[(f64, f64, f64)] = &[
    (300.0, 3.340, 0.880),
    (320.0, 2.990, 0.480),
    (340.0, 2.780, 0.220),
    (360.0, 2.680, 0.080),
    (380.0, 2.640, 0.018),
    (400.0, 2.620, 0.003),
    (450.0, 2.5915, 0.0),
    (500.0, 2.572, 0.0),
    (550.0, 2.5575, 0.0),
    (600.0, 2.547, 0.0),
    (650.0, 2.5385, 0.0),
    (700.0, 2.531, 0.0),
    (750.0, 2.526, 0.0),
    (800.0, 2.521, 0.0),
    (850.0, 2.517, 0.0),
    (900.0, 2.513, 0.0),
    (950.0, 2.5105, 0.0),
    (1000.0, 2.507, 0.0),
];

const SI_ASPNES: &[(f64, f64, f64)] = &[
    (400.0, 5.570, 0.387),
    (450.0, 4.670, 0.140),
    (500.0, 4.300, 0.070),
    (550.0, 4.080, 0.040),
    (600.0, 3.940, 0.020),
    (650.0, 3.850, 0.016),
    (700.0, 3.780, 0.010),
    (800.0, 3.690, 0.006),
    (900.0, 3.630, 0.002),
    (1000.0, 3.570, 0.001),
];

const AU_JC: &[(f64, f64, f64)] = &[
    (400.0, 1.658, 1.956),
    (450.0, 1.500, 1.880),
    (500.0, 0.970, 1.870),
    (550.0, 0.430, 2.455),
    (600.0, 0.250, 2.980),
    (650.0, 0.166, 3.450),
    (700.0, 0.160, 3.950),
    (750.0, 0.150, 4.420),
    (800.0, 0.160, 4.900),
    (900.0, 0.180, 5.600),
    (1000.0, 0.230, 6.300),
];
