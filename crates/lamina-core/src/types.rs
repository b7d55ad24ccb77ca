//! Request types shared across the calculation pipeline.
//!
//! A [`CalculationRequest`] bundles the wavelength sweep, incidence angle and
//! polarization of one spectrum run. It is validated on construction and
//! consumed once.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Invalid calculation parameters.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RequestError {
    #[error("Wavelength grid needs at least 2 points, got {0}")]
    TooFewPoints(usize),

    #[error("Wavelength grid must be strictly increasing and positive (at index {index}: {value} nm)")]
    NotIncreasing { index: usize, value: f64 },

    #[error("Incidence angle must be in [0, 90) degrees, got {0}")]
    InvalidAngle(f64),
}

/// Linear polarization of the incident plane wave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarization {
    /// Electric field perpendicular to the plane of incidence (TE).
    S,
    /// Electric field in the plane of incidence (TM).
    P,
}

impl fmt::Display for Polarization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::S => write!(f, "s"),
            Self::P => write!(f, "p"),
        }
    }
}

/// Strictly increasing wavelengths in nanometres.
///
/// Serialised as a plain list; deserialising goes through
/// [`WavelengthGrid::from_values`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct WavelengthGrid {
    values: Vec<f64>,
}

impl WavelengthGrid {
    /// `points` evenly spaced wavelengths from `start_nm` to `end_nm` inclusive.
    pub fn linspace(start_nm: f64, end_nm: f64, points: usize) -> Result<Self, RequestError> {
        if points < 2 {
            return Err(RequestError::TooFewPoints(points));
        }
        let step = (end_nm - start_nm) / (points - 1) as f64;
        let values = (0..points)
            .map(|i| {
                if i == points - 1 {
                    end_nm
                } else {
                    start_nm + step * i as f64
                }
            })
            .collect();
        Self::from_values(values)
    }

    /// Explicit wavelength list.
    pub fn from_values(values: Vec<f64>) -> Result<Self, RequestError> {
        if values.len() < 2 {
            return Err(RequestError::TooFewPoints(values.len()));
        }
        for (index, &value) in values.iter().enumerate() {
            let previous = if index == 0 { 0.0 } else { values[index - 1] };
            if !value.is_finite() || value <= previous {
                return Err(RequestError::NotIncreasing { index, value });
            }
        }
        Ok(Self { values })
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn start(&self) -> f64 {
        self.values[0]
    }

    pub fn end(&self) -> f64 {
        self.values[self.values.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl TryFrom<Vec<f64>> for WavelengthGrid {
    type Error = RequestError;

    fn try_from(values: Vec<f64>) -> Result<Self, Self::Error> {
        Self::from_values(values)
    }
}

impl From<WavelengthGrid> for Vec<f64> {
    fn from(grid: WavelengthGrid) -> Self {
        grid.values
    }
}

impl Default for WavelengthGrid {
    fn default() -> Self {
        Self {
            values: (0..=100).map(|i| 400.0 + 5.0 * i as f64).collect(),
        }
    }
}

/// Parameters of one spectrum run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationRequest {
    pub grid: WavelengthGrid,
    /// Incidence angle in the entrance medium (degrees).
    pub angle_deg: f64,
    pub polarization: Polarization,
}

impl CalculationRequest {
    pub fn new(
        grid: WavelengthGrid,
        angle_deg: f64,
        polarization: Polarization,
    ) -> Result<Self, RequestError> {
        let request = Self {
            grid,
            angle_deg,
            polarization,
        };
        request.validate()?;
        Ok(request)
    }

    /// Re-check the angle; the grid is validated when it is built.
    pub fn validate(&self) -> Result<(), RequestError> {
        if !(0.0..90.0).contains(&self.angle_deg) {
            return Err(RequestError::InvalidAngle(self.angle_deg));
        }
        if self.grid.len() < 2 {
            return Err(RequestError::TooFewPoints(self.grid.len()));
        }
        Ok(())
    }

    pub fn angle_rad(&self) -> f64 {
        self.angle_deg.to_radians()
    }
}
