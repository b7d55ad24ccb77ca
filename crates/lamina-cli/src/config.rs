//! TOML configuration deserialisation for filter jobs.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use serde::Deserialize;

use lamina_core::filter::expand::DEFAULT_THICKNESS_NM;
use lamina_core::types::Polarization;

/// Top-level job configuration.
#[derive(Debug, Deserialize)]
pub struct JobConfig {
    #[serde(default)]
    pub simulation: SimulationConfig,
    pub media: MediaConfig,
    #[serde(default)]
    pub material: Vec<MaterialConfig>,
    #[serde(default)]
    pub array: Vec<ArrayConfig>,
    #[serde(default)]
    pub filter: FilterConfig,
    pub catalog: Option<CatalogConfig>,
    #[serde(default)]
    pub output: OutputConfig,
    /// Directory of the configuration file; relative paths resolve against it.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// Sweep parameters from TOML.
#[derive(Debug, Deserialize)]
pub struct SimulationConfig {
    #[serde(default)]
    pub wavelengths: WavelengthSpec,
    /// Incidence angle in degrees (default: 0).
    #[serde(default)]
    pub angle_deg: f64,
    #[serde(default)]
    pub polarization: PolarizationChoice,
    /// Thickness of layers named directly in the filter (default: 100 nm).
    #[serde(default = "default_thickness")]
    pub default_thickness_nm: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            wavelengths: WavelengthSpec::default(),
            angle_deg: 0.0,
            polarization: PolarizationChoice::default(),
            default_thickness_nm: default_thickness(),
        }
    }
}

fn default_thickness() -> f64 {
    DEFAULT_THICKNESS_NM
}

/// Wavelength specification: either a range or explicit list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum WavelengthSpec {
    Range { range: [f64; 2], points: usize },
    List { values: Vec<f64> },
}

impl Default for WavelengthSpec {
    fn default() -> Self {
        WavelengthSpec::Range {
            range: [400.0, 900.0],
            points: 101,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolarizationChoice {
    #[default]
    S,
    P,
    Both,
}

impl PolarizationChoice {
    /// Polarizations to run, in order.
    pub fn runs(self) -> Vec<Polarization> {
        match self {
            PolarizationChoice::S => vec![Polarization::S],
            PolarizationChoice::P => vec![Polarization::P],
            PolarizationChoice::Both => vec![Polarization::S, Polarization::P],
        }
    }
}

/// Entrance and exit media, by material label.
#[derive(Debug, Deserialize)]
pub struct MediaConfig {
    pub entrance: String,
    pub exit: String,
}

/// A `[[material]]` entry.
#[derive(Debug, Deserialize)]
pub struct MaterialConfig {
    pub label: String,
    /// Human-readable name (defaults to the label).
    pub name: Option<String>,
    #[serde(default)]
    pub defect: bool,
    pub n: Option<f64>,
    pub k: Option<f64>,
    /// refractiveindex.info YAML document.
    pub file: Option<PathBuf>,
    /// Built-in library id, e.g. `"SiO2_Palik"`.
    pub builtin: Option<String>,
    /// Catalog id `shelf|book|page`.
    pub catalog: Option<String>,
    pub formula: Option<FormulaConfig>,
}

/// Inline dispersion formula.
#[derive(Debug, Deserialize)]
pub struct FormulaConfig {
    /// refractiveindex.info formula number (1-9).
    pub kind: u32,
    pub coefficients: Vec<f64>,
    /// Validity range in nm.
    pub range: Option<[f64; 2]>,
}

/// Where a material's optical constants come from.
#[derive(Debug)]
pub enum MaterialSource<'a> {
    Constant { n: f64, k: f64 },
    File(&'a Path),
    Builtin(&'a str),
    Catalog(&'a str),
    Formula(&'a FormulaConfig),
}

impl MaterialConfig {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.label)
    }

    /// The single configured source.
    pub fn source(&self) -> anyhow::Result<MaterialSource<'_>> {
        let mut sources = Vec::new();
        if let Some(n) = self.n {
            sources.push(MaterialSource::Constant {
                n,
                k: self.k.unwrap_or(0.0),
            });
        } else if self.k.is_some() {
            bail!("Material '{}': 'k' given without 'n'", self.label);
        }
        if let Some(file) = &self.file {
            sources.push(MaterialSource::File(file));
        }
        if let Some(id) = &self.builtin {
            sources.push(MaterialSource::Builtin(id));
        }
        if let Some(id) = &self.catalog {
            sources.push(MaterialSource::Catalog(id));
        }
        if let Some(formula) = &self.formula {
            sources.push(MaterialSource::Formula(formula));
        }

        match sources.len() {
            1 => Ok(sources.remove(0)),
            0 => bail!(
                "Material '{}' needs one of: n/k, file, builtin, catalog, formula",
                self.label
            ),
            _ => bail!("Material '{}' has more than one source", self.label),
        }
    }
}

/// An `[[array]]` entry.
#[derive(Debug, Deserialize)]
pub struct ArrayConfig {
    pub label: String,
    /// Material labels joined by `*`.
    pub layers: String,
    /// Thicknesses by zero-based position, e.g. `{ "0" = 58.5 }`.
    #[serde(default)]
    pub thicknesses: BTreeMap<String, f64>,
}

impl ArrayConfig {
    pub fn positioned_thicknesses(&self) -> anyhow::Result<Vec<(usize, f64)>> {
        self.thicknesses
            .iter()
            .map(|(key, &value)| {
                let position = key.trim().parse::<usize>().with_context(|| {
                    format!(
                        "Array '{}': thickness key '{}' is not a layer position",
                        self.label, key
                    )
                })?;
                Ok((position, value))
            })
            .collect()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct FilterConfig {
    /// Filter text; empty means a bare interface.
    #[serde(default)]
    pub definition: String,
}

#[derive(Debug, Deserialize)]
pub struct CatalogConfig {
    /// Root of a `shelf/book/page.yml` directory tree.
    pub root: PathBuf,
}

/// Output configuration.
#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    /// Output directory (default: "./output").
    #[serde(default = "default_output_dir")]
    pub directory: String,
    /// Whether to save spectra as CSV (default: true).
    #[serde(default = "default_true")]
    pub save_spectra: bool,
    /// Whether to also save spectra as JSON (default: false).
    #[serde(default)]
    pub save_json: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            save_spectra: true,
            save_json: false,
        }
    }
}

fn default_output_dir() -> String {
    "./output".into()
}
fn default_true() -> bool {
    true
}

impl JobConfig {
    /// Resolve a path from the configuration file against its directory.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

/// Parse a TOML job configuration from text.
pub fn parse_config(content: &str) -> anyhow::Result<JobConfig> {
    let config: JobConfig = toml::from_str(content)?;
    Ok(config)
}

/// Load and parse a TOML job configuration file.
pub fn load_config(path: &Path) -> anyhow::Result<JobConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read configuration {}", path.display()))?;
    let mut config = parse_config(&content)
        .with_context(|| format!("Invalid configuration {}", path.display()))?;
    config.base_dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    Ok(config)
}
