//! Job runner: ties together materials, filter expansion and the spectrum worker.

use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};

use lamina_core::filter::{
    ArrayDefinition, ArrayTable, DisplayLayer, ExpandedLayer, FilterExpander, MaterialEntry,
    MaterialTable,
};
use lamina_core::spectrum::Spectrum;
use lamina_core::stack::{LayerOrigin, LayerStack};
use lamina_core::types::{CalculationRequest, WavelengthGrid};
use lamina_core::worker::{SpectrumWorker, WorkerEvent};
use lamina_materials::document::load_document;
use lamina_materials::formula::{DispersionFormula, FormulaKind, FormulaMaterial};
use lamina_materials::{library, DirectoryCatalog, MaterialRef, MaterialResolver};

use crate::config::{JobConfig, MaterialConfig, MaterialSource, WavelengthSpec};

/// Material and array tables built from a job.
#[derive(Debug)]
pub struct JobTables {
    pub materials: MaterialTable,
    pub arrays: ArrayTable,
}

impl JobTables {
    pub fn expander(&self, job: &JobConfig) -> FilterExpander<'_> {
        FilterExpander::new(&self.materials, &self.arrays)
            .with_default_thickness(job.simulation.default_thickness_nm)
    }
}

/// Build the material reference for one `[[material]]` entry.
fn material_ref(job: &JobConfig, material: &MaterialConfig) -> Result<MaterialRef> {
    let reference = match material.source()? {
        MaterialSource::Constant { n, k } => MaterialRef::constant(n, k)?,
        MaterialSource::File(path) => {
            let path = job.resolve_path(path);
            load_document(&path)
                .with_context(|| format!("Material '{}': {}", material.label, path.display()))?
        }
        MaterialSource::Builtin(id) => library::builtin(id)?,
        MaterialSource::Catalog(id) => {
            if job.catalog.is_none() {
                bail!(
                    "Material '{}' uses catalog id '{}' but no [catalog] root is configured",
                    material.label,
                    id
                );
            }
            MaterialRef::Catalog(id.parse()?)
        }
        MaterialSource::Formula(formula) => {
            let kind = FormulaKind::from_number(formula.kind)?;
            let dispersion = DispersionFormula::new(kind, formula.coefficients.clone())?;
            if let Some([lo, hi]) = formula.range {
                if lo.is_nan() || hi.is_nan() || lo >= hi {
                    bail!(
                        "Material '{}': formula range [{}, {}] is not increasing",
                        material.label,
                        lo,
                        hi
                    );
                }
            }
            let range = formula.range.map(|[lo, hi]| (lo, hi));
            MaterialRef::Formula(Arc::new(FormulaMaterial::new(
                material.display_name(),
                dispersion,
                range,
            )))
        }
    };
    Ok(reference)
}

/// Build the material and array tables of a job.
pub fn build_tables(job: &JobConfig) -> Result<JobTables> {
    let mut materials = MaterialTable::new();
    for material in &job.material {
        let reference = material_ref(job, material)
            .with_context(|| format!("Cannot load material '{}'", material.label))?;
        let mut entry = MaterialEntry::new(material.display_name(), reference);
        if material.defect {
            entry = entry.defect();
        }
        materials.insert(material.label.clone(), entry)?;
    }

    let mut arrays = ArrayTable::new();
    for array in &job.array {
        let mut definition = ArrayDefinition::parse(array.label.clone(), &array.layers)?;
        for (position, thickness_nm) in array.positioned_thicknesses()? {
            definition = definition.with_thickness(position, thickness_nm);
        }
        arrays.insert(definition, &materials)?;
    }

    log::debug!(
        "Job defines {} material(s) and {} array(s)",
        materials.len(),
        arrays.len()
    );
    Ok(JobTables { materials, arrays })
}

/// Expand the job's filter into a calculation stack.
pub fn build_stack(job: &JobConfig, tables: &JobTables) -> Result<LayerStack> {
    let stack = tables.expander(job).expand(
        &job.filter.definition,
        &job.media.entrance,
        &job.media.exit,
    )?;
    Ok(stack)
}

/// Resolver for the job, backed by its catalog directory when configured.
pub fn build_resolver(job: &JobConfig) -> MaterialResolver {
    match &job.catalog {
        Some(catalog) => MaterialResolver::with_catalog(Arc::new(DirectoryCatalog::new(
            job.resolve_path(&catalog.root),
        ))),
        None => MaterialResolver::new(),
    }
}

pub fn wavelength_grid(job: &JobConfig) -> Result<WavelengthGrid> {
    let grid = match &job.simulation.wavelengths {
        WavelengthSpec::Range { range, points } => {
            WavelengthGrid::linspace(range[0], range[1], *points)?
        }
        WavelengthSpec::List { values } => WavelengthGrid::from_values(values.clone())?,
    };
    Ok(grid)
}

/// Check everything a run needs without computing a spectrum.
pub fn validate_job(job: &JobConfig) -> Result<LayerStack> {
    let tables = build_tables(job)?;
    let stack = build_stack(job, &tables)?;
    let grid = wavelength_grid(job)?;
    for polarization in job.simulation.polarization.runs() {
        CalculationRequest::new(grid.clone(), job.simulation.angle_deg, polarization)?;
    }
    Ok(stack)
}

/// Run every requested polarization, s before p.
pub fn run_job(job: &JobConfig) -> Result<Vec<Spectrum>> {
    let tables = build_tables(job)?;
    let stack = build_stack(job, &tables)?;
    let grid = wavelength_grid(job)?;
    println!(
        "Stack: {} layers between '{}' and '{}', {:.1} nm total",
        stack.interior().len(),
        stack.entrance().label,
        stack.exit().label,
        stack.total_thickness_nm()
    );

    let mut resolver = build_resolver(job);
    let mut spectra = Vec::new();
    for polarization in job.simulation.polarization.runs() {
        let request =
            CalculationRequest::new(grid.clone(), job.simulation.angle_deg, polarization)?;
        println!(
            "Computing {}-polarized spectrum: {} wavelengths, {}-{} nm at {}°",
            polarization,
            grid.len(),
            grid.start(),
            grid.end(),
            job.simulation.angle_deg
        );

        let worker = SpectrumWorker::spawn(stack.clone(), request, resolver)
            .context("Cannot start spectrum worker")?;
        for event in worker.events() {
            match event {
                WorkerEvent::Progress(percent) => println!("  {:>3}%", percent),
                WorkerEvent::Finished => break,
            }
        }
        let (returned, result) = worker
            .join()
            .map_err(|_| anyhow!("Spectrum worker panicked"))?;
        resolver = returned;

        let spectrum = result?;
        for warning in &spectrum.warnings {
            eprintln!("Warning: {}", warning);
        }
        if let Some((i, r)) = spectrum.peak_reflectance() {
            println!(
                "  peak R = {:.4} at {:.1} nm",
                r, spectrum.wavelengths_nm[i]
            );
        }
        spectra.push(spectrum);
    }
    resolver.clear_cache();
    Ok(spectra)
}

fn origin_text(origin: &LayerOrigin) -> String {
    match origin {
        LayerOrigin::Medium => "medium".into(),
        LayerOrigin::Filter => "filter".into(),
        LayerOrigin::Array { label, position } => format!("array {}[{}]", label, position),
    }
}

fn layer_line(index: usize, layer: &ExpandedLayer, tables: &JobTables) -> String {
    let name = tables
        .materials
        .get(&layer.label)
        .map(|entry| entry.name.as_str())
        .unwrap_or("");
    format!(
        "{:>5}  {:<16} {:>10.2} nm  {:<20} {}",
        index,
        layer.label,
        layer.thickness_nm,
        origin_text(&layer.origin),
        name
    )
}

/// Layer listing of the job's filter; `full` disables display truncation.
pub fn expansion_listing(job: &JobConfig, full: bool) -> Result<Vec<String>> {
    let tables = build_tables(job)?;
    let expander = tables.expander(job);
    let text = &job.filter.definition;

    let mut lines = vec![format!("{:>5}  {}  (entrance)", 0, job.media.entrance)];
    let mut index = 1;
    if full {
        for layer in expander.expand_layers(text)? {
            lines.push(layer_line(index, &layer, &tables));
            index += 1;
        }
    } else {
        for item in expander.expand_for_display(text)? {
            match item {
                DisplayLayer::Layer(layer) => {
                    lines.push(layer_line(index, &layer, &tables));
                    index += 1;
                }
                DisplayLayer::Ellipsis => lines.push(format!("{:>5}  ...", "")),
            }
        }
    }
    lines.push(format!("{:>5}  {}  (exit)", "", job.media.exit));
    Ok(lines)
}

/// Write spectra to a CSV file with a metadata header.
///
/// One `R_x,T_x,A_x` column triple per polarization; all spectra share the
/// job's wavelength grid.
pub fn write_spectra_csv(spectra: &[Spectrum], path: &Path, job: &JobConfig) -> Result<()> {
    use std::io::Write;

    let first = spectra.first().context("No spectra to write")?;
    if spectra.iter().any(|s| s.wavelengths_nm != first.wavelengths_nm) {
        bail!("Spectra do not share a wavelength grid");
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Cannot create {}", path.display()))?;

    // Metadata header
    writeln!(file, "# Lamina thin-film filter: R/T/A spectra")?;
    writeln!(file, "# Version: {}", env!("CARGO_PKG_VERSION"))?;
    writeln!(file, "# filter: {}", job.filter.definition)?;
    writeln!(
        file,
        "# media: entrance={}, exit={}",
        job.media.entrance, job.media.exit
    )?;
    writeln!(file, "# angle_deg: {}", first.angle_deg)?;
    for material in &job.material {
        writeln!(
            file,
            "# material '{}': {}{}",
            material.label,
            material.display_name(),
            if material.defect { " (defect)" } else { "" }
        )?;
    }
    for warning in spectra.iter().flat_map(|s| &s.warnings) {
        writeln!(file, "# warning: {}", warning)?;
    }
    writeln!(file, "#")?;

    let mut header = String::from("wavelength_nm");
    for s in spectra {
        let p = s.polarization;
        header.push_str(&format!(",R_{p},T_{p},A_{p}"));
    }
    writeln!(file, "{}", header)?;

    for (i, wl) in first.wavelengths_nm.iter().enumerate() {
        let mut row = format!("{:.2}", wl);
        for s in spectra {
            row.push_str(&format!(
                ",{:.6e},{:.6e},{:.6e}",
                s.reflectance[i], s.transmittance[i], s.absorptance[i]
            ));
        }
        writeln!(file, "{}", row)?;
    }

    println!("Spectra written to: {}", path.display());
    Ok(())
}

/// Write spectra to a JSON file.
pub fn write_spectra_json(spectra: &[Spectrum], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(spectra)
        .map_err(|e| anyhow!("JSON serialisation error: {}", e))?;
    std::fs::write(path, json)?;

    println!("Spectra (JSON) written to: {}", path.display());
    Ok(())
}
