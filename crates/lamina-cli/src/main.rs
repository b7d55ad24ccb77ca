//! Lamina command-line interface.
//!
//! Compute thin-film filter spectra from TOML job files:
//! ```sh
//! lamina-cli run job.toml
//! lamina-cli validate job.toml
//! lamina-cli expand job.toml --full
//! lamina-cli materials
//! lamina-cli search ./catalog silica
//! ```

mod config;
mod runner;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use lamina_materials::{library, CatalogLookup, DirectoryCatalog};

#[derive(Parser)]
#[command(name = "lamina-cli")]
#[command(about = "Lamina: thin-film filter spectra by the transfer-matrix method")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a calculation from a TOML configuration file.
    Run {
        /// Path to the job configuration file.
        config: PathBuf,
        /// Output directory (overrides config file setting).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file without computing spectra.
    Validate {
        /// Path to the job configuration file.
        config: PathBuf,
    },
    /// List the layers of the configured filter.
    Expand {
        /// Path to the job configuration file.
        config: PathBuf,
        /// Show every repetition instead of truncating long groups.
        #[arg(long)]
        full: bool,
    },
    /// Display the built-in materials.
    Materials,
    /// Search a catalog directory by material name.
    Search {
        /// Catalog root (`shelf/book/page.yml` tree).
        root: PathBuf,
        query: String,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, output } => {
            println!("Lamina Thin-Film Solver");
            println!("=======================");
            let job = config::load_config(&config)?;
            println!("Configuration: {}", config.display());

            let spectra = runner::run_job(&job)?;

            // Determine output directory
            let out_dir =
                output.unwrap_or_else(|| job.resolve_path(Path::new(&job.output.directory)));

            // CSV spectra (default on)
            if job.output.save_spectra {
                let csv_path = out_dir.join("spectra.csv");
                runner::write_spectra_csv(&spectra, &csv_path, &job)?;
            }

            // JSON spectra (optional)
            if job.output.save_json {
                let json_path = out_dir.join("spectra.json");
                runner::write_spectra_json(&spectra, &json_path)?;
            }

            println!("Calculation complete.");
            Ok(())
        }
        Commands::Validate { config } => {
            let job = config::load_config(&config)?;
            let stack = runner::validate_job(&job)
                .with_context(|| format!("Configuration {} is not runnable", config.display()))?;
            println!(
                "Configuration is valid: {} ({} layers)",
                config.display(),
                stack.interior().len()
            );
            Ok(())
        }
        Commands::Expand { config, full } => {
            let job = config::load_config(&config)?;
            for line in runner::expansion_listing(&job, full)? {
                println!("{}", line);
            }
            Ok(())
        }
        Commands::Materials => {
            println!("Built-in materials:");
            println!();
            for info in library::list() {
                println!(
                    "  {:<12} {}, {}-{} nm",
                    info.id, info.description, info.range_nm.0, info.range_nm.1
                );
            }
            println!();
            println!("Constants (n, k), YAML documents, formulas and catalog ids are");
            println!("configured per [[material]] in the job file.");
            Ok(())
        }
        Commands::Search { root, query } => {
            let catalog = DirectoryCatalog::new(root);
            let hits = catalog.search_by_name(&query);
            if hits.is_empty() {
                println!("No materials match '{}'", query);
            }
            for hit in hits {
                println!("  {:<40} {}", hit.id.to_string(), hit.display_name);
            }
            Ok(())
        }
    }
}
