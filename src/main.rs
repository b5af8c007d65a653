//! Coupling Bench CLI
//! Times coupling-library API call patterns

use clap::{Parser, Subcommand};
use coupling_bench::config::Backend;
use coupling_bench::types::AccessOrder;
use coupling_bench::{coupling, telemetry, BenchConfig, FixtureCache, Registry, VariantFilter};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "coupling-bench", version, about = "Coupling-library API call-pattern benchmarks")]
struct Cli {
    /// JSON config file (defaults to $COUPLING_BENCH_CONFIG, then config/bench.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Only run variants whose name matches this regex
    #[arg(long, global = true)]
    filter: Option<String>,

    /// Run only these variants
    #[arg(long, global = true, value_delimiter = ',')]
    enable: Vec<String>,

    /// Never run these variants
    #[arg(long, global = true, value_delimiter = ',')]
    disable: Vec<String>,

    /// Number of fixture vertices
    #[arg(long, global = true)]
    entities: Option<usize>,

    /// Minimum measured time per variant
    #[arg(long, global = true)]
    min_time_ms: Option<u64>,

    /// Visit vertex ids in a seeded random order
    #[arg(long, global = true)]
    shuffle: bool,

    /// Use the coupling library's C bindings (needs the `native` feature)
    #[arg(long, global = true)]
    native: bool,

    /// Coupling configuration file passed to the library
    #[arg(long, global = true, env = "COUPLING_CONFIG_FILE")]
    coupling_config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Cmd>,
}

#[derive(Subcommand)]
enum Cmd {
    /// Run the selected variants and print a report
    Run {
        /// Also write the report as JSON
        #[arg(long)]
        json: Option<PathBuf>,
    },
    /// List variants and whether the current selection runs them
    List,
}

impl Cli {
    fn apply(&self, config: &mut BenchConfig) {
        if let Some(filter) = &self.filter {
            config.selection.filter = Some(filter.clone());
        }
        config.selection.enabled.extend(self.enable.iter().cloned());
        config.selection.disabled.extend(self.disable.iter().cloned());
        if let Some(entities) = self.entities {
            config.fixture.entity_count = entities;
        }
        if let Some(ms) = self.min_time_ms {
            config.measurement.min_time_ms = ms;
        }
        if self.shuffle {
            config.fixture.access_order = AccessOrder::Shuffled;
        }
        if self.native {
            config.coupling.backend = Backend::Native;
        }
        if let Some(path) = &self.coupling_config {
            config.coupling.config_file = Some(path.clone());
        }
    }
}

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => BenchConfig::load(path)?,
        None => BenchConfig::from_env()?,
    };
    cli.apply(&mut config);

    telemetry::init_logging(&config.logging)?;
    config.validate()?;

    // Setup errors abort here, before anything is timed
    let mut coupling = coupling::open(&config.coupling)?;

    match cli.command.unwrap_or(Cmd::Run { json: None }) {
        Cmd::List => {
            let filter = VariantFilter::from_config(&config.selection)?;
            let registry = Registry::with_default_matrix(coupling.supports_write_by_name());
            for spec in registry.variants() {
                let mark = if filter.allows(&spec.name) { "run " } else { "skip" };
                println!("[{}] {}", mark, spec);
            }
            for spec in coupling_bench::default_matrix() {
                if !registry.variants().contains(&spec) {
                    println!("[n/a ] {}", spec);
                }
            }
        }
        Cmd::Run { json } => {
            let mut fixtures = FixtureCache::new(&config.coupling.mesh, config.fixture.seed);
            let report = coupling_bench::run_benchmarks(&config, &mut coupling, &mut fixtures)?;

            println!("{}", report);
            if let Some(path) = json {
                report.write_json(&path)?;
                info!(path = %path.display(), "report written");
            }
        }
    }

    Ok(())
}
