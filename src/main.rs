//! Galton board entry point
//!
//! Runs one simulation per project directory, all of them concurrently.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use rayon::prelude::*;

use galton_board::Config;
use galton_board::export::CsvExporter;
use galton_board::sim::{Engine, RunSummary};

#[derive(Parser, Debug)]
#[command(about = "Galton board simulator", version)]
struct Args {
    /// Project directory holding config.json (repeatable)
    #[arg(long = "path")]
    paths: Vec<PathBuf>,

    /// Create a default config.json where none exists
    #[arg(long)]
    default: bool,

    /// Run in the current directory with a default configuration
    #[arg(long)]
    debug: bool,

    /// Number of CPUs to use
    #[arg(long, default_value_t = 1)]
    cpu: usize,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = Args::parse();

    let available = std::thread::available_parallelism().map_or(1, |n| n.get());
    let cpus = args.cpu.clamp(1, available);
    rayon::ThreadPoolBuilder::new()
        .num_threads(cpus)
        .build_global()
        .context("failed to size the worker pool")?;
    log::info!("Using {} CPUs", cpus);

    if args.debug {
        args.paths.push(PathBuf::from("./"));
        args.default = true;
    }

    if args.paths.is_empty() {
        log::info!("No project paths specified");
        return Ok(());
    }

    let start = Instant::now();
    args.paths.par_iter().for_each(|path| {
        if let Err(err) = run_project(path, args.default) {
            log::error!("Simulation for {} failed: {:#}", path.display(), err);
        }
    });

    log::info!("------------------------------------");
    log::info!("All simulations finished in {:?}", start.elapsed());
    Ok(())
}

/// Load, run and export a single project
fn run_project(dir: &Path, create_default: bool) -> Result<RunSummary> {
    if create_default {
        Config::write_default(dir)
            .with_context(|| format!("creating default configuration in {}", dir.display()))?;
    }

    let config = Config::load(dir)
        .with_context(|| format!("loading configuration from {}", dir.display()))?;
    let mut exporter = CsvExporter::create(dir, &config.save).context("opening output files")?;
    let mut engine = Engine::new(config)?;

    log::info!("Running simulation for {}", dir.display());
    let start = Instant::now();
    let summary = engine.run(&mut exporter)?;
    exporter.finish().context("flushing output files")?;

    log::info!(
        "Simulation for {} finished in {:?}: {} steps, {}/{} bodies landed",
        dir.display(),
        start.elapsed(),
        summary.steps,
        summary.terminal,
        engine.bodies().len()
    );
    Ok(summary)
}
