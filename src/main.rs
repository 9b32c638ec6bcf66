//! Phase-field cell population engine - entry point
//!
//! CLI Usage:
//!   cargo run                              # Run with data/parameters or defaults
//!   cargo run -- --params runs/a --seed 7  # Custom parameter directory and seed
//!   cargo run -- -n 1000 -o out            # Custom reporting ticks and output directory

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use phase_field_cells::{
    config::Parameters,
    export::{export_lineage_json, CsvExporter, LineageLogWriter},
    lifecycle::{run, SimulationContext},
    mechanics::CrowdingStress,
};

/// Command-line options
struct Options {
    params_dir: Option<PathBuf>,
    steps: Option<u64>,
    seed: Option<u64>,
    output: PathBuf,
}

/// Parse CLI arguments
fn parse_args() -> Options {
    let args: Vec<String> = std::env::args().collect();
    let mut options = Options {
        params_dir: None,
        steps: None,
        seed: None,
        output: PathBuf::from("exports"),
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-p" | "--params" => {
                i += 1;
                if i < args.len() {
                    options.params_dir = Some(PathBuf::from(&args[i]));
                }
            }
            "-n" | "--steps" => {
                i += 1;
                if i < args.len() {
                    options.steps = args[i].parse().ok();
                }
            }
            "-s" | "--seed" => {
                i += 1;
                if i < args.len() {
                    options.seed = args[i].parse().ok();
                }
            }
            "-o" | "--output" => {
                i += 1;
                if i < args.len() {
                    options.output = PathBuf::from(&args[i]);
                }
            }
            "--help" | "-h" => {
                println!("Phase-field cell population engine");
                println!();
                println!("Usage: phase-field-cells [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -p, --params DIR   Parameter directory (default: data/parameters)");
                println!("  -n, --steps N      Reporting ticks to run (default: from run.json)");
                println!("  -s, --seed S       Seed for all random streams");
                println!("  -o, --output DIR   Output directory (default: exports)");
                println!("  --help, -h         Show this help");
                std::process::exit(0);
            }
            other => log::warn!("ignoring unknown argument {}", other),
        }
        i += 1;
    }

    options
}

fn main() -> Result<()> {
    env_logger::init();

    let options = parse_args();

    let mut params = match &options.params_dir {
        Some(dir) => Parameters::load_from_dir(dir),
        None => Parameters::load_or_default(),
    };
    if let Some(steps) = options.steps {
        params.run.nsteps = steps;
    }
    if options.seed.is_some() {
        params.run.seed = options.seed;
    }

    let interval = params.run.reporting_interval();
    let total_steps = params.run.nsteps * params.run.nsubsteps;
    let proliferation = params.proliferation.enabled;

    let mut ctx = SimulationContext::on_host(params)?;
    let mut stress = CrowdingStress::default();

    std::fs::create_dir_all(&options.output)?;
    let mut lineage_log = if proliferation {
        Some(LineageLogWriter::new(options.output.join("lineage.bin")))
    } else {
        None
    };
    let mut csv = CsvExporter::new(&options.output, interval)?;

    log::info!(
        "running {} steps, reporting every {} steps",
        total_steps,
        interval
    );

    let start = Instant::now();
    let mut block_start = Instant::now();
    let summary = run(
        &mut ctx,
        &mut stress,
        total_steps,
        lineage_log.as_mut(),
        |metrics, divisions| {
            csv.maybe_record(metrics)?;
            log::info!(
                "step {} (t = {:.1}): {} cells, {} divisions, {:.1} steps/s",
                metrics.step,
                metrics.time,
                metrics.cell_count,
                divisions,
                interval as f64 / block_start.elapsed().as_secs_f64().max(1e-9)
            );
            block_start = Instant::now();
            Ok(())
        },
    )?;
    if summary.log_failures > 0 {
        log::warn!("{} lineage snapshots could not be written", summary.log_failures);
    }

    let metrics = ctx.metrics(total_steps);
    csv.record(&metrics)?;
    csv.finish()?;
    export_lineage_json(&options.output, &metrics, ctx.registry.ledger())?;
    ctx.mirror.release();

    let elapsed = start.elapsed();
    log::info!(
        "finished in {:.2?}: {} cells alive, {} ever created, {} divisions, {} lineage anomalies",
        elapsed,
        metrics.cell_count,
        metrics.ledger_size,
        metrics.divisions,
        metrics.lineage_anomalies
    );

    Ok(())
}
