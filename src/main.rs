use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use multilateration::api::formatting::{CsvFormatter, FormattedEstimate, JsonFormatter, OutputFormat, TextFormatter};
use multilateration::processing::batch::{BatchSolver, BatchSummary, TargetObservations};
use multilateration::utils::config::ConfigurationManager;

/// Locate transmitters from reception times at known receivers
#[derive(Parser, Debug)]
#[command(name = "multilateration", version, about)]
struct Args {
    /// Scenario file (JSON) with solver settings, receivers and targets
    #[arg(short, long)]
    config: PathBuf,

    /// CSV observation feed; replaces the scenario's targets
    #[arg(short, long)]
    observations: Option<PathBuf>,

    /// Output format: text, json or csv
    #[arg(short, long, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(args.verbose);

    let manager = ConfigurationManager::from_file(&args.config)?;
    let receivers = manager.receivers()?;
    let targets = match &args.observations {
        Some(path) => {
            let ids: Vec<&str> = receivers.iter().map(|r| r.id.as_str()).collect();
            let targets = TargetObservations::from_csv_path(path, &ids)?;
            info!(path = %path.display(), targets = targets.len(), "Loaded observation feed");
            targets
        }
        None => manager.targets().to_vec(),
    };
    if targets.is_empty() {
        warn!("Scenario has no targets to solve");
    }

    let batch = BatchSolver::new(manager.solver_config().clone())?;
    let results = batch.solve_all(&receivers, &targets);
    let summary = BatchSummary::from_results(&results);
    info!(
        total = summary.total,
        converged = summary.converged,
        not_converged = summary.not_converged,
        failed = summary.failed,
        "Batch complete"
    );

    let formatted: Vec<FormattedEstimate> = results.iter().map(FormattedEstimate::from_target).collect();
    match args.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new();
            for f in &formatted {
                println!("{}", formatter.format_text(f));
            }
        }
        OutputFormat::Json => println!("{}", JsonFormatter::pretty().format_all(&formatted)?),
        OutputFormat::Csv => println!("{}", CsvFormatter::new().format_all(&formatted)),
    }

    Ok(())
}

/// Default filter directive when `RUST_LOG` is unset
fn log_directive(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "info"
    }
}

/// Logs go to stderr, results to stdout. `RUST_LOG` overrides `--verbose`.
fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_directive(verbose)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .init();

    if verbose {
        info!("Verbose logging enabled (DEBUG level)");
    }
}
