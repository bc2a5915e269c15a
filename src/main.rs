use clap::{Parser, ValueEnum};
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use env_logger::Env;
use log::info;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use tricycle::config_loader::{self, CliOverrides};
use tricycle::orchestrator::{self, Simulation};
use tricycle::report::{self, ReportMetadata, RunReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Text,
    All,
}

/// Tritium fuel-cycle simulation
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the scenario YAML file
    #[arg(short, long)]
    config: PathBuf,

    /// Output directory for reports
    #[arg(short, long, default_value = "tricycle_output")]
    output: PathBuf,

    /// Which reports to write
    #[arg(short, long, value_enum, default_value_t = OutputFormat::All)]
    format: OutputFormat,

    /// Also write a compressed binary dump of every recorded row
    #[arg(long)]
    dump: bool,

    /// Log filter, overrides the scenario's log_level
    #[arg(long)]
    log_level: Option<String>,

    /// Worker threads for facility stepping
    #[arg(long)]
    threads: Option<usize>,

    /// Override the number of timesteps
    #[arg(long)]
    duration: Option<u32>,

    /// Override the timestep length, e.g. "30days"
    #[arg(long, value_parser = humantime_serde::re::humantime::parse_duration)]
    timestep: Option<Duration>,
}

fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    let args = Args::parse();

    let level = args
        .log_level
        .clone()
        .or_else(|| config_loader::peek_log_level(&args.config))
        .unwrap_or_else(|| "info".to_string());
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    info!("Starting tricycle v{}", env!("CARGO_PKG_VERSION"));
    info!("Scenario file: {:?}", args.config);
    info!("Output directory: {:?}", args.output);

    if let Some(threads) = args.threads {
        orchestrator::configure_threads(threads)?;
    }

    let mut config = config_loader::load_config(&args.config)?;
    let overrides = CliOverrides {
        duration: args.duration,
        timestep: args.timestep,
    };
    config_loader::apply_overrides(&mut config, &overrides)?;

    let mut sim = Simulation::new(&config)?;
    let summary = sim.run()?;

    fs::create_dir_all(&args.output).wrap_err_with(|| {
        format!("Failed to create output directory '{}'", args.output.display())
    })?;

    let metadata = ReportMetadata::new(&args.config);
    if matches!(args.format, OutputFormat::Json | OutputFormat::All) {
        let run_report = RunReport {
            metadata: metadata.clone(),
            summary: &summary,
            records: sim.records().all(),
        };
        report::generate_json_report(&run_report, &args.output.join("report.json"))?;
    }
    if matches!(args.format, OutputFormat::Text | OutputFormat::All) {
        report::generate_text_report(
            &metadata,
            &summary,
            sim.records(),
            &args.output.join("report.txt"),
        )?;
    }
    if args.dump {
        report::write_record_dump(sim.records().all(), &args.output.join("records.bin.zst"))?;
    }

    info!(
        "Simulation completed: {} timesteps, {} transactions",
        summary.duration, summary.transactions
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let args = Args::parse_from(["tricycle", "--config", "scenario.yaml"]);

        assert_eq!(args.config, PathBuf::from("scenario.yaml"));
        assert_eq!(args.output, PathBuf::from("tricycle_output"));
        assert_eq!(args.format, OutputFormat::All);
        assert!(!args.dump);
    }

    #[test]
    fn test_override_args() {
        let args = Args::parse_from([
            "tricycle",
            "--config",
            "scenario.yaml",
            "--format",
            "json",
            "--duration",
            "24",
            "--timestep",
            "1day",
            "--threads",
            "2",
        ]);

        assert_eq!(args.format, OutputFormat::Json);
        assert_eq!(args.duration, Some(24));
        assert_eq!(args.timestep, Some(Duration::from_secs(86_400)));
        assert_eq!(args.threads, Some(2));
    }
}
