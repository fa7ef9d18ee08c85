use std::path::PathBuf;

use clap::Parser;

use packet_core::AppInfo;
use packet_gen::config::{GeneratorConfig, ResolvedOutputs};
use packet_gen::logging::init_logging;
use packet_gen::runner::PacketRunner;

/// Round packet generator for science bowl question sets.
#[derive(Debug, Parser)]
#[command(
    name = "packet-gen",
    author,
    version,
    about = "Deterministic round packet generator"
)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config/packet.yaml")]
    config: PathBuf,

    /// Override the run identifier (substitutes {run_id} templates).
    #[arg(long, value_name = "RUN_ID")]
    run_id: Option<String>,

    /// Override the question table path.
    #[arg(short, long, value_name = "CSV")]
    input: Option<String>,

    /// Override the RNG seed.
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Override the number of regular rounds.
    #[arg(long, value_name = "COUNT")]
    rounds: Option<u32>,

    /// Exit after validating the configuration (no packets are generated).
    #[arg(long)]
    validate_only: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = GeneratorConfig::from_path(&cli.config)?;

    if let Some(run_id) = cli.run_id {
        config.run_id = run_id;
    }

    if let Some(input) = cli.input {
        config.input = input;
    }

    if let Some(seed) = cli.seed {
        config.seed = Some(seed);
    }

    if let Some(rounds) = cli.rounds {
        config.rounds.count = rounds;
    }

    config.validate()?;

    let outputs: ResolvedOutputs = config.resolved_outputs();
    let run_id = config.run_id.clone();
    let rounds = config.rounds.count;
    let seed = config.seed.unwrap_or(0);

    println!(
        "{} {} ({}): loaded configuration '{run_id}' ({rounds} round{}, seed {seed})",
        AppInfo::name(),
        AppInfo::version(),
        AppInfo::codename(),
        if rounds == 1 { "" } else { "s" }
    );

    let _logging_guard = init_logging(&config.logging, &outputs, &run_id)?;
    let runner = PacketRunner::new(config, outputs)?;

    if cli.validate_only {
        println!("Validation-only mode: packet generation skipped.");
        return Ok(());
    }

    let summary = runner.run()?;
    println!(
        "Packets complete for '{run_id}' ({} strategy): {} questions read, {} rounds + {} tiebreaks, {} removed",
        summary.strategy,
        summary.questions_read,
        summary.rounds,
        summary.tiebreaks,
        summary.removed
    );
    println!(
        "Assignment table: {} ({} rows)",
        summary.table_csv.display(),
        summary.rows_written
    );
    println!("Snapshot: {}", summary.table_json.display());
    println!("Round files: {}", summary.round_files.len());
    println!("Summary table: {}", summary.summary_path.display());
    if let Some(telemetry_path) = summary.telemetry_path.as_ref() {
        println!("Telemetry log: {}", telemetry_path.display());
    }

    Ok(())
}
