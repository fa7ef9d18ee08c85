use std::fs;
use std::path::{Path, PathBuf};

use packet_core::assembly::AssemblyConfig;
use packet_core::{PacketAssembler, PacketError, Strategy};
use thiserror::Error;
use tracing::{Level, event};

use crate::config::{GeneratorConfig, ResolvedOutputs};
use crate::input::{InputError, load_questions};
use crate::output::{
    OutputError, write_round_files, write_summary_markdown, write_table_csv, write_table_json,
};

/// Primary entry point for one packet generation run.
pub struct PacketRunner {
    config: GeneratorConfig,
    outputs: ResolvedOutputs,
    assembly: AssemblyConfig,
    logging_enabled: bool,
}

/// Summary details returned after a run.
#[derive(Debug)]
pub struct RunSummary {
    pub strategy: Strategy,
    pub questions_read: usize,
    pub rounds: usize,
    pub tiebreaks: usize,
    pub removed: usize,
    pub rows_written: usize,
    pub table_csv: PathBuf,
    pub table_json: PathBuf,
    pub round_files: Vec<PathBuf>,
    pub summary_path: PathBuf,
    pub telemetry_path: Option<PathBuf>,
}

impl PacketRunner {
    /// Build a runner from a validated configuration.
    pub fn new(config: GeneratorConfig, outputs: ResolvedOutputs) -> Result<Self, RunnerError> {
        let assembly = config.assembly_config();
        assembly.validate()?;
        Ok(Self {
            logging_enabled: config.logging.enable_structured,
            config,
            outputs,
            assembly,
        })
    }

    /// Read the input, assemble every round, then write all outputs. Nothing
    /// is written unless assembly succeeds.
    pub fn run(&self) -> Result<RunSummary, RunnerError> {
        let input = self.config.input_path();
        let questions = load_questions(&input)?;
        let questions_read = questions.len();

        let mut assembler = PacketAssembler::new(self.assembly.clone())?;
        let packets = assembler.assemble(questions)?;

        ensure_parent(self.outputs.table_csv.parent())?;
        ensure_parent(self.outputs.table_json.parent())?;
        ensure_parent(self.outputs.summary_md.parent())?;

        let seed = self.assembly.seed;
        let rows_written = write_table_csv(&self.outputs.table_csv, &packets)?;
        write_table_json(&self.outputs.table_json, &packets, seed)?;
        let round_files = write_round_files(&self.outputs.rounds_dir, &packets)?;
        write_summary_markdown(&self.outputs.summary_md, &packets, &self.config.run_id, seed)?;

        event!(
            target: "packet_gen::runner",
            Level::INFO,
            run_id = self.config.run_id.as_str(),
            strategy = packets.strategy().as_str(),
            rounds = packets.rounds().len() as u64,
            tiebreaks = packets.tiebreaks().len() as u64,
            removed = packets.removed().len() as u64,
            rows = rows_written as u64,
        );

        let telemetry_path = if self.logging_enabled {
            let dir = self
                .outputs
                .summary_md
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            Some(dir.join("telemetry.jsonl"))
        } else {
            None
        };

        Ok(RunSummary {
            strategy: packets.strategy(),
            questions_read,
            rounds: packets.rounds().len(),
            tiebreaks: packets.tiebreaks().len(),
            removed: packets.removed().len(),
            rows_written,
            table_csv: self.outputs.table_csv.clone(),
            table_json: self.outputs.table_json.clone(),
            round_files,
            summary_path: self.outputs.summary_md.clone(),
            telemetry_path,
        })
    }
}

fn ensure_parent(path: Option<&Path>) -> Result<(), RunnerError> {
    if let Some(dir) = path.filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("{0}")]
    Input(#[from] InputError),
    #[error("assembly failed: {0}")]
    Assembly(#[from] PacketError),
    #[error("{0}")]
    Output(#[from] OutputError),
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}
