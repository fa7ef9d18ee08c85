use std::fs;
use std::path::{Path, PathBuf};

use packet_core::PacketSet;
use packet_core::model::category::Category;
use packet_core::model::record::QuestionRecord;
use packet_core::model::round::{Round, RoundKind};
use packet_core::snapshot::PacketSnapshot;
use thiserror::Error;

/// Full assignment table: placed questions in packet order, removed last.
pub fn write_table_csv(path: &Path, packets: &PacketSet) -> Result<usize, OutputError> {
    let mut writer = csv::Writer::from_path(path).map_err(|source| OutputError::csv(path, source))?;
    let rows = packets.table_rows();
    for row in &rows {
        writer.serialize(row).map_err(|source| OutputError::csv(path, source))?;
    }
    writer.flush().map_err(|source| OutputError::Io {
        context: "flushing assignment table",
        source,
    })?;
    Ok(rows.len())
}

pub fn write_table_json(path: &Path, packets: &PacketSet, seed: u64) -> Result<(), OutputError> {
    let json = PacketSnapshot::to_json(packets, seed)?;
    fs::write(path, json).map_err(|source| OutputError::Io {
        context: "writing assignment snapshot",
        source,
    })
}

/// File name for a round inside the rounds directory.
pub fn round_file_name(round: &Round) -> String {
    match round.kind() {
        RoundKind::Regular => format!("round{}.csv", round.number()),
        RoundKind::Tiebreak(index) => format!("tiebreak{index}.csv"),
    }
}

/// One CSV per round in reading order, using the input column layout so a
/// round file can be fed back in as pre-assigned input. Each question's
/// pairing cell names its pair.
pub fn write_round_files(dir: &Path, packets: &PacketSet) -> Result<Vec<PathBuf>, OutputError> {
    fs::create_dir_all(dir).map_err(|source| OutputError::Io {
        context: "creating rounds directory",
        source,
    })?;

    let mut written = Vec::new();
    for round in packets.all_rounds() {
        let path = dir.join(round_file_name(round));
        let mut writer = csv::Writer::from_path(&path).map_err(|source| OutputError::csv(&path, source))?;
        for (pair, question) in round.questions() {
            let record = QuestionRecord::from_question(question, Some(round.number()), Some(pair.id().to_string()));
            writer
                .serialize(&record)
                .map_err(|source| OutputError::csv(&path, source))?;
        }
        writer.flush().map_err(|source| OutputError::Io {
            context: "flushing round file",
            source,
        })?;
        written.push(path);
    }
    Ok(written)
}

pub fn write_summary_markdown(
    path: &Path,
    packets: &PacketSet,
    run_id: &str,
    seed: u64,
) -> Result<(), OutputError> {
    let mut rows = String::new();
    rows.push_str(&format!("# Packet Summary: {run_id}\n\n"));
    rows.push_str(&format!(
        "Seed {seed}, {} strategy, {} rounds, {} tiebreaks\n\n",
        packets.strategy(),
        packets.rounds().len(),
        packets.tiebreaks().len()
    ));
    rows.push_str("| Round | Pairs | Difficulty span | Shuffles | Category sequence |\n");
    rows.push_str("|-------|-------|-----------------|----------|-------------------|\n");

    for round in packets.all_rounds() {
        let label = match round.kind() {
            RoundKind::Regular => round.number().to_string(),
            RoundKind::Tiebreak(index) => format!("TB{index} ({})", round.number()),
        };
        let span = difficulty_span(round)
            .map(|(low, high)| format!("{low:.2} - {high:.2}"))
            .unwrap_or_else(|| "-".to_string());
        let sequence: Vec<&str> = round.categories().into_iter().map(short_label).collect();
        rows.push_str(&format!(
            "| {label} | {pairs} | {span} | {attempts} | {sequence} |\n",
            pairs = round.pairs().len(),
            attempts = round.attempts(),
            sequence = sequence.join(" "),
        ));
    }

    rows.push_str("\n## Removed questions\n\n");
    rows.push_str("| Category | Removed |\n");
    rows.push_str("|----------|---------|\n");
    for (category, count) in packets.removed_counts().iter() {
        rows.push_str(&format!("| {category} | {count} |\n"));
    }

    fs::write(path, rows).map_err(|source| OutputError::Io {
        context: "writing summary markdown",
        source,
    })
}

fn difficulty_span(round: &Round) -> Option<(f64, f64)> {
    round.pairs().iter().map(|pair| pair.difficulty()).fold(None, |span, value| match span {
        None => Some((value, value)),
        Some((low, high)) => Some((low.min(value), high.max(value))),
    })
}

fn short_label(category: Category) -> &'static str {
    match category {
        Category::Math => "MTH",
        Category::Biology => "BIO",
        Category::Chemistry => "CHM",
        Category::Physics => "PHY",
        Category::EarthSpace => "ESS",
        Category::Energy => "NRG",
    }
}

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("I/O error while {context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write CSV {path:?}: {source}")]
    Csv {
        #[source]
        source: csv::Error,
        path: PathBuf,
    },
    #[error("failed to serialize snapshot: {0}")]
    Json(#[from] serde_json::Error),
}

impl OutputError {
    fn csv(path: &Path, source: csv::Error) -> Self {
        OutputError::Csv {
            source,
            path: path.to_path_buf(),
        }
    }
}
