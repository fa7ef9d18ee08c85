use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use packet_core::SchemaError;
use packet_core::model::question::{Question, QuestionId};
use packet_core::model::record::QuestionRecord;
use thiserror::Error;
use tracing::{Level, event};

/// Read the question table exported from the spreadsheet.
pub fn load_questions(path: impl AsRef<Path>) -> Result<Vec<Question>, InputError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| InputError::Open {
        source,
        path: path.to_path_buf(),
    })?;
    read_questions(BufReader::new(file), path)
}

/// Parse CSV text. Headers are checked before any row is read; row numbers in
/// errors count data rows from 1.
pub fn read_questions<R: Read>(reader: R, origin: &Path) -> Result<Vec<Question>, InputError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers = csv_reader.headers().map_err(|source| InputError::csv(origin, source))?;
    QuestionRecord::check_headers(headers.iter()).map_err(|source| InputError::schema(origin, source))?;

    let mut questions = Vec::new();
    for (idx, result) in csv_reader.deserialize::<QuestionRecord>().enumerate() {
        let record = result.map_err(|source| InputError::csv(origin, source))?;
        let question = record
            .into_question(QuestionId(idx + 1))
            .map_err(|source| InputError::schema(origin, source))?;
        questions.push(question);
    }

    event!(
        target: "packet_gen::input",
        Level::INFO,
        path = %origin.display(),
        questions = questions.len() as u64,
    );

    Ok(questions)
}

#[derive(Debug, Error)]
pub enum InputError {
    #[error("failed to open question table {path:?}: {source}")]
    Open {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to read question table {path:?}: {source}")]
    Csv {
        #[source]
        source: csv::Error,
        path: PathBuf,
    },
    #[error("invalid question table {path:?}: {source}")]
    Schema {
        #[source]
        source: SchemaError,
        path: PathBuf,
    },
}

impl InputError {
    fn csv(path: &Path, source: csv::Error) -> Self {
        InputError::Csv {
            source,
            path: path.to_path_buf(),
        }
    }

    fn schema(path: &Path, source: SchemaError) -> Self {
        InputError::Schema {
            source,
            path: path.to_path_buf(),
        }
    }
}
