use thiserror::Error;

use crate::model::category::Category;
use crate::model::question::{QuestionId, QuestionType};

/// Malformed input records. Always fatal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("missing required column '{column}'")]
    MissingColumn { column: String },
    #[error("{row}: unknown category '{value}'")]
    UnknownCategory { row: QuestionId, value: String },
    #[error("{row}: unknown question type '{value}' (expected Toss-up or Bonus)")]
    UnknownType { row: QuestionId, value: String },
    #[error("{row}: unknown format '{value}' (expected Multiple Choice or Short Answer)")]
    UnknownFormat { row: QuestionId, value: String },
    #[error("{row}: multiple choice question is missing answer choice {letter}")]
    MissingChoice { row: QuestionId, letter: char },
    #[error("{row}: short answer question has extraneous answer choices")]
    StrayChoices { row: QuestionId },
    #[error("{row}: column '{column}' is not a number: '{value}'")]
    InvalidNumber {
        row: QuestionId,
        column: &'static str,
        value: String,
    },
    #[error("{row}: column '{column}' must be Yes or No, found '{value}'")]
    InvalidFlag {
        row: QuestionId,
        column: &'static str,
        value: String,
    },
    #[error("{row}: round column is blank but {assigned} other rows carry a round number")]
    MixedRoundColumn { row: QuestionId, assigned: usize },
    #[error("pairing hint '{token}': {message}")]
    PairingHint { token: String, message: String },
}

/// Failures surfaced by the assembly pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PacketError {
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
    #[error("{category}: need {required} {kind} questions to fill every round but only {available} supplied")]
    Quantity {
        category: Category,
        kind: QuestionType,
        required: usize,
        available: usize,
    },
    #[error("consistency error in {context}: {message}")]
    Consistency { context: String, message: String },
    #[error("round {round}: no arrangement without adjacent repeated categories after {attempts} attempts")]
    Infeasible { round: u32, attempts: usize },
    #[error("invalid assembly configuration: {field}: {message}")]
    Config { field: String, message: String },
}

impl PacketError {
    pub(crate) fn consistency(context: impl Into<String>, message: impl Into<String>) -> Self {
        PacketError::Consistency {
            context: context.into(),
            message: message.into(),
        }
    }

    pub(crate) fn config(field: impl Into<String>, message: impl Into<String>) -> Self {
        PacketError::Config {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantity_message_names_category_and_type() {
        let err = PacketError::Quantity {
            category: Category::EarthSpace,
            kind: QuestionType::Bonus,
            required: 52,
            available: 49,
        };
        assert_eq!(
            err.to_string(),
            "Earth and Space: need 52 Bonus questions to fill every round but only 49 supplied"
        );
    }

    #[test]
    fn schema_errors_convert_into_packet_errors() {
        let err: PacketError = SchemaError::StrayChoices { row: QuestionId(4) }.into();
        assert!(matches!(err, PacketError::Schema(SchemaError::StrayChoices { .. })));
        assert!(err.to_string().contains("row 4"));
    }
}
