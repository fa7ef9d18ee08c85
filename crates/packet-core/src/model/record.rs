use serde::{Deserialize, Serialize};

use crate::error::SchemaError;
use crate::model::category::Category;
use crate::model::question::{AnswerChoices, Question, QuestionFormat, QuestionId, QuestionType};

/// One row of the question spreadsheet, as exported to CSV.
///
/// Every cell is read as optional text; `into_question` applies the schema.
/// Written rows use the same headers, so an exported round file reads back
/// as pre-assigned input.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct QuestionRecord {
    #[serde(rename = "Round", default)]
    pub round: Option<String>,
    #[serde(rename = "Type", default)]
    pub kind: Option<String>,
    #[serde(rename = "Category", default)]
    pub category: Option<String>,
    #[serde(rename = "Subcategory", default)]
    pub subcategory: Option<String>,
    #[serde(rename = "Format", default)]
    pub format: Option<String>,
    #[serde(rename = "Multiple-item", default)]
    pub multi_item: Option<String>,
    #[serde(rename = "Question", default)]
    pub body: Option<String>,
    #[serde(rename = "Answer", default)]
    pub answer: Option<String>,
    #[serde(rename = "Accept", default)]
    pub accept: Option<String>,
    #[serde(rename = "Do Not Accept", default)]
    pub reject: Option<String>,
    #[serde(rename = "W", default)]
    pub w: Option<String>,
    #[serde(rename = "X", default)]
    pub x: Option<String>,
    #[serde(rename = "Y", default)]
    pub y: Option<String>,
    #[serde(rename = "Z", default)]
    pub z: Option<String>,
    #[serde(rename = "Difficulty", default)]
    pub difficulty: Option<String>,
    #[serde(rename = "Quality", default)]
    pub quality: Option<String>,
    #[serde(rename = "Pairing", default)]
    pub pairing: Option<String>,
}

impl QuestionRecord {
    pub const REQUIRED_COLUMNS: [&'static str; 12] = [
        "Type",
        "Category",
        "Format",
        "Multiple-item",
        "Question",
        "Answer",
        "W",
        "X",
        "Y",
        "Z",
        "Difficulty",
        "Quality",
    ];

    /// Report the first required column absent from a header row.
    pub fn check_headers<'a>(headers: impl IntoIterator<Item = &'a str>) -> Result<(), SchemaError> {
        let present: Vec<&str> = headers.into_iter().map(str::trim).collect();
        for column in Self::REQUIRED_COLUMNS {
            if !present.contains(&column) {
                return Err(SchemaError::MissingColumn {
                    column: column.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Export a question with its final round and a token binding it to its
    /// pair partner.
    pub fn from_question(question: &Question, round: Option<u32>, pairing: Option<String>) -> Self {
        let choice = |letter| {
            question
                .choices()
                .and_then(|choices| choices.get(letter))
                .map(str::to_string)
        };
        Self {
            round: round.map(|r| r.to_string()),
            kind: Some(question.kind().as_str().to_string()),
            category: Some(question.category().as_str().to_string()),
            subcategory: question.subcategory().map(str::to_string),
            format: Some(question.format().as_str().to_string()),
            multi_item: Some(if question.is_multi_item() { "Yes" } else { "No" }.to_string()),
            body: Some(question.body().to_string()),
            answer: Some(question.answer().to_string()),
            accept: question.accept().map(str::to_string),
            reject: question.reject().map(str::to_string),
            w: choice('W'),
            x: choice('X'),
            y: choice('Y'),
            z: choice('Z'),
            difficulty: Some(question.difficulty().to_string()),
            quality: Some(question.quality().to_string()),
            pairing,
        }
    }

    pub fn into_question(self, id: QuestionId) -> Result<Question, SchemaError> {
        let category_label = cell(self.category);
        let category = category_label
            .as_deref()
            .and_then(Category::from_label)
            .ok_or_else(|| SchemaError::UnknownCategory {
                row: id,
                value: category_label.clone().unwrap_or_default(),
            })?;

        let kind_label = cell(self.kind);
        let kind = kind_label
            .as_deref()
            .and_then(QuestionType::from_label)
            .ok_or_else(|| SchemaError::UnknownType {
                row: id,
                value: kind_label.clone().unwrap_or_default(),
            })?;

        let format_label = cell(self.format);
        let format = format_label
            .as_deref()
            .and_then(QuestionFormat::from_label)
            .ok_or_else(|| SchemaError::UnknownFormat {
                row: id,
                value: format_label.clone().unwrap_or_default(),
            })?;

        let cells = [cell(self.w), cell(self.x), cell(self.y), cell(self.z)];
        let choices = match format {
            QuestionFormat::MultipleChoice => {
                if let Some(idx) = cells.iter().position(Option::is_none) {
                    return Err(SchemaError::MissingChoice {
                        row: id,
                        letter: AnswerChoices::LETTERS[idx],
                    });
                }
                Some(AnswerChoices::new(cells.map(Option::unwrap_or_default)))
            }
            QuestionFormat::ShortAnswer => {
                if cells.iter().any(Option::is_some) {
                    return Err(SchemaError::StrayChoices { row: id });
                }
                None
            }
        };

        let difficulty = parse_number(id, "Difficulty", cell(self.difficulty))?;
        let quality = parse_number(id, "Quality", cell(self.quality))?;
        let multi_item = parse_flag(id, "Multiple-item", cell(self.multi_item))?;

        let round = match cell(self.round) {
            None => None,
            Some(value) => Some(parse_round(id, value)?),
        };

        let mut question = Question::new(id, category, kind)
            .with_text(
                cell(self.body).unwrap_or_default(),
                cell(self.answer).unwrap_or_default(),
            )
            .with_answer_notes(cell(self.accept), cell(self.reject))
            .with_ratings(difficulty, quality)
            .with_multi_item(multi_item);

        if let Some(choices) = choices {
            question = question.with_choices(choices);
        }
        if let Some(subcategory) = cell(self.subcategory) {
            question = question.with_subcategory(subcategory);
        }
        if let Some(token) = cell(self.pairing) {
            question = question.with_pairing_hint(token);
        }
        if let Some(round) = round {
            question = question.with_round(round);
        }

        Ok(question)
    }
}

fn cell(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("nan"))
}

fn parse_number(
    row: QuestionId,
    column: &'static str,
    value: Option<String>,
) -> Result<f64, SchemaError> {
    let raw = value.unwrap_or_default();
    match raw.parse::<f64>() {
        Ok(number) if number.is_finite() => Ok(number),
        _ => Err(SchemaError::InvalidNumber {
            row,
            column,
            value: raw,
        }),
    }
}

fn parse_round(row: QuestionId, value: String) -> Result<u32, SchemaError> {
    // Spreadsheet exports often write integral rounds as "3.0".
    let parsed = value
        .parse::<u32>()
        .ok()
        .or_else(|| {
            value
                .parse::<f64>()
                .ok()
                .filter(|v| v.fract() == 0.0 && *v >= 1.0 && *v <= u32::MAX as f64)
                .map(|v| v as u32)
        })
        .filter(|round| *round >= 1);
    parsed.ok_or(SchemaError::InvalidNumber {
        row,
        column: "Round",
        value,
    })
}

fn parse_flag(
    row: QuestionId,
    column: &'static str,
    value: Option<String>,
) -> Result<bool, SchemaError> {
    let normalized = value.as_deref().map(str::to_ascii_lowercase);
    match normalized.as_deref() {
        None | Some("no") => Ok(false),
        Some("yes") => Ok(true),
        Some(_) => Err(SchemaError::InvalidFlag {
            row,
            column,
            value: value.unwrap_or_default(),
        }),
    }
}
