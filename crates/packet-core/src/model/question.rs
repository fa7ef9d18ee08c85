use core::fmt;

use crate::model::category::Category;

/// 1-based data-row number of the record a question was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QuestionId(pub usize);

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum QuestionType {
    TossUp,
    Bonus,
}

impl QuestionType {
    pub const BOTH: [QuestionType; 2] = [QuestionType::TossUp, QuestionType::Bonus];

    pub const fn opposite(self) -> QuestionType {
        match self {
            QuestionType::TossUp => QuestionType::Bonus,
            QuestionType::Bonus => QuestionType::TossUp,
        }
    }

    pub const fn index(self) -> usize {
        match self {
            QuestionType::TossUp => 0,
            QuestionType::Bonus => 1,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            QuestionType::TossUp => "Toss-up",
            QuestionType::Bonus => "Bonus",
        }
    }

    pub fn from_label(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "toss-up" | "toss up" | "tossup" => Some(QuestionType::TossUp),
            "bonus" => Some(QuestionType::Bonus),
            _ => None,
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuestionFormat {
    MultipleChoice,
    ShortAnswer,
}

impl QuestionFormat {
    pub const fn as_str(self) -> &'static str {
        match self {
            QuestionFormat::MultipleChoice => "Multiple Choice",
            QuestionFormat::ShortAnswer => "Short Answer",
        }
    }

    pub fn from_label(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "multiple choice" => Some(QuestionFormat::MultipleChoice),
            "short answer" => Some(QuestionFormat::ShortAnswer),
            _ => None,
        }
    }
}

impl fmt::Display for QuestionFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The W/X/Y/Z choices of a multiple choice question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerChoices {
    choices: [String; 4],
}

impl AnswerChoices {
    pub const LETTERS: [char; 4] = ['W', 'X', 'Y', 'Z'];

    pub fn new(choices: [String; 4]) -> Self {
        Self { choices }
    }

    pub fn get(&self, letter: char) -> Option<&str> {
        Self::LETTERS
            .iter()
            .position(|l| *l == letter)
            .map(|idx| self.choices[idx].as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (char, &str)> {
        Self::LETTERS
            .iter()
            .copied()
            .zip(self.choices.iter().map(String::as_str))
    }
}

/// Selection state of a candidate question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Active,
    Removed,
}

impl Status {
    pub const fn as_str(self) -> &'static str {
        match self {
            Status::Active => "active",
            Status::Removed => "removed",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    id: QuestionId,
    category: Category,
    subcategory: Option<String>,
    kind: QuestionType,
    format: QuestionFormat,
    body: String,
    answer: String,
    accept: Option<String>,
    reject: Option<String>,
    choices: Option<AnswerChoices>,
    multi_item: bool,
    difficulty: f64,
    quality: f64,
    pairing_hint: Option<String>,
    round: Option<u32>,
}

impl Question {
    /// A short answer question with neutral ratings; refine with the `with_*` builders.
    pub fn new(id: QuestionId, category: Category, kind: QuestionType) -> Self {
        Self {
            id,
            category,
            subcategory: None,
            kind,
            format: QuestionFormat::ShortAnswer,
            body: String::new(),
            answer: String::new(),
            accept: None,
            reject: None,
            choices: None,
            multi_item: false,
            difficulty: 0.0,
            quality: 0.0,
            pairing_hint: None,
            round: None,
        }
    }

    pub fn with_text(mut self, body: impl Into<String>, answer: impl Into<String>) -> Self {
        self.body = body.into();
        self.answer = answer.into();
        self
    }

    pub fn with_answer_notes(mut self, accept: Option<String>, reject: Option<String>) -> Self {
        self.accept = accept;
        self.reject = reject;
        self
    }

    pub fn with_choices(mut self, choices: AnswerChoices) -> Self {
        self.format = QuestionFormat::MultipleChoice;
        self.choices = Some(choices);
        self
    }

    pub fn with_subcategory(mut self, subcategory: impl Into<String>) -> Self {
        self.subcategory = Some(subcategory.into());
        self
    }

    pub fn with_ratings(mut self, difficulty: f64, quality: f64) -> Self {
        self.difficulty = difficulty;
        self.quality = quality;
        self
    }

    pub fn with_multi_item(mut self, multi_item: bool) -> Self {
        self.multi_item = multi_item;
        self
    }

    pub fn with_pairing_hint(mut self, token: impl Into<String>) -> Self {
        self.pairing_hint = Some(token.into());
        self
    }

    pub fn with_round(mut self, round: u32) -> Self {
        self.round = Some(round);
        self
    }

    pub fn id(&self) -> QuestionId {
        self.id
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn subcategory(&self) -> Option<&str> {
        self.subcategory.as_deref()
    }

    pub fn kind(&self) -> QuestionType {
        self.kind
    }

    pub fn format(&self) -> QuestionFormat {
        self.format
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }

    pub fn accept(&self) -> Option<&str> {
        self.accept.as_deref()
    }

    pub fn reject(&self) -> Option<&str> {
        self.reject.as_deref()
    }

    pub fn choices(&self) -> Option<&AnswerChoices> {
        self.choices.as_ref()
    }

    pub fn is_multi_item(&self) -> bool {
        self.multi_item
    }

    pub fn difficulty(&self) -> f64 {
        self.difficulty
    }

    pub fn quality(&self) -> f64 {
        self.quality
    }

    pub fn pairing_hint(&self) -> Option<&str> {
        self.pairing_hint.as_deref()
    }

    pub fn round(&self) -> Option<u32> {
        self.round
    }

    /// Whether two questions may share a pair: same category, and for
    /// categories that pair by sub-category, the same sub-category.
    pub fn is_compatible_with(&self, other: &Question) -> bool {
        if self.category != other.category {
            return false;
        }
        !self.category.requires_subcategory() || self.subcategory == other.subcategory
    }
}
