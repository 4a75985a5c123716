use serde::{Deserialize, Serialize};

/// Kinds of multiple-choice question the placement test can ask
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum QuestionType {
    Meaning,
    Usage,
    Synonym,
    Antonym,
    Matching,
    SentenceFormation,
    ReadingComprehension,
}

impl QuestionType {
    pub const ALL: [QuestionType; 7] = [
        QuestionType::Meaning,
        QuestionType::Usage,
        QuestionType::Synonym,
        QuestionType::Antonym,
        QuestionType::Matching,
        QuestionType::SentenceFormation,
        QuestionType::ReadingComprehension,
    ];

    /// Reading and sentence questions test structure rather than single words
    pub fn is_structural(self) -> bool {
        matches!(
            self,
            QuestionType::SentenceFormation | QuestionType::ReadingComprehension
        )
    }

    pub fn is_vocabulary(self) -> bool {
        !self.is_structural()
    }

    /// Human-readable skill name shown on result screens
    pub fn skill_name(self) -> &'static str {
        match self {
            QuestionType::Meaning => "Word meanings",
            QuestionType::Usage => "Words in context",
            QuestionType::Synonym => "Synonyms",
            QuestionType::Antonym => "Antonyms",
            QuestionType::Matching => "Word matching",
            QuestionType::SentenceFormation => "Sentence building",
            QuestionType::ReadingComprehension => "Reading comprehension",
        }
    }
}

/// The bank entry a question was built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryRef {
    Word(usize),
    Sentence(usize),
    Reading(usize),
}

/// A fully formed multiple-choice question
#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    pub question_type: QuestionType,
    /// What the learner is asked to do
    pub instruction: String,
    /// Optional body: a sentence with a blank, jumbled tokens, or a passage
    pub context: Option<String>,
    pub options: Vec<String>,
    pub answer: String,
    pub source: EntryRef,
}

impl Question {
    pub fn is_correct(&self, choice: &str) -> bool {
        choice.trim().to_lowercase() == self.answer.trim().to_lowercase()
    }

    /// Index of the correct option, if present
    pub fn answer_index(&self) -> Option<usize> {
        self.options.iter().position(|o| self.is_correct(o))
    }

    /// The answer appears exactly once and no two options collide
    pub fn has_valid_options(&self) -> bool {
        let answer_hits = self.options.iter().filter(|o| self.is_correct(o)).count();
        answer_hits == 1 && all_distinct(&self.options)
    }
}

/// Case-insensitive distinctness, matching how answers are compared
pub(crate) fn all_distinct(options: &[String]) -> bool {
    let mut seen = std::collections::HashSet::new();
    options.iter().all(|o| seen.insert(o.trim().to_lowercase()))
}
