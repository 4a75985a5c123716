use rand::seq::SliceRandom;
use rand::RngCore;

use super::{QuestionStrategy, SynthesisError, UsedEntries};
use crate::content::{LevelBank, SentenceEntry};
use crate::question::{EntryRef, Question, QuestionType};

/// Shown between jumbled tokens
pub const TOKEN_SEPARATOR: &str = " / ";

const MAX_JUMBLE_ATTEMPTS: usize = 10;

/// Letters and digits only, lowercased, single-spaced
fn flatten(text: &str) -> String {
    text.split_whitespace()
        .map(|w| {
            w.chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(char::to_lowercase)
                .collect::<String>()
        })
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Tokens in an order that does not already read as the correct sentence
fn jumble(entry: &SentenceEntry, rng: &mut dyn RngCore) -> Vec<String> {
    let mut tokens = entry.tokens.clone();
    if tokens.len() < 2 {
        return tokens;
    }
    let correct = flatten(&entry.correct);
    for _ in 0..MAX_JUMBLE_ATTEMPTS {
        tokens.shuffle(rng);
        if flatten(&tokens.join(" ")) != correct {
            return tokens;
        }
    }
    // Every shuffle reproduced the sentence; rotating guarantees a different order
    tokens.rotate_left(1);
    tokens
}

pub struct SentenceStrategy;

impl QuestionStrategy for SentenceStrategy {
    fn question_type(&self) -> QuestionType {
        QuestionType::SentenceFormation
    }

    fn is_feasible(&self, bank: &LevelBank) -> bool {
        bank.sentence_count() > 0
    }

    fn synthesize(
        &self,
        bank: &LevelBank,
        used: &mut UsedEntries,
        rng: &mut dyn RngCore,
    ) -> Result<Question, SynthesisError> {
        let unused = used.unused_sentences(bank);
        let exhausted = SynthesisError::ContentExhausted(QuestionType::SentenceFormation);
        let idx = *unused.choose(rng).ok_or(exhausted)?;
        let entry = bank.sentence(idx).ok_or(exhausted)?;

        let mut options = Vec::with_capacity(entry.distractors.len() + 1);
        options.push(entry.correct.clone());
        options.extend(entry.distractors.iter().cloned());
        options.shuffle(rng);

        let source = EntryRef::Sentence(idx);
        used.mark(source);
        Ok(Question {
            question_type: QuestionType::SentenceFormation,
            instruction: "Put the words in order:".to_string(),
            context: Some(jumble(entry, rng).join(TOKEN_SEPARATOR)),
            options,
            answer: entry.correct.clone(),
            source,
        })
    }
}

pub struct ReadingStrategy;

impl QuestionStrategy for ReadingStrategy {
    fn question_type(&self) -> QuestionType {
        QuestionType::ReadingComprehension
    }

    fn is_feasible(&self, bank: &LevelBank) -> bool {
        bank.reading_count() > 0
    }

    fn synthesize(
        &self,
        bank: &LevelBank,
        used: &mut UsedEntries,
        rng: &mut dyn RngCore,
    ) -> Result<Question, SynthesisError> {
        let unused = used.unused_readings(bank);
        let exhausted = SynthesisError::ContentExhausted(QuestionType::ReadingComprehension);
        let idx = *unused.choose(rng).ok_or(exhausted)?;
        let entry = bank.reading(idx).ok_or(exhausted)?;

        let mut options = entry.options.clone();
        options.shuffle(rng);

        let source = EntryRef::Reading(idx);
        used.mark(source);
        Ok(Question {
            question_type: QuestionType::ReadingComprehension,
            instruction: entry.question.clone(),
            context: Some(entry.passage.clone()),
            options,
            answer: entry.answer.clone(),
            source,
        })
    }
}
