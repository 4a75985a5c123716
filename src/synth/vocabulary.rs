use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use std::collections::HashSet;

use super::{
    normalize, pick_distinct, QuestionStrategy, SynthesisError, UsedEntries, DISTRACTORS,
    MIN_UNUSED_WORDS,
};
use crate::content::entries::pair_label;
use crate::content::{LevelBank, VocabularyEntry};
use crate::question::{EntryRef, Question, QuestionType};

/// Upper bound on random draws when looking for mismatched pairs
const MATCHING_DRAWS: usize = 64;

/// Unused word indices in random order, or `None` when too few remain for a vocabulary question
fn shuffled_candidates(
    bank: &LevelBank,
    used: &UsedEntries,
    rng: &mut dyn RngCore,
) -> Option<Vec<usize>> {
    let mut unused = used.unused_words(bank);
    if unused.len() < MIN_UNUSED_WORDS {
        return None;
    }
    unused.shuffle(rng);
    Some(unused)
}

/// Every bank word except `skip`, in random order
fn others_shuffled<'a>(
    bank: &'a LevelBank,
    skip: usize,
    rng: &mut dyn RngCore,
) -> Vec<&'a VocabularyEntry> {
    let mut others: Vec<&VocabularyEntry> = bank
        .words
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != skip)
        .map(|(_, w)| w)
        .collect();
    others.shuffle(rng);
    others
}

/// Shuffle the answer in among the distractors and mark the source entry used
fn finish(mut question: Question, used: &mut UsedEntries, rng: &mut dyn RngCore) -> Question {
    question.options.push(question.answer.clone());
    question.options.shuffle(rng);
    used.mark(question.source);
    question
}

/// Word shown, native gloss expected
pub struct MeaningStrategy;

impl QuestionStrategy for MeaningStrategy {
    fn question_type(&self) -> QuestionType {
        QuestionType::Meaning
    }

    fn is_feasible(&self, bank: &LevelBank) -> bool {
        bank.word_count() >= MIN_UNUSED_WORDS
    }

    fn synthesize(
        &self,
        bank: &LevelBank,
        used: &mut UsedEntries,
        rng: &mut dyn RngCore,
    ) -> Result<Question, SynthesisError> {
        let exhausted = SynthesisError::ContentExhausted(QuestionType::Meaning);
        let unused = shuffled_candidates(bank, used, rng).ok_or(exhausted)?;

        for idx in unused {
            let Some(target) = bank.word(idx) else {
                continue;
            };
            let distractors = pick_distinct(
                others_shuffled(bank, idx, rng)
                    .into_iter()
                    .map(|w| w.gloss.clone()),
                &[target.gloss.as_str()],
                DISTRACTORS,
            );
            if distractors.len() < DISTRACTORS {
                continue;
            }
            return Ok(finish(
                Question {
                    question_type: QuestionType::Meaning,
                    instruction: format!("What does \"{}\" mean?", target.word),
                    context: None,
                    options: distractors,
                    answer: target.gloss.clone(),
                    source: EntryRef::Word(idx),
                },
                used,
                rng,
            ));
        }
        Err(exhausted)
    }
}

/// Example sentence with a blank, word form expected
pub struct UsageStrategy;

impl QuestionStrategy for UsageStrategy {
    fn question_type(&self) -> QuestionType {
        QuestionType::Usage
    }

    fn is_feasible(&self, bank: &LevelBank) -> bool {
        bank.word_count() >= MIN_UNUSED_WORDS
    }

    fn synthesize(
        &self,
        bank: &LevelBank,
        used: &mut UsedEntries,
        rng: &mut dyn RngCore,
    ) -> Result<Question, SynthesisError> {
        let exhausted = SynthesisError::ContentExhausted(QuestionType::Usage);
        let unused = shuffled_candidates(bank, used, rng).ok_or(exhausted)?;

        // Entries whose part of speech lacks enough alternatives are skipped
        for idx in unused {
            let Some(target) = bank.word(idx) else {
                continue;
            };
            let same_pos = others_shuffled(bank, idx, rng)
                .into_iter()
                .filter(|w| w.pos.eq_ignore_ascii_case(&target.pos))
                .map(|w| w.word.clone());
            let distractors = pick_distinct(same_pos, &[target.word.as_str()], DISTRACTORS);
            if distractors.len() < DISTRACTORS {
                continue;
            }
            return Ok(finish(
                Question {
                    question_type: QuestionType::Usage,
                    instruction: "Complete the sentence:".to_string(),
                    context: Some(target.example.clone()),
                    options: distractors,
                    answer: target.word.clone(),
                    source: EntryRef::Word(idx),
                },
                used,
                rng,
            ));
        }
        Err(exhausted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Synonym,
    Antonym,
}

impl Relation {
    fn words(self, entry: &VocabularyEntry) -> &[String] {
        match self {
            Relation::Synonym => &entry.synonyms,
            Relation::Antonym => &entry.antonyms,
        }
    }

    fn question_type(self) -> QuestionType {
        match self {
            Relation::Synonym => QuestionType::Synonym,
            Relation::Antonym => QuestionType::Antonym,
        }
    }
}

/// Synonym or antonym of a word, drawn only from entries that list one
pub struct RelationStrategy {
    relation: Relation,
}

impl RelationStrategy {
    pub const fn new(relation: Relation) -> Self {
        Self { relation }
    }
}

impl QuestionStrategy for RelationStrategy {
    fn question_type(&self) -> QuestionType {
        self.relation.question_type()
    }

    fn is_feasible(&self, bank: &LevelBank) -> bool {
        bank.word_count() >= MIN_UNUSED_WORDS
            && bank
                .words
                .iter()
                .any(|w| !self.relation.words(w).is_empty())
    }

    fn synthesize(
        &self,
        bank: &LevelBank,
        used: &mut UsedEntries,
        rng: &mut dyn RngCore,
    ) -> Result<Question, SynthesisError> {
        let question_type = self.question_type();
        let exhausted = SynthesisError::ContentExhausted(question_type);
        let unused = shuffled_candidates(bank, used, rng).ok_or(exhausted)?;

        let qualifying = unused
            .into_iter()
            .filter(|i| bank.word(*i).is_some_and(|w| !self.relation.words(w).is_empty()));

        for idx in qualifying {
            let Some(target) = bank.word(idx) else {
                continue;
            };
            let related = self.relation.words(target);
            let answer = related[0].clone();

            let mut exclude: Vec<&str> = related.iter().map(String::as_str).collect();
            exclude.push(&target.word);
            let distractors = pick_distinct(
                others_shuffled(bank, idx, rng)
                    .into_iter()
                    .map(|w| w.word.clone()),
                &exclude,
                DISTRACTORS,
            );
            if distractors.len() < DISTRACTORS {
                continue;
            }

            let label = match self.relation {
                Relation::Synonym => "synonym",
                Relation::Antonym => "antonym",
            };
            return Ok(finish(
                Question {
                    question_type,
                    instruction: format!("Choose the {label} of \"{}\":", target.word),
                    context: None,
                    options: distractors,
                    answer,
                    source: EntryRef::Word(idx),
                },
                used,
                rng,
            ));
        }
        Err(exhausted)
    }
}

/// Pick the one true "word - gloss" pair among mismatched ones
pub struct MatchingStrategy;

impl QuestionStrategy for MatchingStrategy {
    fn question_type(&self) -> QuestionType {
        QuestionType::Matching
    }

    fn is_feasible(&self, bank: &LevelBank) -> bool {
        bank.word_count() >= MIN_UNUSED_WORDS
    }

    fn synthesize(
        &self,
        bank: &LevelBank,
        used: &mut UsedEntries,
        rng: &mut dyn RngCore,
    ) -> Result<Question, SynthesisError> {
        let exhausted = SynthesisError::ContentExhausted(QuestionType::Matching);
        let unused = shuffled_candidates(bank, used, rng).ok_or(exhausted)?;

        let true_pairs: HashSet<(String, String)> = bank
            .words
            .iter()
            .map(|w| (normalize(&w.word), normalize(&w.gloss)))
            .collect();

        for idx in unused {
            let Some(target) = bank.word(idx) else {
                continue;
            };
            let answer = target.pair_label();
            let distractors = pick_distinct(
                mismatched_pairs(bank, &true_pairs, rng),
                &[answer.as_str()],
                DISTRACTORS,
            );
            if distractors.len() < DISTRACTORS {
                continue;
            }
            return Ok(finish(
                Question {
                    question_type: QuestionType::Matching,
                    instruction: "Which pair is correct?".to_string(),
                    context: None,
                    options: distractors,
                    answer,
                    source: EntryRef::Word(idx),
                },
                used,
                rng,
            ));
        }
        Err(exhausted)
    }
}

/// Random word/gloss combinations that no bank entry actually pairs
fn mismatched_pairs(
    bank: &LevelBank,
    true_pairs: &HashSet<(String, String)>,
    rng: &mut dyn RngCore,
) -> Vec<String> {
    let n = bank.word_count();
    let mut pairs = Vec::new();
    for _ in 0..MATCHING_DRAWS {
        let word = &bank.words[rng.gen_range(0..n)].word;
        let gloss = &bank.words[rng.gen_range(0..n)].gloss;
        if !true_pairs.contains(&(normalize(word), normalize(gloss))) {
            pairs.push(pair_label(word, gloss));
        }
    }
    pairs
}
