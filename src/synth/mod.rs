//! Question synthesis: one strategy per question type, sampling bank entries
//! without replacement for the duration of a level attempt.

pub mod structural;
pub mod vocabulary;

use rand::RngCore;
use std::collections::HashSet;
use thiserror::Error;

use crate::content::LevelBank;
use crate::question::{EntryRef, Question, QuestionType};

pub use structural::{ReadingStrategy, SentenceStrategy};
pub use vocabulary::{MatchingStrategy, MeaningStrategy, Relation, RelationStrategy, UsageStrategy};

/// Every vocabulary question shows this many wrong options
pub const DISTRACTORS: usize = 3;

/// Vocabulary questions need this many unused words before one can be built
pub const MIN_UNUSED_WORDS: usize = DISTRACTORS + 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SynthesisError {
    #[error("no unused content left for {0} questions")]
    ContentExhausted(QuestionType),
}

/// Bank entries already consumed in the current level attempt
#[derive(Debug, Clone, Default)]
pub struct UsedEntries {
    words: HashSet<usize>,
    sentences: HashSet<usize>,
    readings: HashSet<usize>,
}

impl UsedEntries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.words.clear();
        self.sentences.clear();
        self.readings.clear();
    }

    pub fn mark(&mut self, entry: EntryRef) {
        match entry {
            EntryRef::Word(i) => self.words.insert(i),
            EntryRef::Sentence(i) => self.sentences.insert(i),
            EntryRef::Reading(i) => self.readings.insert(i),
        };
    }

    pub fn is_used(&self, entry: EntryRef) -> bool {
        match entry {
            EntryRef::Word(i) => self.words.contains(&i),
            EntryRef::Sentence(i) => self.sentences.contains(&i),
            EntryRef::Reading(i) => self.readings.contains(&i),
        }
    }

    pub fn len(&self) -> usize {
        self.words.len() + self.sentences.len() + self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn unused_words(&self, bank: &LevelBank) -> Vec<usize> {
        (0..bank.word_count())
            .filter(|i| !self.words.contains(i))
            .collect()
    }

    pub fn unused_sentences(&self, bank: &LevelBank) -> Vec<usize> {
        (0..bank.sentence_count())
            .filter(|i| !self.sentences.contains(i))
            .collect()
    }

    pub fn unused_readings(&self, bank: &LevelBank) -> Vec<usize> {
        (0..bank.reading_count())
            .filter(|i| !self.readings.contains(i))
            .collect()
    }
}

/// Strategy for building one kind of question
pub trait QuestionStrategy: Sync {
    fn question_type(&self) -> QuestionType;

    /// Whether the bank could ever supply this type, ignoring what is already used
    fn is_feasible(&self, bank: &LevelBank) -> bool;

    /// Build one question, marking the entry it consumed as used on success
    fn synthesize(
        &self,
        bank: &LevelBank,
        used: &mut UsedEntries,
        rng: &mut dyn RngCore,
    ) -> Result<Question, SynthesisError>;
}

static MEANING: MeaningStrategy = MeaningStrategy;
static USAGE: UsageStrategy = UsageStrategy;
static SYNONYM: RelationStrategy = RelationStrategy::new(Relation::Synonym);
static ANTONYM: RelationStrategy = RelationStrategy::new(Relation::Antonym);
static MATCHING: MatchingStrategy = MatchingStrategy;
static SENTENCE: SentenceStrategy = SentenceStrategy;
static READING: ReadingStrategy = ReadingStrategy;

/// Dispatch a question type to its strategy
pub fn strategy_for(question_type: QuestionType) -> &'static dyn QuestionStrategy {
    match question_type {
        QuestionType::Meaning => &MEANING,
        QuestionType::Usage => &USAGE,
        QuestionType::Synonym => &SYNONYM,
        QuestionType::Antonym => &ANTONYM,
        QuestionType::Matching => &MATCHING,
        QuestionType::SentenceFormation => &SENTENCE,
        QuestionType::ReadingComprehension => &READING,
    }
}

/// Convenience wrapper over `strategy_for(..).synthesize(..)`
pub fn synthesize(
    question_type: QuestionType,
    bank: &LevelBank,
    used: &mut UsedEntries,
    rng: &mut dyn RngCore,
) -> Result<Question, SynthesisError> {
    strategy_for(question_type).synthesize(bank, used, rng)
}

/// Question types the bank can supply at all
pub fn feasible_types(bank: &LevelBank) -> Vec<QuestionType> {
    QuestionType::ALL
        .into_iter()
        .filter(|t| strategy_for(*t).is_feasible(bank))
        .collect()
}

/// Take up to `count` candidates whose lowercase form differs from `exclude` and from each other
pub(crate) fn pick_distinct<I>(candidates: I, exclude: &[&str], count: usize) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen: HashSet<String> = exclude.iter().map(|s| normalize(s)).collect();
    candidates
        .into_iter()
        .filter(|c| seen.insert(normalize(c)))
        .take(count)
        .collect()
}

pub(crate) fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}


#[cfg(test)]
mod tests {
    use super::testutil::*;
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn strategy_dispatch_matches_type() {
        for t in QuestionType::ALL {
            assert_eq!(strategy_for(t).question_type(), t);
        }
    }

    #[test]
    fn used_entries_track_each_bank_separately() {
        let mut used = UsedEntries::new();
        used.mark(EntryRef::Word(2));
        used.mark(EntryRef::Reading(2));
        assert!(used.is_used(EntryRef::Word(2)));
        assert!(!used.is_used(EntryRef::Sentence(2)));
        assert_eq!(used.len(), 2);

        let bank = sample_bank();
        assert_eq!(used.unused_words(&bank).len(), bank.word_count() - 1);
        assert_eq!(used.unused_readings(&bank), vec![0, 1]);

        used.reset();
        assert!(used.is_empty());
    }

    #[test]
    fn every_type_is_feasible_for_sample_bank() {
        assert_eq!(feasible_types(&sample_bank()), QuestionType::ALL.to_vec());
    }

    #[test]
    fn small_word_bank_rules_out_vocabulary_types() {
        let mut bank = sample_bank();
        bank.words.truncate(3);
        let feasible = feasible_types(&bank);
        assert_eq!(
            feasible,
            vec![
                QuestionType::SentenceFormation,
                QuestionType::ReadingComprehension
            ]
        );
    }

    #[test]
    fn no_entry_is_reused_within_an_attempt() {
        let bank = sample_bank();
        let mut used = UsedEntries::new();
        let mut rng = StdRng::seed_from_u64(7);
        let mut sources = HashSet::new();

        for t in QuestionType::ALL.iter().cycle().take(40) {
            if let Ok(q) = synthesize(*t, &bank, &mut used, &mut rng) {
                assert!(q.has_valid_options(), "{t} produced bad options: {q:?}");
                assert!(sources.insert(q.source), "entry {:?} reused", q.source);
            }
        }
        assert!(!sources.is_empty());
    }

    #[test]
    fn pick_distinct_skips_excluded_and_duplicates() {
        let picked = pick_distinct(
            ["Cat", "dog", "cat", "DOG", "bird", "fish"]
                .iter()
                .map(|s| s.to_string()),
            &["cat"],
            2,
        );
        assert_eq!(picked, vec!["dog".to_string(), "bird".to_string()]);
    }
}
