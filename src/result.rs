use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

use crate::level::{CefrLevel, Placement};
use crate::question::QuestionType;

/// Correct/total counter for one slice of answers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeTally {
    pub correct: u32,
    pub total: u32,
}

impl TypeTally {
    pub fn record(&mut self, is_correct: bool) {
        self.total += 1;
        if is_correct {
            self.correct += 1;
        }
    }

    pub fn incorrect(&self) -> u32 {
        self.total - self.correct
    }

    /// Success rate in percent, 0 when nothing was answered
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 * 100.0 / self.total as f64
        }
    }

    pub fn merge(&mut self, other: &TypeTally) {
        self.correct += other.correct;
        self.total += other.total;
    }

    /// Exact ratio comparison; an empty tally scores 0
    pub fn beats(&self, other: &TypeTally) -> bool {
        let (c1, t1) = (u64::from(self.correct), u64::from(self.total.max(1)));
        let (c2, t2) = (u64::from(other.correct), u64::from(other.total.max(1)));
        c1 * t2 > c2 * t1
    }
}

impl fmt::Display for TypeTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.correct, self.total)
    }
}

/// Answers given during one level attempt
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelPerformance {
    pub correct: u32,
    pub total: u32,
    #[serde(default)]
    pub by_type: BTreeMap<QuestionType, TypeTally>,
}

impl LevelPerformance {
    pub fn record(&mut self, question_type: QuestionType, is_correct: bool) {
        self.total += 1;
        if is_correct {
            self.correct += 1;
        }
        self.by_type
            .entry(question_type)
            .or_default()
            .record(is_correct);
    }

    pub fn tally(&self) -> TypeTally {
        TypeTally {
            correct: self.correct,
            total: self.total,
        }
    }

    pub fn incorrect(&self) -> u32 {
        self.total - self.correct
    }

    pub fn percent(&self) -> f64 {
        self.tally().percent()
    }
}

/// Vocabulary-size label shown for each placement
#[derive(Debug, Clone, PartialEq)]
pub struct VocabEstimates {
    beginner: String,
    levels: BTreeMap<CefrLevel, String>,
}

impl VocabEstimates {
    pub fn new(beginner: impl Into<String>, levels: BTreeMap<CefrLevel, String>) -> Self {
        Self {
            beginner: beginner.into(),
            levels,
        }
    }

    pub fn label(&self, placement: Placement) -> &str {
        match placement {
            Placement::Beginner => &self.beginner,
            Placement::Level(level) => self
                .levels
                .get(&level)
                .map(String::as_str)
                .unwrap_or("unknown"),
        }
    }
}

impl Default for VocabEstimates {
    fn default() -> Self {
        let levels = [
            (CefrLevel::A1, "≈ 500 words"),
            (CefrLevel::A2, "≈ 1,000 words"),
            (CefrLevel::B1, "≈ 2,000 words"),
            (CefrLevel::B2, "≈ 4,000 words"),
            (CefrLevel::C1, "≈ 8,000 words"),
            (CefrLevel::C2, "≈ 16,000+ words"),
        ]
        .into_iter()
        .map(|(level, label)| (level, label.to_string()))
        .collect();
        Self::new("≈ 0-100 words", levels)
    }
}

/// Outcome of one finished placement test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub final_level: Placement,
    pub failed_level: Option<CefrLevel>,
    pub estimated_vocab: String,
    /// Finalized levels only: every passed level plus the failed one, if any
    pub levels: BTreeMap<CefrLevel, LevelPerformance>,
    pub completed_at: DateTime<Local>,
}

impl TestResult {
    /// Correct/total at `level`; zero when the level was never recorded
    pub fn score_at(&self, level: CefrLevel) -> TypeTally {
        self.levels
            .get(&level)
            .map(LevelPerformance::tally)
            .unwrap_or_default()
    }

    pub fn totals(&self) -> TypeTally {
        let mut sum = TypeTally::default();
        for perf in self.levels.values() {
            sum.merge(&perf.tally());
        }
        sum
    }

    /// Per-type tallies summed over every recorded level
    pub fn by_type(&self) -> BTreeMap<QuestionType, TypeTally> {
        let mut merged: BTreeMap<QuestionType, TypeTally> = BTreeMap::new();
        for perf in self.levels.values() {
            for (question_type, tally) in &perf.by_type {
                merged.entry(*question_type).or_default().merge(tally);
            }
        }
        merged
    }
}

/// Build the final result from the finalized per-level records
pub fn aggregate(
    levels: BTreeMap<CefrLevel, LevelPerformance>,
    final_level: Placement,
    failed_level: Option<CefrLevel>,
    estimates: &VocabEstimates,
) -> TestResult {
    TestResult {
        final_level,
        failed_level,
        estimated_vocab: estimates.label(final_level).to_string(),
        levels,
        completed_at: Local::now(),
    }
}

/// Whether `new` should overwrite the stored best result.
///
/// Only strict improvements win: a higher final level, or the same level
/// with a strictly better score at that level. A stored Beginner result is
/// always replaced.
pub fn should_replace(stored: Option<&TestResult>, new: &TestResult) -> bool {
    let Some(stored) = stored else {
        return true;
    };
    let replace = match (stored.final_level, new.final_level) {
        (Placement::Beginner, _) => true,
        (_, Placement::Beginner) => false,
        (Placement::Level(old), Placement::Level(level)) if level != old => level > old,
        (Placement::Level(level), Placement::Level(_)) => {
            new.score_at(level).beats(&stored.score_at(level))
        }
    };
    debug!(
        stored = %stored.final_level,
        new = %new.final_level,
        replace,
        "retention decision"
    );
    replace
}
