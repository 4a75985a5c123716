//! The placement test state machine.
//!
//! A `PlacementTest` walks the learner up through the levels. Each level
//! attempt gets a freshly planned question list; the attempt fails as soon as
//! the mistake budget is used up and passes when its last question is
//! answered. A failure ends the whole test, a pass advances to the next
//! level that has content.

use itertools::Itertools;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::content::{ContentBanks, LevelBank};
use crate::level::{CefrLevel, Placement};
use crate::planner::{plan_level, QUESTIONS_PER_LEVEL};
use crate::question::{Question, QuestionType};
use crate::result::{aggregate, LevelPerformance, TestResult, VocabEstimates};
use crate::synth::{feasible_types, synthesize, UsedEntries};

/// Wrong answers tolerated before a level attempt fails
pub const MISTAKE_BUDGET: u32 = 3;

/// Substitutes tried, in order, when a planned type cannot be synthesized
pub const FALLBACK_ORDER: [QuestionType; 3] = [
    QuestionType::Usage,
    QuestionType::Meaning,
    QuestionType::Matching,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestConfig {
    pub questions_per_level: usize,
    pub mistake_budget: u32,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            questions_per_level: QUESTIONS_PER_LEVEL,
            mistake_budget: MISTAKE_BUDGET,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing started yet
    AwaitingQuestion,
    QuestionPresented,
    /// Answer recorded, more questions remain in this level
    Answered,
    /// Level passed, waiting for `request_next` to advance
    LevelComplete,
    /// Mistake budget hit; the test is over and its result is available
    LevelFailed,
    Finished,
    /// Exited mid-test; nothing is kept
    Aborted,
}

/// What follows the answer just submitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextState {
    NextQuestion,
    LevelComplete,
    LevelFailed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnswerOutcome {
    pub level: CefrLevel,
    pub question_type: QuestionType,
    pub is_correct: bool,
    /// Lets the UI highlight the right option after a miss
    pub correct_answer: String,
    pub performance: LevelPerformance,
    pub mistakes: u32,
    pub next: NextState,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LevelStart {
    Question(Question),
    /// The level's banks could not produce a single question
    NoContent,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Question(Question),
    LevelStarted { level: CefrLevel, question: Question },
    Finished(TestResult),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PlacementError {
    #[error("the placement test has not been started")]
    NotStarted,
    #[error("no question is waiting for an answer")]
    NoPendingQuestion,
    #[error("the current question has not been answered yet")]
    AnswerPending,
    #[error("the placement test is over")]
    TestOver,
}

/// One placement test run. Owns its sampling state; banks are shared read-only.
pub struct PlacementTest {
    banks: Arc<ContentBanks>,
    config: TestConfig,
    estimates: VocabEstimates,
    rng: StdRng,
    phase: Phase,
    level: CefrLevel,
    used: UsedEntries,
    pending: VecDeque<Question>,
    current: Option<Question>,
    level_questions: usize,
    asked: usize,
    mistakes: u32,
    performance: LevelPerformance,
    passed: Vec<CefrLevel>,
    finalized: BTreeMap<CefrLevel, LevelPerformance>,
    result: Option<TestResult>,
}

impl PlacementTest {
    pub fn new(banks: Arc<ContentBanks>, config: TestConfig, estimates: VocabEstimates) -> Self {
        Self {
            banks,
            config,
            estimates,
            rng: StdRng::from_entropy(),
            phase: Phase::AwaitingQuestion,
            level: CefrLevel::first(),
            used: UsedEntries::new(),
            pending: VecDeque::new(),
            current: None,
            level_questions: 0,
            asked: 0,
            mistakes: 0,
            performance: LevelPerformance::default(),
            passed: Vec::new(),
            finalized: BTreeMap::new(),
            result: None,
        }
    }

    /// Replace the random source, e.g. with a seeded one in tests
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// A new, unstarted test over the same banks and settings
    pub fn fresh(&self) -> Self {
        Self::new(Arc::clone(&self.banks), self.config, self.estimates.clone())
    }

    /// Start at the first level
    pub fn start(&mut self) -> Result<LevelStart, PlacementError> {
        self.start_level(CefrLevel::first())
    }

    /// Begin a fresh attempt at `level`, discarding any unfinished one
    pub fn start_level(&mut self, level: CefrLevel) -> Result<LevelStart, PlacementError> {
        match self.phase {
            Phase::LevelFailed | Phase::Finished | Phase::Aborted => {
                return Err(PlacementError::TestOver)
            }
            _ => {}
        }
        match self.enter_level(level) {
            Some(question) => Ok(LevelStart::Question(question)),
            None => Ok(LevelStart::NoContent),
        }
    }

    /// Record the learner's choice for the presented question
    pub fn submit_answer(&mut self, choice: &str) -> Result<AnswerOutcome, PlacementError> {
        match self.phase {
            Phase::QuestionPresented => {}
            Phase::AwaitingQuestion => return Err(PlacementError::NotStarted),
            Phase::LevelFailed | Phase::Finished | Phase::Aborted => {
                return Err(PlacementError::TestOver)
            }
            _ => return Err(PlacementError::NoPendingQuestion),
        }
        let question = self
            .current
            .take()
            .ok_or(PlacementError::NoPendingQuestion)?;

        let is_correct = question.is_correct(choice);
        self.performance.record(question.question_type, is_correct);
        self.asked += 1;
        if !is_correct {
            self.mistakes += 1;
        }
        debug!(
            level = %self.level,
            question_type = %question.question_type,
            is_correct,
            mistakes = self.mistakes,
            "answer recorded"
        );

        let next = if self.mistakes >= self.config.mistake_budget {
            self.fail_level();
            NextState::LevelFailed
        } else if self.pending.is_empty() {
            self.pass_level();
            NextState::LevelComplete
        } else {
            self.phase = Phase::Answered;
            NextState::NextQuestion
        };

        Ok(AnswerOutcome {
            level: self.level,
            question_type: question.question_type,
            is_correct,
            correct_answer: question.answer,
            performance: self.performance.clone(),
            mistakes: self.mistakes,
            next,
        })
    }

    /// Move on after an answer: next question, next level, or the final result
    pub fn request_next(&mut self) -> Result<Step, PlacementError> {
        match self.phase {
            Phase::AwaitingQuestion => Err(PlacementError::NotStarted),
            Phase::QuestionPresented => Err(PlacementError::AnswerPending),
            Phase::Aborted => Err(PlacementError::TestOver),
            Phase::Answered => {
                let question = self
                    .pending
                    .pop_front()
                    .ok_or(PlacementError::NoPendingQuestion)?;
                self.present(question.clone());
                Ok(Step::Question(question))
            }
            Phase::LevelComplete => {
                let next = self
                    .level
                    .next()
                    .filter(|level| self.banks.has_content(*level));
                if let Some(level) = next {
                    if let Some(question) = self.enter_level(level) {
                        return Ok(Step::LevelStarted { level, question });
                    }
                }
                // Past C2 or out of content: the last passed level stands
                let result = self.finish(None);
                Ok(Step::Finished(result))
            }
            Phase::LevelFailed | Phase::Finished => {
                self.phase = Phase::Finished;
                self.result
                    .clone()
                    .map(Step::Finished)
                    .ok_or(PlacementError::TestOver)
            }
        }
    }

    /// The finished test's result; `None` until the test has ended, and after an exit
    pub fn final_result(&self) -> Option<&TestResult> {
        match self.phase {
            Phase::LevelFailed | Phase::Finished => self.result.as_ref(),
            _ => None,
        }
    }

    /// Abandon the test. The in-progress level is discarded and no result is produced.
    pub fn exit(&mut self) {
        if matches!(self.phase, Phase::LevelFailed | Phase::Finished) {
            return;
        }
        info!(level = %self.level, answered = self.asked, "placement test abandoned");
        self.phase = Phase::Aborted;
        self.current = None;
        self.pending.clear();
        self.performance = LevelPerformance::default();
        self.finalized.clear();
        self.result = None;
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_over(&self) -> bool {
        matches!(
            self.phase,
            Phase::LevelFailed | Phase::Finished | Phase::Aborted
        )
    }

    pub fn current_level(&self) -> CefrLevel {
        self.level
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.current.as_ref()
    }

    /// 1-based position of the presented question within its level
    pub fn question_number(&self) -> usize {
        self.asked + usize::from(self.current.is_some())
    }

    /// Questions generated for the current level (may be below the quota)
    pub fn level_question_count(&self) -> usize {
        self.level_questions
    }

    pub fn mistakes(&self) -> u32 {
        self.mistakes
    }

    pub fn mistakes_left(&self) -> u32 {
        self.config.mistake_budget.saturating_sub(self.mistakes)
    }

    pub fn performance(&self) -> &LevelPerformance {
        &self.performance
    }

    pub fn passed_levels(&self) -> &[CefrLevel] {
        &self.passed
    }

    pub fn config(&self) -> TestConfig {
        self.config
    }

    fn enter_level(&mut self, level: CefrLevel) -> Option<Question> {
        self.level = level;
        self.used.reset();
        self.performance = LevelPerformance::default();
        self.mistakes = 0;
        self.asked = 0;
        self.current = None;

        let banks = Arc::clone(&self.banks);
        let questions = generate_level(
            level,
            banks.bank(level),
            self.config.questions_per_level,
            &mut self.used,
            &mut self.rng,
        );
        self.level_questions = questions.len();
        self.pending = questions.into();

        let Some(first) = self.pending.pop_front() else {
            warn!(%level, "no questions could be generated");
            self.phase = Phase::AwaitingQuestion;
            return None;
        };
        info!(%level, questions = self.level_questions, "level started");
        self.present(first.clone());
        Some(first)
    }

    fn present(&mut self, question: Question) {
        self.current = Some(question);
        self.phase = Phase::QuestionPresented;
    }

    fn pass_level(&mut self) {
        info!(
            level = %self.level,
            correct = self.performance.correct,
            total = self.performance.total,
            "level passed"
        );
        self.passed.push(self.level);
        self.finalized
            .insert(self.level, self.performance.clone());
        self.phase = Phase::LevelComplete;
    }

    fn fail_level(&mut self) {
        info!(
            level = %self.level,
            answered = self.asked,
            mistakes = self.mistakes,
            "mistake budget reached"
        );
        self.pending.clear();
        self.finalized
            .insert(self.level, self.performance.clone());
        self.finish(Some(self.level));
        self.phase = Phase::LevelFailed;
    }

    fn finish(&mut self, failed_level: Option<CefrLevel>) -> TestResult {
        let final_level = self
            .passed
            .iter()
            .max()
            .map(|level| Placement::Level(*level))
            .unwrap_or(Placement::Beginner);
        let result = aggregate(
            self.finalized.clone(),
            final_level,
            failed_level,
            &self.estimates,
        );
        info!(
            final_level = %result.final_level,
            failed_level = ?result.failed_level,
            "placement test finished"
        );
        self.result = Some(result.clone());
        self.phase = Phase::Finished;
        result
    }
}

/// Synthesize up to `quota` questions for one level attempt.
///
/// Planned types that cannot be built are replaced by the first feasible
/// fallback that can; slots with no workable substitute are dropped. Short
/// lists are then topped up with meaning questions while words last.
pub fn generate_level(
    level: CefrLevel,
    bank: &LevelBank,
    quota: usize,
    used: &mut UsedEntries,
    rng: &mut dyn RngCore,
) -> Vec<Question> {
    let feasible = feasible_types(bank);
    let fallbacks: Vec<QuestionType> = FALLBACK_ORDER
        .into_iter()
        .filter(|t| feasible.contains(t))
        .collect();

    let plan = plan_level(level, quota, rng);
    let mut questions = Vec::with_capacity(quota);
    for desired in plan {
        let mut candidates = std::iter::once(desired)
            .chain(fallbacks.iter().copied().filter(|t| *t != desired));
        let built = candidates.find_map(|t| synthesize(t, bank, used, rng).ok());
        match built {
            Some(question) => {
                if question.question_type != desired {
                    debug!(%level, %desired, substitute = %question.question_type, "fallback used");
                }
                questions.push(question);
            }
            None => warn!(%level, %desired, "slot skipped, content exhausted"),
        }
    }

    while questions.len() < quota {
        match synthesize(QuestionType::Meaning, bank, used, rng) {
            Ok(question) => questions.push(question),
            Err(_) => break,
        }
    }
    questions.truncate(quota);
    debug!(
        %level,
        mix = ?questions.iter().map(|q| q.question_type).counts(),
        "questions generated"
    );
    questions
}
