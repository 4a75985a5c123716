//! A placement test run as the terminal sees it: option selection, answer
//! feedback, and the bookkeeping done when the test ends.

use tracing::warn;

use crate::analysis::{analyze, PerformanceAnalysis};
use crate::level::CefrLevel;
use crate::placement::{AnswerOutcome, LevelStart, PlacementTest, Step};
use crate::profile::{merge_result, LearnerProfile, ProfileStore};
use crate::question::Question;
use crate::result::TestResult;
use crate::stats::{AnswerRecord, StatsDb};

#[derive(Debug, Clone, PartialEq)]
pub enum View {
    Question,
    /// Showing whether the last answer was right
    Feedback(AnswerOutcome),
    /// The first level has nothing to ask
    NoContent,
    Finished,
    Exited,
}

pub struct Session {
    test: PlacementTest,
    profiles: Box<dyn ProfileStore>,
    stats_db: Option<StatsDb>,
    profile: LearnerProfile,
    /// Whether the store held a profile when the test began
    profile_saved: bool,
    view: View,
    question: Option<Question>,
    selected: usize,
    /// Set when a new level has just begun
    entered_level: Option<CefrLevel>,
    result: Option<TestResult>,
    analysis: Option<PerformanceAnalysis>,
    new_best: bool,
}

impl Session {
    pub fn new(
        test: PlacementTest,
        learner: &str,
        profiles: Box<dyn ProfileStore>,
        stats_db: Option<StatsDb>,
    ) -> Self {
        Self {
            test,
            profiles,
            stats_db,
            profile: LearnerProfile::new(learner),
            profile_saved: false,
            view: View::NoContent,
            question: None,
            selected: 0,
            entered_level: None,
            result: None,
            analysis: None,
            new_best: false,
        }
    }

    /// Load the stored profile and present the first question
    pub fn begin(&mut self) {
        let name = self.profile.name.clone();
        self.profile_saved = false;
        match self.profiles.load() {
            Ok(Some(stored)) => {
                self.profile = stored;
                self.profile_saved = true;
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "starting with a fresh profile"),
        }
        if self.profile.name.is_empty() {
            self.profile.name = name;
        }

        self.result = None;
        self.analysis = None;
        self.new_best = false;
        self.entered_level = None;
        match self.test.start() {
            Ok(LevelStart::Question(question)) => {
                self.entered_level = Some(self.test.current_level());
                self.show(question);
            }
            Ok(LevelStart::NoContent) | Err(_) => {
                self.question = None;
                self.view = View::NoContent;
            }
        }
    }

    /// Name the learner. A first-time learner's profile is created right away.
    pub fn set_learner(&mut self, name: &str) {
        self.profile.name = name.trim().to_string();
        if self.profile_saved || self.profile.name.is_empty() {
            return;
        }
        match self.profiles.save(&self.profile) {
            Ok(()) => self.profile_saved = true,
            Err(e) => warn!(error = %e, "could not create learner profile"),
        }
    }

    /// Throw the finished test away and start over
    pub fn retake(&mut self) {
        self.test = self.test.fresh();
        self.begin();
    }

    pub fn select_next(&mut self) {
        if let Some(question) = self.pending_question() {
            self.selected = (self.selected + 1) % question.options.len().max(1);
        }
    }

    pub fn select_previous(&mut self) {
        if let Some(question) = self.pending_question() {
            let count = question.options.len().max(1);
            self.selected = (self.selected + count - 1) % count;
        }
    }

    /// Highlight option `index` if it exists; returns whether it did
    pub fn select(&mut self, index: usize) -> bool {
        match self.pending_question() {
            Some(question) if index < question.options.len() => {
                self.selected = index;
                true
            }
            _ => false,
        }
    }

    /// Enter: answer the highlighted option, or move past the feedback
    pub fn confirm(&mut self) {
        match self.view {
            View::Question => self.submit_selected(),
            View::Feedback(_) => self.advance(),
            _ => {}
        }
    }

    pub fn submit_selected(&mut self) {
        let Some(choice) = self
            .pending_question()
            .and_then(|q| q.options.get(self.selected))
            .cloned()
        else {
            return;
        };
        match self.test.submit_answer(&choice) {
            Ok(outcome) => {
                if let Some(db) = &self.stats_db {
                    if let Err(e) = db.record_answer(&AnswerRecord::from(&outcome)) {
                        warn!(error = %e, "failed to record answer");
                    }
                }
                self.view = View::Feedback(outcome);
            }
            Err(e) => warn!(error = %e, "answer rejected"),
        }
    }

    pub fn advance(&mut self) {
        self.entered_level = None;
        match self.test.request_next() {
            Ok(Step::Question(question)) => self.show(question),
            Ok(Step::LevelStarted { level, question }) => {
                self.entered_level = Some(level);
                self.show(question);
            }
            Ok(Step::Finished(result)) => self.finish(result),
            Err(e) => warn!(error = %e, "cannot advance"),
        }
    }

    /// Leave mid-test; nothing from this run is kept
    pub fn exit(&mut self) {
        if matches!(self.view, View::Question | View::Feedback(_)) {
            self.test.exit();
            self.view = View::Exited;
        }
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    /// The question on screen, also while its feedback is shown
    pub fn question(&self) -> Option<&Question> {
        self.question.as_ref()
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn entered_level(&self) -> Option<CefrLevel> {
        self.entered_level
    }

    pub fn test(&self) -> &PlacementTest {
        &self.test
    }

    pub fn learner(&self) -> &str {
        &self.profile.name
    }

    pub fn best_result(&self) -> Option<&TestResult> {
        self.profile.best_result.as_ref()
    }

    pub fn result(&self) -> Option<&TestResult> {
        self.result.as_ref()
    }

    pub fn analysis(&self) -> Option<&PerformanceAnalysis> {
        self.analysis.as_ref()
    }

    /// Whether the finished test replaced the stored best result
    pub fn is_new_best(&self) -> bool {
        self.new_best
    }

    pub fn stats_db(&self) -> Option<&StatsDb> {
        self.stats_db.as_ref()
    }

    fn pending_question(&self) -> Option<&Question> {
        match self.view {
            View::Question => self.question.as_ref(),
            _ => None,
        }
    }

    fn show(&mut self, question: Question) {
        self.question = Some(question);
        self.selected = 0;
        self.view = View::Question;
    }

    fn finish(&mut self, result: TestResult) {
        if let Some(db) = &self.stats_db {
            if let Err(e) = db.record_test(&result) {
                warn!(error = %e, "failed to record test");
            }
        }
        self.new_best = merge_result(&mut self.profile, &result);
        if self.new_best {
            if let Err(e) = self.profiles.save(&self.profile) {
                warn!(error = %e, "failed to save profile");
            }
        }
        self.analysis = Some(analyze(&result.by_type()));
        self.result = Some(result);
        self.question = None;
        self.view = View::Finished;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentBanks;
    use crate::placement::TestConfig;
    use crate::profile::{FileProfileStore, MemoryProfileStore};
    use crate::result::VocabEstimates;
    use rand::{rngs::StdRng, SeedableRng};
    use std::sync::Arc;

    fn session() -> Session {
        let banks = Arc::new(ContentBanks::embedded().unwrap());
        let test = PlacementTest::new(banks, TestConfig::default(), VocabEstimates::default())
            .with_rng(StdRng::seed_from_u64(99));
        Session::new(
            test,
            "Huda",
            Box::new(MemoryProfileStore::new()),
            Some(StatsDb::open_in_memory().unwrap()),
        )
    }

    fn select_answer(session: &mut Session, correct: bool) {
        let question = session.question().unwrap().clone();
        let index = question
            .options
            .iter()
            .position(|o| question.is_correct(o) == correct)
            .unwrap();
        assert!(session.select(index));
    }

    #[test]
    fn selection_wraps_around() {
        let mut s = session();
        s.begin();
        let count = s.question().unwrap().options.len();
        s.select_previous();
        assert_eq!(s.selected(), count - 1);
        s.select_next();
        assert_eq!(s.selected(), 0);
        assert!(!s.select(count));
    }

    #[test]
    fn confirm_alternates_between_answer_and_feedback() {
        let mut s = session();
        s.begin();
        assert_eq!(s.entered_level(), Some(CefrLevel::A1));
        select_answer(&mut s, true);
        s.confirm();
        let View::Feedback(outcome) = s.view().clone() else {
            panic!("expected feedback");
        };
        assert!(outcome.is_correct);
        assert!(s.question().is_some());
        s.confirm();
        assert_eq!(s.view(), &View::Question);
        assert_eq!(s.entered_level(), None);
    }

    #[test]
    fn failing_a1_records_beginner_and_saves_once() {
        let mut s = session();
        s.begin();
        for _ in 0..3 {
            select_answer(&mut s, false);
            s.confirm();
            s.confirm();
        }
        assert_eq!(s.view(), &View::Finished);
        let result = s.result().unwrap();
        assert!(result.final_level.is_beginner());
        assert!(s.is_new_best());
        assert_eq!(s.best_result(), Some(result));
        assert!(s.analysis().is_some());

        let db = s.stats_db().unwrap();
        assert_eq!(db.answers().unwrap().len(), 3);
        assert_eq!(db.test_count().unwrap(), 1);
    }

    #[test]
    fn exit_keeps_no_result() {
        let mut s = session();
        s.begin();
        select_answer(&mut s, true);
        s.confirm();
        s.exit();
        assert_eq!(s.view(), &View::Exited);
        assert!(s.result().is_none());
        assert!(s.best_result().is_none());
    }

    #[test]
    fn first_name_is_saved_before_any_result() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.json");
        let banks = Arc::new(ContentBanks::embedded().unwrap());
        let test = PlacementTest::new(banks, TestConfig::default(), VocabEstimates::default())
            .with_rng(StdRng::seed_from_u64(99));
        let mut s = Session::new(test, "", Box::new(FileProfileStore::with_path(&path)), None);
        s.begin();
        s.set_learner("  Dana ");
        s.exit();

        let stored = FileProfileStore::with_path(&path).load().unwrap().unwrap();
        assert_eq!(stored.name, "Dana");
        assert_eq!(stored.best_result, None);
    }

    #[test]
    fn renaming_a_stored_learner_does_not_write() {
        let store = MemoryProfileStore::with_profile(LearnerProfile::new("Omar"));
        let banks = Arc::new(ContentBanks::embedded().unwrap());
        let test = PlacementTest::new(banks, TestConfig::default(), VocabEstimates::default());
        let mut s = Session::new(test, "", Box::new(store), None);
        s.begin();
        assert_eq!(s.learner(), "Omar");
        s.set_learner("Omar B");
        assert_eq!(s.learner(), "Omar B");
        s.exit();
        assert_eq!(s.profiles.load().unwrap().unwrap().name, "Omar");
    }

    #[test]
    fn retake_starts_over_at_a1() {
        let mut s = session();
        s.begin();
        for _ in 0..3 {
            select_answer(&mut s, false);
            s.confirm();
            s.confirm();
        }
        s.retake();
        assert_eq!(s.view(), &View::Question);
        assert_eq!(s.test().current_level(), CefrLevel::A1);
        assert!(s.result().is_none());
        // the stored best survives a retake
        assert!(s.best_result().is_some());
    }
}
