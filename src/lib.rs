// Library surface: the placement engine plus storage, shared by the
// terminal binary and the integration tests.
pub mod analysis;
pub mod app_dirs;
pub mod config;
pub mod content;
pub mod level;
pub mod placement;
pub mod planner;
pub mod profile;
pub mod question;
pub mod result;
pub mod runtime;
pub mod session;
pub mod stats;
pub mod synth;
pub mod telemetry;

pub use level::{CefrLevel, Placement};
pub use placement::{AnswerOutcome, LevelStart, NextState, PlacementError, PlacementTest, Step, TestConfig};
pub use question::{Question, QuestionType};
pub use result::{TestResult, VocabEstimates};
