use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::app_dirs::AppDirs;
use crate::result::{should_replace, TestResult};

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("profile I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("profile at {path} is not valid JSON: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// The learner's name and best placement so far
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LearnerProfile {
    pub name: String,
    #[serde(default)]
    pub best_result: Option<TestResult>,
}

impl LearnerProfile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            best_result: None,
        }
    }
}

/// Persistent get/set of the learner profile
pub trait ProfileStore {
    /// `None` on first use
    fn load(&self) -> Result<Option<LearnerProfile>, ProfileError>;
    fn save(&self, profile: &LearnerProfile) -> Result<(), ProfileError>;
}

/// JSON file in the state directory
#[derive(Debug, Clone)]
pub struct FileProfileStore {
    path: PathBuf,
}

impl FileProfileStore {
    pub fn new() -> Option<Self> {
        AppDirs::profile_path().map(|path| Self { path })
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    /// Forget the stored profile; a missing file is not an error
    pub fn reset(&self) -> Result<(), ProfileError> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(ProfileError::Io {
                path: self.path.clone(),
                source: e,
            }),
            _ => Ok(()),
        }
    }
}

impl ProfileStore for FileProfileStore {
    fn load(&self) -> Result<Option<LearnerProfile>, ProfileError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ProfileError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| ProfileError::Format {
                path: self.path.clone(),
                source,
            })
    }

    fn save(&self, profile: &LearnerProfile) -> Result<(), ProfileError> {
        let io_err = |source| ProfileError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let data = serde_json::to_vec_pretty(profile).map_err(|source| ProfileError::Format {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, data).map_err(io_err)
    }
}

/// Process-local store for tests and throwaway sessions
#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    profile: RefCell<Option<LearnerProfile>>,
    saves: RefCell<usize>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(profile: LearnerProfile) -> Self {
        Self {
            profile: RefCell::new(Some(profile)),
            saves: RefCell::new(0),
        }
    }

    pub fn save_count(&self) -> usize {
        *self.saves.borrow()
    }
}

impl ProfileStore for MemoryProfileStore {
    fn load(&self) -> Result<Option<LearnerProfile>, ProfileError> {
        Ok(self.profile.borrow().clone())
    }

    fn save(&self, profile: &LearnerProfile) -> Result<(), ProfileError> {
        *self.profile.borrow_mut() = Some(profile.clone());
        *self.saves.borrow_mut() += 1;
        Ok(())
    }
}

/// Apply the retention policy: keep `result` only if it beats the stored best.
///
/// Returns whether the profile changed and needs saving.
pub fn merge_result(profile: &mut LearnerProfile, result: &TestResult) -> bool {
    if !should_replace(profile.best_result.as_ref(), result) {
        info!(final_level = %result.final_level, "kept stored best result");
        return false;
    }
    info!(final_level = %result.final_level, "stored new best result");
    profile.best_result = Some(result.clone());
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::{CefrLevel, Placement};
    use crate::result::{aggregate, LevelPerformance, VocabEstimates};
    use crate::question::QuestionType;
    use assert_matches::assert_matches;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    fn result_at(level: CefrLevel, correct: u32) -> TestResult {
        let mut perf = LevelPerformance::default();
        for i in 0..10 {
            perf.record(QuestionType::Meaning, i < correct);
        }
        aggregate(
            BTreeMap::from([(level, perf)]),
            Placement::Level(level),
            None,
            &VocabEstimates::default(),
        )
    }

    #[test]
    fn missing_file_means_no_profile() {
        let dir = tempdir().unwrap();
        let store = FileProfileStore::with_path(dir.path().join("profile.json"));
        assert_matches!(store.load(), Ok(None));
        store.reset().unwrap();
    }

    #[test]
    fn file_store_round_trip() {
        let dir = tempdir().unwrap();
        let store = FileProfileStore::with_path(dir.path().join("state").join("profile.json"));
        let mut profile = LearnerProfile::new("Omar");
        profile.best_result = Some(result_at(CefrLevel::B1, 6));
        store.save(&profile).unwrap();
        assert_eq!(store.load().unwrap(), Some(profile));

        store.reset().unwrap();
        assert_matches!(store.load(), Ok(None));
    }

    #[test]
    fn corrupt_file_is_a_format_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("profile.json");
        fs::write(&path, "{").unwrap();
        assert_matches!(
            FileProfileStore::with_path(&path).load(),
            Err(ProfileError::Format { .. })
        );
    }

    #[test]
    fn merge_keeps_only_improvements() {
        let mut profile = LearnerProfile::new("Sara");
        assert!(merge_result(&mut profile, &result_at(CefrLevel::B1, 6)));
        assert!(merge_result(&mut profile, &result_at(CefrLevel::B1, 8)));
        assert!(!merge_result(&mut profile, &result_at(CefrLevel::A2, 10)));
        assert!(!merge_result(&mut profile, &result_at(CefrLevel::B1, 7)));

        let best = profile.best_result.unwrap();
        assert_eq!(best.final_level, Placement::Level(CefrLevel::B1));
        assert_eq!(best.score_at(CefrLevel::B1).correct, 8);
    }

    #[test]
    fn memory_store_counts_saves() {
        let store = MemoryProfileStore::with_profile(LearnerProfile::new("Nour"));
        let mut profile = store.load().unwrap().unwrap();
        merge_result(&mut profile, &result_at(CefrLevel::A1, 9));
        store.save(&profile).unwrap();
        assert_eq!(store.save_count(), 1);
        assert_eq!(store.load().unwrap(), Some(profile));
    }
}
