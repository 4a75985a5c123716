use include_dir::{include_dir, Dir};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use super::entries::{LevelBank, BLANK};
use crate::level::CefrLevel;
use crate::question::all_distinct;

static BANK_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/content/banks");

static EMPTY_BANK: LevelBank = LevelBank::empty();

#[derive(Debug, Error)]
pub enum BankError {
    #[error("bank file {0} is not valid UTF-8")]
    Encoding(String),
    #[error("failed to read bank file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse bank file {file}: {source}")]
    Parse {
        file: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("bank file {file} declares level {declared}, expected {expected}")]
    LevelMismatch {
        file: String,
        declared: CefrLevel,
        expected: CefrLevel,
    },
    #[error("invalid {level} bank entry: {reason}")]
    Invalid { level: CefrLevel, reason: String },
}

/// On-disk shape of one level's bank file
#[derive(Deserialize)]
struct BankFile {
    level: CefrLevel,
    #[serde(flatten)]
    bank: LevelBank,
}

/// Read-only content for every level. Loaded once, never mutated.
#[derive(Debug, Clone, Default)]
pub struct ContentBanks {
    levels: BTreeMap<CefrLevel, LevelBank>,
}

impl ContentBanks {
    /// Banks compiled into the binary
    pub fn embedded() -> Result<Self, BankError> {
        let mut levels = BTreeMap::new();
        for level in CefrLevel::ALL {
            let name = file_name(level);
            let Some(file) = BANK_DIR.get_file(&name) else {
                debug!(%level, "no embedded bank");
                continue;
            };
            let text = file
                .contents_utf8()
                .ok_or_else(|| BankError::Encoding(name.clone()))?;
            levels.insert(level, parse_bank(&name, text, level)?);
        }
        Self::from_levels(levels)
    }

    /// Banks read from `<dir>/a1.json` .. `<dir>/c2.json`; missing files are empty levels
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Result<Self, BankError> {
        let mut levels = BTreeMap::new();
        for level in CefrLevel::ALL {
            let path = dir.as_ref().join(file_name(level));
            if !path.exists() {
                debug!(%level, path = %path.display(), "bank file missing");
                continue;
            }
            let text = fs::read_to_string(&path).map_err(|source| BankError::Io {
                path: path.clone(),
                source,
            })?;
            levels.insert(level, parse_bank(&path.display().to_string(), &text, level)?);
        }
        Self::from_levels(levels)
    }

    /// Use `dir` when given, the embedded banks otherwise
    pub fn load(dir: Option<&Path>) -> Result<Self, BankError> {
        let banks = match dir {
            Some(dir) => Self::from_dir(dir)?,
            None => Self::embedded()?,
        };
        for (level, bank) in &banks.levels {
            info!(
                %level,
                words = bank.word_count(),
                sentences = bank.sentence_count(),
                readings = bank.reading_count(),
                "content bank loaded"
            );
        }
        Ok(banks)
    }

    /// Build from in-memory banks, validating every entry
    pub fn from_levels(levels: BTreeMap<CefrLevel, LevelBank>) -> Result<Self, BankError> {
        for (level, bank) in &levels {
            validate(*level, bank)?;
        }
        Ok(Self { levels })
    }

    /// The bank for `level`; an empty bank if none was supplied
    pub fn bank(&self, level: CefrLevel) -> &LevelBank {
        self.levels.get(&level).unwrap_or(&EMPTY_BANK)
    }

    pub fn has_content(&self, level: CefrLevel) -> bool {
        !self.bank(level).is_empty()
    }
}

fn file_name(level: CefrLevel) -> String {
    format!("{}.json", level.to_string().to_lowercase())
}

fn parse_bank(file: &str, text: &str, expected: CefrLevel) -> Result<LevelBank, BankError> {
    let parsed: BankFile = serde_json::from_str(text).map_err(|source| BankError::Parse {
        file: file.to_string(),
        source,
    })?;
    if parsed.level != expected {
        return Err(BankError::LevelMismatch {
            file: file.to_string(),
            declared: parsed.level,
            expected,
        });
    }
    Ok(parsed.bank)
}

/// Reject bank data that would let a synthesized question break its own invariants
pub fn validate(level: CefrLevel, bank: &LevelBank) -> Result<(), BankError> {
    let invalid = |reason: String| BankError::Invalid { level, reason };

    for (i, word) in bank.words.iter().enumerate() {
        if word.word.trim().is_empty() || word.gloss.trim().is_empty() {
            return Err(invalid(format!("word #{i} has an empty word or gloss")));
        }
        if !word.example.contains(BLANK) {
            return Err(invalid(format!(
                "example for '{}' has no {BLANK} blank",
                word.word
            )));
        }
    }

    for (i, sentence) in bank.sentences.iter().enumerate() {
        if sentence.tokens.is_empty() || sentence.correct.trim().is_empty() {
            return Err(invalid(format!("sentence #{i} has no tokens or no answer")));
        }
        let distinct: HashSet<String> = sentence
            .tokens
            .iter()
            .map(|t| t.trim().to_lowercase())
            .collect();
        if distinct.len() < 2 {
            return Err(invalid(format!(
                "sentence '{}' needs at least two different tokens",
                sentence.correct
            )));
        }
        if sentence.distractors.is_empty() {
            return Err(invalid(format!(
                "sentence '{}' has no distractors",
                sentence.correct
            )));
        }
        let mut options = vec![sentence.correct.clone()];
        options.extend(sentence.distractors.iter().cloned());
        if !all_distinct(&options) {
            return Err(invalid(format!(
                "sentence '{}' repeats an option",
                sentence.correct
            )));
        }
    }

    for reading in &bank.readings {
        if !all_distinct(&reading.options) {
            return Err(invalid(format!(
                "reading question '{}' repeats an option",
                reading.question
            )));
        }
        let hits = reading
            .options
            .iter()
            .filter(|o| o.trim().to_lowercase() == reading.answer.trim().to_lowercase())
            .count();
        if hits != 1 {
            return Err(invalid(format!(
                "reading question '{}' does not list its answer exactly once",
                reading.question
            )));
        }
    }

    Ok(())
}
