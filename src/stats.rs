use chrono::{DateTime, Local};
use rusqlite::{params, Connection, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::app_dirs::AppDirs;
use crate::level::{CefrLevel, Placement};
use crate::placement::AnswerOutcome;
use crate::question::QuestionType;
use crate::result::{TestResult, TypeTally};

/// One answered question
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerRecord {
    pub level: CefrLevel,
    pub question_type: QuestionType,
    pub was_correct: bool,
    pub answered_at: DateTime<Local>,
}

impl From<&AnswerOutcome> for AnswerRecord {
    fn from(outcome: &AnswerOutcome) -> Self {
        Self {
            level: outcome.level,
            question_type: outcome.question_type,
            was_correct: outcome.is_correct,
            answered_at: Local::now(),
        }
    }
}

/// Summary row for one finished test
#[derive(Debug, Clone, PartialEq)]
pub struct TestRecord {
    pub final_level: Placement,
    pub failed_level: Option<CefrLevel>,
    pub correct: u32,
    pub total: u32,
    pub completed_at: DateTime<Local>,
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Db(#[from] rusqlite::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Local answer and test history
#[derive(Debug)]
pub struct StatsDb {
    conn: Connection,
}

impl StatsDb {
    /// Open the database in the state directory, creating it if needed
    pub fn new() -> Result<Self> {
        let db_path = AppDirs::db_path().unwrap_or_else(|| PathBuf::from("levelcheck_history.db"));
        Self::open(db_path)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN),
                    Some(format!("Failed to create directory: {}", e)),
                )
            })?;
        }
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS answers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                level TEXT NOT NULL,
                question_type TEXT NOT NULL,
                was_correct BOOLEAN NOT NULL,
                answered_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_answers_type ON answers(question_type);
            CREATE INDEX IF NOT EXISTS idx_answers_time ON answers(answered_at);

            CREATE TABLE IF NOT EXISTS tests (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                final_level TEXT NOT NULL,
                failed_level TEXT,
                correct INTEGER NOT NULL,
                total INTEGER NOT NULL,
                completed_at TEXT NOT NULL
            );
            "#,
        )?;
        Ok(StatsDb { conn })
    }

    pub fn record_answer(&self, answer: &AnswerRecord) -> Result<()> {
        self.conn.execute(
            "INSERT INTO answers (level, question_type, was_correct, answered_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                answer.level.to_string(),
                answer.question_type.to_string(),
                answer.was_correct,
                answer.answered_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn record_test(&self, result: &TestResult) -> Result<()> {
        let totals = result.totals();
        self.conn.execute(
            r#"
            INSERT INTO tests (final_level, failed_level, correct, total, completed_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                result.final_level.to_string(),
                result.failed_level.map(|l| l.to_string()),
                totals.correct,
                totals.total,
                result.completed_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Lifetime correct/total per question type
    pub fn type_summary(&self) -> Result<Vec<(QuestionType, TypeTally)>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT question_type,
                   SUM(CASE WHEN was_correct = 1 THEN 1 ELSE 0 END),
                   COUNT(*)
            FROM answers
            GROUP BY question_type
            ORDER BY question_type
            "#,
        )?;
        let rows = stmt.query_map([], |row| {
            let name: String = row.get(0)?;
            let question_type = parse_question_type(&name)
                .ok_or_else(|| invalid_text(0, "question_type"))?;
            Ok((
                question_type,
                TypeTally {
                    correct: row.get(1)?,
                    total: row.get(2)?,
                },
            ))
        })?;
        rows.collect()
    }

    pub fn answers(&self) -> Result<Vec<AnswerRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT level, question_type, was_correct, answered_at FROM answers ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            let level: String = row.get(0)?;
            let question_type: String = row.get(1)?;
            let answered_at: String = row.get(3)?;
            Ok(AnswerRecord {
                level: level.parse().map_err(|_| invalid_text(0, "level"))?,
                question_type: parse_question_type(&question_type)
                    .ok_or_else(|| invalid_text(1, "question_type"))?,
                was_correct: row.get(2)?,
                answered_at: parse_timestamp(&answered_at, 3)?,
            })
        })?;
        rows.collect()
    }

    pub fn test_count(&self) -> Result<u64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM tests", [], |row| row.get(0))
    }

    /// Most recent first
    pub fn recent_tests(&self, limit: usize) -> Result<Vec<TestRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT final_level, failed_level, correct, total, completed_at
            FROM tests
            ORDER BY id DESC
            LIMIT ?1
            "#,
        )?;
        let rows = stmt.query_map([limit as i64], |row| {
            let final_level: String = row.get(0)?;
            let failed_level: Option<String> = row.get(1)?;
            let completed_at: String = row.get(4)?;
            Ok(TestRecord {
                final_level: final_level
                    .parse()
                    .map_err(|_| invalid_text(0, "final_level"))?,
                failed_level: failed_level
                    .map(|l| l.parse().map_err(|_| invalid_text(1, "failed_level")))
                    .transpose()?,
                correct: row.get(2)?,
                total: row.get(3)?,
                completed_at: parse_timestamp(&completed_at, 4)?,
            })
        })?;
        rows.collect()
    }

    /// Write every recorded answer to `path` as CSV; returns the row count
    pub fn export_answers_csv<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> std::result::Result<usize, ExportError> {
        let answers = self.answers()?;
        let mut writer = csv::Writer::from_path(path)?;
        for answer in &answers {
            writer.serialize(answer)?;
        }
        writer.flush()?;
        Ok(answers.len())
    }

    pub fn clear_all(&self) -> Result<()> {
        self.conn
            .execute_batch("DELETE FROM answers; DELETE FROM tests;")
    }

    pub fn database_exists() -> bool {
        AppDirs::db_path().is_some_and(|path| path.exists())
    }
}

fn parse_question_type(name: &str) -> Option<QuestionType> {
    QuestionType::ALL.into_iter().find(|t| t.to_string() == name)
}

fn parse_timestamp(text: &str, column: usize) -> Result<DateTime<Local>> {
    DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&Local))
        .map_err(|_| invalid_text(column, "timestamp"))
}

fn invalid_text(column: usize, name: &str) -> rusqlite::Error {
    rusqlite::Error::InvalidColumnType(column, name.to_string(), rusqlite::types::Type::Text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::{aggregate, LevelPerformance, VocabEstimates};
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    fn answer(level: CefrLevel, question_type: QuestionType, was_correct: bool) -> AnswerRecord {
        AnswerRecord {
            level,
            question_type,
            was_correct,
            answered_at: Local::now(),
        }
    }

    #[test]
    fn answers_round_trip() {
        let db = StatsDb::open_in_memory().unwrap();
        let a = answer(CefrLevel::B2, QuestionType::SentenceFormation, true);
        db.record_answer(&a).unwrap();
        let stored = db.answers().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].level, CefrLevel::B2);
        assert_eq!(stored[0].question_type, QuestionType::SentenceFormation);
        assert!(stored[0].was_correct);
    }

    #[test]
    fn type_summary_groups_answers() {
        let db = StatsDb::open_in_memory().unwrap();
        db.record_answer(&answer(CefrLevel::A1, QuestionType::Meaning, true)).unwrap();
        db.record_answer(&answer(CefrLevel::A2, QuestionType::Meaning, false)).unwrap();
        db.record_answer(&answer(CefrLevel::A1, QuestionType::Usage, true)).unwrap();

        let summary = db.type_summary().unwrap();
        assert_eq!(
            summary,
            vec![
                (QuestionType::Meaning, TypeTally { correct: 1, total: 2 }),
                (QuestionType::Usage, TypeTally { correct: 1, total: 1 }),
            ]
        );
    }

    #[test]
    fn tests_are_listed_newest_first() {
        let db = StatsDb::open_in_memory().unwrap();
        let mut perf = LevelPerformance::default();
        perf.record(QuestionType::Meaning, true);
        perf.record(QuestionType::Usage, false);
        let levels = BTreeMap::from([(CefrLevel::A1, perf)]);
        let estimates = VocabEstimates::default();

        let first = aggregate(levels.clone(), Placement::Beginner, Some(CefrLevel::A1), &estimates);
        let second = aggregate(levels, CefrLevel::A1.into(), None, &estimates);
        db.record_test(&first).unwrap();
        db.record_test(&second).unwrap();

        assert_eq!(db.test_count().unwrap(), 2);
        let recent = db.recent_tests(5).unwrap();
        assert_eq!(recent[0].final_level, Placement::Level(CefrLevel::A1));
        assert_eq!(recent[1].final_level, Placement::Beginner);
        assert_eq!(recent[1].failed_level, Some(CefrLevel::A1));
        assert_eq!((recent[1].correct, recent[1].total), (1, 2));
    }

    #[test]
    fn export_writes_header_and_rows() {
        let db = StatsDb::open_in_memory().unwrap();
        db.record_answer(&answer(CefrLevel::C1, QuestionType::Antonym, false)).unwrap();
        db.record_answer(&answer(CefrLevel::C1, QuestionType::Synonym, true)).unwrap();

        let dir = tempdir().unwrap();
        let path = dir.path().join("history.csv");
        assert_eq!(db.export_answers_csv(&path).unwrap(), 2);

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("level,question_type,was_correct,answered_at")
        );
        assert!(lines.next().unwrap().starts_with("C1,antonym,false,"));
    }

    #[test]
    fn clear_all_empties_both_tables() {
        let db = StatsDb::open_in_memory().unwrap();
        db.record_answer(&answer(CefrLevel::A1, QuestionType::Matching, true)).unwrap();
        db.clear_all().unwrap();
        assert!(db.answers().unwrap().is_empty());
        assert_eq!(db.test_count().unwrap(), 0);
    }

    #[test]
    fn open_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("history.db");
        let db = StatsDb::open(&path).unwrap();
        db.record_answer(&answer(CefrLevel::A1, QuestionType::Meaning, true)).unwrap();
        assert!(path.exists());
    }
}
