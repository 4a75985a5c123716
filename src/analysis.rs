use std::collections::BTreeMap;

use crate::question::QuestionType;
use crate::result::TypeTally;

/// Below this success rate a skill counts as a weakness
pub const WEAKNESS_PERCENT: f64 = 60.0;
/// Every skill at or above this earns the "great work" note
pub const STRONG_PERCENT: f64 = 75.0;

const STARTER: [&str; 2] = [
    "Start with matching practice to learn the most common words.",
    "Watch simple English videos made for young learners.",
];
const FLASHCARDS: &str = "Use flashcards to strengthen your memory of word meanings.";
const WRITE_DAILY: &str = "Write a few simple sentences every day with the new words you learn.";
const READ_IN_CONTEXT: &str = "Read short stories and notice how words are used in context.";
const SHORT_PASSAGES: &str =
    "Begin with very short texts and answer one question about each to build comprehension.";
const RELATED_WORDS: &str =
    "When you learn a new word, look up its synonyms and antonyms to widen your vocabulary.";
const KEEP_GOING: &str = "Great work! Keep practising to hold and grow your level.";
const BALANCED: &str =
    "Your skills are balanced. Practise all of them regularly to keep improving.";

#[derive(Debug, Clone, PartialEq)]
pub struct SkillScore {
    pub question_type: QuestionType,
    pub tally: TypeTally,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PerformanceAnalysis {
    /// Weakest skill first
    pub skills: Vec<SkillScore>,
    pub advice: Vec<String>,
}

impl PerformanceAnalysis {
    pub fn weaknesses(&self) -> impl Iterator<Item = &SkillScore> {
        self.skills.iter().filter(|s| s.percent < WEAKNESS_PERCENT)
    }
}

/// Rank skills by success rate and suggest what to practise
pub fn analyze(by_type: &BTreeMap<QuestionType, TypeTally>) -> PerformanceAnalysis {
    let mut skills: Vec<SkillScore> = by_type
        .iter()
        .filter(|(_, tally)| tally.total > 0)
        .map(|(question_type, tally)| SkillScore {
            question_type: *question_type,
            tally: *tally,
            percent: tally.percent(),
        })
        .collect();

    if skills.is_empty() {
        return PerformanceAnalysis {
            skills,
            advice: STARTER.iter().map(|s| s.to_string()).collect(),
        };
    }

    skills.sort_by(|a, b| a.percent.total_cmp(&b.percent));

    let weak: Vec<QuestionType> = skills
        .iter()
        .filter(|s| s.percent < WEAKNESS_PERCENT)
        .map(|s| s.question_type)
        .collect();
    let any_weak = |types: &[QuestionType]| weak.iter().any(|t| types.contains(t));

    let mut advice: Vec<&str> = Vec::new();
    if any_weak(&[QuestionType::Meaning, QuestionType::Matching]) {
        advice.push(FLASHCARDS);
    }
    if any_weak(&[QuestionType::Usage, QuestionType::SentenceFormation]) {
        advice.push(WRITE_DAILY);
        advice.push(READ_IN_CONTEXT);
    }
    if any_weak(&[QuestionType::ReadingComprehension]) {
        advice.push(SHORT_PASSAGES);
    }
    if any_weak(&[QuestionType::Synonym, QuestionType::Antonym]) {
        advice.push(RELATED_WORDS);
    }
    if advice.is_empty() {
        if skills.iter().all(|s| s.percent >= STRONG_PERCENT) {
            advice.push(KEEP_GOING);
        } else {
            advice.push(BALANCED);
        }
    }

    PerformanceAnalysis {
        skills,
        advice: advice.into_iter().map(String::from).collect(),
    }
}
