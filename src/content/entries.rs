use serde::{Deserialize, Serialize};

/// Marker for the missing word in an example sentence
pub const BLANK: &str = "____";

/// A word or phrase with its native-language gloss
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct VocabularyEntry {
    pub word: String,
    pub gloss: String,
    /// Part-of-speech tag, e.g. "noun", "verb"
    pub pos: String,
    /// Example sentence containing a blank where `word` belongs
    pub example: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example_gloss: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub synonyms: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub antonyms: Vec<String>,
}

impl VocabularyEntry {
    pub fn has_synonyms(&self) -> bool {
        !self.synonyms.is_empty()
    }

    pub fn has_antonyms(&self) -> bool {
        !self.antonyms.is_empty()
    }

    /// "word - gloss", the form used by matching questions
    pub fn pair_label(&self) -> String {
        pair_label(&self.word, &self.gloss)
    }
}

pub fn pair_label(word: &str, gloss: &str) -> String {
    format!("{word} - {gloss}")
}

/// Jumbled-sentence exercise: tokens, the correct sentence, and wrong orderings
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct SentenceEntry {
    pub tokens: Vec<String>,
    pub correct: String,
    #[serde(default)]
    pub distractors: Vec<String>,
}

/// A passage with one multiple-choice question about it
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct ReadingEntry {
    pub passage: String,
    pub question: String,
    pub options: Vec<String>,
    pub answer: String,
}

/// The three content banks for one level
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct LevelBank {
    #[serde(default)]
    pub words: Vec<VocabularyEntry>,
    #[serde(default)]
    pub sentences: Vec<SentenceEntry>,
    #[serde(default)]
    pub readings: Vec<ReadingEntry>,
}

impl LevelBank {
    pub const fn empty() -> Self {
        Self {
            words: Vec::new(),
            sentences: Vec::new(),
            readings: Vec::new(),
        }
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    pub fn sentence_count(&self) -> usize {
        self.sentences.len()
    }

    pub fn reading_count(&self) -> usize {
        self.readings.len()
    }

    pub fn word(&self, idx: usize) -> Option<&VocabularyEntry> {
        self.words.get(idx)
    }

    pub fn sentence(&self, idx: usize) -> Option<&SentenceEntry> {
        self.sentences.get(idx)
    }

    pub fn reading(&self, idx: usize) -> Option<&ReadingEntry> {
        self.readings.get(idx)
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty() && self.sentences.is_empty() && self.readings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_fields_default_to_empty() {
        let json = r#"{
            "word": "apple",
            "gloss": "تفاحة",
            "pos": "noun",
            "example": "I eat an ____ every day."
        }"#;
        let entry: VocabularyEntry = serde_json::from_str(json).unwrap();
        assert!(!entry.has_synonyms());
        assert!(!entry.has_antonyms());
        assert_eq!(entry.example_gloss, None);
        assert_eq!(entry.pair_label(), "apple - تفاحة");
    }

    #[test]
    fn level_bank_counts_and_lookup() {
        let json = r#"{
            "words": [],
            "sentences": [
                { "tokens": ["is", "This", "a", "book"], "correct": "This is a book.",
                  "distractors": ["A is this book."] }
            ]
        }"#;
        let bank: LevelBank = serde_json::from_str(json).unwrap();
        assert_eq!(bank.word_count(), 0);
        assert_eq!(bank.sentence_count(), 1);
        assert_eq!(bank.reading_count(), 0);
        assert!(bank.sentence(0).is_some());
        assert!(bank.sentence(1).is_none());
        assert!(!bank.is_empty());
        assert!(LevelBank::empty().is_empty());
    }
}
