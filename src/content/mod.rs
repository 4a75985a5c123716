pub mod entries;
pub mod loader;

// Re-export the main types for convenience
pub use entries::{LevelBank, ReadingEntry, SentenceEntry, VocabularyEntry, BLANK};
pub use loader::{BankError, ContentBanks};
