//! Flashdeck Core - vocabulary flashcards with saved lists, study sessions and quizzes
//!
//! Provides word-list persistence on SQLite, spreadsheet import/export, study
//! navigation, AI-generated sentences and multiple-choice quizzes.

pub mod config;
pub mod error;
pub mod fuzzy;
pub mod generator;
pub mod lists;
pub mod progress;
pub mod quiz;
pub mod session;
pub mod spreadsheet;
pub mod storage;
pub mod word;

#[cfg(feature = "python")]
mod python;

pub use config::Config;
pub use error::{ListError, QuizError, ServiceError, SpreadsheetError, StoreError, WordError};
pub use generator::{CompletionRequest, CompletionService, ContentGenerator, OpenAiClient};
pub use lists::{Category, CollisionPolicy, ImportOutcome, ListRepository, SavedList};
pub use progress::{apply_correct_answers, ProgressUpdate, PROMOTION_THRESHOLD};
pub use quiz::{build_questions, Phase, Question, Quiz, QuizKind, Score};
pub use session::{Current, StudyMode, StudySession};
pub use storage::{KeyValueStore, MemoryStore, SqliteStore};
pub use word::{ImportRow, Status, StatusCounts, WordId, WordRecord, WordStore};
