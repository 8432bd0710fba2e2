//! Error types for each Flashdeck concern

use thiserror::Error;

/// Key-value store failures
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("stored value is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Word record store failures
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WordError {
    #[error("both the English and Turkish fields are required")]
    EmptyField,
    #[error("no word with id {0}")]
    NotFound(u64),
}

/// Saved list failures
#[derive(Debug, Error)]
pub enum ListError {
    #[error("list name must not be empty")]
    EmptyName,
    #[error("no saved list named '{0}'")]
    NotFound(String),
    #[error("a list named '{0}' already exists")]
    NameCollision(String),
    #[error("invalid list file: {0}")]
    MalformedFile(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<rusqlite::Error> for ListError {
    fn from(e: rusqlite::Error) -> Self {
        ListError::Store(StoreError::Sqlite(e))
    }
}

impl From<serde_json::Error> for ListError {
    fn from(e: serde_json::Error) -> Self {
        ListError::Store(StoreError::Json(e))
    }
}

/// Spreadsheet import/export failures
#[derive(Debug, Error)]
pub enum SpreadsheetError {
    #[error("unsupported file format: .{0}")]
    UnsupportedFormat(String),
    #[error("failed to read workbook: {0}")]
    Workbook(#[from] calamine::Error),
    #[error("failed to read CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("no sheets found in workbook")]
    NoSheets,
    #[error("empty file - no header row")]
    NoHeader,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Completion service failures. These are surfaced to the user, unlike
/// malformed responses which fall back to canned content.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("no API key configured (set OPENAI_API_KEY)")]
    MissingApiKey,
    #[error("completion request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("completion service returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// Quiz construction failures
#[derive(Debug, Error)]
pub enum QuizError {
    #[error("no practice words found - mark some words for practice first")]
    NoPracticeWords,
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error(transparent)]
    List(#[from] ListError),
}
