//! Word records and the in-memory working set they are studied from

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::WordError;

/// Learning status of a word
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    New,
    Ok,
    Practice,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::New => "new",
            Status::Ok => "ok",
            Status::Practice => "practice",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "new" => Ok(Status::New),
            "ok" | "known" => Ok(Status::Ok),
            "practice" => Ok(Status::Practice),
            other => Err(format!("unknown status '{}' (expected new, ok or practice)", other)),
        }
    }
}

/// A single flashcard. Field names match the persisted JSON layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordRecord {
    pub english: String,
    pub turkish: String,
    #[serde(default)]
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example_sentence: Option<String>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub correct_count: u32,
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

impl WordRecord {
    pub fn new(english: &str, turkish: &str) -> Self {
        WordRecord {
            english: english.trim().to_string(),
            turkish: turkish.trim().to_string(),
            status: Status::New,
            example_sentence: None,
            correct_count: 0,
        }
    }

    /// Key used to de-duplicate records by their English side
    pub fn key(&self) -> String {
        dedup_key(&self.english)
    }
}

/// Normalize an English value into its de-duplication key
pub fn dedup_key(english: &str) -> String {
    english.trim().to_lowercase()
}

/// A row read from an external table, before it becomes a record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportRow {
    pub english: String,
    pub turkish: String,
    pub example_sentence: Option<String>,
}

impl ImportRow {
    pub fn new(english: &str, turkish: &str) -> Self {
        ImportRow {
            english: english.to_string(),
            turkish: turkish.to_string(),
            example_sentence: None,
        }
    }
}

/// Stable identifier of a record inside a [`WordStore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WordId(u64);

impl WordId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Number of records per status
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StatusCounts {
    pub new: usize,
    pub ok: usize,
    pub practice: usize,
}

impl StatusCounts {
    pub fn total(&self) -> usize {
        self.new + self.ok + self.practice
    }

    pub fn of(&self, status: Status) -> usize {
        match status {
            Status::New => self.new,
            Status::Ok => self.ok,
            Status::Practice => self.practice,
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    id: WordId,
    record: WordRecord,
}

/// Ordered working set of word records addressed by [`WordId`]
#[derive(Debug, Default, Clone)]
pub struct WordStore {
    entries: Vec<Entry>,
    next_id: u64,
}

impl WordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from persisted records, keeping their order
    pub fn from_records(records: impl IntoIterator<Item = WordRecord>) -> Self {
        let mut store = Self::new();
        for record in records {
            store.push(record);
        }
        store
    }

    fn push(&mut self, record: WordRecord) -> WordId {
        let id = WordId(self.next_id);
        self.next_id += 1;
        self.entries.push(Entry { id, record });
        id
    }

    fn entry_mut(&mut self, id: WordId) -> Result<&mut Entry, WordError> {
        self.entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(WordError::NotFound(id.0))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: WordId) -> Option<&WordRecord> {
        self.entries.iter().find(|e| e.id == id).map(|e| &e.record)
    }

    /// Position of a record in store order
    pub fn position(&self, id: WordId) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }

    pub fn at(&self, index: usize) -> Option<(WordId, &WordRecord)> {
        self.entries.get(index).map(|e| (e.id, &e.record))
    }

    pub fn iter(&self) -> impl Iterator<Item = (WordId, &WordRecord)> {
        self.entries.iter().map(|e| (e.id, &e.record))
    }

    /// Snapshot of every record in store order
    pub fn records(&self) -> Vec<WordRecord> {
        self.entries.iter().map(|e| e.record.clone()).collect()
    }

    /// Ids of records with the given status, in store order
    pub fn filtered(&self, status: Status) -> Vec<WordId> {
        self.iter()
            .filter(|(_, r)| r.status == status)
            .map(|(id, _)| id)
            .collect()
    }

    pub fn filtered_records(&self, status: Status) -> Vec<WordRecord> {
        self.iter()
            .filter(|(_, r)| r.status == status)
            .map(|(_, r)| r.clone())
            .collect()
    }

    /// Case-insensitive, trimmed lookup on the English side
    pub fn find_by_english(&self, english: &str) -> Option<WordId> {
        let key = dedup_key(english);
        self.iter().find(|(_, r)| r.key() == key).map(|(id, _)| id)
    }

    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for (_, record) in self.iter() {
            match record.status {
                Status::New => counts.new += 1,
                Status::Ok => counts.ok += 1,
                Status::Practice => counts.practice += 1,
            }
        }
        counts
    }

    /// Add a single word with status NEW
    pub fn add_word(&mut self, english: &str, turkish: &str) -> Result<WordId, WordError> {
        if english.trim().is_empty() || turkish.trim().is_empty() {
            return Err(WordError::EmptyField);
        }
        Ok(self.push(WordRecord::new(english, turkish)))
    }

    /// Import external rows, skipping blanks and English values already seen
    /// in the store or earlier in the batch. The accepted batch is shuffled
    /// before it is appended.
    pub fn import_rows<R: Rng + ?Sized>(
        &mut self,
        rows: Vec<ImportRow>,
        rng: &mut R,
    ) -> Vec<WordId> {
        let mut seen: HashSet<String> = self.iter().map(|(_, r)| r.key()).collect();
        let mut accepted = Vec::new();
        let mut skipped = 0usize;

        for row in rows {
            let key = dedup_key(&row.english);
            if key.is_empty() || row.turkish.trim().is_empty() || !seen.insert(key) {
                skipped += 1;
                continue;
            }
            let mut record = WordRecord::new(&row.english, &row.turkish);
            record.example_sentence = row
                .example_sentence
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty());
            accepted.push(record);
        }

        accepted.shuffle(rng);
        log::info!("Imported {} words ({} skipped)", accepted.len(), skipped);
        accepted.into_iter().map(|r| self.push(r)).collect()
    }

    pub fn set_status(&mut self, id: WordId, status: Status) -> Result<(), WordError> {
        self.entry_mut(id)?.record.status = status;
        Ok(())
    }

    /// Rewrite both sides of a word
    pub fn edit_word(&mut self, id: WordId, english: &str, turkish: &str) -> Result<(), WordError> {
        if english.trim().is_empty() || turkish.trim().is_empty() {
            return Err(WordError::EmptyField);
        }
        let entry = self.entry_mut(id)?;
        entry.record.english = english.trim().to_string();
        entry.record.turkish = turkish.trim().to_string();
        Ok(())
    }

    pub fn set_example_sentence(&mut self, id: WordId, sentence: &str) -> Result<(), WordError> {
        self.entry_mut(id)?.record.example_sentence = Some(sentence.to_string());
        Ok(())
    }

    pub fn remove(&mut self, id: WordId) -> Result<WordRecord, WordError> {
        let index = self.position(id).ok_or(WordError::NotFound(id.0))?;
        Ok(self.entries.remove(index).record)
    }
}
