//! Saved word lists: named snapshots of the working set kept in a key-value store

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::ListError;
use crate::storage::{KeyValueStore, CURRENT_LIST_KEY, WORD_LISTS_KEY};
use crate::word::{ImportRow, Status, WordRecord, WordStore};

/// Which records of the working set a save keeps
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    #[default]
    All,
    Ok,
    New,
    Practice,
}

impl Category {
    pub fn includes(&self, status: Status) -> bool {
        match self {
            Category::All => true,
            Category::Ok => status == Status::Ok,
            Category::New => status == Status::New,
            Category::Practice => status == Status::Practice,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Category::All => "all",
            Category::Ok => "ok",
            Category::New => "new",
            Category::Practice => "practice",
        };
        f.write_str(s)
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(Category::All),
            other => other.parse::<Status>().map(|status| match status {
                Status::New => Category::New,
                Status::Ok => Category::Ok,
                Status::Practice => Category::Practice,
            }),
        }
    }
}

/// A named list as persisted and exported
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedList {
    pub name: String,
    pub cards: Vec<WordRecord>,
    pub created_at: DateTime<Utc>,
}

impl SavedList {
    pub fn counts(&self) -> crate::word::StatusCounts {
        WordStore::from_records(self.cards.iter().cloned()).counts()
    }
}

/// What to do when an imported list's name is already taken
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionPolicy {
    Abort,
    Overwrite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    Added,
    Replaced,
}

/// Saved lists on top of a [`KeyValueStore`]. Every write rewrites the whole
/// collection.
pub struct ListRepository<S> {
    store: S,
}

impl<S: KeyValueStore> ListRepository<S> {
    pub fn new(store: S) -> Self {
        ListRepository { store }
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    /// All saved lists in save order
    pub fn lists(&self) -> Result<Vec<SavedList>, ListError> {
        match self.store.get(WORD_LISTS_KEY)? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    pub(crate) fn write_lists(&mut self, lists: &[SavedList]) -> Result<(), ListError> {
        let json = serde_json::to_string(lists)?;
        self.store.set(WORD_LISTS_KEY, &json)?;
        Ok(())
    }

    pub fn find(&self, name: &str) -> Result<Option<SavedList>, ListError> {
        Ok(self.lists()?.into_iter().find(|l| l.name == name))
    }

    pub fn load_list(&self, name: &str) -> Result<SavedList, ListError> {
        let list = self.find(name)?.ok_or_else(|| ListError::NotFound(name.to_string()))?;
        log::info!("Loaded list '{}' ({} cards)", list.name, list.cards.len());
        Ok(list)
    }

    /// Snapshot the records matching `category` under `name`. A list with the
    /// same name is replaced in place.
    pub fn save_list(
        &mut self,
        name: &str,
        category: Category,
        words: &WordStore,
    ) -> Result<SavedList, ListError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ListError::EmptyName);
        }

        let saved = SavedList {
            name: name.to_string(),
            cards: words
                .iter()
                .filter(|(_, r)| category.includes(r.status))
                .map(|(_, r)| r.clone())
                .collect(),
            created_at: Utc::now(),
        };

        let mut lists = self.lists()?;
        match lists.iter_mut().find(|l| l.name == name) {
            Some(existing) => *existing = saved.clone(),
            None => lists.push(saved.clone()),
        }
        self.write_lists(&lists)?;

        log::info!(
            "Saved list '{}' ({} cards, category {})",
            saved.name,
            saved.cards.len(),
            category
        );
        Ok(saved)
    }

    /// Import rows into a saved list, creating it when missing. Returns how
    /// many new words were added.
    pub fn merge_rows<R: Rng + ?Sized>(
        &mut self,
        name: &str,
        rows: Vec<ImportRow>,
        rng: &mut R,
    ) -> Result<usize, ListError> {
        let mut words = match self.find(name)? {
            Some(list) => WordStore::from_records(list.cards),
            None => WordStore::new(),
        };
        let added = words.import_rows(rows, rng).len();
        self.save_list(name, Category::All, &words)?;
        Ok(added)
    }

    /// Remove the first list with this name. Returns false when none matched.
    pub fn delete_list(&mut self, name: &str) -> Result<bool, ListError> {
        let mut lists = self.lists()?;
        let Some(index) = lists.iter().position(|l| l.name == name) else {
            return Ok(false);
        };
        lists.remove(index);
        self.write_lists(&lists)?;

        if self.current_list_name()?.as_deref() == Some(name) {
            self.set_current_list(None)?;
        }
        log::info!("Deleted list '{}'", name);
        Ok(true)
    }

    pub fn rename_list(&mut self, old: &str, new: &str) -> Result<(), ListError> {
        let new = new.trim();
        if new.is_empty() {
            return Err(ListError::EmptyName);
        }
        let mut lists = self.lists()?;
        if lists.iter().any(|l| l.name == new) {
            return Err(ListError::NameCollision(new.to_string()));
        }
        let list = lists
            .iter_mut()
            .find(|l| l.name == old)
            .ok_or_else(|| ListError::NotFound(old.to_string()))?;
        list.name = new.to_string();
        self.write_lists(&lists)?;

        if self.current_list_name()?.as_deref() == Some(old) {
            self.set_current_list(Some(new))?;
        }
        Ok(())
    }

    pub fn current_list_name(&self) -> Result<Option<String>, ListError> {
        match self.store.get(CURRENT_LIST_KEY)? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(None),
        }
    }

    pub fn set_current_list(&mut self, name: Option<&str>) -> Result<(), ListError> {
        match name {
            Some(name) => {
                let json = serde_json::to_string(name)?;
                self.store.set(CURRENT_LIST_KEY, &json)?;
            }
            None => self.store.remove(CURRENT_LIST_KEY)?,
        }
        Ok(())
    }

    /// Serialize one list to its portable JSON form
    pub fn export_list(&self, name: &str) -> Result<String, ListError> {
        let list = self.load_list(name)?;
        Ok(serde_json::to_string_pretty(&list)?)
    }

    /// Add a list from its portable JSON form. With [`CollisionPolicy::Abort`]
    /// an existing name is reported as [`ListError::NameCollision`] so the
    /// caller can ask before retrying with [`CollisionPolicy::Overwrite`].
    pub fn import_list(
        &mut self,
        contents: &str,
        policy: CollisionPolicy,
    ) -> Result<ImportOutcome, ListError> {
        let imported = parse_list_file(contents)?;
        let mut lists = self.lists()?;

        let outcome = match lists.iter_mut().find(|l| l.name == imported.name) {
            Some(_) if policy == CollisionPolicy::Abort => {
                return Err(ListError::NameCollision(imported.name));
            }
            Some(existing) => {
                *existing = imported;
                ImportOutcome::Replaced
            }
            None => {
                lists.push(imported);
                ImportOutcome::Added
            }
        };
        self.write_lists(&lists)?;
        Ok(outcome)
    }

    /// PRACTICE cards of the active list, or of every list when none is active
    pub fn practice_words(&self) -> Result<Vec<WordRecord>, ListError> {
        let lists = self.lists()?;
        let practice = |list: &SavedList| -> Vec<WordRecord> {
            list.cards
                .iter()
                .filter(|c| c.status == Status::Practice)
                .cloned()
                .collect()
        };

        Ok(match self.current_list_name()? {
            Some(name) => lists.iter().find(|l| l.name == name).map(practice).unwrap_or_default(),
            None => lists.iter().flat_map(practice).collect(),
        })
    }
}

/// Validate and decode an exported list file
pub fn parse_list_file(contents: &str) -> Result<SavedList, ListError> {
    let value: Value = serde_json::from_str(contents)
        .map_err(|e| ListError::MalformedFile(format!("not valid JSON: {}", e)))?;

    let name = value
        .get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ListError::MalformedFile("missing list name".to_string()))?
        .to_string();

    let cards = value
        .get("cards")
        .and_then(Value::as_array)
        .ok_or_else(|| ListError::MalformedFile("missing cards array".to_string()))?
        .iter()
        .map(|card| serde_json::from_value::<WordRecord>(card.clone()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ListError::MalformedFile(format!("invalid card: {}", e)))?;

    let created_at = value
        .get("createdAt")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);

    Ok(SavedList { name, cards, created_at })
}
