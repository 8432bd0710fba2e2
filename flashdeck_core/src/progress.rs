//! Quiz progress: correct-answer streaks that move words out of practice

use std::collections::HashMap;

use crate::error::ListError;
use crate::lists::ListRepository;
use crate::storage::KeyValueStore;
use crate::word::{dedup_key, Status, WordRecord};

/// Correct answers after which a word counts as known
pub const PROMOTION_THRESHOLD: u32 = 5;

/// Result of applying one quiz's correct answers
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    /// Cards whose count went up
    pub updated: usize,
    /// English values promoted to OK
    pub promoted: Vec<String>,
}

/// Bump `correct_count` for each correctly answered word and promote words
/// that reach [`PROMOTION_THRESHOLD`]
pub fn apply_correct_answers(cards: &mut [WordRecord], correct_words: &[String]) -> ProgressUpdate {
    let mut hits: HashMap<String, u32> = HashMap::new();
    for word in correct_words {
        *hits.entry(dedup_key(word)).or_insert(0) += 1;
    }

    let mut update = ProgressUpdate::default();
    for card in cards.iter_mut() {
        let Some(&n) = hits.get(&card.key()) else {
            continue;
        };
        card.correct_count += n;
        update.updated += 1;
        if card.correct_count >= PROMOTION_THRESHOLD && card.status != Status::Ok {
            card.status = Status::Ok;
            update.promoted.push(card.english.clone());
        }
    }
    update
}

impl<S: KeyValueStore> ListRepository<S> {
    /// Persist quiz progress into the active list, or into every list when
    /// none is active
    pub fn record_quiz_progress(
        &mut self,
        correct_words: &[String],
    ) -> Result<ProgressUpdate, ListError> {
        let current = self.current_list_name()?;
        let mut lists = self.lists()?;
        let mut total = ProgressUpdate::default();

        for list in lists
            .iter_mut()
            .filter(|l| current.as_deref().map_or(true, |name| l.name == name))
        {
            let update = apply_correct_answers(&mut list.cards, correct_words);
            total.updated += update.updated;
            for word in update.promoted {
                if !total.promoted.contains(&word) {
                    total.promoted.push(word);
                }
            }
        }

        self.write_lists(&lists)?;
        for word in &total.promoted {
            log::info!(
                "'{}' reached {} correct answers, moved to known words",
                word,
                PROMOTION_THRESHOLD
            );
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lists::Category;
    use crate::storage::MemoryStore;
    use crate::word::WordStore;

    fn practice_card(english: &str, count: u32) -> WordRecord {
        let mut card = WordRecord::new(english, "x");
        card.status = Status::Practice;
        card.correct_count = count;
        card
    }

    #[test]
    fn fifth_correct_answer_promotes() {
        let mut cards = vec![
            practice_card("apple", 4),
            practice_card("book", 1),
            practice_card("door", 0),
        ];
        let update = apply_correct_answers(&mut cards, &["Apple".to_string(), "book".to_string()]);
        assert_eq!(update.updated, 2);
        assert_eq!(update.promoted, vec!["apple"]);
        assert_eq!(cards[0].status, Status::Ok);
        assert_eq!(cards[0].correct_count, 5);
        assert_eq!(cards[1].status, Status::Practice);
        assert_eq!(cards[1].correct_count, 2);
        assert_eq!(cards[2].correct_count, 0);
    }

    #[test]
    fn promoted_words_leave_practice_filtering() {
        let mut cards = vec![practice_card("apple", 4), practice_card("book", 0)];
        apply_correct_answers(&mut cards, &["apple".to_string()]);
        let store = WordStore::from_records(cards);
        let practice = store.filtered_records(Status::Practice);
        assert_eq!(practice.len(), 1);
        assert_eq!(practice[0].english, "book");
    }

    #[test]
    fn progress_is_written_to_the_active_list_only() {
        let mut repo = ListRepository::new(MemoryStore::new());
        let cards = vec![practice_card("apple", 4), practice_card("book", 0)];
        let store = WordStore::from_records(cards);
        repo.save_list("Fruit", Category::All, &store).unwrap();
        repo.save_list("Other", Category::All, &store).unwrap();
        repo.set_current_list(Some("Fruit")).unwrap();

        let update = repo.record_quiz_progress(&["apple".to_string()]).unwrap();
        assert_eq!(update.promoted, vec!["apple"]);

        let fruit = repo.load_list("Fruit").unwrap();
        assert_eq!(fruit.cards[0].status, Status::Ok);
        let other = repo.load_list("Other").unwrap();
        assert_eq!(other.cards[0].status, Status::Practice);
        assert_eq!(other.cards[0].correct_count, 4);
        assert_eq!(repo.practice_words().unwrap().len(), 1);
    }

    #[test]
    fn progress_without_active_list_touches_every_list() {
        let mut repo = ListRepository::new(MemoryStore::new());
        let store = WordStore::from_records(vec![practice_card("apple", 4)]);
        repo.save_list("A", Category::All, &store).unwrap();
        repo.save_list("B", Category::All, &store).unwrap();

        let update = repo.record_quiz_progress(&["apple".to_string()]).unwrap();
        assert_eq!(update.updated, 2);
        assert_eq!(update.promoted, vec!["apple"]);
        assert!(repo.practice_words().unwrap().is_empty());
    }
}
