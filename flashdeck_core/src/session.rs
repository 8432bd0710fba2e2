//! Study navigation: a cursor over the words of the active study mode

use std::collections::HashMap;

use crate::error::WordError;
use crate::word::{Status, WordId, WordRecord, WordStore};

/// Which words a study pass walks through
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StudyMode {
    #[default]
    New,
    Practice,
}

impl StudyMode {
    pub fn status(self) -> Status {
        match self {
            StudyMode::New => Status::New,
            StudyMode::Practice => Status::Practice,
        }
    }

    pub fn other(self) -> StudyMode {
        match self {
            StudyMode::New => StudyMode::Practice,
            StudyMode::Practice => StudyMode::New,
        }
    }
}

/// What the card area shows
#[derive(Debug, PartialEq)]
pub enum Current<'a> {
    Card(WordId, &'a WordRecord),
    /// Nothing left to study in either mode
    Finished,
}

/// Binds an in-flight sentence generation to the card it was started for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct GenerationTicket {
    word: WordId,
}

impl GenerationTicket {
    pub fn word(&self) -> WordId {
        self.word
    }
}

#[derive(Clone, Copy)]
enum Direction {
    Forward,
    Backward,
}

/// Working set plus navigation state for one study session
#[derive(Debug, Default)]
pub struct StudySession {
    words: WordStore,
    mode: StudyMode,
    current: Option<WordId>,
    flipped: bool,
    last_position: HashMap<StudyMode, WordId>,
    pending: Option<GenerationTicket>,
}

impl StudySession {
    pub fn new(words: WordStore) -> Self {
        let mut session = StudySession {
            words,
            ..Default::default()
        };
        session.relocate();
        session
    }

    /// Replace the working set wholesale and start from the first card
    pub fn load(&mut self, cards: Vec<WordRecord>) {
        self.words = WordStore::from_records(cards);
        self.last_position.clear();
        self.pending = None;
        self.flipped = false;
        self.relocate();
    }

    pub fn words(&self) -> &WordStore {
        &self.words
    }

    /// Mutable access for add/import/edit. Call [`StudySession::refresh`]
    /// afterwards if records may have been removed.
    pub fn words_mut(&mut self) -> &mut WordStore {
        &mut self.words
    }

    pub fn mode(&self) -> StudyMode {
        self.mode
    }

    pub fn is_flipped(&self) -> bool {
        self.flipped
    }

    pub fn flip(&mut self) {
        self.flipped = !self.flipped;
    }

    pub fn current_id(&self) -> Option<WordId> {
        self.current
    }

    pub fn current(&self) -> Current<'_> {
        match self.current.and_then(|id| self.words.get(id).map(|r| (id, r))) {
            Some((id, record)) => Current::Card(id, record),
            None => Current::Finished,
        }
    }

    pub fn filtered_view(&self, mode: StudyMode) -> Vec<WordId> {
        self.words.filtered(mode.status())
    }

    /// Repair the cursor after records were removed behind its back
    pub fn refresh(&mut self) {
        if let Some(id) = self.current {
            if self.words.get(id).is_none() {
                log::warn!("Current card {} no longer exists, resetting to first card", id);
                self.relocate();
            }
        } else if !self.filtered_view(self.mode).is_empty()
            || !self.filtered_view(self.mode.other()).is_empty()
        {
            self.relocate();
        }
    }

    pub fn advance(&mut self) {
        self.step(Direction::Forward);
    }

    pub fn retreat(&mut self) {
        self.step(Direction::Backward);
    }

    /// Move one card within the active mode, wrapping around. Scanning starts
    /// at the current card's place in store order, so a card that just left
    /// the mode is skipped rather than revisited.
    fn step(&mut self, direction: Direction) {
        let status = self.mode.status();
        let len = self.words.len();
        if len == 0 || self.words.filtered(status).is_empty() {
            return;
        }

        let start = match self.current.and_then(|id| self.words.position(id)) {
            Some(pos) => pos,
            None => {
                // Start just before the first slot so a forward scan begins at 0.
                self.current = None;
                match direction {
                    Direction::Forward => len - 1,
                    Direction::Backward => 0,
                }
            }
        };

        let next = (1..=len)
            .map(|k| match direction {
                Direction::Forward => (start + k) % len,
                Direction::Backward => (start + len * k - k) % len,
            })
            .filter_map(|i| self.words.at(i))
            .find(|(_, r)| r.status == status)
            .map(|(id, _)| id);

        if let Some(id) = next {
            log::debug!("Moved to card {} in {:?} mode", id, self.mode);
            self.current = Some(id);
            self.flipped = false;
        }
    }

    /// Change the active mode. With `resume`, return to where that mode was
    /// last left if the card is still part of it.
    pub fn switch_mode(&mut self, mode: StudyMode, resume: bool) {
        if let Some(id) = self.current {
            self.last_position.insert(self.mode, id);
        }
        self.mode = mode;
        self.flipped = false;

        let view = self.filtered_view(mode);
        let resumed = self
            .last_position
            .get(&mode)
            .copied()
            .filter(|id| resume && view.contains(id));
        self.current = resumed.or_else(|| view.first().copied());
    }

    /// Mark the current card and move on using the updated view. When the
    /// active mode runs dry the other mode takes over; when both are empty the
    /// session is finished.
    pub fn record_decision(&mut self, status: Status) -> Result<(), WordError> {
        let Some(id) = self.current else {
            return Ok(());
        };
        if self.words.get(id).is_none() {
            log::warn!("Current card {} no longer exists, resetting to first card", id);
            self.relocate();
            return Ok(());
        }
        self.words.set_status(id, status)?;

        if !self.filtered_view(self.mode).is_empty() {
            self.advance();
        } else {
            let other = self.mode.other();
            match self.filtered_view(other).first().copied() {
                Some(first) => {
                    log::info!("No {:?} words left, switching to {:?}", self.mode, other);
                    self.mode = other;
                    self.current = Some(first);
                }
                None => {
                    log::info!("All words reviewed");
                    self.current = None;
                }
            }
            self.flipped = false;
        }
        Ok(())
    }

    /// Point at the first card of the active mode, falling back to the other
    /// mode and then to the finished state
    fn relocate(&mut self) {
        self.flipped = false;
        if let Some(first) = self.filtered_view(self.mode).first().copied() {
            self.current = Some(first);
            return;
        }
        let other = self.mode.other();
        match self.filtered_view(other).first().copied() {
            Some(first) => {
                self.mode = other;
                self.current = Some(first);
            }
            None => self.current = None,
        }
    }

    /// Start generating content for the current card. Returns `None` while
    /// another generation is still pending.
    pub fn begin_generation(&mut self) -> Option<GenerationTicket> {
        if self.pending.is_some() {
            log::debug!("Generation already in progress");
            return None;
        }
        let ticket = GenerationTicket { word: self.current? };
        self.pending = Some(ticket);
        Some(ticket)
    }

    /// Drop a ticket whose generation failed
    pub fn abandon_generation(&mut self, ticket: GenerationTicket) {
        if self.pending == Some(ticket) {
            self.pending = None;
        }
    }

    pub fn generation_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Attach a generated sentence to the card the ticket was issued for, if
    /// that card is still current. Returns whether it was applied.
    pub fn finish_generation(&mut self, ticket: GenerationTicket, sentence: &str) -> bool {
        if self.pending == Some(ticket) {
            self.pending = None;
        }
        if self.current != Some(ticket.word) {
            log::warn!(
                "Discarding generated sentence for {}: card is no longer current",
                ticket.word
            );
            return false;
        }
        self.words.set_example_sentence(ticket.word, sentence).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(statuses: &[Status]) -> StudySession {
        let mut store = WordStore::new();
        for (i, status) in statuses.iter().enumerate() {
            let id = store.add_word(&format!("w{i}"), &format!("k{i}")).unwrap();
            store.set_status(id, *status).unwrap();
        }
        StudySession::new(store)
    }

    fn current_english(session: &StudySession) -> Option<String> {
        match session.current() {
            Current::Card(_, r) => Some(r.english.clone()),
            Current::Finished => None,
        }
    }

    fn assert_cursor_matches_mode(session: &StudySession) {
        if let Current::Card(_, record) = session.current() {
            assert_eq!(record.status, session.mode().status());
        }
    }

    use Status::{New as N, Ok as O, Practice as P};

    #[test]
    fn starts_at_first_card_of_mode() {
        let s = session(&[O, N, N]);
        assert_eq!(current_english(&s).as_deref(), Some("w1"));
    }

    #[test]
    fn advance_and_retreat_wrap_within_mode() {
        let mut s = session(&[N, P, N, N]);
        assert_eq!(current_english(&s).as_deref(), Some("w0"));
        s.advance();
        assert_eq!(current_english(&s).as_deref(), Some("w2"));
        s.advance();
        s.advance();
        assert_eq!(current_english(&s).as_deref(), Some("w0"));
        s.retreat();
        assert_eq!(current_english(&s).as_deref(), Some("w3"));
    }

    #[test]
    fn empty_view_leaves_cursor_alone() {
        let mut s = session(&[N, N]);
        s.advance();
        let before = s.current_id();
        s.switch_mode(StudyMode::Practice, false);
        assert_eq!(s.current(), Current::Finished);
        s.advance();
        assert_eq!(s.current(), Current::Finished);
        s.switch_mode(StudyMode::New, true);
        assert_eq!(s.current_id(), before);
    }

    #[test]
    fn decision_skips_cards_leaving_the_mode() {
        let mut s = session(&[N, N, N]);
        s.record_decision(O).unwrap();
        assert_eq!(current_english(&s).as_deref(), Some("w1"));
        assert_cursor_matches_mode(&s);
        s.record_decision(P).unwrap();
        assert_eq!(current_english(&s).as_deref(), Some("w2"));
        assert_cursor_matches_mode(&s);
    }

    #[test]
    fn decision_falls_back_to_other_mode_then_finishes() {
        let mut s = session(&[N, P]);
        s.record_decision(O).unwrap();
        assert_eq!(s.mode(), StudyMode::Practice);
        assert_eq!(current_english(&s).as_deref(), Some("w1"));

        s.record_decision(O).unwrap();
        assert_eq!(s.current(), Current::Finished);
        s.record_decision(O).unwrap();
        assert_eq!(s.current(), Current::Finished);
    }

    #[test]
    fn cursor_always_matches_mode_after_decisions() {
        let mut s = session(&[N, P, N, P, N, N, P]);
        let decisions = [P, O, O, P, O, P, O, O, O, O, O, O, O, O];
        for status in decisions {
            s.record_decision(status).unwrap();
            assert_cursor_matches_mode(&s);
        }
        assert_eq!(s.current(), Current::Finished);
        assert_eq!(s.words().counts().ok, 7);
    }

    #[test]
    fn practice_decision_in_practice_mode_moves_on() {
        let mut s = session(&[P, P]);
        assert_eq!(s.mode(), StudyMode::Practice);
        s.record_decision(P).unwrap();
        assert_eq!(current_english(&s).as_deref(), Some("w1"));
    }

    #[test]
    fn switch_mode_can_resume() {
        let mut s = session(&[N, N, P, P]);
        s.advance();
        s.switch_mode(StudyMode::Practice, false);
        assert_eq!(current_english(&s).as_deref(), Some("w2"));
        s.advance();
        s.switch_mode(StudyMode::New, true);
        assert_eq!(current_english(&s).as_deref(), Some("w1"));
        s.switch_mode(StudyMode::Practice, false);
        assert_eq!(current_english(&s).as_deref(), Some("w2"));
    }

    #[test]
    fn navigation_unflips() {
        let mut s = session(&[N, N]);
        s.flip();
        assert!(s.is_flipped());
        s.advance();
        assert!(!s.is_flipped());
    }

    #[test]
    fn edit_shows_through_current_card() {
        let mut s = session(&[N, N]);
        let id = s.current_id().unwrap();
        s.words_mut().edit_word(id, "apple", "elma").unwrap();
        assert_eq!(current_english(&s).as_deref(), Some("apple"));
    }

    #[test]
    fn removed_current_card_resets_cursor() {
        let mut s = session(&[N, N, N]);
        s.advance();
        let id = s.current_id().unwrap();
        s.words_mut().remove(id).unwrap();
        s.refresh();
        assert_eq!(current_english(&s).as_deref(), Some("w0"));
    }

    #[test]
    fn decision_on_removed_card_recovers() {
        let mut s = session(&[N, N]);
        let id = s.current_id().unwrap();
        s.words_mut().remove(id).unwrap();

        s.record_decision(O).unwrap();
        assert_eq!(current_english(&s).as_deref(), Some("w1"));
        assert_eq!(s.words().counts().new, 1);
    }

    #[test]
    fn load_replaces_words_and_resets() {
        let mut s = session(&[N, N, N]);
        s.advance();
        let mut practice = WordRecord::new("sun", "güneş");
        practice.status = P;
        s.load(vec![WordRecord::new("moon", "ay"), practice]);
        assert_eq!(s.words().len(), 2);
        assert_eq!(current_english(&s).as_deref(), Some("moon"));
    }

    #[test]
    fn generation_lands_only_on_its_own_card() {
        let mut s = session(&[N, N]);
        let ticket = s.begin_generation().unwrap();
        assert!(s.generation_pending());
        assert!(s.finish_generation(ticket, "w0 in a sentence."));
        assert!(!s.generation_pending());

        let stale = s.begin_generation().unwrap();
        s.advance();
        assert!(!s.finish_generation(stale, "late"));
        let second = s.current_id().unwrap();
        assert_eq!(s.words().get(second).unwrap().example_sentence, None);
        assert_eq!(
            s.words().get(stale.word()).unwrap().example_sentence.as_deref(),
            Some("w0 in a sentence.")
        );
    }

    #[test]
    fn one_generation_at_a_time() {
        let mut s = session(&[N, N]);
        let ticket = s.begin_generation().unwrap();
        assert_eq!(s.begin_generation(), None);
        s.advance();
        assert_eq!(s.begin_generation(), None);

        assert!(!s.finish_generation(ticket, "late"));
        let next = s.begin_generation().unwrap();
        assert_eq!(Some(next.word()), s.current_id());

        s.abandon_generation(next);
        assert!(!s.generation_pending());
        assert!(s.begin_generation().is_some());
    }
}
