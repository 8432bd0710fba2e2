//! Multiple-choice quizzes over practice words

use rand::seq::SliceRandom;
use rand::Rng;
use std::fmt;
use std::str::FromStr;

use crate::error::{QuizError, ServiceError};
use crate::fuzzy::is_near_duplicate;
use crate::generator::{
    find_ignore_case, find_word_ignore_case, CompletionService, ContentGenerator, PLACEHOLDER,
};
use crate::word::WordRecord;

/// Options per question, correct answer included
pub const OPTION_COUNT: usize = 4;

/// Question styles
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum QuizKind {
    /// English word shown, pick the Turkish translation
    #[default]
    Translation,
    /// AI sentence with the word blanked out, AI-chosen wrong options
    FillInBlank,
    /// AI placeholder sentence, alternatives of the same grammatical subtype
    Cloze,
}

impl QuizKind {
    pub fn needs_generator(&self) -> bool {
        !matches!(self, QuizKind::Translation)
    }
}

impl fmt::Display for QuizKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            QuizKind::Translation => "translation",
            QuizKind::FillInBlank => "fill-in-blank",
            QuizKind::Cloze => "cloze",
        })
    }
}

impl FromStr for QuizKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "translation" => Ok(QuizKind::Translation),
            "fill-in-blank" | "grammar" => Ok(QuizKind::FillInBlank),
            "cloze" | "practice" => Ok(QuizKind::Cloze),
            other => Err(format!("unknown quiz kind '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    /// English key of the word being tested
    pub word: String,
    pub prompt: String,
    pub word_type: Option<String>,
    pub options: Vec<String>,
    pub correct_answer: String,
}

fn accepts(options: &[String], candidate: &str, correct: &str) -> bool {
    let lowered = candidate.to_lowercase();
    !candidate.is_empty()
        && !is_near_duplicate(candidate, correct)
        && !options.iter().any(|o| o.to_lowercase() == lowered)
}

/// Option set holding `correct` exactly once plus up to `size - 1`
/// distinct distractors. `candidates` are tried first in order; any shortfall
/// is sampled uniformly from `pool`.
pub fn build_options<R: Rng + ?Sized>(
    correct: &str,
    candidates: impl IntoIterator<Item = String>,
    pool: &[String],
    size: usize,
    rng: &mut R,
) -> Vec<String> {
    let correct = correct.trim();
    let mut options = vec![correct.to_string()];

    for candidate in candidates {
        if options.len() >= size {
            break;
        }
        let candidate = candidate.trim();
        if accepts(&options, candidate, correct) {
            options.push(candidate.to_string());
        }
    }

    if options.len() < size {
        let mut pool: Vec<&String> = pool.iter().collect();
        pool.shuffle(rng);
        for candidate in pool {
            if options.len() >= size {
                break;
            }
            let candidate = candidate.trim();
            if accepts(&options, candidate, correct) {
                options.push(candidate.to_string());
            }
        }
    }

    options.shuffle(rng);
    options
}

/// Replace `word` with the blank marker, preferring a whole-word match
pub fn blank_out(sentence: &str, word: &str) -> String {
    let found = find_word_ignore_case(sentence, word).or_else(|| find_ignore_case(sentence, word));
    match found {
        Some(start) => {
            let end = start + word.len();
            format!("{}{}{}", &sentence[..start], PLACEHOLDER, &sentence[end..])
        }
        None => sentence.to_string(),
    }
}

pub fn translation_questions<R: Rng + ?Sized>(words: &[WordRecord], rng: &mut R) -> Vec<Question> {
    let pool: Vec<String> = words.iter().map(|w| w.turkish.clone()).collect();
    let mut questions: Vec<Question> = words
        .iter()
        .map(|w| {
            let correct = w.turkish.trim();
            Question {
                word: w.english.clone(),
                prompt: w.english.trim().to_string(),
                word_type: None,
                options: build_options(correct, Vec::new(), &pool, OPTION_COUNT, rng),
                correct_answer: correct.to_string(),
            }
        })
        .collect();
    questions.shuffle(rng);
    questions
}

pub fn fill_in_blank_questions<C, R>(
    words: &[WordRecord],
    generator: &ContentGenerator<C>,
    rng: &mut R,
) -> Result<Vec<Question>, ServiceError>
where
    C: CompletionService,
    R: Rng + ?Sized,
{
    let pool: Vec<String> = words.iter().map(|w| w.english.clone()).collect();
    let mut questions = Vec::with_capacity(words.len());
    for word in words {
        let content = generator.fill_in_blank(word)?;
        let correct = word.english.trim();
        questions.push(Question {
            word: word.english.clone(),
            prompt: blank_out(&content.sentence, correct),
            word_type: Some(content.word_type),
            options: build_options(correct, content.options, &pool, OPTION_COUNT, rng),
            correct_answer: correct.to_string(),
        });
    }
    questions.shuffle(rng);
    Ok(questions)
}

pub fn cloze_questions<C, R>(
    words: &[WordRecord],
    generator: &ContentGenerator<C>,
    rng: &mut R,
) -> Result<Vec<Question>, ServiceError>
where
    C: CompletionService,
    R: Rng + ?Sized,
{
    let pool: Vec<String> = words.iter().map(|w| w.english.to_lowercase()).collect();
    let mut questions = Vec::with_capacity(words.len());
    for word in words {
        let content = generator.cloze(word)?;
        let correct = word.english.trim();
        questions.push(Question {
            word: word.english.clone(),
            prompt: content.sentence,
            word_type: Some(content.word_type),
            options: build_options(correct, content.alternatives, &pool, OPTION_COUNT, rng),
            correct_answer: correct.to_string(),
        });
    }
    questions.shuffle(rng);
    Ok(questions)
}

/// Build a quiz's questions. AI-backed kinds need a generator.
pub fn build_questions<C, R>(
    kind: QuizKind,
    words: &[WordRecord],
    generator: Option<&ContentGenerator<C>>,
    rng: &mut R,
) -> Result<Vec<Question>, QuizError>
where
    C: CompletionService,
    R: Rng + ?Sized,
{
    if words.is_empty() {
        return Err(QuizError::NoPracticeWords);
    }
    let questions = match (kind, generator) {
        (QuizKind::Translation, _) => translation_questions(words, rng),
        (QuizKind::FillInBlank, Some(generator)) => fill_in_blank_questions(words, generator, rng)?,
        (QuizKind::Cloze, Some(generator)) => cloze_questions(words, generator, rng)?,
        (_, None) => return Err(ServiceError::MissingApiKey.into()),
    };
    log::info!("Built {} {} questions", questions.len(), kind);
    Ok(questions)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Answering(usize),
    Results,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Score {
    pub correct: usize,
    pub total: usize,
}

impl Score {
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.correct as f64 / self.total as f64
    }

    /// Percentage rounded to one decimal place
    pub fn percent(&self) -> f64 {
        (self.ratio() * 1000.0).round() / 10.0
    }
}

/// One row of the results screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome<'a> {
    pub question: &'a Question,
    pub answer: Option<&'a str>,
    pub correct: bool,
}

/// A quiz session: questions, the answers given so far and where we are
#[derive(Debug, Clone)]
pub struct Quiz {
    questions: Vec<Question>,
    answers: Vec<Option<String>>,
    phase: Phase,
    auto_advance: bool,
}

impl Quiz {
    /// With `auto_advance`, answering moves to the next question and the last
    /// answer ends the quiz; otherwise navigation is manual.
    pub fn new(questions: Vec<Question>, auto_advance: bool) -> Self {
        let phase = if questions.is_empty() {
            Phase::Results
        } else {
            Phase::Answering(0)
        };
        Quiz {
            answers: vec![None; questions.len()],
            questions,
            phase,
            auto_advance,
        }
    }

    pub fn for_kind(kind: QuizKind, questions: Vec<Question>) -> Self {
        Self::new(questions, kind == QuizKind::Translation)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn current(&self) -> Option<(usize, &Question)> {
        match self.phase {
            Phase::Answering(i) => self.questions.get(i).map(|q| (i, q)),
            Phase::Results => None,
        }
    }

    pub fn answer_for(&self, index: usize) -> Option<&str> {
        self.answers.get(index).and_then(|a| a.as_deref())
    }

    /// Record an answer for the current question. Returns false when the quiz
    /// is over or the option is not one of the question's options.
    pub fn answer(&mut self, option: &str) -> bool {
        let Phase::Answering(i) = self.phase else {
            return false;
        };
        if !self.questions[i].options.iter().any(|o| o == option) {
            return false;
        }
        self.answers[i] = Some(option.to_string());

        if self.auto_advance {
            self.phase = if i + 1 < self.questions.len() {
                Phase::Answering(i + 1)
            } else {
                Phase::Results
            };
        }
        true
    }

    pub fn next(&mut self) {
        if let Phase::Answering(i) = self.phase {
            if i + 1 < self.questions.len() {
                self.phase = Phase::Answering(i + 1);
            }
        }
    }

    pub fn previous(&mut self) {
        if let Phase::Answering(i) = self.phase {
            if i > 0 {
                self.phase = Phase::Answering(i - 1);
            }
        }
    }

    /// End the quiz now; unanswered questions count as wrong
    pub fn finish(&mut self) {
        self.phase = Phase::Results;
    }

    /// Clear all answers and start over with the same questions
    pub fn reset(&mut self) {
        self.answers = vec![None; self.questions.len()];
        self.phase = if self.questions.is_empty() {
            Phase::Results
        } else {
            Phase::Answering(0)
        };
    }

    fn is_correct(&self, index: usize) -> bool {
        self.answer_for(index) == Some(self.questions[index].correct_answer.as_str())
    }

    pub fn score(&self) -> Score {
        Score {
            correct: (0..self.questions.len()).filter(|&i| self.is_correct(i)).count(),
            total: self.questions.len(),
        }
    }

    pub fn outcomes(&self) -> Vec<Outcome<'_>> {
        self.questions
            .iter()
            .enumerate()
            .map(|(i, question)| Outcome {
                question,
                answer: self.answer_for(i),
                correct: self.is_correct(i),
            })
            .collect()
    }

    /// English keys of correctly answered words, one entry per correct answer
    pub fn correct_words(&self) -> Vec<String> {
        self.outcomes()
            .into_iter()
            .filter(|o| o.correct)
            .map(|o| o.question.word.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::tests::StubService;
    use crate::word::Status;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn practice(pairs: &[(&str, &str)]) -> Vec<WordRecord> {
        pairs
            .iter()
            .map(|(e, t)| {
                let mut w = WordRecord::new(e, t);
                w.status = Status::Practice;
                w
            })
            .collect()
    }

    fn assert_valid_options(question: &Question) {
        let hits = question.options.iter().filter(|o| **o == question.correct_answer).count();
        assert_eq!(hits, 1, "{question:?}");
        let distinct: HashSet<String> = question.options.iter().map(|o| o.to_lowercase()).collect();
        assert_eq!(distinct.len(), question.options.len(), "{question:?}");
    }

    #[test]
    fn options_hold_answer_once_without_duplicates() {
        let pool: Vec<String> = ["kitap", "ev", "su", "elma", "Kitap", "masa"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let candidates: Vec<String> = ["kitap", "KİTAP", "", "ev", "ev"]
                .iter()
                .map(|s| s.to_string())
                .collect();
            let options = build_options("kitap", candidates, &pool, OPTION_COUNT, &mut rng);
            assert_eq!(options.len(), OPTION_COUNT);
            let question = Question {
                word: "book".into(),
                prompt: "book".into(),
                word_type: None,
                options,
                correct_answer: "kitap".into(),
            };
            assert_valid_options(&question);
        }
    }

    #[test]
    fn small_pool_yields_fewer_options() {
        let mut rng = StdRng::seed_from_u64(3);
        let pool = vec!["elma".to_string(), "su".to_string()];
        let mut options = build_options("elma", Vec::new(), &pool, OPTION_COUNT, &mut rng);
        options.sort();
        assert_eq!(options, vec!["elma", "su"]);
    }

    #[test]
    fn near_duplicates_of_the_answer_are_dropped() {
        let mut rng = StdRng::seed_from_u64(9);
        let options = build_options(
            "apple",
            vec!["apples".to_string(), "bicycle".to_string()],
            &["window".to_string(), "potato".to_string()],
            OPTION_COUNT,
            &mut rng,
        );
        assert!(!options.contains(&"apples".to_string()));
        assert_eq!(options.len(), 4);
    }

    #[test]
    fn translation_quiz_covers_every_word() {
        let words = practice(&[
            ("apple", "elma"),
            ("book", "kitap"),
            ("house", "ev"),
            ("water", "su"),
            ("door", "kapı"),
        ]);
        let mut rng = StdRng::seed_from_u64(11);
        let questions = translation_questions(&words, &mut rng);
        assert_eq!(questions.len(), 5);
        let asked: HashSet<&str> = questions.iter().map(|q| q.prompt.as_str()).collect();
        assert_eq!(asked.len(), 5);
        for q in &questions {
            assert_eq!(q.options.len(), OPTION_COUNT);
            assert_valid_options(q);
        }
    }

    #[test]
    fn padded_cards_still_score() {
        let mut words =
            practice(&[("apple", "elma"), ("book", "kitap"), ("house", "ev"), ("water", "su")]);
        words[0].turkish = "elma ".into();
        words[1].english = " book".into();
        let mut rng = StdRng::seed_from_u64(7);
        let questions = translation_questions(&words, &mut rng);
        for q in &questions {
            assert_valid_options(q);
        }
        let apple = questions.iter().find(|q| q.word == "apple").unwrap();
        assert_eq!(apple.correct_answer, "elma");

        let mut quiz = Quiz::for_kind(QuizKind::Translation, questions);
        while let Some((_, question)) = quiz.current() {
            let answer = question.correct_answer.clone();
            assert!(quiz.answer(&answer));
        }
        assert_eq!(quiz.score(), Score { correct: 4, total: 4 });
    }

    #[test]
    fn blank_prefers_the_whole_word() {
        assert_eq!(
            blank_out("I have already read it.", "read"),
            format!("I have already {PLACEHOLDER} it.")
        );
        assert_eq!(blank_out("Stop Reading.", "read"), format!("Stop {PLACEHOLDER}ing."));
        assert_eq!(
            blank_out("It is already late.", "read"),
            format!("It is al{PLACEHOLDER}y late.")
        );
    }

    #[test]
    fn fill_in_blank_hides_the_word() {
        let words = practice(&[("sprint", "koşmak"), ("read", "okumak")]);
        let stub = StubService::new(vec![
            Ok(r#"{"sentence": "Athletes Sprint to the line.", "wordType": "verb", "options": ["sleep", "cry", "sing"]}"#.into()),
            Ok("garbage".into()),
        ]);
        let generator = ContentGenerator::new(&stub, "m");
        let mut rng = StdRng::seed_from_u64(5);
        let questions = fill_in_blank_questions(&words, &generator, &mut rng).unwrap();
        assert_eq!(questions.len(), 2);

        let sprint = questions.iter().find(|q| q.word == "sprint").unwrap();
        assert_eq!(sprint.prompt, format!("Athletes {PLACEHOLDER} to the line."));
        assert_eq!(sprint.word_type.as_deref(), Some("verb"));
        let read = questions.iter().find(|q| q.word == "read").unwrap();
        assert_eq!(read.prompt, format!("The students {PLACEHOLDER} their homework carefully."));
        for q in &questions {
            assert_eq!(q.options.len(), OPTION_COUNT);
            assert_valid_options(q);
        }
    }

    #[test]
    fn cloze_tops_up_from_pool() {
        let words = practice(&[
            ("umbrella", "şemsiye"),
            ("bicycle", "bisiklet"),
            ("potato", "patates"),
            ("window", "pencere"),
        ]);
        let stub = StubService::new(vec![
            Ok(r#"{"wordType": "noun", "sentence": "I need an __________ today.", "alternatives": ["Umbrella", "carpet", "carpet"]}"#.into()),
        ]);
        let generator = ContentGenerator::new(&stub, "m");
        let mut rng = StdRng::seed_from_u64(2);
        let questions = cloze_questions(&words, &generator, &mut rng).unwrap();
        assert_eq!(questions.len(), 4);
        for q in &questions {
            assert_eq!(q.options.len(), OPTION_COUNT, "{q:?}");
            assert_valid_options(q);
        }
        let umbrella = questions.iter().find(|q| q.word == "umbrella").unwrap();
        assert!(umbrella.options.contains(&"carpet".to_string()));
    }

    #[test]
    fn service_failure_aborts_ai_quiz() {
        let words = practice(&[("sprint", "koşmak")]);
        let stub = StubService::new(vec![Err(ServiceError::Status {
            status: 401,
            body: "bad key".into(),
        })]);
        let generator = ContentGenerator::new(&stub, "m");
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            build_questions(QuizKind::FillInBlank, &words, Some(&generator), &mut rng),
            Err(QuizError::Service(ServiceError::Status { status: 401, .. }))
        ));
    }

    #[test]
    fn empty_practice_set_is_reported() {
        let mut rng = StdRng::seed_from_u64(1);
        let none: Option<&ContentGenerator<StubService>> = None;
        assert!(matches!(
            build_questions(QuizKind::Translation, &[], none, &mut rng),
            Err(QuizError::NoPracticeWords)
        ));
        let words = practice(&[("a", "b")]);
        assert!(matches!(
            build_questions(QuizKind::Cloze, &words, none, &mut rng),
            Err(QuizError::Service(ServiceError::MissingApiKey))
        ));
    }

    fn sample_quiz(auto_advance: bool) -> Quiz {
        let questions = (0..3)
            .map(|i| Question {
                word: format!("w{i}"),
                prompt: format!("w{i}"),
                word_type: None,
                options: vec![format!("right{i}"), format!("wrong{i}")],
                correct_answer: format!("right{i}"),
            })
            .collect();
        Quiz::new(questions, auto_advance)
    }

    #[test]
    fn auto_advance_ends_after_last_answer() {
        let mut quiz = sample_quiz(true);
        assert!(quiz.answer("right0"));
        assert_eq!(quiz.phase(), Phase::Answering(1));
        assert!(!quiz.answer("not an option"));
        assert!(quiz.answer("wrong1"));
        assert!(quiz.answer("right2"));
        assert_eq!(quiz.phase(), Phase::Results);
        assert!(!quiz.answer("right2"));

        let score = quiz.score();
        assert_eq!((score.correct, score.total), (2, 3));
        assert_eq!(score.percent(), 66.7);
        assert_eq!(quiz.correct_words(), vec!["w0", "w2"]);
    }

    #[test]
    fn manual_navigation_keeps_answers() {
        let mut quiz = sample_quiz(false);
        quiz.answer("right0");
        assert_eq!(quiz.phase(), Phase::Answering(0));
        quiz.previous();
        assert_eq!(quiz.phase(), Phase::Answering(0));
        quiz.next();
        quiz.next();
        quiz.next();
        assert_eq!(quiz.phase(), Phase::Answering(2));
        quiz.previous();
        quiz.previous();
        assert_eq!(quiz.current().unwrap().1.word, "w0");
        assert_eq!(quiz.answer_for(0), Some("right0"));
        quiz.finish();
        assert_eq!(quiz.phase(), Phase::Results);
        assert_eq!(quiz.score().correct, 1);
    }

    #[test]
    fn perfect_and_blank_scores() {
        let mut quiz = sample_quiz(true);
        for i in 0..3 {
            quiz.answer(&format!("right{i}"));
        }
        assert_eq!(quiz.score().ratio(), 1.0);
        assert_eq!(quiz.score().percent(), 100.0);

        quiz.reset();
        assert_eq!(quiz.phase(), Phase::Answering(0));
        quiz.finish();
        assert_eq!(quiz.score().ratio(), 0.0);
        assert!(quiz.outcomes().iter().all(|o| o.answer.is_none() && !o.correct));
    }

    #[test]
    fn quiz_kind_parsing() {
        assert_eq!("grammar".parse::<QuizKind>().unwrap(), QuizKind::FillInBlank);
        assert_eq!("cloze".parse::<QuizKind>().unwrap(), QuizKind::Cloze);
        assert!(QuizKind::Cloze.needs_generator());
        assert!(!QuizKind::Translation.needs_generator());
    }
}
