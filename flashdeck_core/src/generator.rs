//! AI-written example sentences and quiz content from a chat-completion service
//!
//! Service failures (network, HTTP status, missing key) are returned to the
//! caller. Responses that arrive but have the wrong shape are logged and
//! replaced with fixed fallback content.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::config::Config;
use crate::error::ServiceError;
use crate::word::WordRecord;

/// Blank marker used in cloze sentences
pub const PLACEHOLDER: &str = "__________";

/// One chat-completion call
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub system_prompt: String,
    pub user_prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Ask the service to answer with a JSON object
    pub json_response: bool,
}

/// Anything that can turn a request into completion text
pub trait CompletionService {
    fn complete(&self, request: &CompletionRequest) -> Result<String, ServiceError>;
}

impl<T: CompletionService + ?Sized> CompletionService for &T {
    fn complete(&self, request: &CompletionRequest) -> Result<String, ServiceError> {
        (**self).complete(request)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

impl<'a> From<&'a CompletionRequest> for ChatRequest<'a> {
    fn from(request: &'a CompletionRequest) -> Self {
        ChatRequest {
            model: &request.model,
            messages: [
                ChatMessage { role: "system", content: &request.system_prompt },
                ChatMessage { role: "user", content: &request.user_prompt },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format: request
                .json_response
                .then_some(ResponseFormat { kind: "json_object" }),
        }
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

impl ChatResponse {
    /// Text of the first choice; empty when there is none
    fn into_content(self) -> String {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default()
    }
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Client for OpenAI-compatible `/chat/completions` endpoints
pub struct OpenAiClient {
    http: reqwest::blocking::Client,
    api_base: String,
    api_key: String,
}

impl OpenAiClient {
    pub fn new(
        api_key: impl Into<String>,
        api_base: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let http = reqwest::blocking::Client::builder().timeout(timeout).build()?;
        Ok(OpenAiClient {
            http,
            api_base: api_base.into(),
            api_key: api_key.into(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ServiceError> {
        let api_key = config.api_key.clone().ok_or(ServiceError::MissingApiKey)?;
        Self::new(api_key, config.api_base.clone(), config.request_timeout)
    }
}

impl CompletionService for OpenAiClient {
    fn complete(&self, request: &CompletionRequest) -> Result<String, ServiceError> {
        let body = ChatRequest::from(request);

        let url = format!("{}/chat/completions", self.api_base.trim_end_matches('/'));
        log::debug!("POST {} (model {})", url, request.model);
        let response = self.http.post(url).bearer_auth(&self.api_key).json(&body).send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ServiceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json()?;
        Ok(parsed.into_content())
    }
}

/// Why a completion could not be used as-is
#[derive(Debug, Error)]
enum ShapeError {
    #[error("response is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("field '{0}' is missing or empty")]
    EmptyField(&'static str),
    #[error("expected 3 options, got {0}")]
    OptionCount(usize),
    #[error("sentence has no blank placeholder")]
    MissingPlaceholder,
    #[error("sentence gives the answer away")]
    RevealsAnswer,
}

/// Sentence containing the word, with three wrong options of the same kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillInBlank {
    pub sentence: String,
    pub word_type: String,
    pub options: Vec<String>,
}

impl FillInBlank {
    fn fallback(english: &str) -> Self {
        FillInBlank {
            sentence: format!("The students {} their homework carefully.", english),
            word_type: "verb".to_string(),
            options: vec!["jump".to_string(), "sleep".to_string(), "dance".to_string()],
        }
    }
}

/// Sentence with a [`PLACEHOLDER`] where the word belongs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cloze {
    pub sentence: String,
    pub word_type: String,
    /// Empty when the service gave nothing usable; the quiz tops up from its pool
    pub alternatives: Vec<String>,
}

impl Cloze {
    fn fallback(word: &WordRecord) -> Self {
        Cloze {
            sentence: format!("{} (Turkish: \"{}\")", PLACEHOLDER, word.turkish),
            word_type: "word".to_string(),
            alternatives: Vec::new(),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFillInBlank {
    sentence: String,
    word_type: String,
    options: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCloze {
    word_type: String,
    sentence: String,
    alternatives: Vec<String>,
}

/// Builds prompts, calls the service and validates what comes back
pub struct ContentGenerator<C> {
    service: C,
    model: String,
}

impl<C: CompletionService> ContentGenerator<C> {
    pub fn new(service: C, model: impl Into<String>) -> Self {
        ContentGenerator {
            service,
            model: model.into(),
        }
    }

    fn request(
        &self,
        system: &str,
        user: String,
        temperature: f32,
        max_tokens: u32,
        json: bool,
    ) -> CompletionRequest {
        CompletionRequest {
            model: self.model.clone(),
            system_prompt: system.to_string(),
            user_prompt: user,
            temperature,
            max_tokens,
            json_response: json,
        }
    }

    /// One example sentence for a card
    pub fn generate_sentence(&self, word: &WordRecord) -> Result<String, ServiceError> {
        let request = self.request(
            "You are a language learning assistant for Turkish speakers learning English. \
             Write short, natural sentences at an intermediate level.",
            format!(
                "Write one English example sentence that uses the word \"{}\" (Turkish: \"{}\") \
                 in its most common meaning. Reply with the sentence only.",
                word.english, word.turkish
            ),
            0.7,
            150,
            false,
        );
        let content = self.service.complete(&request)?;

        Ok(parse_sentence(&content, &word.english).unwrap_or_else(|e| {
            log::warn!("Unusable sentence for '{}': {}", word.english, e);
            format!("Here is an example sentence with the word \"{}\".", word.english)
        }))
    }

    /// Fill-in-the-blank content: a sentence where only this word fits
    pub fn fill_in_blank(&self, word: &WordRecord) -> Result<FillInBlank, ServiceError> {
        let w = &word.english;
        let request = self.request(
            "You are a quiz generator. Always respond with a valid JSON object containing exactly: \
             sentence, wordType, and options (array of 3 strings).",
            format!(
                "Create a fill-in-the-blank question for the word \"{w}\".\n\
                 Return JSON: {{\"sentence\": \"...\", \"wordType\": \"...\", \"options\": [\"...\", \"...\", \"...\"]}}\n\
                 - The sentence uses \"{w}\" and only \"{w}\" fits it.\n\
                 - wordType is the part of speech (noun/verb/adjective/adverb).\n\
                 - The three options share that part of speech, are not synonyms of \"{w}\", \
                 and are clearly wrong in the sentence."
            ),
            0.5,
            300,
            true,
        );
        let content = self.service.complete(&request)?;

        Ok(parse_fill_in_blank(&content, w).unwrap_or_else(|e| {
            log::warn!("Invalid fill-in-the-blank response for '{}': {}", w, e);
            FillInBlank::fallback(w)
        }))
    }

    /// Cloze content: a placeholder sentence plus structurally similar but
    /// unrelated alternatives
    pub fn cloze(&self, word: &WordRecord) -> Result<Cloze, ServiceError> {
        let w = &word.english;
        let request = self.request(
            "You are a language learning assistant that writes challenging test questions. \
             Alternatives must have exactly the same grammatical subtype as the answer but come \
             from unrelated semantic domains, and the sentence must leave only the answer sensible.",
            format!(
                "Write a practice question for the English word \"{w}\" (Turkish: \"{t}\").\n\
                 1. Identify its detailed grammatical type (e.g. \"countable noun\", \"transitive verb\").\n\
                 2. Write a sentence with the blank {PLACEHOLDER} where the word goes. Do not use the \
                 word or a close synonym anywhere else.\n\
                 3. Give three alternatives of the same subtype and similar length that are semantically \
                 unrelated to \"{w}\" and make the sentence nonsensical.\n\
                 Return JSON: {{\"wordType\": \"...\", \"sentence\": \"...\", \"alternatives\": [\"...\", \"...\", \"...\"]}}",
                t = word.turkish
            ),
            0.8,
            500,
            true,
        );
        let content = self.service.complete(&request)?;

        Ok(parse_cloze(&content, w).unwrap_or_else(|e| {
            log::warn!("Invalid cloze response for '{}': {}", w, e);
            Cloze::fallback(word)
        }))
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn non_empty(value: &str, field: &'static str) -> Result<String, ShapeError> {
    let value = collapse_whitespace(value);
    if value.is_empty() {
        return Err(ShapeError::EmptyField(field));
    }
    Ok(value)
}

/// Append the word when the sentence does not already contain it
fn ensure_contains(sentence: String, english: &str) -> String {
    if find_word_ignore_case(&sentence, english).is_some() {
        sentence
    } else {
        format!("{} {}", sentence, english)
    }
}

fn parse_sentence(content: &str, english: &str) -> Result<String, ShapeError> {
    let trimmed = content
        .trim()
        .trim_matches(|c: char| c == '"' || c == '\u{201c}' || c == '\u{201d}');
    let sentence = non_empty(trimmed, "sentence")?;
    Ok(ensure_contains(sentence, english))
}

fn parse_fill_in_blank(content: &str, english: &str) -> Result<FillInBlank, ShapeError> {
    let raw: RawFillInBlank = serde_json::from_str(content)?;
    let sentence = non_empty(&raw.sentence, "sentence")?;
    let word_type = non_empty(&raw.word_type, "wordType")?;
    if raw.options.len() != 3 {
        return Err(ShapeError::OptionCount(raw.options.len()));
    }
    let options = raw
        .options
        .iter()
        .map(|o| non_empty(o, "options"))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(FillInBlank {
        sentence: ensure_contains(sentence, english),
        word_type,
        options,
    })
}

fn parse_cloze(content: &str, english: &str) -> Result<Cloze, ShapeError> {
    let raw: RawCloze = serde_json::from_str(content)?;
    let word_type = non_empty(&raw.word_type, "wordType")?;
    let sentence = non_empty(&raw.sentence, "sentence")?;
    let sentence = normalize_placeholder(&sentence).ok_or(ShapeError::MissingPlaceholder)?;
    if find_word_ignore_case(&sentence, english).is_some() {
        return Err(ShapeError::RevealsAnswer);
    }
    if raw.alternatives.len() != 3 {
        return Err(ShapeError::OptionCount(raw.alternatives.len()));
    }

    Ok(Cloze {
        sentence,
        word_type,
        alternatives: raw.alternatives.iter().map(|a| collapse_whitespace(a)).collect(),
    })
}

/// Rewrite the first run of five or more underscores as [`PLACEHOLDER`]
fn normalize_placeholder(sentence: &str) -> Option<String> {
    if sentence.contains(PLACEHOLDER) {
        return Some(sentence.to_string());
    }
    let start = sentence.find("_____")?;
    let end = sentence[start..]
        .find(|c: char| c != '_')
        .map(|n| start + n)
        .unwrap_or(sentence.len());
    Some(format!("{}{}{}", &sentence[..start], PLACEHOLDER, &sentence[end..]))
}

/// Byte offsets of every ASCII-case-insensitive match of `needle`
fn match_offsets<'a>(haystack: &'a str, needle: &'a str) -> impl Iterator<Item = usize> + 'a {
    haystack
        .char_indices()
        .map(|(i, _)| i)
        .filter(move |&i| {
            !needle.is_empty()
                && haystack
                    .get(i..i + needle.len())
                    .is_some_and(|s| s.eq_ignore_ascii_case(needle))
        })
}

/// Byte offset of the first ASCII-case-insensitive match of `needle`
pub(crate) fn find_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    match_offsets(haystack, needle).next()
}

/// Like [`find_ignore_case`] but only where `needle` starts a word. A
/// whole-word match wins over a prefix match such as "read" in "reading".
pub(crate) fn find_word_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    let is_word_char = |c: char| c.is_alphanumeric();
    let mut prefix_match = None;
    for start in match_offsets(haystack, needle) {
        if haystack[..start].chars().next_back().is_some_and(is_word_char) {
            continue;
        }
        let end = start + needle.len();
        if !haystack[end..].chars().next().is_some_and(is_word_char) {
            return Some(start);
        }
        prefix_match = prefix_match.or(Some(start));
    }
    prefix_match
}
