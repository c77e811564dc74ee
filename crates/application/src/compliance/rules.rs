//! Format rules. Each returns the extracted body when the response complies.

use audio_ifeval_domain::{ResponseMeta, Task};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::text::{collapse_whitespace, strip_surrounding_quotes};

static TRANSCRIPT_ANSWER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^\s*the transcript is\s*:\s*").unwrap());
static TRANSLATION_ANSWER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^\s*the translation is:\s*").unwrap());
static CAPTION_ANSWER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^\s*the audio caption is:\s*").unwrap());

fn has_ascii_upper(s: &str) -> bool {
    s.bytes().any(|b| b.is_ascii_uppercase())
}

fn has_ascii_lower(s: &str) -> bool {
    s.bytes().any(|b| b.is_ascii_lowercase())
}

/// At least one upper-case letter and no lower-case ones.
pub fn upper_case(response: &str) -> Option<String> {
    (has_ascii_upper(response) && !has_ascii_lower(response)).then(|| response.trim().to_string())
}

/// At least one lower-case letter and no upper-case ones.
pub fn lower_case(response: &str) -> Option<String> {
    (has_ascii_lower(response) && !has_ascii_upper(response)).then(|| response.trim().to_string())
}

/// Left-trimmed response starts with the literal; body is the rest, trimmed.
pub fn prefix(meta: &ResponseMeta, response: &str) -> Option<String> {
    let literal = meta.prefix.as_deref()?;
    let body = response.trim_start().strip_prefix(literal)?;
    Some(body.trim().to_string())
}

/// Right-trimmed response ends with the literal; body is the rest, trimmed.
pub fn suffix(meta: &ResponseMeta, response: &str) -> Option<String> {
    let literal = meta.suffix.as_deref()?;
    let body = response.trim_end().strip_suffix(literal)?;
    Some(body.trim().to_string())
}

/// Trimmed response is enclosed by the `left|right` pair; body is the interior.
pub fn wrap(meta: &ResponseMeta, response: &str) -> Option<String> {
    let (left, right) = meta.lrt.as_deref()?.split_once('|')?;
    let trimmed = response.trim();
    if trimmed.len() < left.len() + right.len() {
        return None;
    }
    let body = trimmed.strip_prefix(left)?.strip_suffix(right)?;
    Some(body.trim().to_string())
}

/// Strict JSON object, or array of objects. With an expected key the payload
/// is that string field; without, all string fields space-joined.
pub fn json(meta: &ResponseMeta, response: &str) -> Option<String> {
    let parsed: Value = serde_json::from_str(response).ok()?;
    let key = meta.key.as_deref();
    match parsed {
        Value::Object(obj) => from_object(&obj, key),
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .filter_map(Value::as_object)
                .filter_map(|obj| from_object(obj, key))
                .collect();
            (!parts.is_empty()).then(|| parts.join(" "))
        }
        _ => None,
    }
}

fn from_object(obj: &Map<String, Value>, key: Option<&str>) -> Option<String> {
    let payload = match key {
        Some(key) => obj.get(key)?.as_str()?.trim().to_string(),
        None => obj
            .values()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
    };
    (!payload.is_empty()).then_some(payload)
}

/// Answer format every `d` variation is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerFormat {
    /// `The transcript is: ...`
    Transcript,
    /// `The translation is: ...`
    Translation,
    /// `The audio caption is: ...`
    Caption,
    /// A bare label of the task's label set
    Label(Task),
}

impl AnswerFormat {
    /// Format for a task.
    pub fn for_task(task: Task) -> Self {
        match task {
            Task::Asr => Self::Transcript,
            Task::S2tt => Self::Translation,
            Task::Aac => Self::Caption,
            Task::Ser | Task::Gr => Self::Label(task),
        }
    }

    /// Extract the answer body.
    pub fn extract(&self, response: &str) -> Option<String> {
        match self {
            Self::Transcript => {
                let m = TRANSCRIPT_ANSWER.find(response)?;
                Some(response[m.end()..].to_string())
            }
            Self::Translation => prefixed_sentence(&TRANSLATION_ANSWER, response),
            Self::Caption => prefixed_sentence(&CAPTION_ANSWER, response),
            Self::Label(task) => {
                let label = response
                    .trim()
                    .trim_matches('\'')
                    .trim_matches('"')
                    .trim_matches('.')
                    .to_lowercase();
                let labels = task.label_set()?;
                labels.contains(&label.as_str()).then_some(label)
            }
        }
    }
}

fn prefixed_sentence(pattern: &Regex, response: &str) -> Option<String> {
    let sanitized = collapse_whitespace(response);
    let m = pattern.find(&sanitized)?;
    let body = sanitized[m.end()..].trim();
    Some(strip_surrounding_quotes(body).to_string())
}
