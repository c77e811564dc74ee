//! Evaluation samples and response flattening.
//!
//! A sample carries the reference for one audio clip and every raw response a
//! model produced for it, keyed by variation name. Samples are immutable once
//! loaded; the helpers here only borrow and flatten them.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::task::{SubTask, Task};

/// Default separator for the multi-task `separation` variation.
pub const DEFAULT_SEPARATOR: &str = "\\";

/// One evaluation item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Reference text, a label, or `ref1|ref2|...` alternatives
    #[serde(default, deserialize_with = "scalar_as_string")]
    pub text: String,

    /// Dataset task name (e.g. `emotion_recognition`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,

    /// Emotion ground truth for multi-task samples
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotion: Option<String>,

    /// Gender ground truth for multi-task samples
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,

    /// Raw responses keyed by variation name
    #[serde(default, deserialize_with = "null_as_default")]
    pub variation_responses: IndexMap<String, Value>,

    /// Multi-task instruction records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<Instructions>,
}

/// Rule parameters attached to a single response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseMeta {
    /// Literal the response must start with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    /// Literal the response must end with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    /// Wrap spec, `left|right`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lrt: Option<String>,
    /// Expected JSON key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

/// A raw response plus its rule parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseItem {
    /// Raw model output
    pub text: String,
    /// Per-response parameters
    pub meta: ResponseMeta,
}

impl ResponseItem {
    /// A response without parameters.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            meta: ResponseMeta::default(),
        }
    }

    fn from_object(obj: &serde_json::Map<String, Value>) -> Self {
        let text = obj
            .get("response")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let field = |name: &str| obj.get(name).and_then(Value::as_str).map(str::to_string);
        Self {
            text,
            meta: ResponseMeta {
                prefix: field("prefix"),
                suffix: field("suffix"),
                lrt: field("lrt"),
                key: field("key"),
            },
        }
    }
}

/// Flatten a variation value into its responses.
///
/// Strings are single responses. Lists hold strings or `{"response": ..}`
/// objects. Objects hold the same, with list values flattened recursively.
pub fn flatten_responses(value: &Value) -> Vec<ResponseItem> {
    let mut out = Vec::new();
    collect_responses(value, &mut out, true);
    out
}

fn collect_responses(value: &Value, out: &mut Vec<ResponseItem>, top: bool) {
    match value {
        Value::String(s) => out.push(ResponseItem::plain(s.clone())),
        Value::Array(items) => {
            for item in items {
                match item {
                    Value::String(s) => out.push(ResponseItem::plain(s.clone())),
                    Value::Object(obj) => out.push(ResponseItem::from_object(obj)),
                    _ => {}
                }
            }
        }
        Value::Object(obj) if top => {
            for v in obj.values() {
                match v {
                    Value::Object(inner) if inner.contains_key("response") => {
                        out.push(ResponseItem::from_object(inner))
                    }
                    Value::String(_) | Value::Array(_) => collect_responses(v, out, false),
                    _ => {}
                }
            }
        }
        _ => {}
    }
}

/// Whether an object-valued variation is a group of named sub-variations.
fn is_variation_group(value: &Value) -> bool {
    match value {
        Value::Object(obj) => !obj.is_empty() && obj.values().all(|v| !is_response_object(v)),
        _ => false,
    }
}

fn is_response_object(value: &Value) -> bool {
    matches!(value, Value::Object(obj) if obj.contains_key("response"))
}

impl Sample {
    /// Reference alternatives for a task. Multi-reference tasks split on `|`
    /// and drop blanks; other tasks use the text as a single reference.
    pub fn references(&self, task: Task) -> Vec<String> {
        if task.has_multiple_references() {
            self.text
                .split('|')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string)
                .collect()
        } else {
            vec![self.text.clone()]
        }
    }

    /// Responses per variation, in the order the variations appear.
    ///
    /// With `expand_groups`, an object whose values are plain responses or
    /// lists is split into one variation per inner key.
    pub fn variations(&self, expand_groups: bool) -> Vec<(String, Vec<ResponseItem>)> {
        let mut out = Vec::with_capacity(self.variation_responses.len());
        for (name, value) in &self.variation_responses {
            if expand_groups && is_variation_group(value) {
                if let Value::Object(obj) = value {
                    for (inner, inner_value) in obj {
                        out.push((inner.clone(), flatten_responses(inner_value)));
                    }
                }
            } else {
                out.push((name.clone(), flatten_responses(value)));
            }
        }
        out
    }

    /// Multi-task stages present on this sample.
    pub fn stages(&self) -> impl Iterator<Item = (&str, &StageVariations)> {
        self.instructions
            .iter()
            .flat_map(|i| i.variations.iter())
            .map(|(k, v)| (k.as_str(), v))
    }
}

/// Multi-task instruction block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Instructions {
    /// Stage name (`single-stage` / `multi-stage`) to its variations
    #[serde(default, deserialize_with = "null_as_default")]
    pub variations: IndexMap<String, StageVariations>,
}

/// Multi-task variations of one stage. Each entry is a block (list) of records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageVariations {
    /// Separator-delimited answers
    #[serde(default, deserialize_with = "null_as_default")]
    pub separation: Vec<Value>,
    /// Keyed JSON answers
    #[serde(default, deserialize_with = "null_as_default")]
    pub json: Vec<Value>,
}

impl StageVariations {
    /// Well-formed `separation` records; malformed blocks and records are skipped.
    pub fn separation_records(&self) -> Vec<MultiTaskRecord> {
        records_of(&self.separation)
    }

    /// Well-formed `json` records.
    pub fn json_records(&self) -> Vec<MultiTaskRecord> {
        records_of(&self.json)
    }
}

fn records_of(blocks: &[Value]) -> Vec<MultiTaskRecord> {
    blocks
        .iter()
        .filter_map(Value::as_array)
        .flatten()
        .filter(|rec| rec.is_object())
        .filter_map(|rec| serde_json::from_value(rec.clone()).ok())
        .collect()
}

/// One multi-task response record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiTaskRecord {
    /// `|`-joined task list, e.g. `ASR|SER`
    #[serde(default)]
    pub task: String,
    /// Raw model output
    #[serde(default)]
    pub response: String,
    /// Separator for the `separation` variation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub separator: Option<String>,
    /// `|`-joined JSON keys for the `json` variation, positional to `task`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl MultiTaskRecord {
    /// Requested sub-tasks in order; unknown names are dropped.
    pub fn tasks(&self) -> Vec<SubTask> {
        self.task.split('|').filter_map(SubTask::parse).collect()
    }

    /// Requested JSON keys in order; blanks are dropped.
    pub fn keys(&self) -> Vec<String> {
        self.key
            .as_deref()
            .unwrap_or_default()
            .split('|')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Separator, defaulting to a backslash.
    pub fn separator(&self) -> &str {
        self.separator.as_deref().unwrap_or(DEFAULT_SEPARATOR)
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn scalar_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}
