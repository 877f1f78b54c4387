//! Record normalization
//!
//! Fixture records are loosely typed: fields go missing, numbers arrive as
//! strings, options contain mixed values. The functions here map a raw
//! record to the canonical document shape stored for it, substituting
//! defaults field by field. Nothing here performs I/O.
//!
//! Two notions of "missing" apply:
//!
//! - *falsy* fields (`null`, `false`, `0`, `""` or absent) fall back to the
//!   default: `title`, `description`, `moduleId`, `badgeThresholds` and all
//!   module attributes;
//! - *absent* fields (`null` or absent) fall back, but a defined falsy value
//!   such as `false` or `0` is kept: `durationSeconds`, `allowRetake`, `order`.

use crate::error::{ImportError, Result};
use crate::fixtures::Dataset;
use crate::store::{into_fields, Fields};
use modload_common::types::validate_segment;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Title given to quizzes without one
pub const DEFAULT_QUIZ_TITLE: &str = "Quiz";

/// Score cutoffs awarding a quiz badge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeThresholds {
    pub gold: i64,
    pub silver: i64,
    pub bronze: i64,
}

impl BadgeThresholds {
    pub fn to_value(self) -> Value {
        json!({"gold": self.gold, "silver": self.silver, "bronze": self.bronze})
    }
}

impl Default for BadgeThresholds {
    fn default() -> Self {
        Self {
            gold: 90,
            silver: 75,
            bronze: 50,
        }
    }
}

/// Module attributes written on every import
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleDocument {
    pub title: Value,
    pub description: Value,
    pub count_fiches: Value,
    pub count_videos: Value,
    pub count_quizzes: Value,
    pub tags: Value,
    pub image_url: Value,
}

impl ModuleDocument {
    pub fn to_fields(&self) -> Result<Fields> {
        Ok(into_fields(serde_json::to_value(self)?))
    }
}

/// One embedded quiz question
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDocument {
    pub question: String,
    pub options: Vec<String>,
    pub correct_index: i64,
    pub explanation: String,
}

/// Canonical quiz document, without its server timestamps
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizDocument {
    pub id: Value,
    pub module_id: Value,
    pub title: Value,
    pub description: Value,
    pub duration_seconds: Value,
    pub allow_retake: Value,
    pub order: Value,
    pub badge_thresholds: Value,
    pub questions: Vec<QuestionDocument>,
    pub question_count: usize,
}

impl QuizDocument {
    pub fn to_fields(&self) -> Result<Fields> {
        Ok(into_fields(serde_json::to_value(self)?))
    }
}

/// Whether `value` counts as set for `||` style defaults
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Field `key` of `record` when it is truthy
fn truthy<'a>(record: &'a Value, key: &str) -> Option<&'a Value> {
    record.get(key).filter(|v| is_truthy(v))
}

/// Field `key` of `record` when it is present and not null
fn defined<'a>(record: &'a Value, key: &str) -> Option<&'a Value> {
    record.get(key).filter(|v| !v.is_null())
}

fn truthy_or(record: &Value, key: &str, default: Value) -> Value {
    truthy(record, key).cloned().unwrap_or(default)
}

fn defined_or(record: &Value, key: &str, default: Value) -> Value {
    defined(record, key).cloned().unwrap_or(default)
}

/// String form of a JSON value
///
/// Whole numbers print without a fractional part, arrays join their
/// elements with `,` (null elements become empty), objects print as
/// `[object Object]`.
pub fn coerce_string(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => format_number(n),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => coerce_string(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

fn format_number(n: &serde_json::Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < 1e21 => format!("{:.0}", f),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}

/// Integer value of `value` when it holds a whole number
fn as_integer(value: &Value) -> Option<i64> {
    let Value::Number(n) = value else {
        return None;
    };
    if let Some(i) = n.as_i64() {
        return Some(i);
    }
    n.as_f64()
        .filter(|f| f.fract() == 0.0 && f.is_finite())
        .map(|f| f as i64)
}

/// Parse the leading base-10 integer of `s`
///
/// Leading whitespace and one sign are accepted and anything after the
/// digits is ignored, so `" 12abc"` is 12. Returns `None` without digits.
pub fn parse_int_prefix(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let digits: &str = &rest[..rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len())];
    if digits.is_empty() {
        return None;
    }

    let magnitude = digits.bytes().fold(0i64, |acc, b| {
        acc.saturating_mul(10).saturating_add(i64::from(b - b'0'))
    });
    Some(if negative { -magnitude } else { magnitude })
}

/// Answer index of a question; anything unusable becomes 0
pub fn coerce_correct_index(value: Option<&Value>) -> i64 {
    let value = match value.filter(|v| !v.is_null()) {
        Some(value) => value,
        None => return 0,
    };

    as_integer(value)
        .or_else(|| parse_int_prefix(&coerce_string(value)))
        .unwrap_or(0)
}

fn text_field(record: &Value, key: &str) -> String {
    truthy(record, key).map(coerce_string).unwrap_or_default()
}

/// Normalize one raw question; non-object entries yield an empty question
pub fn normalize_question(raw: &Value) -> QuestionDocument {
    let options = match raw.get("options") {
        Some(Value::Array(options)) => options.iter().map(coerce_string).collect(),
        _ => Vec::new(),
    };

    QuestionDocument {
        question: text_field(raw, "question"),
        options,
        correct_index: coerce_correct_index(raw.get("correctIndex")),
        explanation: text_field(raw, "explanation"),
    }
}

/// Normalize a raw quiz owned by module `fallback_module_id`
pub fn normalize_quiz(raw: &Value, fallback_module_id: &str) -> QuizDocument {
    let raw_questions = raw.get("questions").and_then(Value::as_array);

    QuizDocument {
        id: raw.get("id").cloned().unwrap_or(Value::Null),
        module_id: truthy_or(raw, "moduleId", json!(fallback_module_id)),
        title: truthy_or(raw, "title", json!(DEFAULT_QUIZ_TITLE)),
        description: truthy_or(raw, "description", json!("")),
        duration_seconds: defined_or(raw, "durationSeconds", Value::Null),
        allow_retake: defined_or(raw, "allowRetake", json!(true)),
        order: defined_or(raw, "order", json!(0)),
        badge_thresholds: truthy(raw, "badgeThresholds")
            .cloned()
            .unwrap_or_else(|| BadgeThresholds::default().to_value()),
        questions: raw_questions
            .map(|questions| questions.iter().map(normalize_question).collect())
            .unwrap_or_default(),
        question_count: raw_questions.map_or(0, Vec::len),
    }
}

/// Normalize a raw module record
pub fn normalize_module(raw: &Value) -> ModuleDocument {
    ModuleDocument {
        title: truthy_or(raw, "title", json!("")),
        description: truthy_or(raw, "description", json!("")),
        count_fiches: truthy_or(raw, "countFiches", json!(0)),
        count_videos: truthy_or(raw, "countVideos", json!(0)),
        count_quizzes: truthy_or(raw, "countQuizzes", json!(0)),
        tags: truthy_or(raw, "tags", json!([])),
        image_url: truthy_or(raw, "imageUrl", json!("")),
    }
}

/// Document id of a raw record
///
/// The id must be a string usable as a single path segment.
pub fn record_id(raw: &Value, dataset: &str) -> Result<String> {
    let id = match raw.get("id") {
        Some(Value::String(id)) => id,
        Some(other) => {
            return Err(ImportError::invalid_record(
                dataset,
                format!("id must be a string, got {}", other),
            ))
        }
        None => return Err(ImportError::invalid_record(dataset, "record has no id")),
    };

    validate_segment(id).map_err(|e| ImportError::invalid_record(dataset, e.to_string()))?;
    Ok(id.clone())
}

/// [`record_id`] for a child dataset record
pub fn dataset_record_id(raw: &Value, dataset: Dataset, module_id: &str) -> Result<String> {
    record_id(raw, &dataset.file_name(module_id))
}
