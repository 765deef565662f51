//! Turns loosely-typed history entries into canonical [`HistoryRecord`]s.
//!
//! The scorer sometimes returns feedback sub-fields as JSON-encoded strings.
//! Anything that looks like a JSON object or array is parsed; everything else
//! (including strings that fail to parse) is kept as plain text.

use chrono::{DateTime, NaiveDateTime, Utc};
use log::{debug, warn};
use serde_json::{Map, Value};

use crate::models::{
    Category, Feedback, HistoryRecord, PerCategory, RawRecord, Section, StructuredSection,
};

pub fn looks_like_json(text: &str) -> bool {
    (text.starts_with('{') && text.ends_with('}'))
        || (text.starts_with('[') && text.ends_with(']'))
}

/// Replaces a JSON-looking string with its parsed value. Never fails.
pub fn expand_json_string(value: Value) -> Value {
    let text = match value {
        Value::String(text) => text,
        other => return other,
    };

    let trimmed = text.trim();
    if !looks_like_json(trimmed) {
        return Value::String(text);
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(parsed) => parsed,
        Err(err) => {
            debug!("keeping JSON-looking section as text: {err}");
            Value::String(text)
        }
    }
}

pub fn normalize_feedback(raw: &Value) -> Option<Feedback> {
    let map = match expand_json_string(raw.clone()) {
        Value::Object(map) => map,
        Value::Null => return None,
        other => {
            debug!("ignoring feedback that is not an object: {other}");
            return None;
        }
    };

    let sections = PerCategory::from_fn(|category| section_from_value(map.get(category.key())));
    let suggestions = map
        .get("suggestions")
        .map(|value| string_list(&expand_json_string(value.clone())))
        .unwrap_or_default();
    let scores = match map.get("scores").cloned().map(expand_json_string) {
        Some(Value::Object(block)) => scores_from_block(&block),
        _ => PerCategory::default(),
    };

    Some(Feedback {
        sections,
        suggestions,
        scores,
    })
}

pub fn section_from_value(value: Option<&Value>) -> Section {
    let Some(value) = value else {
        return Section::Missing;
    };

    match expand_json_string(value.clone()) {
        Value::Null => Section::Missing,
        Value::String(text) if text.trim().is_empty() => Section::Missing,
        Value::String(text) => Section::Text(text.trim().to_string()),
        Value::Object(map) => Section::Structured(structured_from_map(&map)),
        Value::Array(items) => Section::Structured(StructuredSection {
            notes: items.iter().filter_map(text_of).collect(),
            ..StructuredSection::default()
        }),
        other => Section::Text(other.to_string()),
    }
}

fn structured_from_map(map: &Map<String, Value>) -> StructuredSection {
    StructuredSection {
        summary: map.get("summary").and_then(text_of),
        strengths: map.get("strengths").map(string_list).unwrap_or_default(),
        weaknesses: map.get("weaknesses").map(string_list).unwrap_or_default(),
        score: map.get("score").and_then(score_value),
        notes: Vec::new(),
    }
}

fn scores_from_block(block: &Map<String, Value>) -> PerCategory<Option<f64>> {
    PerCategory::from_fn(|category: Category| block.get(category.key()).and_then(score_value))
}

/// Numbers and numeric strings count as scores; anything else is absent.
pub fn score_value(value: &Value) -> Option<f64> {
    let score = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    score.is_finite().then_some(score)
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(text_of).collect(),
        Value::String(text) if !text.trim().is_empty() => vec![text.clone()],
        _ => Vec::new(),
    }
}

/// Accepts RFC 3339 and naive ISO-8601 timestamps. Naive values are UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

pub fn normalize_record(raw: RawRecord) -> HistoryRecord {
    let created_at = raw.created_at.as_deref().and_then(parse_timestamp);
    if created_at.is_none() {
        if let Some(value) = raw.created_at.as_deref() {
            debug!("record {} has unreadable created_at {value:?}", raw.id);
        }
    }

    HistoryRecord {
        id: raw.id,
        transcript: raw.transcript,
        created_at,
        feedback: raw.feedback.as_ref().and_then(normalize_feedback),
    }
}

/// Normalizes every decodable entry and returns them oldest first.
///
/// Undated records sort ahead of dated ones; ties keep their input order.
pub fn normalize_history(entries: Vec<Value>) -> Vec<HistoryRecord> {
    let mut records: Vec<HistoryRecord> = entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<RawRecord>(entry) {
            Ok(raw) => Some(normalize_record(raw)),
            Err(err) => {
                warn!("skipping history entry: {err}");
                None
            }
        })
        .collect();

    records.sort_by_key(|record| record.created_at);
    records
}
