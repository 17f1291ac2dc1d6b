//! Task metadata carried inside a remote record's free-text notes.
//!
//! Remote providers have no notion of estimates or an active flag, so the
//! sync-relevant fields ride along in the notes field under a header line.
//! Three generations exist in the wild and all of them must stay readable:
//!
//! ```text
//! TomTimer Task                      <- current, written by `encode`
//! estimatedMinutes:30
//! remainingMinutes:12
//! modifiedAt:2025-03-21T09:15:00.250Z
//! isActive:true
//!
//! TomTimerMeta:{"estimatedMinutes":30,"remainingMinutes":12,
//!               "isActive":true,"modifiedAt":"2025-03-21T09:15:00.250Z"}
//!
//! TicketyPom Task                    <- oldest, no timestamp
//! Estimated Total Time: 30 minutes
//! Remaining Time: 12 minutes
//! Active: true
//! ```
//!
//! Decoding never fails. A missing or unknown header yields the defaults,
//! and each field that cannot be read falls back to its own default.
//! Timestamps are encoded at millisecond resolution.

use std::sync::OnceLock;

use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;
use serde_json::{Map, Value};

use crate::models::{Task, DEFAULT_ESTIMATE_MINUTES};

/// Header line of the current line-oriented encoding
pub const METADATA_HEADER: &str = "TomTimer Task";

/// Tag that prefixes the structured (JSON) encoding
pub const STRUCTURED_TAG: &str = "TomTimerMeta:";

/// Header line of the oldest encoding
pub const LEGACY_HEADER: &str = "TicketyPom Task";

/// Sync-relevant task fields as stored in a remote record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metadata {
    pub estimated_minutes: u32,
    pub remaining_minutes: u32,
    pub is_active: bool,
    /// Unix ms
    pub modified_at: i64,
}

impl Metadata {
    /// Values used for records that carry no readable metadata
    #[must_use]
    pub const fn defaults(fallback_modified_at: i64) -> Self {
        Self {
            estimated_minutes: DEFAULT_ESTIMATE_MINUTES,
            remaining_minutes: DEFAULT_ESTIMATE_MINUTES,
            is_active: false,
            modified_at: fallback_modified_at,
        }
    }

    /// Snapshot the sync-relevant fields of a task
    #[must_use]
    pub const fn from_task(task: &Task) -> Self {
        Self {
            estimated_minutes: task.estimated_minutes,
            remaining_minutes: task.remaining_minutes,
            is_active: task.is_active,
            modified_at: task.modified_at,
        }
    }
}

/// Which generation of the encoding a notes blob was written in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// `key:value` lines under [`METADATA_HEADER`]
    Current,
    /// JSON object after [`STRUCTURED_TAG`] (or after a header line)
    Structured,
    /// Human-readable lines under [`LEGACY_HEADER`]
    Legacy,
}

/// Encode a task's metadata in the current canonical form
#[must_use]
pub fn encode(task: &Task) -> String {
    encode_metadata(&Metadata::from_task(task))
}

/// Encode metadata in the current canonical form
#[must_use]
pub fn encode_metadata(metadata: &Metadata) -> String {
    [
        METADATA_HEADER.to_string(),
        format!("estimatedMinutes:{}", metadata.estimated_minutes),
        format!("remainingMinutes:{}", metadata.remaining_minutes),
        format!("modifiedAt:{}", format_timestamp(metadata.modified_at)),
        format!("isActive:{}", metadata.is_active),
    ]
    .join("\n")
}

/// Decode metadata from a remote notes field
///
/// `fallback_modified_at` is used when the blob carries no timestamp, which
/// is always the case for the legacy generation.
#[must_use]
pub fn decode(raw: Option<&str>, fallback_modified_at: i64) -> Metadata {
    let mut metadata = Metadata::defaults(fallback_modified_at);
    let Some(raw) = raw else {
        return metadata;
    };
    let Some((encoding, body)) = locate(raw) else {
        tracing::debug!("Remote notes carry no recognizable metadata header; using defaults");
        return metadata;
    };

    let fields = match encoding {
        Encoding::Structured => structured_fields(&body),
        Encoding::Current | Encoding::Legacy => line_fields(&body),
    };
    for (key, value) in fields {
        apply_field(&mut metadata, &key, &value);
    }
    metadata
}

/// Detect which encoding generation a notes blob uses, if any
#[must_use]
pub fn detect(raw: &str) -> Option<Encoding> {
    locate(raw).map(|(encoding, _)| encoding)
}

/// Find the header and return the encoding plus the text that follows it
fn locate(raw: &str) -> Option<(Encoding, String)> {
    let lines = raw.lines().collect::<Vec<_>>();
    for (index, line) in lines.iter().enumerate() {
        let trimmed = line.trim();
        let rest = || lines[index + 1..].join("\n");

        if let Some(payload) = strip_prefix_ignore_case(trimmed, STRUCTURED_TAG) {
            return Some((Encoding::Structured, format!("{payload}\n{}", rest())));
        }

        let generation = if trimmed.eq_ignore_ascii_case(METADATA_HEADER) {
            Encoding::Current
        } else if trimmed.eq_ignore_ascii_case(LEGACY_HEADER) {
            Encoding::Legacy
        } else {
            continue;
        };

        let body = rest();
        if body.trim_start().starts_with('{') {
            return Some((Encoding::Structured, body));
        }
        return Some((generation, body));
    }
    None
}

fn strip_prefix_ignore_case<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    let head = value.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &value[prefix.len()..])
}

/// A decoded field value before it is interpreted
enum RawValue {
    Text(String),
    Number(i64),
    Bool(bool),
}

fn line_fields(body: &str) -> Vec<(String, RawValue)> {
    static LINE: OnceLock<Regex> = OnceLock::new();
    let line_re = LINE.get_or_init(|| {
        Regex::new(r"^\s*([A-Za-z][A-Za-z _-]*?)\s*:\s*(.*?)\s*$").expect("Invalid regex")
    });

    body.lines()
        .filter_map(|line| {
            let captures = line_re.captures(line)?;
            Some((
                normalize_key(&captures[1]),
                RawValue::Text(captures[2].to_string()),
            ))
        })
        .collect()
}

#[allow(clippy::cast_possible_truncation)] // fractional JSON numbers are truncated
fn structured_fields(body: &str) -> Vec<(String, RawValue)> {
    let (Some(start), Some(end)) = (body.find('{'), body.rfind('}')) else {
        tracing::debug!("Structured metadata payload has no JSON object");
        return Vec::new();
    };
    if end < start {
        return Vec::new();
    }

    let object = match serde_json::from_str::<Map<String, Value>>(&body[start..=end]) {
        Ok(object) => object,
        Err(error) => {
            tracing::debug!("Structured metadata payload is not valid JSON: {error}");
            return Vec::new();
        }
    };

    object
        .into_iter()
        .filter_map(|(key, value)| {
            let value = match value {
                Value::String(text) => RawValue::Text(text),
                Value::Bool(flag) => RawValue::Bool(flag),
                Value::Number(number) => RawValue::Number(
                    number
                        .as_i64()
                        .or_else(|| number.as_f64().map(|float| float as i64))?,
                ),
                _ => return None,
            };
            Some((normalize_key(&key), value))
        })
        .collect()
}

/// Lowercase and strip separators so `Estimated Total Time`,
/// `estimatedMinutes` and `estimated_minutes` compare alike
fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn apply_field(metadata: &mut Metadata, key: &str, value: &RawValue) {
    match key {
        "estimatedminutes" | "estimatedtotaltime" | "estimate" => {
            if let Some(minutes) = parse_minutes(value) {
                metadata.estimated_minutes = minutes;
            }
        }
        "remainingminutes" | "remainingtime" | "remaining" => {
            if let Some(minutes) = parse_minutes(value) {
                metadata.remaining_minutes = minutes;
            }
        }
        "isactive" | "active" => metadata.is_active = parse_flag(value),
        "modifiedat" | "lastmodified" => {
            if let Some(timestamp) = parse_timestamp(value) {
                metadata.modified_at = timestamp;
            }
        }
        _ => {}
    }
}

/// Digits only, so `"30 minutes"` reads as 30
fn parse_minutes(value: &RawValue) -> Option<u32> {
    match value {
        RawValue::Number(number) => u32::try_from(*number).ok(),
        RawValue::Text(text) => text
            .chars()
            .filter(char::is_ascii_digit)
            .collect::<String>()
            .parse()
            .ok(),
        RawValue::Bool(_) => None,
    }
}

fn parse_flag(value: &RawValue) -> bool {
    match value {
        RawValue::Bool(flag) => *flag,
        RawValue::Number(number) => *number == 1,
        RawValue::Text(text) => matches!(
            text.trim().to_ascii_lowercase().as_str(),
            "true" | "yes" | "1"
        ),
    }
}

fn parse_timestamp(value: &RawValue) -> Option<i64> {
    match value {
        RawValue::Number(millis) => Some(*millis),
        RawValue::Text(text) => DateTime::parse_from_rfc3339(text.trim())
            .ok()
            .map(|date_time| date_time.timestamp_millis()),
        RawValue::Bool(_) => None,
    }
}

fn format_timestamp(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .unwrap_or(DateTime::UNIX_EPOCH)
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const FALLBACK: i64 = 1_700_000_000_000;

    fn sample() -> Metadata {
        Metadata {
            estimated_minutes: 30,
            remaining_minutes: 12,
            is_active: true,
            modified_at: 1_742_548_500_250,
        }
    }

    #[test]
    fn encode_uses_canonical_layout() {
        let encoded = encode_metadata(&sample());
        assert_eq!(
            encoded,
            "TomTimer Task\n\
             estimatedMinutes:30\n\
             remainingMinutes:12\n\
             modifiedAt:2025-03-21T09:15:00.250Z\n\
             isActive:true"
        );
    }

    #[test]
    fn decode_reverses_encode() {
        let metadata = sample();
        let decoded = decode(Some(&encode_metadata(&metadata)), FALLBACK);
        assert_eq!(decoded, metadata);
        assert_eq!(detect(&encode_metadata(&metadata)), Some(Encoding::Current));
    }

    #[test]
    fn encode_task_snapshots_sync_fields() {
        let mut task = Task::new("Write", 40);
        task.update_estimates(40, 10);
        task.set_active(true);
        let decoded = decode(Some(&encode(&task)), FALLBACK);
        assert_eq!(decoded, Metadata::from_task(&task));
    }

    #[test]
    fn decode_missing_notes_yields_defaults() {
        assert_eq!(decode(None, FALLBACK), Metadata::defaults(FALLBACK));
    }

    #[test]
    fn decode_without_header_yields_defaults() {
        assert_eq!(decode(Some("garbage"), FALLBACK), Metadata::defaults(FALLBACK));
        assert_eq!(
            decode(Some("estimatedMinutes:50\nremainingMinutes:5"), FALLBACK),
            Metadata::defaults(FALLBACK)
        );
        assert_eq!(detect("buy milk"), None);
    }

    #[test]
    fn decode_falls_back_per_field() {
        let notes = "TomTimer Task\n\
                     estimatedMinutes:forty\n\
                     remainingMinutes:10\n\
                     modifiedAt:yesterday\n\
                     isActive:maybe";
        let decoded = decode(Some(notes), FALLBACK);
        assert_eq!(
            decoded,
            Metadata {
                estimated_minutes: 25,
                remaining_minutes: 10,
                is_active: false,
                modified_at: FALLBACK,
            }
        );
    }

    #[test]
    fn decode_legacy_matches_current_generation() {
        let legacy = "TicketyPom Task\n\
                      Estimated Total Time: 30 minutes\n\
                      Remaining Time: 12 minutes\n\
                      Active: true";
        assert_eq!(detect(legacy), Some(Encoding::Legacy));

        let from_legacy = decode(Some(legacy), FALLBACK);
        let from_current = decode(Some(&encode_metadata(&sample())), FALLBACK);
        assert_eq!(from_legacy.estimated_minutes, from_current.estimated_minutes);
        assert_eq!(from_legacy.remaining_minutes, from_current.remaining_minutes);
        assert_eq!(from_legacy.is_active, from_current.is_active);
        assert_eq!(from_legacy.modified_at, FALLBACK);
    }

    #[test]
    fn decode_legacy_partial_fields() {
        let legacy = "TicketyPom Task\nEstimated Total Time: 15 minutes\nActive: false";
        let decoded = decode(Some(legacy), FALLBACK);
        assert_eq!(decoded.estimated_minutes, 15);
        assert_eq!(decoded.remaining_minutes, 25);
        assert!(!decoded.is_active);
    }

    #[test]
    fn decode_structured_generation() {
        let notes = r#"TomTimerMeta:{"estimatedMinutes":30,"remainingMinutes":"12 minutes","isActive":true,"modifiedAt":"2025-03-21T09:15:00.250Z"}"#;
        assert_eq!(detect(notes), Some(Encoding::Structured));
        assert_eq!(decode(Some(notes), FALLBACK), sample());
    }

    #[test]
    fn decode_structured_payload_under_header() {
        let notes = "TomTimer Task\n{\n  \"estimatedMinutes\": 45,\n  \"isActive\": \"TRUE\"\n}";
        assert_eq!(detect(notes), Some(Encoding::Structured));
        let decoded = decode(Some(notes), FALLBACK);
        assert_eq!(decoded.estimated_minutes, 45);
        assert_eq!(decoded.remaining_minutes, 25);
        assert!(decoded.is_active);
        assert_eq!(decoded.modified_at, FALLBACK);
    }

    #[test]
    fn decode_structured_invalid_json_yields_defaults() {
        let notes = "TomTimerMeta:{\"estimatedMinutes\": 30,";
        assert_eq!(decode(Some(notes), FALLBACK), Metadata::defaults(FALLBACK));
    }

    #[test]
    fn decode_structured_numeric_timestamp_is_unix_millis() {
        let notes = r#"TomTimerMeta:{"modifiedAt":1742548500250,"estimatedMinutes":-3}"#;
        let decoded = decode(Some(notes), FALLBACK);
        assert_eq!(decoded.modified_at, 1_742_548_500_250);
        assert_eq!(decoded.estimated_minutes, 25);
    }

    #[test]
    fn decode_finds_header_after_user_text() {
        let notes = format!("Remember the attachments\n\n{}", encode_metadata(&sample()));
        assert_eq!(decode(Some(&notes), FALLBACK), sample());
    }

    #[test]
    fn decode_tolerates_case_and_spacing() {
        let notes = "  tomtimer task  \n  EstimatedMinutes :  20 min \nisactive: Yes";
        let decoded = decode(Some(notes), FALLBACK);
        assert_eq!(decoded.estimated_minutes, 20);
        assert!(decoded.is_active);
    }

    #[test]
    fn decode_overflowing_minutes_falls_back() {
        let notes = "TomTimer Task\nestimatedMinutes:99999999999999";
        assert_eq!(decode(Some(notes), FALLBACK).estimated_minutes, 25);
    }
}
