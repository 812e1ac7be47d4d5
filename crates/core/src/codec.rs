//! JSON encoding of the progress slot.
//!
//! Decoding is lenient: a readable object is merged field by field over the
//! defaults, so that older or hand-edited payloads still load.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::model::{ProgressDraft, ProgressRecord};

/// Well-known key of the progress slot.
pub const PROGRESS_STORAGE_KEY: &str = "system-design-progress";

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CodecError {
    #[error("malformed progress payload: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("progress payload is not a JSON object")]
    NotAnObject,
    #[error("failed to encode progress: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Result of a lenient decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub record: ProgressRecord,
    /// Fields that were present but unreadable and fell back to defaults.
    pub skipped_fields: Vec<&'static str>,
}

/// # Errors
///
/// Returns `CodecError::Encode` if serialization fails.
pub fn encode(record: &ProgressRecord) -> Result<String, CodecError> {
    serde_json::to_string(record).map_err(CodecError::Encode)
}

/// Decode a persisted payload, defaulting anything missing or unreadable.
///
/// `started_at` becomes the start date when the payload carries none.
///
/// # Errors
///
/// Returns `CodecError::Malformed` for invalid JSON and
/// `CodecError::NotAnObject` for JSON that is not an object.
pub fn decode(raw: &str, started_at: DateTime<Utc>) -> Result<Decoded, CodecError> {
    let value: Value = serde_json::from_str(raw).map_err(CodecError::Malformed)?;
    let Value::Object(fields) = value else {
        return Err(CodecError::NotAnObject);
    };

    let mut reader = FieldReader {
        fields: &fields,
        skipped: Vec::new(),
    };
    let draft = ProgressDraft {
        completed_topics: reader.read("completedTopics", string_list).unwrap_or_default(),
        completed_case_studies: reader
            .read("completedCaseStudies", string_list)
            .unwrap_or_default(),
        time_spent: reader.read("timeSpent", minutes).unwrap_or_default(),
        current_streak: reader.read("currentStreak", streak).unwrap_or_default(),
        last_active_date: reader.read("lastActiveDate", last_active).flatten(),
        achievements: reader.read("achievements", string_list).unwrap_or_default(),
        start_date: reader.read("startDate", timestamp),
    };

    Ok(Decoded {
        record: draft.into_record(started_at),
        skipped_fields: reader.skipped,
    })
}

struct FieldReader<'a> {
    fields: &'a Map<String, Value>,
    skipped: Vec<&'static str>,
}

impl FieldReader<'_> {
    fn read<T>(&mut self, name: &'static str, parse: fn(&Value) -> Option<T>) -> Option<T> {
        let value = self.fields.get(name)?;
        let parsed = parse(value);
        if parsed.is_none() {
            self.skipped.push(name);
        }
        parsed
    }
}

fn string_list(value: &Value) -> Option<Vec<String>> {
    value
        .as_array()?
        .iter()
        .map(|item| item.as_str().map(str::to_owned))
        .collect()
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn minutes(value: &Value) -> Option<u64> {
    if let Some(whole) = value.as_u64() {
        return Some(whole);
    }
    let fractional = value.as_f64()?;
    (fractional.is_finite() && fractional >= 0.0).then(|| fractional.trunc() as u64)
}

fn streak(value: &Value) -> Option<u32> {
    value.as_u64().and_then(|n| u32::try_from(n).ok())
}

fn timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let raw = value.as_str()?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

// Empty string means "never active".
fn last_active(value: &Value) -> Option<Option<DateTime<Utc>>> {
    match value {
        Value::Null => Some(None),
        Value::String(s) if s.is_empty() => Some(None),
        other => timestamp(other).map(Some),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ItemKind;
    use crate::time::{fixed_clock, fixed_now};
    use chrono::Duration;

    #[test]
    fn encode_then_decode_preserves_every_field() {
        let clock = fixed_clock();
        let mut record = ProgressRecord::new(clock.now() - Duration::days(3));
        record.complete(ItemKind::Topic, "caching", &clock);
        record.complete(ItemKind::CaseStudy, "netflix", &clock);
        record.add_time_spent(42, &clock);

        let raw = encode(&record).unwrap();
        let decoded = decode(&raw, fixed_now() + Duration::days(30)).unwrap();
        assert_eq!(decoded.record, record);
        assert!(decoded.skipped_fields.is_empty());
    }

    #[test]
    fn missing_fields_take_defaults_silently() {
        let decoded = decode(r#"{"completedTopics":["dns"]}"#, fixed_now()).unwrap();
        assert_eq!(decoded.record.completed_topics(), ["dns".to_string()]);
        assert_eq!(decoded.record.time_spent(), 0);
        assert_eq!(decoded.record.last_active_date(), None);
        assert_eq!(decoded.record.start_date(), fixed_now());
        assert!(decoded.skipped_fields.is_empty());
    }

    #[test]
    fn unreadable_fields_are_reported_and_defaulted() {
        let raw = r#"{
            "completedTopics": ["dns", 7],
            "timeSpent": -3,
            "currentStreak": 4,
            "lastActiveDate": "yesterday-ish"
        }"#;
        let decoded = decode(raw, fixed_now()).unwrap();
        assert!(decoded.record.completed_topics().is_empty());
        assert_eq!(decoded.record.time_spent(), 0);
        assert_eq!(decoded.record.current_streak(), 4);
        assert_eq!(
            decoded.skipped_fields,
            vec!["completedTopics", "timeSpent", "lastActiveDate"]
        );
    }

    #[test]
    fn fractional_minutes_are_truncated() {
        let decoded = decode(r#"{"timeSpent": 12.75}"#, fixed_now()).unwrap();
        assert_eq!(decoded.record.time_spent(), 12);
    }

    #[test]
    fn duplicate_ids_in_storage_are_collapsed() {
        let decoded = decode(
            r#"{"completedCaseStudies":["uber","uber","lyft"]}"#,
            fixed_now(),
        )
        .unwrap();
        assert_eq!(
            decoded.record.completed_case_studies(),
            ["uber".to_string(), "lyft".to_string()]
        );
    }

    #[test]
    fn rejects_invalid_json_and_non_objects() {
        assert!(matches!(
            decode("{not json", fixed_now()),
            Err(CodecError::Malformed(_))
        ));
        assert!(matches!(
            decode("[1, 2]", fixed_now()),
            Err(CodecError::NotAnObject)
        ));
    }
}
