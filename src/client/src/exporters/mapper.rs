use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use eventsink_common::constants::EMPTY_JSON_OBJECT;
use eventsink_common::event::{ParsedRecord, RawEvent};
use serde_json::Value;
use tracing::warn;

/// Keeps allow-listed events, in input order, mapped to export rows.
pub fn filter_and_map<'a>(
    events: impl IntoIterator<Item = &'a RawEvent>,
    events_to_insert: &HashSet<String>,
) -> Vec<ParsedRecord> {
    events
        .into_iter()
        .filter(|event| events_to_insert.contains(&event.event))
        .map(parse_event)
        .collect()
}

pub fn parse_event(event: &RawEvent) -> ParsedRecord {
    ParsedRecord {
        feedback_type: event.event.clone(),
        user_id: json_text_or_empty(event.user()),
        item_id: json_text_or_empty(event.item()),
        time_stamp: normalize_timestamp(event.timestamp_candidate()),
        comment: json_text_or_empty(event.comment_text()),
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

/// Compact JSON text of the value, or `{}` when it is absent or falsy.
pub fn json_text_or_empty(value: Option<&Value>) -> String {
    match value {
        Some(v) if !is_falsy(v) => v.to_string(),
        _ => EMPTY_JSON_OBJECT.to_string(),
    }
}

fn parse_timestamp_str(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = DateTime::parse_from_rfc2822(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            // date-only strings are midnight UTC
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
}

/// Renders the timestamp as `YYYY-MM-DDTHH:MM:SS.mmmZ`.
///
/// Strings are parsed as RFC 3339, RFC 2822 or a naive UTC date-time, and
/// numbers are epoch milliseconds. Anything else is passed through verbatim
/// so the insert is rejected by the database instead of the event vanishing.
pub fn normalize_timestamp(value: Option<&Value>) -> String {
    let parsed = match value {
        Some(Value::String(raw)) => parse_timestamp_str(raw),
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(DateTime::from_timestamp_millis),
        _ => None,
    };

    if let Some(ts) = parsed {
        return ts.to_rfc3339_opts(SecondsFormat::Millis, true);
    }

    let raw = match value {
        Some(Value::String(raw)) => raw.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    };
    warn!("Unparseable event timestamp {:?}, passing it through as-is", raw);
    raw
}
