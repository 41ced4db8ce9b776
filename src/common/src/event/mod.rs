use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An analytics event as delivered by the host runtime.
///
/// Only the fields the exporter reads are modelled; anything else in the
/// incoming JSON is ignored during deserialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    pub event: String,

    #[serde(default)]
    pub properties: Map<String, Value>,

    #[serde(default)]
    pub user_id: Option<Value>,
    #[serde(default, rename = "anonymousId")]
    pub anonymous_id: Option<Value>,
    #[serde(default)]
    pub item_id: Option<Value>,
    #[serde(default)]
    pub service_id: Option<Value>,
    #[serde(default)]
    pub comment: Option<Value>,
    #[serde(default)]
    pub elements_chain: Option<Value>,

    #[serde(default)]
    pub timestamp: Option<Value>,
    #[serde(default)]
    pub now: Option<Value>,
    #[serde(default)]
    pub sent_at: Option<Value>,
}

fn first_present<'a>(candidates: &[&'a Option<Value>]) -> Option<&'a Value> {
    candidates
        .iter()
        .copied()
        .find_map(|candidate| candidate.as_ref().filter(|v| !v.is_null()))
}

impl RawEvent {
    pub fn new(event: impl Into<String>) -> Self {
        RawEvent {
            event: event.into(),
            ..Default::default()
        }
    }

    /// `anonymousId` when present, otherwise `user_id`.
    pub fn user(&self) -> Option<&Value> {
        first_present(&[&self.anonymous_id, &self.user_id])
    }

    /// `service_id` when present, otherwise `item_id`.
    pub fn item(&self) -> Option<&Value> {
        first_present(&[&self.service_id, &self.item_id])
    }

    /// `elements_chain` when present, otherwise `comment`.
    pub fn comment_text(&self) -> Option<&Value> {
        first_present(&[&self.elements_chain, &self.comment])
    }

    /// The first timestamp candidate that is present, in order of preference.
    pub fn timestamp_candidate(&self) -> Option<&Value> {
        first_present(&[&self.timestamp, &self.now, &self.sent_at])
    }
}

/// One row of the export table. Column order matches [`ParsedRecord::COLUMNS`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedRecord {
    pub feedback_type: String,
    pub user_id: String,
    pub item_id: String,
    pub time_stamp: String,
    pub comment: String,
}

impl ParsedRecord {
    pub const COLUMNS: [&'static str; crate::constants::COLUMN_COUNT] =
        ["feedback_type", "user_id", "item_id", "time_stamp", "comment"];

    /// Values in column order, ready to be bound as statement parameters.
    pub fn params(&self) -> [&str; crate::constants::COLUMN_COUNT] {
        [
            self.feedback_type.as_str(),
            self.user_id.as_str(),
            self.item_id.as_str(),
            self.time_stamp.as_str(),
            self.comment.as_str(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_raw_event_ignores_unknown_fields() {
        let event: RawEvent = serde_json::from_value(json!({
            "event": "feedback",
            "user_id": "u1",
            "item_id": "i1",
            "timestamp": "2024-01-01T00:00:00Z",
            "comment": "x",
            "uuid": "0189aa",
            "ip": "127.0.0.1"
        }))
        .unwrap();

        assert_eq!(event.event, "feedback");
        assert_eq!(event.user_id, Some(json!("u1")));
        assert_eq!(event.item_id, Some(json!("i1")));
        assert_eq!(event.comment, Some(json!("x")));
        assert!(event.properties.is_empty());
    }

    #[test]
    fn test_raw_event_accepts_plugin_field_names() {
        let event: RawEvent = serde_json::from_value(json!({
            "event": "$pageview",
            "anonymousId": {"device": "d-1"},
            "service_id": 42,
            "elements_chain": "div:nth-child=1",
            "properties": {"$browser": "Firefox"}
        }))
        .unwrap();

        assert_eq!(event.user(), Some(&json!({"device": "d-1"})));
        assert_eq!(event.item(), Some(&json!(42)));
        assert_eq!(event.comment_text(), Some(&json!("div:nth-child=1")));
        assert_eq!(event.properties["$browser"], json!("Firefox"));
    }

    #[test]
    fn test_both_field_spellings_are_accepted() {
        let event: RawEvent = serde_json::from_str(
            r#"{"event":"feedback","user_id":"u1","anonymousId":"a1",
                "item_id":"i1","service_id":"s1","comment":"c","elements_chain":"e",
                "timestamp":"2024-01-01T00:00:00Z"}"#,
        )
        .unwrap();

        assert_eq!(event.user(), Some(&json!("a1")));
        assert_eq!(event.item(), Some(&json!("s1")));
        assert_eq!(event.comment_text(), Some(&json!("e")));
    }

    #[test]
    fn test_null_plugin_field_falls_back_to_canonical() {
        let event: RawEvent = serde_json::from_value(json!({
            "event": "feedback",
            "user_id": "u1",
            "anonymousId": null
        }))
        .unwrap();

        assert_eq!(event.user(), Some(&json!("u1")));
    }

    #[test]
    fn test_timestamp_candidate_prefers_explicit_timestamp() {
        let mut event = RawEvent::new("feedback");
        event.sent_at = Some(json!("2024-01-03T00:00:00Z"));
        event.now = Some(json!("2024-01-02T00:00:00Z"));
        assert_eq!(event.timestamp_candidate(), Some(&json!("2024-01-02T00:00:00Z")));

        event.timestamp = Some(json!("2024-01-01T00:00:00Z"));
        assert_eq!(event.timestamp_candidate(), Some(&json!("2024-01-01T00:00:00Z")));
    }

    #[test]
    fn test_timestamp_candidate_missing() {
        assert_eq!(RawEvent::new("feedback").timestamp_candidate(), None);
    }
}
