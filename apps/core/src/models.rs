use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Author of a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Represents a single message within a chat session.
///
/// Owned by the session layer; the engine only reads it. The timestamp is kept
/// as the raw string the session layer produced, since it may be malformed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    /// Who sent the message.
    pub role: Role,
    /// The textual content of the message.
    pub content: String,
    /// ISO-8601 timestamp of when the message was recorded.
    #[serde(default)]
    pub timestamp: String,
}

impl ConversationMessage {
    /// Creates a user message stamped with the given instant.
    pub fn user(content: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: at.to_rfc3339_opts(SecondsFormat::Micros, false),
        }
    }

    /// Creates an assistant message stamped with the given instant.
    pub fn assistant(content: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp: at.to_rfc3339_opts(SecondsFormat::Micros, false),
        }
    }

    /// Parsed timestamp, if the raw string is a recognisable ISO-8601 value.
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.timestamp)
    }
}

/// Ordered conversation history, oldest first.
pub type ConversationHistory = Vec<ConversationMessage>;

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

/// Parses an ISO-8601 timestamp.
///
/// Values carrying an offset are converted to UTC; naive values are taken as UTC.
/// Returns `None` for anything unrecognisable.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
