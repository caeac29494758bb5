//! Wire DTOs for the chat API.
//!
//! DESIGN
//! ======
//! The backend is lenient about shapes it has emitted over time: user ids
//! arrive as strings or numbers, history timestamps as epoch milliseconds or
//! RFC 3339 strings, and assistant turns as either `assistant` or `ai`. The
//! deserializers here absorb that so the rest of the panel sees one shape.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::state::conversation::{Message, Role};

/// Response body of `POST /chat`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ChatReply {
    /// Assistant markdown on success.
    #[serde(default)]
    pub result: Option<String>,
    /// Server-side failure description, when the backend supplies one.
    #[serde(default)]
    pub error: Option<String>,
}

/// Timestamp as delivered by `GET /chat/history`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum HistoryTimestamp {
    Millis(f64),
    Text(String),
}

impl HistoryTimestamp {
    /// Milliseconds since the Unix epoch, if the value is usable.
    #[must_use]
    pub fn as_millis(&self) -> Option<f64> {
        match self {
            Self::Millis(ms) => ms.is_finite().then_some(*ms),
            Self::Text(raw) => {
                let raw = raw.trim();
                if let Ok(ms) = raw.parse::<f64>() {
                    return ms.is_finite().then_some(ms);
                }
                let parsed = OffsetDateTime::parse(raw, &Rfc3339).ok()?;
                #[allow(clippy::cast_precision_loss)]
                let ms = parsed.unix_timestamp_nanos() as f64 / 1_000_000.0;
                Some(ms)
            }
        }
    }
}

/// One entry of `GET /chat/history`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct HistoryEntry {
    pub role: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub timestamp: Option<HistoryTimestamp>,
}

impl HistoryEntry {
    /// Map to a log message, or `None` for a role the panel does not render.
    ///
    /// Entries without a usable timestamp take `fallback_ts`.
    #[must_use]
    pub fn into_message(self, fallback_ts: f64) -> Option<Message> {
        let role = parse_role(&self.role)?;
        let ts = self.timestamp.as_ref().and_then(HistoryTimestamp::as_millis).unwrap_or(fallback_ts);
        Some(match role {
            Role::User => Message::user(self.text, None, ts),
            Role::Assistant => Message::assistant(self.text, ts),
        })
    }
}

/// Map server history to log messages, skipping unknown roles.
#[must_use]
pub fn history_to_messages(entries: Vec<HistoryEntry>, fallback_ts: f64) -> Vec<Message> {
    entries
        .into_iter()
        .filter_map(|entry| {
            let role = entry.role.clone();
            let message = entry.into_message(fallback_ts);
            if message.is_none() {
                log::warn!("skipping history entry with unknown role {role:?}");
            }
            message
        })
        .collect()
}

fn parse_role(raw: &str) -> Option<Role> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "user" => Some(Role::User),
        "assistant" | "ai" => Some(Role::Assistant),
        _ => None,
    }
}

/// User record persisted next to the bearer token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    #[serde(deserialize_with = "deserialize_id")]
    pub user_id: String,
    #[serde(default)]
    pub email: String,
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(D::Error::custom(format!("expected string or number id, got {other}"))),
    }
}
