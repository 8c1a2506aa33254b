//! Shared wire model and JSON codec for the chat transport.
//!
//! This crate owns the representation of everything that crosses the wire:
//! live frames pushed over the websocket, the outbound frame a client sends,
//! and the REST payloads (users, channels, rosters) the session controller
//! consumes. Field names follow the server's camelCase JSON.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

mod timestamp;

pub use timestamp::Timestamp;

/// Error returned by the decode functions.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The payload was empty or whitespace only.
    #[error("empty payload")]
    Empty,
    /// The payload is not valid JSON for the expected shape.
    #[error("failed to decode JSON payload: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// MESSAGES
// =============================================================================

/// A chat message, either pushed live or returned as part of a backlog.
///
/// Server-originated notices (unknown user, unknown channel) arrive with an
/// empty `from_username`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Server row id, present once the message has been persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default)]
    pub from_username: String,
    /// Avatar index of the sender.
    #[serde(default)]
    pub from_avatar: Option<i32>,
    #[serde(default)]
    pub content: String,
    /// Absent or undecodable timestamps are `None`; they never fail the message.
    #[serde(
        default,
        deserialize_with = "timestamp::deserialize_lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_channel_id: Option<i64>,
}

impl Message {
    /// `true` when there is nothing to show for this message.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.content.is_empty()
    }
}

/// The frame a client sends over a live binding.
///
/// `to_username` is empty for channel contexts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundFrame {
    pub content: String,
    pub to_username: String,
}

// =============================================================================
// USERS AND CHANNELS
// =============================================================================

/// Public view of a user as returned by the user and channel endpoints.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    /// System-moderator flag. Only meaningful inside a roster's `mods` list.
    #[serde(default)]
    pub is_mod: bool,
    #[serde(default)]
    pub avatar: Option<i32>,
}

impl UserSummary {
    /// "First Last", falling back to the username when both are blank.
    #[must_use]
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_owned()
        }
    }
}

/// A channel as listed by `channel/all` and `user/{username}/channels`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelSummary {
    pub id: i64,
    pub name: String,
}

/// Membership snapshot returned by `channel/{id}`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSnapshot {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub participants: Vec<UserSummary>,
    #[serde(default)]
    pub mods: Vec<UserSummary>,
}

/// Credentials posted to `user/login`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

// =============================================================================
// CODEC
// =============================================================================

/// Decode a live frame received on a binding.
///
/// # Errors
///
/// Returns [`CodecError::Empty`] for blank text and [`CodecError::Json`] when
/// the text is not a message object.
pub fn decode_message(text: &str) -> Result<Message, CodecError> {
    decode_json(text.as_bytes())
}

/// Encode an outbound frame as JSON text.
#[must_use]
pub fn encode_outbound(frame: &OutboundFrame) -> String {
    // Two string fields; serialization cannot fail.
    serde_json::to_string(frame).unwrap_or_default()
}

/// Decode any JSON payload (REST body or live frame).
///
/// # Errors
///
/// Returns [`CodecError::Empty`] for an empty or whitespace body and
/// [`CodecError::Json`] when the body does not match `T`.
pub fn decode_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(CodecError::Empty);
    }
    Ok(serde_json::from_slice(bytes)?)
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
