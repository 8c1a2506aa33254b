//! Addressable chat contexts: a broadcast channel or a direct conversation.

use std::fmt;

/// The channel or direct-message peer a session is attached to.
///
/// Immutable once constructed; identifies both the live endpoint and the
/// backlog to fetch.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Context {
    Channel { id: i64, name: String },
    Direct { peer: String },
}

impl Context {
    #[must_use]
    pub fn channel(id: i64, name: impl Into<String>) -> Self {
        Self::Channel { id, name: name.into() }
    }

    #[must_use]
    pub fn direct(peer: impl Into<String>) -> Self {
        Self::Direct { peer: peer.into() }
    }

    /// Path of the live endpoint relative to the websocket base.
    #[must_use]
    pub fn endpoint_path(&self, username: &str) -> String {
        match self {
            Self::Channel { id, .. } => format!("cm/{id}/{username}"),
            Self::Direct { peer } => format!("dm/{peer}/{username}"),
        }
    }

    /// Full live endpoint URL. `ws_base` must end with `/`.
    #[must_use]
    pub fn endpoint(&self, ws_base: &str, username: &str) -> String {
        format!("{ws_base}{}", self.endpoint_path(username))
    }

    /// `true` when both address the same endpoint. Channel names are labels
    /// only and do not participate.
    #[must_use]
    pub fn same_target(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Channel { id: a, .. }, Self::Channel { id: b, .. }) => a == b,
            (Self::Direct { peer: a }, Self::Direct { peer: b }) => a == b,
            _ => false,
        }
    }

    #[must_use]
    pub fn channel_id(&self) -> Option<i64> {
        match self {
            Self::Channel { id, .. } => Some(*id),
            Self::Direct { .. } => None,
        }
    }

    /// Value of the outbound `toUsername` field.
    #[must_use]
    pub fn recipient(&self) -> &str {
        match self {
            Self::Channel { .. } => "",
            Self::Direct { peer } => peer,
        }
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Channel { name, .. } => write!(f, "#{name}"),
            Self::Direct { peer } => write!(f, "@{peer}"),
        }
    }
}

#[cfg(test)]
#[path = "context_test.rs"]
mod tests;
