//! Backlog-then-live ordering for one context.
//!
//! While a backlog fetch is in flight the merger is `Loading` and buffers
//! live messages; `complete` yields the backlog followed by the buffer and
//! switches to `Live`, after which messages pass straight through.
//!
//! Server ids of everything released for the current context are remembered
//! until the next `begin`, so a row is released at most once even when its
//! live push lands after the backlog that already contained it.

use std::collections::HashSet;

use frames::Message;

use crate::api::ChatApi;
use crate::context::Context;
use crate::error::SessionError;

#[derive(Debug, Default)]
enum Phase {
    #[default]
    Live,
    Loading {
        buffered: Vec<Message>,
    },
}

#[derive(Debug, Default)]
pub struct HistoryMerger {
    phase: Phase,
    released: HashSet<i64>,
}

impl HistoryMerger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a fetch window for a new context. Anything buffered or
    /// remembered from the previous one is dropped.
    pub fn begin(&mut self) {
        self.phase = Phase::Loading { buffered: Vec::new() };
        self.released.clear();
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self.phase, Phase::Loading { .. })
    }

    /// Offer a live message. Returns it when it may be rendered now; buffers
    /// it while loading. Blank messages and rows already released are dropped.
    pub fn accept_live(&mut self, message: Message) -> Option<Message> {
        if message.is_blank() {
            return None;
        }
        match &mut self.phase {
            Phase::Loading { buffered } => {
                buffered.push(message);
                None
            }
            Phase::Live => {
                if let Some(id) = message.id {
                    if !self.released.insert(id) {
                        tracing::debug!(id, "dropping live copy of a rendered row");
                        return None;
                    }
                }
                Some(message)
            }
        }
    }

    /// Close the fetch window and return everything to render, in order:
    /// the backlog, then live messages buffered during the fetch. A buffered
    /// message whose `id` already appears in the backlog is dropped.
    pub fn complete(&mut self, backlog: Vec<Message>) -> Vec<Message> {
        let buffered = match std::mem::take(&mut self.phase) {
            Phase::Loading { buffered } => buffered,
            Phase::Live => Vec::new(),
        };

        let released = &mut self.released;
        backlog
            .into_iter()
            .chain(buffered)
            .filter(|m| !m.is_blank())
            .filter(|m| m.id.is_none_or(|id| released.insert(id)))
            .collect()
    }
}

/// Fetch the ordered backlog for `context` as seen by `me`.
///
/// # Errors
///
/// Propagates the REST failure.
pub async fn fetch_backlog(api: &dyn ChatApi, context: &Context, me: &str) -> Result<Vec<Message>, SessionError> {
    match context {
        Context::Channel { id, .. } => api.channel_backlog(*id).await,
        Context::Direct { peer } => api.direct_backlog(me, peer).await,
    }
}

#[cfg(test)]
#[path = "history_test.rs"]
mod tests;
