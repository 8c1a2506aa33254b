//! Sidebar lists and channel discovery.
//!
//! All three lists are rebuilt together from fresh REST snapshots; joinable
//! channels are never cached across a membership change.

use frames::{ChannelSummary, UserSummary};

use crate::api::ChatApi;
use crate::error::SessionError;

/// Maximum number of suggestions returned by [`search`].
pub const SEARCH_LIMIT: usize = 10;

/// Channels in `all` whose name does not appear in `joined`, in `all`'s order.
#[must_use]
pub fn reconcile(all: &[ChannelSummary], joined: &[ChannelSummary]) -> Vec<ChannelSummary> {
    all.iter()
        .filter(|channel| !joined.iter().any(|j| j.name == channel.name))
        .cloned()
        .collect()
}

/// Everything the sidebars show.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Sidebars {
    pub me: Option<UserSummary>,
    /// Active users other than the signed-in user.
    pub peers: Vec<UserSummary>,
    pub joined: Vec<ChannelSummary>,
    pub joinable: Vec<ChannelSummary>,
}

impl Sidebars {
    #[must_use]
    pub fn joined_named(&self, name: &str) -> Option<&ChannelSummary> {
        self.joined.iter().find(|c| c.name == name)
    }

    #[must_use]
    pub fn joinable_named(&self, name: &str) -> Option<&ChannelSummary> {
        self.joinable.iter().find(|c| c.name == name)
    }

    /// Name of a channel the user can see, joined or not.
    #[must_use]
    pub fn channel_name(&self, id: i64) -> Option<&str> {
        self.joined
            .iter()
            .chain(&self.joinable)
            .find(|c| c.id == id)
            .map(|c| c.name.as_str())
    }

    #[must_use]
    pub fn has_peer(&self, username: &str) -> bool {
        self.peers.iter().any(|u| u.username == username)
    }
}

/// Fetch the three lists concurrently and rebuild the sidebars.
///
/// # Errors
///
/// The first REST failure.
pub async fn load_sidebars(api: &dyn ChatApi, me: &str) -> Result<Sidebars, SessionError> {
    let (active, all, joined) = tokio::try_join!(api.active_users(), api.all_channels(), api.user_channels(me))?;

    let (mine, peers): (Vec<_>, Vec<_>) = active.into_iter().partition(|u| u.username == me);
    let joinable = reconcile(&all, &joined);
    tracing::debug!(peers = peers.len(), joined = joined.len(), joinable = joinable.len(), "sidebars rebuilt");

    Ok(Sidebars { me: mine.into_iter().next(), peers, joined, joinable })
}

/// Resolve `name` to a channel the user may join.
///
/// # Errors
///
/// `AlreadyMember` when already joined, `NotFound` when no such channel.
pub fn check_joinable<'a>(sidebars: &'a Sidebars, name: &str) -> Result<&'a ChannelSummary, SessionError> {
    if sidebars.joined_named(name).is_some() {
        return Err(SessionError::AlreadyMember { channel: name.to_owned() });
    }
    sidebars
        .joinable_named(name)
        .ok_or_else(|| SessionError::not_found(format!("channel {name}")))
}

/// Joinable channels whose name contains `query`, ignoring case.
#[must_use]
pub fn search<'a>(joinable: &'a [ChannelSummary], query: &str) -> Vec<&'a ChannelSummary> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    joinable
        .iter()
        .filter(|c| c.name.to_lowercase().contains(&needle))
        .take(SEARCH_LIMIT)
        .collect()
}

#[cfg(test)]
#[path = "membership_test.rs"]
mod tests;
