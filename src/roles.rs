//! Role evaluation and moderation permissions for a channel roster.
//!
//! DESIGN
//! ======
//! Roles are derived, never stored. `evaluate` scans the moderator list first
//! (first match wins), then the participant list. Every legality check runs
//! locally before any REST mutation is dispatched, so an illegal action never
//! reaches the server.
//!
//! The roster itself is rebuilt wholesale from a `ChannelSnapshot` after every
//! membership mutation; nothing here patches it in place.

use std::fmt;

use frames::{ChannelSnapshot, UserSummary};

use crate::error::SessionError;

// =============================================================================
// TYPES
// =============================================================================

/// The signed-in user's standing in one channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Role {
    #[default]
    None,
    Participant,
    Moderator,
    SystemModerator,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Participant => "participant",
            Self::Moderator => "moderator",
            Self::SystemModerator => "system moderator",
        }
    }

    /// Moderators of either kind.
    #[must_use]
    pub fn can_moderate(self) -> bool {
        matches!(self, Self::Moderator | Self::SystemModerator)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ModAction {
    Promote,
    Demote,
    Kick,
}

impl ModAction {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Promote => "promote",
            Self::Demote => "demote",
            Self::Kick => "kick",
        }
    }
}

impl fmt::Display for ModAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Membership of one channel as last fetched from the server.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChannelRoster {
    pub channel_id: i64,
    pub participants: Vec<UserSummary>,
    /// Moderators; `is_mod` marks a system moderator.
    pub moderators: Vec<UserSummary>,
}

impl From<ChannelSnapshot> for ChannelRoster {
    fn from(snapshot: ChannelSnapshot) -> Self {
        Self { channel_id: snapshot.id, participants: snapshot.participants, moderators: snapshot.mods }
    }
}

impl ChannelRoster {
    /// First moderator entry for `username`.
    #[must_use]
    pub fn moderator(&self, username: &str) -> Option<&UserSummary> {
        self.moderators.iter().find(|u| u.username == username)
    }

    #[must_use]
    pub fn participant(&self, username: &str) -> Option<&UserSummary> {
        self.participants.iter().find(|u| u.username == username)
    }

    #[must_use]
    pub fn contains(&self, username: &str) -> bool {
        self.moderator(username).is_some() || self.participant(username).is_some()
    }
}

// =============================================================================
// EVALUATION
// =============================================================================

/// Derive `username`'s role in `roster`.
#[must_use]
pub fn evaluate(roster: &ChannelRoster, username: &str) -> Role {
    if let Some(entry) = roster.moderator(username) {
        return if entry.is_mod { Role::SystemModerator } else { Role::Moderator };
    }
    if roster.participant(username).is_some() {
        return Role::Participant;
    }
    Role::None
}

/// Whether `role` may perform `action` on `target` given the roster.
///
/// Does not check that the target exists; see [`authorize`].
#[must_use]
pub fn is_legal(roster: &ChannelRoster, role: Role, action: ModAction, actor: &str, target: &str) -> bool {
    if actor == target {
        return false;
    }
    match action {
        ModAction::Promote | ModAction::Kick => role.can_moderate(),
        ModAction::Demote => {
            role == Role::SystemModerator && roster.moderator(target).is_some_and(|m| !m.is_mod)
        }
    }
}

/// Check a moderation action before dispatch.
///
/// # Errors
///
/// `PermissionDenied` when the actor's role or the self check forbids the
/// action, `NotFound` when the target is not in the roster at all.
pub fn authorize(roster: &ChannelRoster, actor: &str, action: ModAction, target: &str) -> Result<Role, SessionError> {
    let role = evaluate(roster, actor);
    let denied = || SessionError::PermissionDenied { action, role, target: target.to_owned() };

    if actor == target {
        return Err(denied());
    }
    match action {
        ModAction::Promote | ModAction::Kick if !role.can_moderate() => return Err(denied()),
        ModAction::Demote if role != Role::SystemModerator => return Err(denied()),
        _ => {}
    }
    if !roster.contains(target) {
        return Err(SessionError::not_found(format!("user {target} in channel {}", roster.channel_id)));
    }
    if !is_legal(roster, role, action, actor, target) {
        return Err(denied());
    }
    Ok(role)
}

/// Actions to offer next to `target`'s entry in the given list.
///
/// The moderator list offers demote, the participant list promote and kick;
/// each is filtered through [`is_legal`] for `viewer`.
#[must_use]
pub fn available_actions(roster: &ChannelRoster, viewer: &str, target: &UserSummary, in_mod_list: bool) -> Vec<ModAction> {
    let role = evaluate(roster, viewer);
    let candidates: &[ModAction] =
        if in_mod_list { &[ModAction::Demote] } else { &[ModAction::Promote, ModAction::Kick] };

    candidates
        .iter()
        .copied()
        .filter(|action| is_legal(roster, role, *action, viewer, &target.username))
        .collect()
}

#[cfg(test)]
#[path = "roles_test.rs"]
mod tests;
