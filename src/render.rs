//! Declarative view model for whatever displays the session.
//!
//! Every function here is pure: session state in, display values out. The
//! controller pushes the results through a [`Surface`] and never holds on to
//! anything the surface owns.

use frames::{ChannelSummary, Message, UserSummary};

use crate::context::Context;
use crate::membership::Sidebars;
use crate::roles::{self, ChannelRoster, ModAction, Role};

// =============================================================================
// SURFACE
// =============================================================================

/// The message-display surface the controller drives.
pub trait Surface: Send {
    /// Drop every message currently shown.
    fn clear(&mut self);

    /// Show one more message below the others.
    fn append(&mut self, line: &RenderedMessage);

    /// Redraw header, sidebars and roster.
    fn present(&mut self, view: &SessionView);
}

// =============================================================================
// MESSAGES
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedMessage {
    /// Sender username; empty for server notices.
    pub from: String,
    /// Avatar image path, e.g. `img/3.jpg`.
    pub avatar: Option<String>,
    /// Short local time like `3:45 PM`; blank when the timestamp is missing
    /// or could not be decoded.
    pub time: String,
    pub content: String,
    /// Sent by the signed-in user.
    pub own: bool,
    /// Server-originated notice with no sender.
    pub notice: bool,
}

/// Display values for one message, or `None` when there is nothing to show.
#[must_use]
pub fn render_message(message: &Message, me: &str) -> Option<RenderedMessage> {
    if message.is_blank() {
        return None;
    }
    Some(RenderedMessage {
        from: message.from_username.clone(),
        avatar: message.from_avatar.map(avatar_path),
        time: message.timestamp.map(frames::Timestamp::short_time).unwrap_or_default(),
        content: message.content.clone(),
        own: !me.is_empty() && message.from_username == me,
        notice: message.from_username.is_empty(),
    })
}

#[must_use]
pub fn avatar_path(index: i32) -> String {
    format!("img/{index}.jpg")
}

// =============================================================================
// SIDEBARS
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SidebarEntry {
    pub label: String,
    pub target: Context,
    pub selected: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SidebarView {
    pub channels: Vec<SidebarEntry>,
    pub users: Vec<SidebarEntry>,
    /// Discoverable channels not yet joined.
    pub joinable: Vec<String>,
}

impl SidebarView {
    pub fn selected(&self) -> impl Iterator<Item = &SidebarEntry> {
        self.channels.iter().chain(&self.users).filter(|e| e.selected)
    }
}

/// Build the sidebars with exactly one entry selected when `active` is set.
///
/// An active context missing from the lists (a channel just left, a peer who
/// went offline) is appended so the selection is never lost.
#[must_use]
pub fn sidebar_view(sidebars: &Sidebars, active: Option<&Context>) -> SidebarView {
    let is_active = |target: &Context| active.is_some_and(|a| a.same_target(target));

    let mut channels: Vec<SidebarEntry> = sidebars
        .joined
        .iter()
        .map(|ChannelSummary { id, name }| {
            let target = Context::channel(*id, name.clone());
            SidebarEntry { label: format!("#{name}"), selected: is_active(&target), target }
        })
        .collect();

    let mut users: Vec<SidebarEntry> = sidebars
        .peers
        .iter()
        .map(|user| {
            let target = Context::direct(user.username.clone());
            SidebarEntry { label: user.display_name(), selected: is_active(&target), target }
        })
        .collect();

    if let Some(active) = active {
        let list = match active {
            Context::Channel { .. } => &mut channels,
            Context::Direct { .. } => &mut users,
        };
        if !list.iter().any(|e| e.selected) {
            list.push(SidebarEntry { label: active.to_string(), target: active.clone(), selected: true });
        }
    }

    SidebarView { channels, users, joinable: sidebars.joinable.iter().map(|c| c.name.clone()).collect() }
}

// =============================================================================
// ROSTER
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RosterEntry {
    pub username: String,
    pub display_name: String,
    pub system_moderator: bool,
    /// Moderation icons to offer next to this entry.
    pub actions: Vec<ModAction>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RosterView {
    pub role: Role,
    pub moderators: Vec<RosterEntry>,
    pub participants: Vec<RosterEntry>,
}

#[must_use]
pub fn roster_view(roster: &ChannelRoster, me: &str) -> RosterView {
    let entry = |user: &UserSummary, in_mod_list: bool| RosterEntry {
        username: user.username.clone(),
        display_name: user.display_name(),
        system_moderator: in_mod_list && user.is_mod,
        actions: roles::available_actions(roster, me, user, in_mod_list),
    };

    RosterView {
        role: roles::evaluate(roster, me),
        moderators: roster.moderators.iter().map(|u| entry(u, true)).collect(),
        participants: roster.participants.iter().map(|u| entry(u, false)).collect(),
    }
}

// =============================================================================
// SESSION
// =============================================================================

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionView {
    pub username: String,
    /// `#channel` or `@peer`; empty before the first switch.
    pub header: String,
    pub sidebar: SidebarView,
    pub roster: Option<RosterView>,
    pub connected: bool,
}

#[must_use]
pub fn session_view(
    me: &str,
    active: Option<&Context>,
    sidebars: &Sidebars,
    roster: Option<&ChannelRoster>,
    connected: bool,
) -> SessionView {
    SessionView {
        username: me.to_owned(),
        header: active.map(ToString::to_string).unwrap_or_default(),
        sidebar: sidebar_view(sidebars, active),
        roster: roster.map(|r| roster_view(r, me)),
        connected,
    }
}

#[cfg(test)]
#[path = "render_test.rs"]
mod tests;
