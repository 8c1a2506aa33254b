//! Line-oriented terminal rendering of the session view.
//!
//! DESIGN
//! ======
//! The formatting functions are pure so they can be tested without a TTY;
//! [`TerminalSurface`] only decides when to print them. A full redraw is not
//! possible on a scrolling terminal, so `present` prints the header only when
//! the active context or connection state changes.

use parley::render::{RosterEntry, RosterView, SidebarEntry, SidebarView};
use parley::{ModAction, RenderedMessage, SessionView, Surface};

#[derive(Debug, Default)]
pub struct TerminalSurface {
    last_header: Option<(String, bool)>,
}

impl Surface for TerminalSurface {
    fn clear(&mut self) {
        println!();
    }

    fn append(&mut self, line: &RenderedMessage) {
        println!("{}", format_message(line));
    }

    fn present(&mut self, view: &SessionView) {
        let current = (view.header.clone(), view.connected);
        if self.last_header.as_ref() == Some(&current) {
            return;
        }
        if let Some(header) = format_header(view) {
            println!("{header}");
        }
        self.last_header = Some(current);
    }
}

pub fn format_message(line: &RenderedMessage) -> String {
    if line.notice {
        return format!("* {}", line.content);
    }
    let from = if line.own { format!("{} (you)", line.from) } else { line.from.clone() };
    if line.time.is_empty() {
        format!("{from}: {}", line.content)
    } else {
        format!("[{}] {from}: {}", line.time, line.content)
    }
}

/// `None` before the first context is selected.
pub fn format_header(view: &SessionView) -> Option<String> {
    if view.header.is_empty() {
        return None;
    }
    let state = if view.connected { "" } else { " (disconnected)" };
    Some(format!("── {}{state} ──", view.header))
}

pub fn format_channels(sidebar: &SidebarView) -> Vec<String> {
    let mut lines = vec!["Channels:".to_owned()];
    lines.extend(sidebar.channels.iter().map(entry_line));
    if !sidebar.joinable.is_empty() {
        lines.push(format!("Joinable: {}", sidebar.joinable.join(", ")));
    }
    lines
}

pub fn format_users(sidebar: &SidebarView) -> Vec<String> {
    let mut lines = vec!["Users:".to_owned()];
    lines.extend(sidebar.users.iter().map(entry_line));
    lines
}

fn entry_line(entry: &SidebarEntry) -> String {
    let marker = if entry.selected { '>' } else { ' ' };
    format!("{marker} {}", entry.label)
}

pub fn format_roster(roster: &RosterView) -> Vec<String> {
    let mut lines = vec![format!("Your role: {}", roster.role)];
    lines.push("Moderators:".to_owned());
    lines.extend(roster.moderators.iter().map(roster_line));
    lines.push("Participants:".to_owned());
    lines.extend(roster.participants.iter().map(roster_line));
    lines
}

fn roster_line(entry: &RosterEntry) -> String {
    let mut line = format!("  {}", entry.display_name);
    if entry.display_name != entry.username {
        line.push_str(&format!(" ({})", entry.username));
    }
    if entry.system_moderator {
        line.push_str(" [system]");
    }
    if !entry.actions.is_empty() {
        let actions: Vec<&str> = entry.actions.iter().copied().map(ModAction::as_str).collect();
        line.push_str(&format!("  /{}", actions.join(" /")));
    }
    line
}

#[cfg(test)]
#[path = "terminal_test.rs"]
mod tests;
