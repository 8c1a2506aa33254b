//! Parsing of interactive input lines.

use parley::ModAction;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Plain text for the active context.
    Say(String),
    Navigate(Navigation),
    Search(String),
    Moderate(ModAction, String),
    Who,
    Channels,
    Users,
    Refresh,
    Help,
    Quit,
    /// A slash command with missing or bad arguments; carries the usage line.
    Usage(&'static str),
    Unknown(String),
}

/// Commands that move the session to another context. These go through the
/// debounce gate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Navigation {
    Channel(i64),
    Direct(String),
    Join(String),
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Option<Command> {
    let text = line.trim();
    if text.is_empty() {
        return None;
    }
    if !text.starts_with('/') {
        return Some(Command::Say(text.to_owned()));
    }

    let (cmd, arg) = match text.split_once(char::is_whitespace) {
        Some((cmd, rest)) => (cmd.to_lowercase(), Some(rest.trim()).filter(|a| !a.is_empty())),
        None => (text.to_lowercase(), None),
    };

    let command = match cmd.as_str() {
        "/channel" | "/c" => match arg.map(str::parse::<i64>) {
            Some(Ok(id)) => Command::Navigate(Navigation::Channel(id)),
            _ => Command::Usage("/channel <id>"),
        },
        "/dm" | "/msg" => arg.map_or(Command::Usage("/dm <user>"), |a| {
            Command::Navigate(Navigation::Direct(a.to_lowercase()))
        }),
        "/join" => arg.map_or(Command::Usage("/join <channel>"), |a| Command::Navigate(Navigation::Join(a.to_owned()))),
        "/search" => arg.map_or(Command::Usage("/search <text>"), |a| Command::Search(a.to_owned())),
        "/promote" | "/mod" => moderate(ModAction::Promote, arg, "/promote <user>"),
        "/demote" | "/unmod" => moderate(ModAction::Demote, arg, "/demote <user>"),
        "/kick" => moderate(ModAction::Kick, arg, "/kick <user>"),
        "/who" | "/roster" => Command::Who,
        "/channels" => Command::Channels,
        "/users" => Command::Users,
        "/refresh" => Command::Refresh,
        "/help" | "/?" => Command::Help,
        "/quit" | "/exit" => Command::Quit,
        _ => Command::Unknown(cmd),
    };
    Some(command)
}

fn moderate(action: ModAction, arg: Option<&str>, usage: &'static str) -> Command {
    arg.map_or(Command::Usage(usage), |target| Command::Moderate(action, target.to_lowercase()))
}

pub fn help_text() -> Vec<&'static str> {
    vec![
        "── Commands ──",
        "<text>            Send to the current channel or conversation",
        "/channel <id>     Switch to a channel",
        "/dm <user>        Open a direct conversation",
        "/join <channel>   Join a channel by name and switch to it",
        "/search <text>    Find channels you can join",
        "/channels         List joined and joinable channels",
        "/users            List other users",
        "/who              Show the channel roster and your role",
        "/promote <user>   Make a participant a moderator",
        "/demote <user>    Remove a moderator (system moderators only)",
        "/kick <user>      Remove a participant from the channel",
        "/refresh          Reload sidebars and roster",
        "/quit             Sign out and exit",
    ]
}

#[cfg(test)]
#[path = "command_test.rs"]
mod tests;
