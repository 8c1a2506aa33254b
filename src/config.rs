//! Client configuration parsed from environment variables.

use crate::error::SessionError;

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8080/prattle/";
pub const DEFAULT_CHANNEL_ID: i64 = 1;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_DEBOUNCE_MS: u64 = 200;
pub const DEFAULT_THROTTLE_MS: u64 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

/// Delays used by the action gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateDelays {
    pub debounce_ms: u64,
    pub throttle_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the REST collaborator, always ending in `/`.
    pub rest_url: String,
    /// Base URL of the real-time endpoints, always ending in `/`.
    pub ws_url: String,
    /// Channel opened right after sign-in.
    pub default_channel: i64,
    pub timeouts: Timeouts,
    pub gate: GateDelays,
}

impl ClientConfig {
    /// Defaults for a server rooted at `server_url`.
    ///
    /// The REST base is `{server_url}rest/`; the websocket base swaps the
    /// scheme (`http` → `ws`, `https` → `wss`).
    ///
    /// # Errors
    ///
    /// `Config` when the URL scheme is neither `http` nor `https`.
    pub fn for_server(server_url: &str) -> Result<Self, SessionError> {
        let server = with_trailing_slash(server_url.trim());
        Ok(Self {
            rest_url: format!("{server}rest/"),
            ws_url: ws_base(&server)?,
            default_channel: DEFAULT_CHANNEL_ID,
            timeouts: Timeouts {
                request_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
                connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            },
            gate: GateDelays { debounce_ms: DEFAULT_DEBOUNCE_MS, throttle_ms: DEFAULT_THROTTLE_MS },
        })
    }

    /// Build typed config from environment variables.
    ///
    /// Optional:
    /// - `PARLEY_SERVER_URL`: default `http://127.0.0.1:8080/prattle/`
    /// - `PARLEY_REST_URL` / `PARLEY_WS_URL`: override the derived bases
    /// - `PARLEY_DEFAULT_CHANNEL`: default 1
    /// - `PARLEY_REQUEST_TIMEOUT_SECS`: default 15
    /// - `PARLEY_CONNECT_TIMEOUT_SECS`: default 5
    /// - `PARLEY_DEBOUNCE_MS`: default 200
    /// - `PARLEY_THROTTLE_MS`: default 500
    ///
    /// Unparseable numbers fall back to their defaults.
    ///
    /// # Errors
    ///
    /// `Config` when the server URL has an unsupported scheme.
    pub fn from_env() -> Result<Self, SessionError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ClientConfig::from_env`] with an explicit variable source.
    ///
    /// # Errors
    ///
    /// See [`ClientConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SessionError> {
        let server = lookup("PARLEY_SERVER_URL").unwrap_or_else(|| DEFAULT_SERVER_URL.to_owned());
        let mut config = Self::for_server(&server)?;

        if let Some(rest) = lookup("PARLEY_REST_URL") {
            config.rest_url = with_trailing_slash(rest.trim());
        }
        if let Some(ws) = lookup("PARLEY_WS_URL") {
            config.ws_url = with_trailing_slash(ws.trim());
        }

        config.default_channel = parse_or(&lookup, "PARLEY_DEFAULT_CHANNEL", DEFAULT_CHANNEL_ID);
        config.timeouts = Timeouts {
            request_secs: parse_or(&lookup, "PARLEY_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: parse_or(&lookup, "PARLEY_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };
        config.gate = GateDelays {
            debounce_ms: parse_or(&lookup, "PARLEY_DEBOUNCE_MS", DEFAULT_DEBOUNCE_MS),
            throttle_ms: parse_or(&lookup, "PARLEY_THROTTLE_MS", DEFAULT_THROTTLE_MS),
        };
        Ok(config)
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    lookup(key)
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn with_trailing_slash(url: &str) -> String {
    if url.ends_with('/') { url.to_owned() } else { format!("{url}/") }
}

fn ws_base(server_url: &str) -> Result<String, SessionError> {
    if let Some(rest) = server_url.strip_prefix("http://") {
        return Ok(format!("ws://{rest}"));
    }
    if let Some(rest) = server_url.strip_prefix("https://") {
        return Ok(format!("wss://{rest}"));
    }
    if server_url.starts_with("ws://") || server_url.starts_with("wss://") {
        return Ok(server_url.to_owned());
    }

    Err(SessionError::Config(format!("unsupported server URL: {server_url}")))
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
