//! REST collaborator for the chat server.
//!
//! `ChatApi` is the seam the controller talks through; `HttpChatApi` is the
//! reqwest implementation. Status and body interpretation live in plain
//! functions (`login_outcome`, `status_error`) so they can be tested without
//! a server.

use std::time::Duration;

use async_trait::async_trait;
use frames::{ChannelSnapshot, ChannelSummary, LoginRequest, Message, UserSummary};
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::config::ClientConfig;
use crate::error::SessionError;

// =============================================================================
// TRAIT
// =============================================================================

/// Every REST call the session controller makes.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// POST `user/login`.
    async fn login(&self, username: &str, password: &str) -> Result<UserSummary, SessionError>;

    /// GET `user/active`.
    async fn active_users(&self) -> Result<Vec<UserSummary>, SessionError>;

    /// GET `channel/all`.
    async fn all_channels(&self) -> Result<Vec<ChannelSummary>, SessionError>;

    /// GET `user/{username}/channels`.
    async fn user_channels(&self, username: &str) -> Result<Vec<ChannelSummary>, SessionError>;

    /// GET `cm/from/{channel_id}/all`.
    async fn channel_backlog(&self, channel_id: i64) -> Result<Vec<Message>, SessionError>;

    /// GET `dm/between/{me}/{peer}`.
    async fn direct_backlog(&self, me: &str, peer: &str) -> Result<Vec<Message>, SessionError>;

    /// GET `channel/{id}`.
    async fn channel_roster(&self, channel_id: i64) -> Result<ChannelSnapshot, SessionError>;

    /// PUT `channel/{id}/user/{username}`.
    async fn add_member(&self, channel_id: i64, username: &str) -> Result<(), SessionError>;

    /// DELETE `channel/{id}/user/{username}`.
    async fn remove_member(&self, channel_id: i64, username: &str) -> Result<(), SessionError>;

    /// PUT `channel/{id}/mod/{username}`.
    async fn add_moderator(&self, channel_id: i64, username: &str) -> Result<(), SessionError>;

    /// DELETE `channel/{id}/mod/{username}`.
    async fn remove_moderator(&self, channel_id: i64, username: &str) -> Result<(), SessionError>;
}

// =============================================================================
// HTTP CLIENT
// =============================================================================

pub struct HttpChatApi {
    http: reqwest::Client,
    base: Url,
}

impl HttpChatApi {
    /// Build a client rooted at `config.rest_url` with the configured timeouts.
    ///
    /// # Errors
    ///
    /// `Config` when the base URL does not parse, `Http` when the client
    /// cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, SessionError> {
        let base = Url::parse(&config.rest_url)
            .map_err(|e| SessionError::Config(format!("invalid REST URL {}: {e}", config.rest_url)))?;
        if base.cannot_be_a_base() {
            return Err(SessionError::Config(format!("REST URL cannot be a base: {base}")));
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()?;
        Ok(Self { http, base })
    }

    /// Resolve path segments against the base, percent-encoding each one.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, SessionError> {
        let path = segments.join("/");
        let response = self.http.get(self.url(segments)).send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%path, status = status.as_u16(), "rest request failed");
            return Err(status_error(status, &path));
        }
        let body = response.bytes().await?;
        frames::decode_json(&body).map_err(|e| SessionError::malformed(path, e))
    }

    async fn mutate(&self, method: Method, segments: &[&str]) -> Result<(), SessionError> {
        let path = segments.join("/");
        let response = self.http.request(method.clone(), self.url(segments)).send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%method, %path, status = status.as_u16(), "rest mutation failed");
            return Err(status_error(status, &path));
        }
        tracing::debug!(%method, %path, "rest mutation applied");
        Ok(())
    }
}

#[async_trait]
impl ChatApi for HttpChatApi {
    async fn login(&self, username: &str, password: &str) -> Result<UserSummary, SessionError> {
        let body = LoginRequest { username: username.to_owned(), password: password.to_owned() };
        let response = self.http.post(self.url(&["user", "login"])).json(&body).send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        login_outcome(status, &bytes, username)
    }

    async fn active_users(&self) -> Result<Vec<UserSummary>, SessionError> {
        self.get_json(&["user", "active"]).await
    }

    async fn all_channels(&self) -> Result<Vec<ChannelSummary>, SessionError> {
        self.get_json(&["channel", "all"]).await
    }

    async fn user_channels(&self, username: &str) -> Result<Vec<ChannelSummary>, SessionError> {
        self.get_json(&["user", username, "channels"]).await
    }

    async fn channel_backlog(&self, channel_id: i64) -> Result<Vec<Message>, SessionError> {
        let id = channel_id.to_string();
        self.get_json(&["cm", "from", &id, "all"]).await
    }

    async fn direct_backlog(&self, me: &str, peer: &str) -> Result<Vec<Message>, SessionError> {
        self.get_json(&["dm", "between", me, peer]).await
    }

    async fn channel_roster(&self, channel_id: i64) -> Result<ChannelSnapshot, SessionError> {
        let id = channel_id.to_string();
        self.get_json(&["channel", &id]).await
    }

    async fn add_member(&self, channel_id: i64, username: &str) -> Result<(), SessionError> {
        let id = channel_id.to_string();
        self.mutate(Method::PUT, &["channel", &id, "user", username]).await
    }

    async fn remove_member(&self, channel_id: i64, username: &str) -> Result<(), SessionError> {
        let id = channel_id.to_string();
        self.mutate(Method::DELETE, &["channel", &id, "user", username]).await
    }

    async fn add_moderator(&self, channel_id: i64, username: &str) -> Result<(), SessionError> {
        let id = channel_id.to_string();
        self.mutate(Method::PUT, &["channel", &id, "mod", username]).await
    }

    async fn remove_moderator(&self, channel_id: i64, username: &str) -> Result<(), SessionError> {
        let id = channel_id.to_string();
        self.mutate(Method::DELETE, &["channel", &id, "mod", username]).await
    }
}

// =============================================================================
// RESPONSE MAPPING
// =============================================================================

/// Interpret a `user/login` response.
///
/// 200 carries the profile; an empty 200 body falls back to a bare summary
/// for `username`.
pub(crate) fn login_outcome(status: StatusCode, body: &[u8], username: &str) -> Result<UserSummary, SessionError> {
    match status {
        StatusCode::UNAUTHORIZED => Err(SessionError::AuthFailed),
        StatusCode::FORBIDDEN => Err(SessionError::AccountLocked),
        StatusCode::NOT_FOUND => Err(SessionError::not_found(format!("user {username}"))),
        s if s.is_success() => match frames::decode_json::<UserSummary>(body) {
            Ok(profile) => Ok(profile),
            Err(frames::CodecError::Empty) => Ok(UserSummary { username: username.to_owned(), ..UserSummary::default() }),
            Err(e) => Err(SessionError::malformed("user/login", e)),
        },
        s => Err(status_error(s, "user/login")),
    }
}

/// Map a non-success status for `path` to an error.
pub(crate) fn status_error(status: StatusCode, path: &str) -> SessionError {
    if status == StatusCode::NOT_FOUND {
        SessionError::not_found(path)
    } else {
        SessionError::Server { status: status.as_u16(), path: path.to_owned() }
    }
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
