//! In-memory doubles for the REST collaborator, the dialer and the surface.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use frames::{ChannelSnapshot, ChannelSummary, Message, UserSummary};
use tokio::sync::{Notify, mpsc};

use crate::api::ChatApi;
use crate::error::SessionError;
use crate::render::{RenderedMessage, SessionView, Surface};
use crate::transport::{Dialer, Socket};

pub fn user(name: &str) -> UserSummary {
    UserSummary { username: name.to_owned(), ..UserSummary::default() }
}

pub fn moderator(name: &str, system: bool) -> UserSummary {
    UserSummary { username: name.to_owned(), is_mod: system, ..UserSummary::default() }
}

pub fn channel(id: i64, name: &str) -> ChannelSummary {
    ChannelSummary { id, name: name.to_owned() }
}

pub fn msg(id: i64, from: &str, content: &str) -> Message {
    Message { id: Some(id), from_username: from.to_owned(), content: content.to_owned(), ..Message::default() }
}

// =============================================================================
// FAKE API
// =============================================================================

#[derive(Default)]
pub struct FakeData {
    pub passwords: HashMap<String, String>,
    pub locked: Vec<String>,
    pub active: Vec<UserSummary>,
    pub channels: Vec<ChannelSummary>,
    /// Channel ids per username.
    pub memberships: HashMap<String, Vec<i64>>,
    pub backlogs: HashMap<i64, Vec<Message>>,
    /// Keyed by the sorted username pair.
    pub direct: HashMap<(String, String), Vec<Message>>,
    pub rosters: HashMap<i64, ChannelSnapshot>,
    pub fail_backlog: bool,
    /// Every call, e.g. `PUT channel/1/mod/bob`.
    pub calls: Vec<String>,
}

#[derive(Default)]
pub struct FakeApi {
    data: Mutex<FakeData>,
    /// When set, backlog fetches announce themselves on `requested` and wait
    /// for `release`.
    hold: Mutex<Option<(Arc<Notify>, Arc<Notify>)>>,
}

fn pair(a: &str, b: &str) -> (String, String) {
    if a <= b { (a.to_owned(), b.to_owned()) } else { (b.to_owned(), a.to_owned()) }
}

impl FakeApi {
    /// Server with users ada, bob, cy and channels general(1), random(2), rust(3).
    /// ada (system mod) and bob belong to general; ada to random.
    pub fn seeded() -> Self {
        let api = Self::default();
        {
            let mut data = api.data();
            for name in ["ada", "bob", "cy"] {
                data.passwords.insert(name.to_owned(), format!("{name}-pw"));
                data.active.push(user(name));
            }
            data.channels = vec![channel(1, "general"), channel(2, "random"), channel(3, "rust")];
            data.memberships.insert("ada".to_owned(), vec![1, 2]);
            data.memberships.insert("bob".to_owned(), vec![1]);
            data.rosters.insert(
                1,
                ChannelSnapshot {
                    id: 1,
                    name: "general".to_owned(),
                    participants: vec![user("ada"), user("bob")],
                    mods: vec![moderator("ada", true)],
                },
            );
            data.rosters.insert(
                2,
                ChannelSnapshot { id: 2, name: "random".to_owned(), participants: vec![user("ada")], mods: Vec::new() },
            );
            data.rosters.insert(3, ChannelSnapshot { id: 3, name: "rust".to_owned(), ..ChannelSnapshot::default() });
        }
        api
    }

    pub fn data(&self) -> MutexGuard<'_, FakeData> {
        self.data.lock().unwrap()
    }

    pub fn calls(&self) -> Vec<String> {
        self.data().calls.clone()
    }

    pub fn mutations(&self) -> Vec<String> {
        self.calls().into_iter().filter(|c| c.starts_with("PUT") || c.starts_with("DELETE")).collect()
    }

    pub fn set_direct(&self, a: &str, b: &str, messages: Vec<Message>) {
        self.data().direct.insert(pair(a, b), messages);
    }

    /// Make backlog fetches wait. Returns (requested, release).
    pub fn hold_backlogs(&self) -> (Arc<Notify>, Arc<Notify>) {
        let requested = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        *self.hold.lock().unwrap() = Some((requested.clone(), release.clone()));
        (requested, release)
    }

    async fn maybe_hold(&self) {
        let hold = self.hold.lock().unwrap().clone();
        if let Some((requested, release)) = hold {
            requested.notify_one();
            release.notified().await;
        }
    }

    fn record(&self, call: String) {
        self.data().calls.push(call);
    }

    fn channels_of(&self, username: &str) -> Vec<ChannelSummary> {
        let data = self.data();
        let ids = data.memberships.get(username).cloned().unwrap_or_default();
        data.channels.iter().filter(|c| ids.contains(&c.id)).cloned().collect()
    }

    fn with_roster(&self, id: i64, f: impl FnOnce(&mut ChannelSnapshot)) -> Result<(), SessionError> {
        let mut data = self.data();
        let roster = data.rosters.get_mut(&id).ok_or_else(|| SessionError::not_found(format!("channel/{id}")))?;
        f(roster);
        Ok(())
    }
}

#[async_trait]
impl ChatApi for FakeApi {
    async fn login(&self, username: &str, password: &str) -> Result<UserSummary, SessionError> {
        self.record(format!("POST user/login {username}"));
        let data = self.data();
        if data.locked.iter().any(|u| u == username) {
            return Err(SessionError::AccountLocked);
        }
        match data.passwords.get(username) {
            None => Err(SessionError::not_found(format!("user {username}"))),
            Some(expected) if expected == password => Ok(user(username)),
            Some(_) => Err(SessionError::AuthFailed),
        }
    }

    async fn active_users(&self) -> Result<Vec<UserSummary>, SessionError> {
        self.record("GET user/active".to_owned());
        Ok(self.data().active.clone())
    }

    async fn all_channels(&self) -> Result<Vec<ChannelSummary>, SessionError> {
        self.record("GET channel/all".to_owned());
        Ok(self.data().channels.clone())
    }

    async fn user_channels(&self, username: &str) -> Result<Vec<ChannelSummary>, SessionError> {
        self.record(format!("GET user/{username}/channels"));
        Ok(self.channels_of(username))
    }

    async fn channel_backlog(&self, channel_id: i64) -> Result<Vec<Message>, SessionError> {
        self.record(format!("GET cm/from/{channel_id}/all"));
        self.maybe_hold().await;
        let data = self.data();
        if data.fail_backlog {
            return Err(SessionError::Server { status: 500, path: format!("cm/from/{channel_id}/all") });
        }
        Ok(data.backlogs.get(&channel_id).cloned().unwrap_or_default())
    }

    async fn direct_backlog(&self, me: &str, peer: &str) -> Result<Vec<Message>, SessionError> {
        self.record(format!("GET dm/between/{me}/{peer}"));
        self.maybe_hold().await;
        Ok(self.data().direct.get(&pair(me, peer)).cloned().unwrap_or_default())
    }

    async fn channel_roster(&self, channel_id: i64) -> Result<ChannelSnapshot, SessionError> {
        self.record(format!("GET channel/{channel_id}"));
        self.data()
            .rosters
            .get(&channel_id)
            .cloned()
            .ok_or_else(|| SessionError::not_found(format!("channel/{channel_id}")))
    }

    async fn add_member(&self, channel_id: i64, username: &str) -> Result<(), SessionError> {
        self.record(format!("PUT channel/{channel_id}/user/{username}"));
        self.with_roster(channel_id, |r| r.participants.push(user(username)))?;
        self.data().memberships.entry(username.to_owned()).or_default().push(channel_id);
        Ok(())
    }

    async fn remove_member(&self, channel_id: i64, username: &str) -> Result<(), SessionError> {
        self.record(format!("DELETE channel/{channel_id}/user/{username}"));
        self.with_roster(channel_id, |r| r.participants.retain(|u| u.username != username))?;
        if let Some(ids) = self.data().memberships.get_mut(username) {
            ids.retain(|id| *id != channel_id);
        }
        Ok(())
    }

    async fn add_moderator(&self, channel_id: i64, username: &str) -> Result<(), SessionError> {
        self.record(format!("PUT channel/{channel_id}/mod/{username}"));
        self.with_roster(channel_id, |r| r.mods.push(moderator(username, false)))
    }

    async fn remove_moderator(&self, channel_id: i64, username: &str) -> Result<(), SessionError> {
        self.record(format!("DELETE channel/{channel_id}/mod/{username}"));
        self.with_roster(channel_id, |r| r.mods.retain(|u| u.username != username))
    }
}

// =============================================================================
// MEMORY DIALER
// =============================================================================

/// The server side of one dialed connection.
pub struct RemoteEnd {
    pub endpoint: String,
    /// Frames the binding wrote.
    pub sent: mpsc::UnboundedReceiver<String>,
    /// Frames to deliver to the binding. Drop to simulate a remote close.
    pub push: mpsc::UnboundedSender<String>,
}

impl RemoteEnd {
    pub fn push_json(&self, json: &str) {
        self.push.send(json.to_owned()).unwrap();
    }
}

#[derive(Default)]
struct DialerState {
    remotes: Vec<RemoteEnd>,
    dialed: Vec<String>,
    refuse: usize,
}

#[derive(Clone, Default)]
pub struct MemoryDialer {
    state: Arc<Mutex<DialerState>>,
}

impl MemoryDialer {
    /// Fail the next `n` dials with `ConnectionFailed`.
    pub fn refuse_next(&self, n: usize) {
        self.state.lock().unwrap().refuse = n;
    }

    /// Every endpoint dialed, including refused ones.
    pub fn dialed(&self) -> Vec<String> {
        self.state.lock().unwrap().dialed.clone()
    }

    /// Take the most recently dialed remote end.
    pub fn take_latest(&self) -> RemoteEnd {
        self.state.lock().unwrap().remotes.pop().unwrap()
    }
}

#[async_trait]
impl Dialer for MemoryDialer {
    async fn dial(&self, endpoint: &str) -> Result<Socket, SessionError> {
        let mut state = self.state.lock().unwrap();
        state.dialed.push(endpoint.to_owned());
        if state.refuse > 0 {
            state.refuse -= 1;
            return Err(SessionError::ConnectionFailed { endpoint: endpoint.to_owned(), reason: "refused".to_owned() });
        }

        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        state.remotes.push(RemoteEnd { endpoint: endpoint.to_owned(), sent: out_rx, push: in_tx });
        Ok(Socket { outgoing: out_tx, incoming: in_rx })
    }
}

// =============================================================================
// RECORDING SURFACE
// =============================================================================

#[derive(Default)]
pub struct SurfaceLog {
    pub lines: Vec<RenderedMessage>,
    pub clears: usize,
    pub view: Option<SessionView>,
}

#[derive(Clone, Default)]
pub struct RecordingSurface {
    log: Arc<Mutex<SurfaceLog>>,
}

impl RecordingSurface {
    /// Content of every line shown since the last clear.
    pub fn contents(&self) -> Vec<String> {
        self.log.lock().unwrap().lines.iter().map(|l| l.content.clone()).collect()
    }

    pub fn clears(&self) -> usize {
        self.log.lock().unwrap().clears
    }

    pub fn view(&self) -> SessionView {
        self.log.lock().unwrap().view.clone().unwrap_or_default()
    }
}

impl Surface for RecordingSurface {
    fn clear(&mut self) {
        let mut log = self.log.lock().unwrap();
        log.lines.clear();
        log.clears += 1;
    }

    fn append(&mut self, line: &RenderedMessage) {
        self.log.lock().unwrap().lines.push(line.clone());
    }

    fn present(&mut self, view: &SessionView) {
        self.log.lock().unwrap().view = Some(view.clone());
    }
}
