//! Session controller: owns the signed-in session and its single live binding.
//!
//! DESIGN
//! ======
//! One `SessionController` per client, driven through `&mut self` by a single
//! task. It holds at most one `TransportBinding`; switching contexts closes
//! the old binding before dialing the new one, and every delivery carries the
//! id of the binding that produced it so anything still queued from a
//! superseded binding is dropped on arrival.
//!
//! Switch sequence:
//! 1. validate the target
//! 2. close the old binding, open the new one (failure leaves the previous
//!    context selected, now disconnected)
//! 3. commit: select the context, clear the surface, start a history window
//! 4. fetch the backlog while buffering live deliveries, then render
//!    backlog-then-buffer
//! 5. refresh the roster (channels) or clear it (direct messages)
//!
//! Bindings never call back into the controller. Their pumps forward to an
//! mpsc channel that the owner drains with `next_inbound` between actions.
//!
//! ERROR HANDLING
//! ==============
//! Every failure returns to the action that started it. Nothing retries on its
//! own except `send`, which re-runs the switch for the active context once
//! when the binding has gone away.

use std::sync::Arc;

use frames::{ChannelSummary, Message, OutboundFrame, UserSummary};
use tokio::sync::mpsc;

use crate::api::{ChatApi, HttpChatApi};
use crate::config::ClientConfig;
use crate::context::Context;
use crate::error::SessionError;
use crate::history::{self, HistoryMerger};
use crate::membership::{self, Sidebars};
use crate::render::{self, SessionView, Surface};
use crate::roles::{self, ChannelRoster, ModAction, Role};
use crate::transport::{Delivery, Dialer, Inbound, TransportBinding, WsDialer};

struct Session {
    username: String,
    profile: UserSummary,
    active: Option<Context>,
    binding: Option<TransportBinding>,
}

pub struct SessionController {
    config: ClientConfig,
    api: Arc<dyn ChatApi>,
    dialer: Arc<dyn Dialer>,
    surface: Box<dyn Surface>,
    session: Option<Session>,
    merger: HistoryMerger,
    sidebars: Sidebars,
    sidebars_loaded: bool,
    roster: Option<ChannelRoster>,
    inbound_tx: mpsc::UnboundedSender<Inbound>,
    inbound_rx: mpsc::UnboundedReceiver<Inbound>,
}

impl SessionController {
    #[must_use]
    pub fn new(config: ClientConfig, api: Arc<dyn ChatApi>, dialer: Arc<dyn Dialer>, surface: Box<dyn Surface>) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        Self {
            config,
            api,
            dialer,
            surface,
            session: None,
            merger: HistoryMerger::new(),
            sidebars: Sidebars::default(),
            sidebars_loaded: false,
            roster: None,
            inbound_tx,
            inbound_rx,
        }
    }

    /// Controller talking to a real server over HTTP and websockets.
    ///
    /// # Errors
    ///
    /// `Config` or `Http` when the REST client cannot be built.
    pub fn connect(config: ClientConfig, surface: Box<dyn Surface>) -> Result<Self, SessionError> {
        let api = Arc::new(HttpChatApi::new(&config)?);
        let dialer = Arc::new(WsDialer::new(&config));
        Ok(Self::new(config, api, dialer, surface))
    }

    // =========================================================================
    // STATE
    // =========================================================================

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.username.as_str())
    }

    #[must_use]
    pub fn profile(&self) -> Option<&UserSummary> {
        self.session.as_ref().map(|s| &s.profile)
    }

    #[must_use]
    pub fn active(&self) -> Option<&Context> {
        self.session.as_ref().and_then(|s| s.active.as_ref())
    }

    /// `true` when the active context has an open binding.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.session
            .as_ref()
            .and_then(|s| s.binding.as_ref())
            .is_some_and(TransportBinding::is_open)
    }

    #[must_use]
    pub fn sidebars(&self) -> &Sidebars {
        &self.sidebars
    }

    #[must_use]
    pub fn roster(&self) -> Option<&ChannelRoster> {
        self.roster.as_ref()
    }

    /// The signed-in user's role in the active channel.
    #[must_use]
    pub fn role(&self) -> Role {
        match (self.roster.as_ref(), self.username()) {
            (Some(roster), Some(me)) => roles::evaluate(roster, me),
            _ => Role::None,
        }
    }

    #[must_use]
    pub fn view(&self) -> SessionView {
        render::session_view(
            self.username().unwrap_or_default(),
            self.active(),
            &self.sidebars,
            self.roster.as_ref(),
            self.is_connected(),
        )
    }

    fn me(&self) -> Result<String, SessionError> {
        self.username().map(ToOwned::to_owned).ok_or(SessionError::NotSignedIn)
    }

    fn session_mut(&mut self) -> Result<&mut Session, SessionError> {
        self.session.as_mut().ok_or(SessionError::NotSignedIn)
    }

    // =========================================================================
    // SIGN-IN
    // =========================================================================

    /// Log in, build the sidebars and open the default channel.
    ///
    /// Usernames are case-insensitive and sent lowercased. Signing in while
    /// already signed in ends the previous session first.
    ///
    /// # Errors
    ///
    /// `AuthFailed`, `AccountLocked` or `NotFound` from the login call; any
    /// sidebar or switch failure after that (the session stays signed in).
    pub async fn sign_in(&mut self, username: &str, password: &str) -> Result<(), SessionError> {
        let username = username.trim().to_lowercase();
        if username.is_empty() {
            return Err(SessionError::AuthFailed);
        }
        if self.session.is_some() {
            self.logout();
        }

        let profile = self.api.login(&username, password).await?;
        tracing::info!(%username, "signed in");
        self.session = Some(Session { username, profile, active: None, binding: None });

        self.refresh_sidebars().await?;
        let id = self.config.default_channel;
        let name = self.sidebars.channel_name(id).map_or_else(|| id.to_string(), ToOwned::to_owned);
        self.switch_to(Context::channel(id, name)).await
    }

    /// Close the binding and forget the session.
    pub fn logout(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        if let Some(binding) = session.binding.as_mut() {
            binding.close();
        }
        tracing::info!(username = %session.username, "signed out");

        while self.inbound_rx.try_recv().is_ok() {}
        self.merger = HistoryMerger::new();
        self.sidebars = Sidebars::default();
        self.sidebars_loaded = false;
        self.roster = None;
        self.surface.clear();
        self.present();
    }

    // =========================================================================
    // CONTEXT SWITCHING
    // =========================================================================

    /// Attach the session to `target`.
    ///
    /// A no-op on the binding when `target` is already active and connected.
    ///
    /// # Errors
    ///
    /// `InvalidContext` / `NotFound` for a bad target, whatever the dialer
    /// reports when the connection cannot be opened (the previous context
    /// stays selected), or the backlog / roster failure after the switch
    /// committed (the new context stays selected).
    pub async fn switch_to(&mut self, target: Context) -> Result<(), SessionError> {
        self.switch(target, false).await
    }

    async fn switch(&mut self, target: Context, force: bool) -> Result<(), SessionError> {
        let me = self.me()?;
        self.validate(&target, &me)?;

        let connected = self.is_connected();
        let session = self.session_mut()?;
        if !force && connected && session.active.as_ref().is_some_and(|a| a.same_target(&target)) {
            tracing::debug!(context = %target, "context already active");
            self.present();
            return Ok(());
        }

        if let Some(mut old) = session.binding.take() {
            old.close();
        }
        let endpoint = target.endpoint(&self.config.ws_url, &me);
        let opened = TransportBinding::open(self.dialer.as_ref(), &endpoint, self.inbound_tx.clone()).await;
        let binding = match opened {
            Ok(binding) => binding,
            Err(e) => {
                tracing::warn!(context = %target, %endpoint, error = %e, "switch failed");
                self.present();
                return Err(e);
            }
        };

        let session = self.session_mut()?;
        session.active = Some(target.clone());
        session.binding = Some(binding);
        self.surface.clear();
        self.merger.begin();
        if target.channel_id().is_none() {
            self.roster = None;
        }
        self.present();
        tracing::info!(context = %target, "switched context");

        let history = self.load_history(&target, &me).await;
        let roster = match target.channel_id() {
            Some(_) => self.refresh_roster().await,
            None => Ok(()),
        };
        self.present();
        history.and(roster)
    }

    fn validate(&self, target: &Context, me: &str) -> Result<(), SessionError> {
        match target {
            Context::Channel { id, .. } if *id <= 0 => {
                Err(SessionError::InvalidContext(format!("channel id must be positive, got {id}")))
            }
            Context::Channel { .. } => Ok(()),
            Context::Direct { peer } if peer.trim().is_empty() => {
                Err(SessionError::InvalidContext("direct message needs a peer".to_owned()))
            }
            Context::Direct { peer } if peer == me => {
                Err(SessionError::InvalidContext("cannot open a direct message with yourself".to_owned()))
            }
            Context::Direct { peer } if self.sidebars_loaded && !self.sidebars.has_peer(peer) => {
                Err(SessionError::not_found(format!("user {peer}")))
            }
            Context::Direct { .. } => Ok(()),
        }
    }

    /// Fetch the backlog for the just-committed context, applying deliveries
    /// that arrive meanwhile (they are buffered by the merger), then render.
    async fn load_history(&mut self, target: &Context, me: &str) -> Result<(), SessionError> {
        let api = Arc::clone(&self.api);
        let fetch = history::fetch_backlog(api.as_ref(), target, me);
        tokio::pin!(fetch);

        let result = loop {
            tokio::select! {
                result = &mut fetch => break result,
                Some(inbound) = self.inbound_rx.recv() => self.apply(inbound),
            }
        };
        // Deliveries queued when the fetch won the race still belong in the
        // window so the merger can dedupe them against the backlog.
        while let Ok(inbound) = self.inbound_rx.try_recv() {
            self.apply(inbound);
        }

        let (backlog, outcome) = match result {
            Ok(backlog) => (backlog, Ok(())),
            Err(e) => {
                tracing::warn!(context = %target, error = %e, "backlog fetch failed");
                (Vec::new(), Err(e))
            }
        };
        let count = backlog.len();
        for message in self.merger.complete(backlog) {
            self.render(&message);
        }
        tracing::debug!(context = %target, backlog = count, "history loaded");
        outcome
    }

    // =========================================================================
    // DELIVERIES
    // =========================================================================

    /// Wait for the next delivery from the binding and apply it.
    ///
    /// Cancel-safe; meant for a `tokio::select!` arm next to user input.
    pub async fn next_inbound(&mut self) {
        if let Some(inbound) = self.inbound_rx.recv().await {
            self.apply(inbound);
        }
    }

    /// Apply every delivery already queued. Returns how many were applied.
    pub fn drain_inbound(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(inbound) = self.inbound_rx.try_recv() {
            self.apply(inbound);
            applied += 1;
        }
        applied
    }

    fn apply(&mut self, inbound: Inbound) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.binding.as_ref().map(TransportBinding::id) != Some(inbound.binding) {
            tracing::debug!(binding = %inbound.binding, "dropping delivery from superseded binding");
            return;
        }

        match inbound.delivery {
            Delivery::Message(message) => {
                if let Some(message) = self.merger.accept_live(message) {
                    self.render(&message);
                }
            }
            Delivery::Closed => {
                if let Some(binding) = session.binding.as_mut() {
                    binding.close();
                }
                tracing::warn!(binding = %inbound.binding, "live connection lost; will reconnect on next send");
                self.present();
            }
        }
    }

    fn render(&mut self, message: &Message) {
        let me = self.session.as_ref().map_or("", |s| s.username.as_str());
        if let Some(line) = render::render_message(message, me) {
            self.surface.append(&line);
        }
    }

    fn present(&mut self) {
        let view = self.view();
        self.surface.present(&view);
    }

    // =========================================================================
    // SENDING
    // =========================================================================

    /// Send `content` to the active context. Blank content is ignored.
    ///
    /// # Errors
    ///
    /// `NotSignedIn`, `InvalidContext` with no active context, or
    /// `ConnectionClosed` when the binding is gone and reconnecting failed.
    pub async fn send(&mut self, content: &str) -> Result<(), SessionError> {
        if content.trim().is_empty() {
            return Ok(());
        }
        let active = self
            .session
            .as_ref()
            .ok_or(SessionError::NotSignedIn)?
            .active
            .clone()
            .ok_or_else(|| SessionError::InvalidContext("no active context".to_owned()))?;

        if !self.is_connected() {
            tracing::info!(context = %active, "binding closed; reconnecting before send");
            if let Err(e) = self.switch(active.clone(), true).await {
                tracing::warn!(context = %active, error = %e, "reconnect failed");
            }
            if !self.is_connected() {
                return Err(SessionError::ConnectionClosed);
            }
        }

        let frame = OutboundFrame { content: content.to_owned(), to_username: active.recipient().to_owned() };
        let session = self.session_mut()?;
        session.binding.as_ref().ok_or(SessionError::ConnectionClosed)?.send(&frame)
    }

    // =========================================================================
    // MEMBERSHIP
    // =========================================================================

    /// Rebuild the sidebars from fresh snapshots.
    ///
    /// # Errors
    ///
    /// `NotSignedIn` or the first REST failure.
    pub async fn refresh_sidebars(&mut self) -> Result<(), SessionError> {
        let me = self.me()?;
        self.sidebars = membership::load_sidebars(self.api.as_ref(), &me).await?;
        self.sidebars_loaded = true;
        self.present();
        Ok(())
    }

    /// Join the channel called `name` and switch to it.
    ///
    /// The check runs against freshly fetched sidebars, before the join
    /// request is sent.
    ///
    /// # Errors
    ///
    /// `AlreadyMember` (no join request sent), `NotFound` for an unknown
    /// channel, or the failing REST call.
    pub async fn join_channel(&mut self, name: &str) -> Result<(), SessionError> {
        let me = self.me()?;
        let name = name.trim().trim_start_matches('#');
        if name.is_empty() {
            return Err(SessionError::InvalidContext("channel name is empty".to_owned()));
        }

        self.refresh_sidebars().await?;
        let channel = membership::check_joinable(&self.sidebars, name)?.clone();

        self.api.add_member(channel.id, &me).await?;
        tracing::info!(channel = %channel.name, channel_id = channel.id, "joined channel");
        self.refresh_sidebars().await?;
        self.switch_to(Context::channel(channel.id, channel.name)).await
    }

    /// Joinable channels matching `query`.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<ChannelSummary> {
        membership::search(&self.sidebars.joinable, query).into_iter().cloned().collect()
    }

    // =========================================================================
    // MODERATION
    // =========================================================================

    /// Re-fetch the active channel's roster.
    ///
    /// # Errors
    ///
    /// `InvalidContext` outside a channel, or the REST failure.
    pub async fn refresh_roster(&mut self) -> Result<(), SessionError> {
        let channel_id = self.active_channel()?;
        let snapshot = self.api.channel_roster(channel_id).await?;
        let roster = ChannelRoster::from(snapshot);
        let role = self.username().map_or(Role::None, |me| roles::evaluate(&roster, me));
        tracing::debug!(channel_id, %role, "roster refreshed");
        self.roster = Some(roster);
        self.present();
        Ok(())
    }

    /// Apply a moderation action in the active channel.
    ///
    /// Legality is checked against the roster before anything is sent; on
    /// success the roster is re-fetched wholesale.
    ///
    /// # Errors
    ///
    /// `PermissionDenied` (nothing dispatched), `NotFound` for a target not in
    /// the roster, `InvalidContext` outside a channel, or the REST failure.
    pub async fn moderate(&mut self, action: ModAction, target: &str) -> Result<(), SessionError> {
        let me = self.me()?;
        let channel_id = self.active_channel()?;
        if self.roster.as_ref().is_none_or(|r| r.channel_id != channel_id) {
            self.refresh_roster().await?;
        }
        let roster = self.roster.as_ref().ok_or_else(|| SessionError::not_found(format!("roster for channel {channel_id}")))?;
        let role = roles::authorize(roster, &me, action, target)?;

        match action {
            ModAction::Promote => self.api.add_moderator(channel_id, target).await?,
            ModAction::Demote => self.api.remove_moderator(channel_id, target).await?,
            ModAction::Kick => self.api.remove_member(channel_id, target).await?,
        }
        tracing::info!(%action, %target, channel_id, %role, "moderation applied");
        self.refresh_roster().await
    }

    /// # Errors
    ///
    /// See [`SessionController::moderate`].
    pub async fn promote(&mut self, target: &str) -> Result<(), SessionError> {
        self.moderate(ModAction::Promote, target).await
    }

    /// # Errors
    ///
    /// See [`SessionController::moderate`].
    pub async fn demote(&mut self, target: &str) -> Result<(), SessionError> {
        self.moderate(ModAction::Demote, target).await
    }

    /// # Errors
    ///
    /// See [`SessionController::moderate`].
    pub async fn kick(&mut self, target: &str) -> Result<(), SessionError> {
        self.moderate(ModAction::Kick, target).await
    }

    fn active_channel(&self) -> Result<i64, SessionError> {
        self.active()
            .and_then(Context::channel_id)
            .ok_or_else(|| SessionError::InvalidContext("not in a channel".to_owned()))
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
