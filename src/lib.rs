//! Session controller for a real-time chat client.
//!
//! A signed-in user talks in broadcast channels and direct conversations over
//! one live websocket at a time. [`SessionController`] owns that connection,
//! moves it between contexts without losing or duplicating messages, merges
//! the REST backlog with live pushes, and checks moderation actions against
//! the user's role before anything is sent.
//!
//! ```text
//! sign_in ─▶ switch_to(default channel) ─▶ backlog ─▶ sidebars
//!    user picks a context ─▶ close old binding ─▶ open new ─▶ backlog
//!    roster refresh ─▶ role ─▶ gated promote / demote / kick
//! ```

pub mod api;
pub mod config;
pub mod context;
pub mod error;
pub mod gate;
pub mod history;
pub mod membership;
pub mod render;
pub mod roles;
pub mod session;
pub mod transport;

#[cfg(test)]
mod testing;

pub use api::{ChatApi, HttpChatApi};
pub use config::ClientConfig;
pub use context::Context;
pub use error::SessionError;
pub use gate::{Debounce, Throttle};
pub use membership::Sidebars;
pub use render::{RenderedMessage, SessionView, Surface};
pub use roles::{ChannelRoster, ModAction, Role};
pub use session::SessionController;
pub use transport::{Dialer, Socket, TransportBinding, WsDialer};
