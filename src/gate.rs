//! Action gates for navigation and moderation clicks.
//!
//! DESIGN
//! ======
//! Both gates are plain values owned by the event loop, keyed on
//! `tokio::time::Instant` so tests can drive them with a paused clock.
//! - `Debounce<T>` keeps only the latest action of a burst and releases it
//!   once `delay` has passed with no further calls.
//! - `Throttle` admits at most one action per `min_interval`.
//!
//! Dropped invocations are discarded, never queued for later.
//!
//! The `_at(now)` variants take the clock as an argument and carry the logic;
//! the plain variants read `Instant::now()`.

use std::future;
use std::time::Duration;

use tokio::time::Instant;

// =============================================================================
// DEBOUNCE
// =============================================================================

#[derive(Debug)]
pub struct Debounce<T> {
    delay: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debounce<T> {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self { delay, pending: None }
    }

    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Record `action`, replacing any pending one and restarting the quiet period.
    pub fn call(&mut self, action: T) {
        self.call_at(action, Instant::now());
    }

    pub fn call_at(&mut self, action: T, now: Instant) {
        if self.pending.is_some() {
            tracing::trace!("debounce: superseding pending action");
        }
        self.pending = Some((action, now + self.delay));
    }

    /// Take the pending action if its quiet period has elapsed by `now`.
    pub fn poll_at(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some((_, due)) if *due <= now => self.pending.take().map(|(action, _)| action),
            _ => None,
        }
    }

    /// When the pending action becomes due.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, due)| *due)
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Discard the pending action, if any.
    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|(action, _)| action)
    }

    /// Wait for the pending action to become due and take it.
    ///
    /// Never resolves while nothing is pending, so it can sit in a
    /// `tokio::select!` arm. Cancel-safe: dropping the future keeps the
    /// pending action.
    pub async fn ready(&mut self) -> T {
        loop {
            let Some(due) = self.deadline() else {
                return future::pending().await;
            };
            tokio::time::sleep_until(due).await;
            if let Some(action) = self.poll_at(Instant::now()) {
                return action;
            }
        }
    }
}

// =============================================================================
// THROTTLE
// =============================================================================

#[derive(Debug)]
pub struct Throttle {
    min_interval: Duration,
    last: Option<Instant>,
}

impl Throttle {
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self { min_interval, last: None }
    }

    /// `true` when an action may run now; records the admission.
    pub fn admit(&mut self) -> bool {
        self.admit_at(Instant::now())
    }

    pub fn admit_at(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last {
            if now.saturating_duration_since(last) < self.min_interval {
                tracing::debug!("throttle: dropping action inside interval");
                return false;
            }
        }
        self.last = Some(now);
        true
    }

    /// Run `action` if admitted. Dropped actions yield `None`.
    pub fn run<T>(&mut self, action: impl FnOnce() -> T) -> Option<T> {
        self.admit().then(action)
    }
}

#[cfg(test)]
#[path = "gate_test.rs"]
mod tests;
