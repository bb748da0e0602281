//! Session expiry watcher — a fixed-interval polling task that detects the
//! active→inactive transition and flushes any residual queue exactly once.
//!
//! The transition fires at most once per session key: the watcher remembers
//! the key it last observed active and only reacts on the edge where that
//! key stops being active, so consecutive ticks after expiry are no-ops.
//! A clear caused by an explicit `end_session` call is not a transition —
//! that path flushes and logs on its own, so the watcher stays silent.

use futures_timer::Delay;
use std::time::Duration;

use crate::batch::FlushOutcome;
use crate::engine::ActionEngine;

/// Nominal poll interval.
pub const WATCH_INTERVAL: Duration = Duration::from_secs(1);

pub struct SessionWatcher {
    engine: ActionEngine,
    interval: Duration,
    /// `created_at` of the key observed active on the previous tick.
    last_seen: Option<i64>,
    /// Explicit-end count observed on the previous tick; an increase means
    /// the key vanished via `end_session`, not expiry.
    ends_seen: u64,
}

impl SessionWatcher {
    pub fn new(engine: ActionEngine) -> Self {
        let ends_seen = engine.explicit_session_ends();
        Self {
            engine,
            interval: WATCH_INTERVAL,
            last_seen: None,
            ends_seen,
        }
    }

    /// Override the poll interval (tests shrink it).
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// One poll step. Returns the flush outcome when this tick fired the
    /// expiry transition, `None` otherwise.
    pub async fn tick(&mut self) -> Option<FlushOutcome> {
        // load() already deletes expired keys as a side effect.
        let active = self.engine.session().load();
        let ends = self.engine.explicit_session_ends();

        let fired = match (self.last_seen, &active) {
            (Some(_), None) if ends == self.ends_seen => {
                tracing::info!("session expired");
                let outcome = if self.engine.queued_len() > 0 {
                    tracing::info!(count = self.engine.queued_len(), "flushing queued actions");
                    self.engine.batch().flush().await
                } else {
                    FlushOutcome::Empty
                };
                Some(outcome)
            }
            (Some(_), None) => {
                tracing::debug!("session was ended explicitly, not expired");
                None
            }
            _ => None,
        };

        self.ends_seen = ends;
        self.last_seen = active.map(|k| k.created_at);
        fired
    }

    /// Poll forever. Spawn this on the host runtime alongside the engine.
    pub async fn run(mut self) {
        loop {
            Delay::new(self.interval).await;
            self.tick().await;
        }
    }
}
