//! Session keys — delegated, time-boxed signing credentials.
//!
//! ## Security Model
//!
//! - The secret material is exclusively owned by the client process. It is
//!   persisted to the configured [`KeyValueStore`](crate::external::KeyValueStore)
//!   so a session survives a reload, but it is never transmitted and never
//!   appears in `Debug` output.
//! - A key is *active* iff `valid_after <= now < valid_until`. Outside that
//!   window it must be treated as absent even if still stored; the store's
//!   `load()` deletes expired keys as a side effect.
//! - Expiry is detected by [`watcher::SessionWatcher`], a 1 Hz polling task
//!   that fires the active→inactive transition exactly once per key.

pub mod store;
pub mod watcher;

pub use store::SessionKeyStore;
pub use watcher::SessionWatcher;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::shared::AddressStr;

/// Shortest session a user may start, in minutes.
pub const MIN_SESSION_MINUTES: u32 = 1;
/// Longest session a user may start, in minutes.
pub const MAX_SESSION_MINUTES: u32 = 60;
/// Fallback duration when no preference has been persisted.
pub const DEFAULT_SESSION_MINUTES: u32 = 10;

/// Clamp a user-supplied duration into the allowed window.
///
/// Callers apply this before [`SessionKeyStore::create`]; the store itself
/// rejects out-of-range values instead of clamping.
pub fn clamp_duration(minutes: u32) -> u32 {
    minutes.clamp(MIN_SESSION_MINUTES, MAX_SESSION_MINUTES)
}

// ─── Secret ──────────────────────────────────────────────────────────────────

/// Hex-encoded secret key material. Redacted from `Debug` so it cannot leak
/// through logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// Expose the raw material. Call sites should be few and deliberate.
    pub fn reveal(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret(..)")
    }
}

// ─── SessionKey ──────────────────────────────────────────────────────────────

/// A delegated signing credential with an explicit validity window.
///
/// All timestamps are epoch seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionKey {
    pub address: AddressStr,
    pub secret: Secret,
    pub valid_after: i64,
    pub valid_until: i64,
    pub created_at: i64,
}

impl SessionKey {
    /// Pure validity predicate: `valid_after <= now < valid_until`.
    pub fn is_active_at(&self, now: i64) -> bool {
        self.valid_after <= now && now < self.valid_until
    }

    pub fn is_active(&self) -> bool {
        self.is_active_at(Utc::now().timestamp())
    }

    /// Seconds until expiry, never negative.
    pub fn remaining_seconds_at(&self, now: i64) -> i64 {
        (self.valid_until - now).max(0)
    }

    pub fn remaining_seconds(&self) -> i64 {
        self.remaining_seconds_at(Utc::now().timestamp())
    }
}
