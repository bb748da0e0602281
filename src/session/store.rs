//! Session credential persistence — create, load, expire, clear.
//!
//! Storage failures are logged and swallowed: a broken storage backend must
//! degrade to session-less operation, never break the caller.

use chrono::Utc;
use std::sync::Arc;

use crate::error::EngineError;
use crate::external::{GeneratedKey, KeyGenerator, KeyValueStore};
use crate::session::{
    SessionKey, DEFAULT_SESSION_MINUTES, MAX_SESSION_MINUTES, MIN_SESSION_MINUTES,
};

/// Storage key for the persisted credential.
const SESSION_KEY_STORAGE_KEY: &str = "breakpoint-session-key";
/// Storage key for the user's duration preference, persisted independently
/// of any specific credential.
const DURATION_PREF_STORAGE_KEY: &str = "breakpoint-session-duration";

/// Creates, persists, validates, and expires session credentials.
#[derive(Clone)]
pub struct SessionKeyStore {
    storage: Arc<dyn KeyValueStore>,
    keygen: Arc<dyn KeyGenerator>,
}

impl SessionKeyStore {
    pub fn new(storage: Arc<dyn KeyValueStore>, keygen: Arc<dyn KeyGenerator>) -> Self {
        Self { storage, keygen }
    }

    /// Generate a fresh credential valid for `duration_minutes` from now and
    /// persist it, overwriting any prior stored key.
    ///
    /// Durations outside `1..=60` are rejected; clamping out-of-range user
    /// input is the caller's job ([`crate::session::clamp_duration`]).
    pub fn create(&self, duration_minutes: u32) -> Result<SessionKey, EngineError> {
        if !(MIN_SESSION_MINUTES..=MAX_SESSION_MINUTES).contains(&duration_minutes) {
            return Err(EngineError::InvalidDuration(duration_minutes));
        }

        let now = Utc::now().timestamp();
        let GeneratedKey { address, secret } = self.keygen.generate();
        let key = SessionKey {
            address,
            secret,
            valid_after: now,
            valid_until: now + i64::from(duration_minutes) * 60,
            created_at: now,
        };

        self.persist(&key);
        tracing::info!(
            address = %key.address,
            duration_minutes,
            valid_until = key.valid_until,
            "session started"
        );
        Ok(key)
    }

    /// Return the persisted credential if present and currently active.
    ///
    /// An expired key is deleted as a side effect and `None` is returned.
    pub fn load(&self) -> Option<SessionKey> {
        let stored = match self.storage.get(SESSION_KEY_STORAGE_KEY) {
            Ok(v) => v?,
            Err(e) => {
                tracing::warn!(error = %e, "failed to load session key");
                return None;
            }
        };

        let key: SessionKey = match serde_json::from_str(&stored) {
            Ok(k) => k,
            Err(e) => {
                tracing::warn!(error = %e, "stored session key is unreadable, discarding");
                self.clear();
                return None;
            }
        };

        let now = Utc::now().timestamp();
        if now >= key.valid_until {
            self.clear();
            return None;
        }
        key.is_active_at(now).then_some(key)
    }

    /// Delete the persisted credential. Idempotent.
    pub fn clear(&self) {
        if let Err(e) = self.storage.delete(SESSION_KEY_STORAGE_KEY) {
            tracing::warn!(error = %e, "failed to clear session key");
        }
    }

    /// The user's preferred session duration, in minutes. Falls back to
    /// [`DEFAULT_SESSION_MINUTES`] when unset or unreadable.
    pub fn duration_preference(&self) -> u32 {
        let stored = match self.storage.get(DURATION_PREF_STORAGE_KEY) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "failed to load session duration preference");
                None
            }
        };

        stored
            .and_then(|s| s.parse::<u32>().ok())
            .filter(|d| (MIN_SESSION_MINUTES..=MAX_SESSION_MINUTES).contains(d))
            .unwrap_or(DEFAULT_SESSION_MINUTES)
    }

    /// Persist a duration preference, clamped into the allowed window.
    pub fn set_duration_preference(&self, minutes: u32) {
        let clamped = crate::session::clamp_duration(minutes);
        if let Err(e) = self
            .storage
            .set(DURATION_PREF_STORAGE_KEY, &clamped.to_string())
        {
            tracing::warn!(error = %e, "failed to save session duration preference");
        }
    }

    fn persist(&self, key: &SessionKey) {
        let json = match serde_json::to_string(key) {
            Ok(j) => j,
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize session key");
                return;
            }
        };
        if let Err(e) = self.storage.set(SESSION_KEY_STORAGE_KEY, &json) {
            tracing::warn!(error = %e, "failed to save session key");
        }
    }

    /// Test/support hook: persist an arbitrary key verbatim.
    #[doc(hidden)]
    pub fn persist_raw(&self, key: &SessionKey) {
        self.persist(key);
    }
}
