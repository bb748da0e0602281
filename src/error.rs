//! Unified engine error types.
//!
//! Propagation policy (deliberate, see [`crate::batch`]): `Busy` and
//! `InvalidDuration` surface synchronously to the caller. `Settlement`
//! propagates only on the immediate path; during a batch flush it is caught,
//! the failing chunk is requeued, and the error becomes a log event. `Read`
//! and `Storage` are always absorbed locally with a logged side effect — a
//! stale profile or a missed persist never breaks the caller.

use thiserror::Error;

/// Top-level engine error.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("another submission is already in flight")]
    Busy,

    #[error("session duration {0} minutes is outside the allowed 1..=60 range")]
    InvalidDuration(u32),

    #[error("settlement error: {0}")]
    Settlement(#[from] SettlementError),

    #[error("profile read error: {0}")]
    Read(#[from] ReadError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Submission-layer errors: a bundle was rejected at acknowledgment, or
/// acknowledged but never finalized.
#[derive(Error, Debug, Clone)]
pub enum SettlementError {
    #[error("bundle rejected: {0}")]
    Rejected(String),

    #[error("operation {handle} failed to finalize: {reason}")]
    NotFinalized { handle: String, reason: String },

    #[error("transport error: {0}")]
    Transport(String),
}

/// Profile read failed. Always swallowed by the refresher — callers keep the
/// last published stats.
#[derive(Error, Debug, Clone)]
#[error("{0}")]
pub struct ReadError(pub String);

/// Durable storage operation failed. Always swallowed by the session store.
#[derive(Error, Debug, Clone)]
#[error("{0}")]
pub struct StorageError(pub String);
