//! # BreakPoint SDK
//!
//! A client engine for issuing high-frequency on-chain actions with as few
//! interactive signing prompts as possible.
//!
//! ## Architecture
//!
//! The crate is organized in layers:
//!
//! 1. **Core** — shared newtypes, errors, network constants
//! 2. **Capabilities** — traits the host environment supplies: bundled
//!    submission, call encoding, profile reads, durable storage, key
//!    generation
//! 3. **Session** — time-boxed signing credentials: store + 1 Hz expiry
//!    watcher
//! 4. **Queueing** — action queue, single-flight lock, batch coordinator,
//!    immediate dispatch, journal
//! 5. **Engine** — `ActionEngine`, the composition root with sub-component
//!    accessors
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use breakpoint_sdk::prelude::*;
//! use std::sync::Arc;
//!
//! let engine = ActionEngine::builder(player, bundler, encoder, reader)
//!     .batch_threshold(10)
//!     .build();
//!
//! engine.start_session(Some(10))?;
//! engine.perform_action(ActionKind::Collect, Some("click".into()), None).await?;
//! ```
//!
//! While a session is active, actions accumulate in the queue and flush in
//! bundles; without one, each action is submitted alone and awaited to
//! settlement.

// ── Layer 1: Core ────────────────────────────────────────────────────────────

/// Shared newtypes used across all modules.
pub mod shared;

/// Unified engine error types.
pub mod error;

/// Network constants.
pub mod network;

// ── Layer 2: Capabilities ────────────────────────────────────────────────────

/// Traits for the capabilities the environment must provide.
pub mod external;

/// Game contract call encoding and the default encoder.
pub mod program;

/// JSON-RPC transport implementations.
#[cfg(feature = "rpc")]
pub mod rpc;

// ── Layer 3: Session ─────────────────────────────────────────────────────────

/// Session keys: credential store and expiry watcher.
pub mod session;

// ── Layer 4: Queueing & submission ───────────────────────────────────────────

/// Action queue and single-flight lock.
pub mod queue;

/// Batch coordinator: drain, chunk, submit, requeue.
pub mod batch;

/// Immediate single-action dispatch.
pub mod dispatch;

/// App-facing journal of recent submissions.
pub mod journal;

/// Player stats and the profile refresher.
pub mod profile;

// ── Layer 5: Engine ──────────────────────────────────────────────────────────

/// `ActionEngine` — the primary entry point.
pub mod engine;

// ── Prelude ──────────────────────────────────────────────────────────────────

pub mod prelude {
    // Shared newtypes
    pub use crate::shared::{ActionKind, AddressStr, EntryId};

    // Errors
    pub use crate::error::{EngineError, ReadError, SettlementError, StorageError};

    // Capabilities
    pub use crate::external::{
        ActionEncoder, Bundler, Call, GeneratedKey, KeyGenerator, KeyValueStore,
        LocalKeyGenerator, MemoryStore, OperationHandle, ProfileReader, SettlementReceipt,
    };

    // Contract layer
    pub use crate::program::GameCallEncoder;

    // Session
    pub use crate::session::{
        clamp_duration, SessionKey, SessionKeyStore, SessionWatcher, DEFAULT_SESSION_MINUTES,
        MAX_SESSION_MINUTES, MIN_SESSION_MINUTES,
    };

    // Queueing
    pub use crate::batch::{FlushOutcome, INTER_CHUNK_DELAY, MAX_CHUNK_SIZE};
    pub use crate::journal::{ActionJournal, ActionStatus, JournalEntry};
    pub use crate::queue::{ActionQueue, QueuedAction, SubmitLock};

    // Profile
    pub use crate::profile::PlayerStats;

    // Engine
    pub use crate::engine::{
        ActionEngine, ActionEngineBuilder, ActionOutcome, DEFAULT_BATCH_THRESHOLD,
    };

    // Transport
    #[cfg(feature = "rpc")]
    pub use crate::rpc::RpcProfileReader;
}
