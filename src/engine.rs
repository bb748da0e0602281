//! `ActionEngine` — the composition root that owns the queue, the
//! single-flight lock, and session state, and routes each action to the
//! batched or immediate path.
//!
//! The engine is built once and passed by reference (or cheap clone — all
//! shared state sits behind `Arc`) to the UI layer. There are no ambient
//! globals; every collaborator is injected through the builder.

use async_lock::RwLock;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::batch::{Batch, FlushOutcome, INTER_CHUNK_DELAY};
use crate::dispatch::Immediate;
use crate::error::EngineError;
use crate::external::{
    ActionEncoder, Bundler, KeyGenerator, KeyValueStore, LocalKeyGenerator, MemoryStore,
    ProfileReader,
};
use crate::journal::{ActionJournal, ActionStatus, JournalEntry};
use crate::profile::{PlayerStats, Profile};
use crate::queue::{ActionQueue, QueuedAction, SubmitLock};
use crate::session::{clamp_duration, SessionKey, SessionKeyStore, SessionWatcher};
use crate::shared::{ActionKind, AddressStr};

/// Default number of queued actions that triggers an automatic flush.
pub const DEFAULT_BATCH_THRESHOLD: usize = 10;
/// Allowed range for the batch threshold.
pub const MAX_BATCH_THRESHOLD: usize = 50;

/// How a requested action was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// A session is active; the action was appended to the queue.
    Queued { queue_len: usize },
    /// No session; the action was submitted alone and settled.
    Confirmed { tx_hash: String },
}

/// The primary entry point of the SDK.
pub struct ActionEngine {
    pub(crate) identity: AddressStr,
    pub(crate) session: SessionKeyStore,
    pub(crate) queue: ActionQueue,
    pub(crate) lock: SubmitLock,
    pub(crate) journal: ActionJournal,
    pub(crate) profile: Arc<RwLock<Option<PlayerStats>>>,
    pub(crate) pending: Arc<AtomicUsize>,
    pub(crate) session_ends: Arc<AtomicU64>,
    pub(crate) bundler: Arc<dyn Bundler>,
    pub(crate) encoder: Arc<dyn ActionEncoder>,
    pub(crate) reader: Arc<dyn ProfileReader>,
    pub(crate) batch_threshold: usize,
    pub(crate) inter_chunk_delay: Duration,
}

impl ActionEngine {
    pub fn builder(
        identity: AddressStr,
        bundler: Arc<dyn Bundler>,
        encoder: Arc<dyn ActionEncoder>,
        reader: Arc<dyn ProfileReader>,
    ) -> ActionEngineBuilder {
        ActionEngineBuilder {
            identity,
            bundler,
            encoder,
            reader,
            storage: None,
            keygen: None,
            batch_threshold: DEFAULT_BATCH_THRESHOLD,
            inter_chunk_delay: INTER_CHUNK_DELAY,
        }
    }

    // ── Sub-component accessors ──────────────────────────────────────────

    pub fn session(&self) -> &SessionKeyStore {
        &self.session
    }

    pub fn batch(&self) -> Batch<'_> {
        Batch { engine: self }
    }

    pub fn immediate(&self) -> Immediate<'_> {
        Immediate { engine: self }
    }

    pub fn profile(&self) -> Profile<'_> {
        Profile { engine: self }
    }

    pub fn journal(&self) -> &ActionJournal {
        &self.journal
    }

    /// The shared action queue, exposed for observers (queued count) and
    /// support tooling.
    pub fn action_queue(&self) -> &ActionQueue {
        &self.queue
    }

    /// The shared single-flight lock.
    pub fn submit_lock(&self) -> &SubmitLock {
        &self.lock
    }

    /// Create a 1 Hz expiry watcher bound to this engine.
    pub fn watcher(&self) -> SessionWatcher {
        SessionWatcher::new(self.clone())
    }

    // ── Core operations ──────────────────────────────────────────────────

    /// Perform one action: enqueue it under an active session, or submit it
    /// immediately when none exists.
    ///
    /// On the queued path the returned outcome reflects the queue state
    /// after any threshold-triggered flush; flush failures there never
    /// propagate (they surface as a non-zero queued count). On the
    /// immediate path the caller awaits settlement and receives any
    /// [`EngineError::Settlement`] directly.
    pub async fn perform_action(
        &self,
        kind: ActionKind,
        note: Option<String>,
        referrer: Option<AddressStr>,
    ) -> Result<ActionOutcome, EngineError> {
        let action = QueuedAction::new(kind, note, referrer);

        if self.session.load().is_some() {
            self.journal.record(JournalEntry {
                entry_id: action.entry_id.clone(),
                kind: action.kind,
                status: ActionStatus::Pending,
                tx_hash: None,
                error: None,
                note: action.note.clone(),
                created_at: action.created_at,
            });

            let len = self.queue.enqueue(action);
            tracing::debug!(queued = len, threshold = self.batch_threshold, "action queued");

            if len >= self.batch_threshold {
                self.batch().flush().await;
            }

            Ok(ActionOutcome::Queued {
                queue_len: self.queue.len(),
            })
        } else {
            let receipt = self.immediate().submit(action).await?;
            Ok(ActionOutcome::Confirmed {
                tx_hash: receipt.tx_hash,
            })
        }
    }

    /// Start a session with the given duration, or the persisted preference
    /// when `None`. Out-of-range input is clamped to `1..=60` minutes.
    pub fn start_session(&self, duration_minutes: Option<u32>) -> Result<SessionKey, EngineError> {
        let minutes = match duration_minutes {
            Some(m) => clamp_duration(m),
            None => self.session.duration_preference(),
        };
        self.session.create(minutes)
    }

    /// End the session explicitly and flush any residual queue.
    ///
    /// Bumps the explicit-end counter so the expiry watcher can tell this
    /// clear apart from a timed-out key.
    pub async fn end_session(&self) -> FlushOutcome {
        self.session.clear();
        self.session_ends.fetch_add(1, Ordering::Relaxed);
        tracing::info!("session ended");

        let residual = self.queue.len();
        if residual > 0 {
            tracing::info!(count = residual, "flushing queued actions");
            self.batch().flush().await
        } else {
            FlushOutcome::Empty
        }
    }

    /// Re-read on-chain stats into the shared profile slot.
    pub async fn refresh_profile(&self) {
        self.profile().refresh().await;
    }

    pub fn queued_len(&self) -> usize {
        self.queue.len()
    }

    /// Actions currently inside a submission attempt (either path).
    pub fn pending_submissions(&self) -> usize {
        self.pending.load(Ordering::Relaxed)
    }

    /// Number of explicit `end_session` calls so far.
    pub(crate) fn explicit_session_ends(&self) -> u64 {
        self.session_ends.load(Ordering::Relaxed)
    }

    pub fn identity(&self) -> &AddressStr {
        &self.identity
    }
}

impl Clone for ActionEngine {
    fn clone(&self) -> Self {
        Self {
            identity: self.identity.clone(),
            session: self.session.clone(),
            queue: self.queue.clone(),
            lock: self.lock.clone(),
            journal: self.journal.clone(),
            profile: self.profile.clone(),
            pending: self.pending.clone(),
            session_ends: self.session_ends.clone(),
            bundler: self.bundler.clone(),
            encoder: self.encoder.clone(),
            reader: self.reader.clone(),
            batch_threshold: self.batch_threshold,
            inter_chunk_delay: self.inter_chunk_delay,
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════════
// Builder
// ═════════════════════════════════════════════════════════════════════════════

pub struct ActionEngineBuilder {
    identity: AddressStr,
    bundler: Arc<dyn Bundler>,
    encoder: Arc<dyn ActionEncoder>,
    reader: Arc<dyn ProfileReader>,
    storage: Option<Arc<dyn KeyValueStore>>,
    keygen: Option<Arc<dyn KeyGenerator>>,
    batch_threshold: usize,
    inter_chunk_delay: Duration,
}

impl ActionEngineBuilder {
    /// Durable storage for the session credential and duration preference.
    /// Defaults to an in-memory store.
    pub fn storage(mut self, storage: Arc<dyn KeyValueStore>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Session credential generator. Defaults to [`LocalKeyGenerator`].
    pub fn key_generator(mut self, keygen: Arc<dyn KeyGenerator>) -> Self {
        self.keygen = Some(keygen);
        self
    }

    /// Queue length that triggers an automatic flush. Clamped to `1..=50`.
    pub fn batch_threshold(mut self, threshold: usize) -> Self {
        self.batch_threshold = threshold.clamp(1, MAX_BATCH_THRESHOLD);
        self
    }

    /// Pause between successive chunks of one flush. Defaults to 500 ms.
    pub fn inter_chunk_delay(mut self, delay: Duration) -> Self {
        self.inter_chunk_delay = delay;
        self
    }

    pub fn build(self) -> ActionEngine {
        let storage = self
            .storage
            .unwrap_or_else(|| Arc::new(MemoryStore::new()));
        let keygen = self
            .keygen
            .unwrap_or_else(|| Arc::new(LocalKeyGenerator));

        ActionEngine {
            identity: self.identity,
            session: SessionKeyStore::new(storage, keygen),
            queue: ActionQueue::new(),
            lock: SubmitLock::new(),
            journal: ActionJournal::new(),
            profile: Arc::new(RwLock::new(None)),
            pending: Arc::new(AtomicUsize::new(0)),
            session_ends: Arc::new(AtomicU64::new(0)),
            bundler: self.bundler,
            encoder: self.encoder,
            reader: self.reader,
            batch_threshold: self.batch_threshold,
            inter_chunk_delay: self.inter_chunk_delay,
        }
    }
}
