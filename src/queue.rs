//! Action queue and the single-flight submission lock.
//!
//! Both are owned by the engine and shared by reference with the UI layer —
//! there are no module-level globals. All queue mutation happens inside short
//! synchronous critical sections that never span an await point, so within
//! the cooperative scheduling model a drain is one atomic step: observers
//! reading the queue length see the post-drain state immediately, not after
//! submission settles.

use chrono::Utc;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::shared::{ActionKind, AddressStr, EntryId};

// ─── QueuedAction ────────────────────────────────────────────────────────────

/// One not-yet-submitted action.
///
/// Owned exclusively by the queue until consumed by a flush; ownership moves
/// to the coordinator for the duration of a submission attempt and returns to
/// the queue on failure. Once accepted, an action is never silently dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedAction {
    pub entry_id: EntryId,
    pub kind: ActionKind,
    pub note: Option<String>,
    pub referrer: Option<AddressStr>,
    pub created_at: i64,
}

impl QueuedAction {
    pub fn new(kind: ActionKind, note: Option<String>, referrer: Option<AddressStr>) -> Self {
        Self {
            entry_id: EntryId::next(kind),
            kind,
            note,
            referrer,
            created_at: Utc::now().timestamp(),
        }
    }
}

// ─── ActionQueue ─────────────────────────────────────────────────────────────

/// Ordered buffer of pending actions. Cheaply cloneable handle; clones share
/// the same underlying queue.
#[derive(Clone, Default)]
pub struct ActionQueue {
    inner: Arc<Mutex<VecDeque<QueuedAction>>>,
}

impl ActionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append to the tail and return the new length.
    pub fn enqueue(&self, action: QueuedAction) -> usize {
        let mut q = self.inner.lock().expect("queue poisoned");
        q.push_back(action);
        q.len()
    }

    /// Atomically remove and return every queued action, in order.
    ///
    /// The sole mechanism for starting a flush: a single snapshot means two
    /// interleaved flush attempts can never each take a partial view.
    pub fn drain_all(&self) -> Vec<QueuedAction> {
        let mut q = self.inner.lock().expect("queue poisoned");
        q.drain(..).collect()
    }

    /// Reinsert a sequence at the head, preserving its internal order, so
    /// retried actions run before anything enqueued afterward.
    pub fn requeue_front(&self, actions: Vec<QueuedAction>) {
        let mut q = self.inner.lock().expect("queue poisoned");
        for action in actions.into_iter().rev() {
            q.push_front(action);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("queue poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ─── SubmitLock ──────────────────────────────────────────────────────────────

/// Single-flight guard shared between the immediate and batched submission
/// paths. At most one [`SubmitPermit`] exists at a time.
#[derive(Clone, Default)]
pub struct SubmitLock {
    held: Arc<AtomicBool>,
}

impl SubmitLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock, or `None` if a submission is already in flight.
    pub fn try_acquire(&self) -> Option<SubmitPermit> {
        self.held
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Acquire)
            .ok()
            .map(|_| SubmitPermit {
                held: self.held.clone(),
            })
    }

    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }
}

/// RAII permit; dropping it releases the lock on every exit path, including
/// early returns after a failed chunk.
pub struct SubmitPermit {
    held: Arc<AtomicBool>,
}

impl Drop for SubmitPermit {
    fn drop(&mut self) {
        self.held.store(false, Ordering::Release);
    }
}
