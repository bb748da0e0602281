//! Action journal — app-owned bookkeeping of recent submissions.
//!
//! Mirrors what the UI shows: newest entries first, capped, with per-entry
//! status transitions. Queued actions that fail a flush stay `Pending` and
//! surface only through the still-queued count; immediate failures are
//! recorded discretely.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::shared::{ActionKind, EntryId};

/// Maximum retained entries; older ones fall off the tail.
pub const JOURNAL_CAP: usize = 25;

/// Lifecycle of one journal entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    Pending,
    Confirmed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub entry_id: EntryId,
    pub kind: ActionKind,
    pub status: ActionStatus,
    pub tx_hash: Option<String>,
    pub error: Option<String>,
    pub note: Option<String>,
    pub created_at: i64,
}

/// Capped, newest-first journal. Cheaply cloneable handle; clones share the
/// same underlying entries.
#[derive(Clone, Default)]
pub struct ActionJournal {
    inner: Arc<Mutex<VecDeque<JournalEntry>>>,
}

impl ActionJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new pending entry at the head, evicting past the cap.
    pub fn record(&self, entry: JournalEntry) {
        let mut entries = self.inner.lock().expect("journal poisoned");
        entries.push_front(entry);
        entries.truncate(JOURNAL_CAP);
    }

    /// Mark an entry confirmed with its transaction hash.
    pub fn confirm(&self, entry_id: &EntryId, tx_hash: &str) {
        self.update(entry_id, |e| {
            e.status = ActionStatus::Confirmed;
            e.tx_hash = Some(tx_hash.to_string());
        });
    }

    /// Mark an entry failed with the underlying error message.
    pub fn fail(&self, entry_id: &EntryId, error: &str) {
        self.update(entry_id, |e| {
            e.status = ActionStatus::Failed;
            e.error = Some(error.to_string());
        });
    }

    fn update(&self, entry_id: &EntryId, f: impl FnOnce(&mut JournalEntry)) {
        let mut entries = self.inner.lock().expect("journal poisoned");
        if let Some(entry) = entries.iter_mut().find(|e| &e.entry_id == entry_id) {
            f(entry);
        }
    }

    /// Snapshot of current entries, newest first.
    pub fn entries(&self) -> Vec<JournalEntry> {
        self.inner
            .lock()
            .expect("journal poisoned")
            .iter()
            .cloned()
            .collect()
    }

    pub fn pending_count(&self) -> usize {
        self.inner
            .lock()
            .expect("journal poisoned")
            .iter()
            .filter(|e| e.status == ActionStatus::Pending)
            .count()
    }

    pub fn clear(&self) {
        self.inner.lock().expect("journal poisoned").clear();
    }
}
