//! Immediate dispatch — single-action submission when no session is active.
//!
//! Shares the single-flight lock with the batch path, so a manual submission
//! can never overlap an in-flight flush (or vice versa). Unlike batched
//! actions, a failed immediate action is not requeued; the caller decides
//! whether to retry.

use std::sync::atomic::Ordering;

use crate::engine::ActionEngine;
use crate::error::EngineError;
use crate::external::{Call, SettlementReceipt};
use crate::journal::{ActionStatus, JournalEntry};
use crate::queue::QueuedAction;

/// Sub-component for out-of-queue submission. Obtained via
/// [`ActionEngine::immediate`].
pub struct Immediate<'a> {
    pub(crate) engine: &'a ActionEngine,
}

impl Immediate<'_> {
    /// Submit one action as a singleton bundle and wait for settlement.
    ///
    /// Fails fast with [`EngineError::Busy`] if any submission is already in
    /// flight. The caller awaits final settlement, not just acknowledgment.
    pub async fn submit(&self, action: QueuedAction) -> Result<SettlementReceipt, EngineError> {
        let engine = self.engine;

        let _permit = engine.lock.try_acquire().ok_or(EngineError::Busy)?;
        tracing::debug!(kind = %action.kind, "sending action immediately (no session)");

        engine.journal.record(JournalEntry {
            entry_id: action.entry_id.clone(),
            kind: action.kind,
            status: ActionStatus::Pending,
            tx_hash: None,
            error: None,
            note: action.note.clone(),
            created_at: action.created_at,
        });

        let call = Call {
            target: engine.encoder.target(),
            data: engine
                .encoder
                .encode(action.kind, action.note.as_deref(), action.referrer.as_ref()),
        };

        engine.pending.fetch_add(1, Ordering::Relaxed);
        let result = async {
            let handle = engine.bundler.submit(std::slice::from_ref(&call)).await?;
            engine.bundler.await_settlement(&handle).await
        }
        .await;
        engine.pending.fetch_sub(1, Ordering::Relaxed);

        match result {
            Ok(receipt) => {
                engine.journal.confirm(&action.entry_id, &receipt.tx_hash);
                drop(_permit);
                engine.profile().refresh().await;
                tracing::info!(tx_hash = %receipt.tx_hash, "action confirmed");
                Ok(receipt)
            }
            Err(e) => {
                engine.journal.fail(&action.entry_id, &e.to_string());
                tracing::error!(error = %e, "immediate action failed");
                Err(e.into())
            }
        }
    }
}
