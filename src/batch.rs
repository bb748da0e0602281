//! Batch coordinator — drains the queue, splits it into bounded chunks, and
//! drives strictly sequential bundled submission.
//!
//! One flush cycle: `Idle → Draining → Chunking → Submitting(chunk i) →
//! Settled | Failed`. A flush is triggered when an enqueue reaches the batch
//! threshold, or when the session becomes inactive with a non-empty queue.
//! If the single-flight lock is unavailable the flush is skipped outright —
//! flushes are never queued behind each other; the next trigger retries.
//!
//! Failure policy: when a chunk fails (at acknowledgment or finalization)
//! the whole chunk plus every undrained chunk goes back to the head of the
//! queue and the cycle ends. There is no per-action result granularity, and
//! the enqueuing caller is never notified — the error is a log event, and
//! the actions surface as a non-zero queued count.

use futures_timer::Delay;
use std::sync::atomic::Ordering;
use std::time::Duration;

use crate::engine::ActionEngine;
use crate::error::SettlementError;
use crate::external::{Call, SettlementReceipt};
use crate::queue::QueuedAction;

/// Upper bound on calls per bundled operation, to respect bundler RPC
/// call-rate limits.
pub const MAX_CHUNK_SIZE: usize = 50;

/// Pause between successive chunks of one flush (not after the last).
pub const INTER_CHUNK_DELAY: Duration = Duration::from_millis(500);

/// Result of one flush cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing was queued.
    Empty,
    /// Another submission held the lock; nothing was drained.
    Skipped,
    /// Every chunk settled.
    Settled { actions: usize, chunks: usize },
    /// A chunk failed; it and all undrained chunks were requeued.
    Failed {
        requeued: usize,
        chunks_settled: usize,
    },
}

/// Sub-component driving batched submission. Obtained via
/// [`ActionEngine::batch`].
pub struct Batch<'a> {
    pub(crate) engine: &'a ActionEngine,
}

impl Batch<'_> {
    /// Run one flush cycle to completion.
    pub async fn flush(&self) -> FlushOutcome {
        let engine = self.engine;

        let permit = match engine.lock.try_acquire() {
            Some(p) => p,
            None => {
                tracing::debug!("flush skipped, another submission is in flight");
                return FlushOutcome::Skipped;
            }
        };

        // Single snapshot; the queue is empty for observers from here on.
        let drained = engine.queue.drain_all();
        if drained.is_empty() {
            return FlushOutcome::Empty;
        }

        let total_actions = drained.len();
        tracing::info!(size = total_actions, "starting batch flush");

        let mut chunks = split_chunks(drained);
        let total_chunks = chunks.len();

        for index in 0..total_chunks {
            if index > 0 {
                Delay::new(engine.inter_chunk_delay).await;
            }

            let chunk_len = chunks[index].len();
            tracing::debug!(
                chunk = index + 1,
                total = total_chunks,
                size = chunk_len,
                "submitting batch chunk"
            );

            engine.pending.fetch_add(chunk_len, Ordering::Relaxed);
            let result = self.submit_chunk(&chunks[index]).await;
            engine.pending.fetch_sub(chunk_len, Ordering::Relaxed);

            match result {
                Ok(receipt) => {
                    for action in &chunks[index] {
                        engine.journal.confirm(&action.entry_id, &receipt.tx_hash);
                    }
                }
                Err(e) => {
                    // The failed chunk and everything undrained go back to
                    // the head: retries run before actions that arrived
                    // during the inter-chunk delay.
                    let requeued: Vec<QueuedAction> =
                        chunks.split_off(index).into_iter().flatten().collect();
                    let requeued_count = requeued.len();
                    tracing::error!(
                        error = %e,
                        chunk = index + 1,
                        total = total_chunks,
                        requeued = requeued_count,
                        "batch chunk failed, requeueing"
                    );
                    engine.queue.requeue_front(requeued);
                    return FlushOutcome::Failed {
                        requeued: requeued_count,
                        chunks_settled: index,
                    };
                }
            }
        }

        // Release the lock before the (read-only) profile refresh.
        drop(permit);
        engine.profile().refresh().await;

        tracing::info!(size = total_actions, chunks = total_chunks, "batch completed");
        FlushOutcome::Settled {
            actions: total_actions,
            chunks: total_chunks,
        }
    }

    /// Encode and submit one chunk as a single bundled operation, then wait
    /// for settlement. Encoding happens here, at submission time.
    async fn submit_chunk(
        &self,
        chunk: &[QueuedAction],
    ) -> Result<SettlementReceipt, SettlementError> {
        let encoder = &self.engine.encoder;
        let calls: Vec<Call> = chunk
            .iter()
            .map(|action| Call {
                target: encoder.target(),
                data: encoder.encode(action.kind, action.note.as_deref(), action.referrer.as_ref()),
            })
            .collect();

        let handle = self.engine.bundler.submit(&calls).await?;
        self.engine.bundler.await_settlement(&handle).await
    }
}

/// Split a drained snapshot into chunks of at most [`MAX_CHUNK_SIZE`],
/// preserving order.
fn split_chunks(actions: Vec<QueuedAction>) -> Vec<Vec<QueuedAction>> {
    let mut chunks = Vec::with_capacity(actions.len().div_ceil(MAX_CHUNK_SIZE));
    let mut rest = actions;
    while rest.len() > MAX_CHUNK_SIZE {
        let tail = rest.split_off(MAX_CHUNK_SIZE);
        chunks.push(rest);
        rest = tail;
    }
    if !rest.is_empty() {
        chunks.push(rest);
    }
    chunks
}
