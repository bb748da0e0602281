//! End-to-end tests for the action engine: session-gated routing, threshold
//! flushes, chunk sequencing, requeue-on-failure, and single-flight
//! exclusion, all driven against mock capabilities.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use breakpoint_sdk::prelude::*;

// ─── Mock capabilities ───────────────────────────────────────────────────────

/// Records every submitted bundle; settlement fails for configured indices.
/// An optional gate blocks `submit` until the test releases a permit.
#[derive(Default)]
struct MockBundler {
    submitted: Mutex<Vec<Vec<Call>>>,
    fail_on: Mutex<HashSet<usize>>,
    gate: Option<Arc<Semaphore>>,
}

impl MockBundler {
    fn failing_on(indices: impl IntoIterator<Item = usize>) -> Self {
        Self {
            fail_on: Mutex::new(indices.into_iter().collect()),
            ..Default::default()
        }
    }

    fn gated(gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Default::default()
        }
    }

    fn submissions(&self) -> Vec<Vec<Call>> {
        self.submitted.lock().unwrap().clone()
    }

    fn bundle_sizes(&self) -> Vec<usize> {
        self.submissions().iter().map(|b| b.len()).collect()
    }
}

#[async_trait]
impl Bundler for MockBundler {
    async fn submit(&self, calls: &[Call]) -> Result<OperationHandle, SettlementError> {
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        let mut submitted = self.submitted.lock().unwrap();
        let index = submitted.len();
        submitted.push(calls.to_vec());
        Ok(OperationHandle(format!("op-{}", index)))
    }

    async fn await_settlement(
        &self,
        handle: &OperationHandle,
    ) -> Result<SettlementReceipt, SettlementError> {
        let index: usize = handle.0.strip_prefix("op-").unwrap().parse().unwrap();
        if self.fail_on.lock().unwrap().contains(&index) {
            return Err(SettlementError::NotFinalized {
                handle: handle.0.clone(),
                reason: "reverted".into(),
            });
        }
        Ok(SettlementReceipt {
            tx_hash: format!("0xtx{}", index),
            block_number: Some(index as u64),
        })
    }
}

/// Encodes the note verbatim, so tests can read actions back out of
/// recorded bundles.
struct PlainEncoder;

impl ActionEncoder for PlainEncoder {
    fn target(&self) -> AddressStr {
        AddressStr::new("0x00000000000000000000000000000000000000aa")
    }

    fn encode(
        &self,
        _kind: ActionKind,
        note: Option<&str>,
        _referrer: Option<&AddressStr>,
    ) -> Vec<u8> {
        note.unwrap_or_default().as_bytes().to_vec()
    }
}

/// Counts reads and returns `total_actions = reads so far`.
#[derive(Default)]
struct StubReader {
    reads: AtomicUsize,
}

#[async_trait]
impl ProfileReader for StubReader {
    async fn read(&self, _player: &AddressStr) -> Result<PlayerStats, ReadError> {
        let n = self.reads.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(PlayerStats {
            total_actions: n as u128,
            ..Default::default()
        })
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

const PLAYER: &str = "0x0000000000000000000000000000000000000011";

fn build_engine(
    bundler: Arc<MockBundler>,
    threshold: usize,
) -> (ActionEngine, Arc<StubReader>) {
    let reader = Arc::new(StubReader::default());
    let engine = ActionEngine::builder(
        AddressStr::new(PLAYER),
        bundler,
        Arc::new(PlainEncoder),
        reader.clone(),
    )
    .batch_threshold(threshold)
    .inter_chunk_delay(Duration::from_millis(1))
    .build();
    (engine, reader)
}

fn note_of(call: &Call) -> String {
    String::from_utf8(call.data.clone()).unwrap()
}

async fn click(engine: &ActionEngine, note: &str) -> ActionOutcome {
    engine
        .perform_action(ActionKind::Collect, Some(note.to_string()), None)
        .await
        .expect("perform_action failed")
}

fn fill_queue(engine: &ActionEngine, count: usize) {
    for i in 0..count {
        engine.action_queue().enqueue(QueuedAction::new(
            ActionKind::Collect,
            Some(format!("a{}", i)),
            None,
        ));
    }
}

// ─── Immediate path ──────────────────────────────────────────────────────────

#[tokio::test]
async fn immediate_path_without_session() {
    let bundler = Arc::new(MockBundler::default());
    let (engine, reader) = build_engine(bundler.clone(), 10);

    let outcome = click(&engine, "solo").await;
    assert_eq!(
        outcome,
        ActionOutcome::Confirmed {
            tx_hash: "0xtx0".into()
        }
    );

    let submissions = bundler.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].len(), 1);
    assert_eq!(note_of(&submissions[0][0]), "solo");

    // settled => journal confirmed and profile refreshed
    assert_eq!(engine.journal().entries()[0].status, ActionStatus::Confirmed);
    assert_eq!(reader.reads.load(Ordering::SeqCst), 1);
    assert_eq!(engine.profile().current().await.unwrap().total_actions, 1);
}

#[tokio::test]
async fn immediate_failure_propagates_and_is_not_requeued() {
    let bundler = Arc::new(MockBundler::failing_on([0]));
    let (engine, reader) = build_engine(bundler.clone(), 10);

    let err = engine
        .perform_action(ActionKind::Collect, Some("solo".into()), None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Settlement(_)));

    assert_eq!(engine.queued_len(), 0);
    assert_eq!(engine.journal().entries()[0].status, ActionStatus::Failed);
    // no refresh on failure
    assert_eq!(reader.reads.load(Ordering::SeqCst), 0);

    // the lock is free again
    assert!(engine.submit_lock().try_acquire().is_some());
}

// ─── Batched path ────────────────────────────────────────────────────────────

#[tokio::test]
async fn threshold_of_three_flushes_twice_for_seven_clicks() {
    let bundler = Arc::new(MockBundler::default());
    let (engine, reader) = build_engine(bundler.clone(), 3);
    engine.start_session(Some(10)).unwrap();

    for i in 0..7 {
        let outcome = click(&engine, &format!("c{}", i)).await;
        assert!(matches!(outcome, ActionOutcome::Queued { .. }));
    }

    assert_eq!(bundler.bundle_sizes(), vec![3, 3]);
    assert_eq!(engine.queued_len(), 1);

    // manual session end flushes the residual click
    let outcome = engine.end_session().await;
    assert_eq!(
        outcome,
        FlushOutcome::Settled {
            actions: 1,
            chunks: 1
        }
    );
    assert_eq!(bundler.bundle_sizes(), vec![3, 3, 1]);
    assert_eq!(engine.queued_len(), 0);

    // one profile refresh per flush, not per action
    assert_eq!(reader.reads.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn queued_actions_flush_in_fifo_order() {
    let bundler = Arc::new(MockBundler::default());
    let (engine, _) = build_engine(bundler.clone(), 4);
    engine.start_session(Some(10)).unwrap();

    for i in 0..4 {
        click(&engine, &format!("c{}", i)).await;
    }

    let submissions = bundler.submissions();
    let notes: Vec<_> = submissions[0].iter().map(note_of).collect();
    assert_eq!(notes, vec!["c0", "c1", "c2", "c3"]);
}

#[tokio::test]
async fn failed_single_chunk_flush_restores_queue_in_order() {
    let bundler = Arc::new(MockBundler::failing_on([0]));
    let (engine, reader) = build_engine(bundler.clone(), 5);
    engine.start_session(Some(10)).unwrap();

    for i in 0..5 {
        // the enqueuing caller is never notified of the flush failure
        let outcome = click(&engine, &format!("c{}", i)).await;
        assert!(matches!(outcome, ActionOutcome::Queued { .. }));
    }

    // exactly one flush attempt, all five actions back in original order
    assert_eq!(bundler.submissions().len(), 1);
    assert_eq!(engine.queued_len(), 5);
    let drained = engine.action_queue().drain_all();
    let notes: Vec<_> = drained.iter().map(|a| a.note.clone().unwrap()).collect();
    assert_eq!(notes, vec!["c0", "c1", "c2", "c3", "c4"]);

    // entries stay pending, no refresh happened
    assert_eq!(engine.journal().pending_count(), 5);
    assert_eq!(reader.reads.load(Ordering::SeqCst), 0);

    // the lock was released on the failure path
    assert!(engine.submit_lock().try_acquire().is_some());
}

// ─── Chunking ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn large_flush_splits_into_sequential_chunks() {
    let bundler = Arc::new(MockBundler::default());
    let (engine, reader) = build_engine(bundler.clone(), 10);
    fill_queue(&engine, 120);

    let outcome = engine.batch().flush().await;
    assert_eq!(
        outcome,
        FlushOutcome::Settled {
            actions: 120,
            chunks: 3
        }
    );

    let submissions = bundler.submissions();
    assert_eq!(bundler.bundle_sizes(), vec![50, 50, 20]);
    assert_eq!(note_of(&submissions[0][0]), "a0");
    assert_eq!(note_of(&submissions[1][0]), "a50");
    assert_eq!(note_of(&submissions[2][19]), "a119");

    // one refresh for the whole flush
    assert_eq!(reader.reads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_middle_chunk_stops_flush_and_requeues_remainder() {
    let bundler = Arc::new(MockBundler::failing_on([1]));
    let (engine, reader) = build_engine(bundler.clone(), 10);
    fill_queue(&engine, 120);

    let outcome = engine.batch().flush().await;
    assert_eq!(
        outcome,
        FlushOutcome::Failed {
            requeued: 70,
            chunks_settled: 1
        }
    );

    // chunk 3 was never submitted
    assert_eq!(bundler.bundle_sizes(), vec![50, 50]);

    // chunks 2 and 3 are back, in original order, ahead of nothing else
    assert_eq!(engine.queued_len(), 70);
    let drained = engine.action_queue().drain_all();
    assert_eq!(drained[0].note.as_deref(), Some("a50"));
    assert_eq!(drained[69].note.as_deref(), Some("a119"));

    // failed flush does not refresh the profile
    assert_eq!(reader.reads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn requeued_actions_go_ahead_of_later_enqueues() {
    let bundler = Arc::new(MockBundler::failing_on([0]));
    let (engine, _) = build_engine(bundler.clone(), 10);
    fill_queue(&engine, 3);

    assert!(matches!(
        engine.batch().flush().await,
        FlushOutcome::Failed { requeued: 3, .. }
    ));

    engine.action_queue().enqueue(QueuedAction::new(
        ActionKind::Collect,
        Some("after".into()),
        None,
    ));

    let drained = engine.action_queue().drain_all();
    let notes: Vec<_> = drained.iter().map(|a| a.note.clone().unwrap()).collect();
    assert_eq!(notes, vec!["a0", "a1", "a2", "after"]);
}

// ─── Single-flight exclusion ─────────────────────────────────────────────────

#[tokio::test]
async fn flush_in_progress_rejects_immediate_and_skips_second_flush() {
    let gate = Arc::new(Semaphore::new(0));
    let bundler = Arc::new(MockBundler::gated(gate.clone()));
    let (engine, _) = build_engine(bundler.clone(), 10);
    fill_queue(&engine, 2);

    let background = engine.clone();
    let flush_task = tokio::spawn(async move { background.batch().flush().await });

    // wait until the flush owns the lock and is parked on the gate
    while !engine.submit_lock().is_held() {
        tokio::task::yield_now().await;
    }

    // immediate path from the other side is rejected
    let err = engine
        .perform_action(ActionKind::Collect, Some("manual".into()), None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Busy));

    // a racing flush is skipped, not queued behind
    assert_eq!(engine.batch().flush().await, FlushOutcome::Skipped);

    gate.add_permits(1);
    let outcome = flush_task.await.unwrap();
    assert_eq!(
        outcome,
        FlushOutcome::Settled {
            actions: 2,
            chunks: 1
        }
    );
}

#[tokio::test]
async fn held_permit_blocks_both_paths() {
    let bundler = Arc::new(MockBundler::default());
    let (engine, _) = build_engine(bundler.clone(), 10);
    fill_queue(&engine, 1);

    let permit = engine.submit_lock().try_acquire().unwrap();

    assert_eq!(engine.batch().flush().await, FlushOutcome::Skipped);
    let err = engine
        .perform_action(ActionKind::Collect, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Busy));
    assert!(bundler.submissions().is_empty());

    drop(permit);
    assert!(matches!(
        engine.batch().flush().await,
        FlushOutcome::Settled { .. }
    ));
}

// ─── Sessions ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn start_session_clamps_ninety_minutes_to_sixty() {
    let bundler = Arc::new(MockBundler::default());
    let (engine, _) = build_engine(bundler, 10);

    let key = engine.start_session(Some(90)).unwrap();
    assert_eq!(key.valid_until - key.valid_after, 60 * 60);
}

#[tokio::test]
async fn start_session_uses_persisted_preference() {
    let bundler = Arc::new(MockBundler::default());
    let (engine, _) = build_engine(bundler, 10);

    engine.session().set_duration_preference(25);
    let key = engine.start_session(None).unwrap();
    assert_eq!(key.valid_until - key.valid_after, 25 * 60);
}

#[tokio::test]
async fn end_session_with_empty_queue_flushes_nothing() {
    let bundler = Arc::new(MockBundler::default());
    let (engine, _) = build_engine(bundler.clone(), 10);
    engine.start_session(Some(10)).unwrap();

    assert_eq!(engine.end_session().await, FlushOutcome::Empty);
    assert!(bundler.submissions().is_empty());

    // and with no session, actions go out immediately again
    let outcome = click(&engine, "solo").await;
    assert!(matches!(outcome, ActionOutcome::Confirmed { .. }));
}

#[tokio::test]
async fn watcher_fires_expiry_transition_exactly_once() {
    let bundler = Arc::new(MockBundler::default());
    let (engine, _) = build_engine(bundler.clone(), 10);
    let now = chrono::Utc::now().timestamp();

    engine.start_session(Some(10)).unwrap();
    let mut watcher = engine.watcher().with_interval(Duration::from_millis(1));

    // session observed active: no transition
    assert_eq!(watcher.tick().await, None);

    fill_queue(&engine, 2);

    // force expiry by overwriting the stored key with an elapsed window
    engine.session().persist_raw(&SessionKey {
        address: AddressStr::zero(),
        secret: breakpoint_sdk::session::Secret::new("00"),
        valid_after: now - 120,
        valid_until: now - 60,
        created_at: now - 120,
    });

    // the transition tick flushes the residual queue
    assert_eq!(
        watcher.tick().await,
        Some(FlushOutcome::Settled {
            actions: 2,
            chunks: 1
        })
    );
    assert_eq!(bundler.submissions().len(), 1);

    // subsequent ticks are no-ops
    assert_eq!(watcher.tick().await, None);
    assert_eq!(watcher.tick().await, None);
    assert_eq!(bundler.submissions().len(), 1);
}

#[tokio::test]
async fn explicit_session_end_does_not_fire_watcher_transition() {
    let bundler = Arc::new(MockBundler::default());
    let (engine, _) = build_engine(bundler.clone(), 10);

    engine.start_session(Some(10)).unwrap();
    let mut watcher = engine.watcher().with_interval(Duration::from_millis(1));
    assert_eq!(watcher.tick().await, None);

    fill_queue(&engine, 1);
    assert!(matches!(
        engine.end_session().await,
        FlushOutcome::Settled { .. }
    ));

    // the watcher observes the key disappearing but does not report expiry
    // or flush a second time
    assert_eq!(watcher.tick().await, None);
    assert_eq!(watcher.tick().await, None);
    assert_eq!(bundler.submissions().len(), 1);

    // a later real expiry on a fresh session still fires
    let now = chrono::Utc::now().timestamp();
    engine.start_session(Some(10)).unwrap();
    assert_eq!(watcher.tick().await, None);
    engine.session().persist_raw(&SessionKey {
        address: AddressStr::zero(),
        secret: breakpoint_sdk::session::Secret::new("00"),
        valid_after: now - 120,
        valid_until: now - 60,
        created_at: now - 120,
    });
    assert_eq!(watcher.tick().await, Some(FlushOutcome::Empty));
}
