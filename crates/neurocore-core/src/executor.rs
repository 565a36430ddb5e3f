//! Action executor and status tracker.
//!
//! Holds one `OptimizationStatus` per catalog entry and drives it through
//! `Pending → Running → Completed | Failed` around each operation call. The
//! status map lock is only ever taken for a single read-modify-write and is
//! never held across an `.await`, so status reads do not wait on running work.
//!
//! A second `run` of an id that is already `Running` is rejected with
//! `AlreadyRunning`. Different ids run independently with no ordering.

use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::action::{OptimizationAction, OptimizationResult};
use crate::catalog::Catalog;
use crate::error::{CoreError, Result};
use crate::types::{ActionStatus, FailureKind};

// ---------------------------------------------------------------------------
// OptimizationStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationStatus {
    pub id: String,
    pub status: ActionStatus,
    /// Time of the last completion attempt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_result: Option<OptimizationResult>,
    /// Set only while `status == Failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
}

impl OptimizationStatus {
    pub fn pending(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: ActionStatus::Pending,
            last_run: None,
            last_result: None,
            failure: None,
        }
    }
}

// ---------------------------------------------------------------------------
// StatusChange
// ---------------------------------------------------------------------------

/// Broadcast on every status transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
    pub id: String,
    pub status: ActionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Tracker
// ---------------------------------------------------------------------------

/// Status map and event channel, shared with outstanding `PendingRun`s so a
/// claimed slot can always be settled.
#[derive(Debug)]
struct Tracker {
    statuses: Mutex<HashMap<String, OptimizationStatus>>,
    events: broadcast::Sender<StatusChange>,
}

impl Tracker {
    fn lock(&self) -> MutexGuard<'_, HashMap<String, OptimizationStatus>> {
        // A panic while holding the lock cannot leave an entry half-written:
        // every critical section assigns whole fields.
        self.statuses.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn emit(&self, id: &str, status: ActionStatus, message: Option<String>) {
        // No subscribers is fine.
        let _ = self.events.send(StatusChange {
            id: id.to_string(),
            status,
            message,
            at: Utc::now(),
        });
    }

    /// Record the terminal status of a run and announce it.
    fn settle(&self, id: &str, failure: Option<FailureKind>, result: &OptimizationResult) {
        let status = match failure {
            None => ActionStatus::Completed,
            Some(_) => ActionStatus::Failed,
        };
        {
            let mut map = self.lock();
            if let Some(entry) = map.get_mut(id) {
                let now = Utc::now();
                // Keep last_run strictly increasing even on coarse clocks.
                let stamp = match entry.last_run {
                    Some(prev) if now <= prev => prev + chrono::Duration::microseconds(1),
                    _ => now,
                };
                entry.status = status;
                entry.failure = failure;
                entry.last_run = Some(stamp);
                entry.last_result = Some(result.clone());
            }
        }

        match failure {
            None => info!(id = %id, message = %result.message, "action completed"),
            Some(kind) => {
                warn!(id = %id, kind = %kind, message = %result.message, "action failed")
            }
        }
        self.emit(id, status, Some(result.message.clone()));
    }
}

// ---------------------------------------------------------------------------
// PendingRun
// ---------------------------------------------------------------------------

/// A claimed `Running` slot, normally handed back to `Executor::finish_run`.
///
/// Dropping it unfinished (including when the `finish_run` future is
/// cancelled) marks the action `Failed` with an exception, so the slot never
/// stays `Running`.
#[must_use = "a claimed run stays `running` until passed to finish_run"]
#[derive(Debug)]
pub struct PendingRun {
    action: Arc<OptimizationAction>,
    tracker: Arc<Tracker>,
    settled: bool,
}

impl PendingRun {
    pub fn id(&self) -> &str {
        &self.action.id
    }

    fn settle(&mut self, failure: Option<FailureKind>, result: &OptimizationResult) {
        self.settled = true;
        self.tracker.settle(&self.action.id, failure, result);
    }
}

impl Drop for PendingRun {
    fn drop(&mut self) {
        if !self.settled {
            let result = OptimizationResult::failed("run abandoned before completion");
            self.settle(Some(FailureKind::Exception), &result);
        }
    }
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

pub struct Executor {
    catalog: Arc<Catalog>,
    tracker: Arc<Tracker>,
}

impl Executor {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        let statuses = catalog
            .ids()
            .map(|id| (id.to_string(), OptimizationStatus::pending(id)))
            .collect();
        let (events, _) = broadcast::channel(256);
        Self {
            catalog,
            tracker: Arc::new(Tracker {
                statuses: Mutex::new(statuses),
                events,
            }),
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusChange> {
        self.tracker.events.subscribe()
    }

    pub fn status(&self, id: &str) -> Result<OptimizationStatus> {
        self.tracker
            .lock()
            .get(id)
            .cloned()
            .ok_or_else(|| CoreError::UnknownAction(id.to_string()))
    }

    /// All statuses in catalog order.
    pub fn statuses(&self) -> Vec<OptimizationStatus> {
        let map = self.tracker.lock();
        self.catalog
            .ids()
            .filter_map(|id| map.get(id).cloned())
            .collect()
    }

    /// Run an action, recording its outcome.
    ///
    /// Failures of the operation itself are folded into the returned result
    /// (`success: false`). Only `UnknownAction` and `AlreadyRunning` surface
    /// as errors.
    pub async fn run(&self, id: &str) -> Result<OptimizationResult> {
        let pending = self.begin_run(id)?;
        Ok(self.finish_run(pending).await)
    }

    /// Like `run`, but operation failures are returned as
    /// `ExecutionFailure` (the tool said no) or `ExecutionException` (the
    /// tool could not run).
    pub async fn run_strict(&self, id: &str) -> Result<OptimizationResult> {
        let pending = self.begin_run(id)?;
        let id = pending.id().to_string();
        let result = self.finish_run(pending).await;
        if result.success {
            return Ok(result);
        }
        let failure = self.status(&id)?.failure;
        match failure {
            Some(FailureKind::Exception) => Err(CoreError::ExecutionException {
                id,
                message: result.message,
            }),
            _ => Err(CoreError::ExecutionFailure {
                id,
                message: result.message,
            }),
        }
    }

    /// Claim the `Running` slot for `id`.
    pub fn begin_run(&self, id: &str) -> Result<PendingRun> {
        let action = self
            .catalog
            .get(id)
            .cloned()
            .ok_or_else(|| CoreError::UnknownAction(id.to_string()))?;

        {
            let mut map = self.tracker.lock();
            let entry = map
                .get_mut(id)
                .ok_or_else(|| CoreError::UnknownAction(id.to_string()))?;
            if entry.status == ActionStatus::Running {
                warn!(id = %id, "run rejected: already running");
                return Err(CoreError::AlreadyRunning(id.to_string()));
            }
            entry.status = ActionStatus::Running;
            entry.failure = None;
        }

        info!(id = %id, "action started");
        self.tracker.emit(id, ActionStatus::Running, None);
        Ok(PendingRun {
            action,
            tracker: self.tracker.clone(),
            settled: false,
        })
    }

    /// Execute a claimed action and record the terminal status.
    ///
    /// A panicking operation is recorded as an exception.
    pub async fn finish_run(&self, mut pending: PendingRun) -> OptimizationResult {
        let action = pending.action.clone();
        let outcome = AssertUnwindSafe(action.operation.execute())
            .catch_unwind()
            .await;

        let (failure, result) = match outcome {
            Ok(Ok(result)) if result.success => (None, result),
            Ok(Ok(result)) => (Some(FailureKind::Rejected), result),
            Ok(Err(e)) => (
                Some(FailureKind::Exception),
                OptimizationResult::failed(e.to_string()),
            ),
            Err(panic) => (
                Some(FailureKind::Exception),
                OptimizationResult::failed(format!(
                    "operation panicked: {}",
                    panic_message(panic.as_ref())
                )),
            ),
        };

        pending.settle(failure, &result);
        result
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{operation_fn, OptimizationAction};
    use std::time::Duration;

    fn action_with(
        id: &str,
        op: Arc<dyn crate::action::Operation>,
    ) -> OptimizationAction {
        OptimizationAction::new(id, id, "Test", 5, op)
    }

    fn executor(actions: Vec<OptimizationAction>) -> Executor {
        Executor::new(Arc::new(Catalog::new(actions).unwrap()))
    }

    fn cleaned() -> OptimizationAction {
        action_with(
            "temp-cleanup",
            operation_fn(|| async { Ok(OptimizationResult::ok("cleaned")) }),
        )
    }

    fn boom() -> OptimizationAction {
        action_with(
            "bad-op",
            operation_fn(|| async {
                Err(CoreError::CommandSpawnFailed {
                    program: "defrag".into(),
                    reason: "boom".into(),
                })
            }),
        )
    }

    fn refused() -> OptimizationAction {
        action_with(
            "refused",
            operation_fn(|| async { Ok(OptimizationResult::failed("access denied")) }),
        )
    }

    #[test]
    fn all_pending_after_init() {
        let exec = executor(vec![cleaned(), boom(), refused()]);
        let statuses = exec.statuses();
        assert_eq!(statuses.len(), 3);
        assert!(statuses.iter().all(|s| s.status == ActionStatus::Pending));
        assert!(statuses.iter().all(|s| s.last_run.is_none()));
    }

    #[tokio::test]
    async fn successful_run_completes() {
        let exec = executor(vec![cleaned()]);
        let result = exec.run("temp-cleanup").await.unwrap();
        assert!(result.success);

        let status = exec.status("temp-cleanup").unwrap();
        assert_eq!(status.status, ActionStatus::Completed);
        assert_eq!(status.last_result.unwrap().message, "cleaned");
        assert!(status.last_run.is_some());
        assert!(status.failure.is_none());
    }

    #[tokio::test]
    async fn rejected_run_fails() {
        let exec = executor(vec![refused()]);
        let result = exec.run("refused").await.unwrap();
        assert!(!result.success);

        let status = exec.status("refused").unwrap();
        assert_eq!(status.status, ActionStatus::Failed);
        assert_eq!(status.failure, Some(FailureKind::Rejected));
    }

    #[tokio::test]
    async fn erroring_run_fails_with_message() {
        let exec = executor(vec![boom()]);
        exec.run("bad-op").await.unwrap();

        let status = exec.status("bad-op").unwrap();
        assert_eq!(status.status, ActionStatus::Failed);
        assert_eq!(status.failure, Some(FailureKind::Exception));
        let last = status.last_result.unwrap();
        assert!(!last.success);
        assert!(last.message.contains("boom"));
    }

    #[tokio::test]
    async fn unknown_id_leaves_statuses_untouched() {
        let exec = executor(vec![cleaned(), boom()]);
        let before = exec.statuses();
        let err = exec.run("does-not-exist").await.unwrap_err();
        assert!(matches!(err, CoreError::UnknownAction(ref id) if id == "does-not-exist"));
        assert_eq!(exec.statuses(), before);
        assert_eq!(exec.catalog().len(), 2);
    }

    #[tokio::test]
    async fn rerun_advances_timestamp() {
        let exec = executor(vec![cleaned(), boom()]);
        for id in ["temp-cleanup", "bad-op"] {
            exec.run(id).await.unwrap();
            let first = exec.status(id).unwrap().last_run.unwrap();
            exec.run(id).await.unwrap();
            let second = exec.status(id).unwrap().last_run.unwrap();
            assert!(second > first, "{id}: {second} should be after {first}");
        }
    }

    #[tokio::test]
    async fn rerun_passes_through_running() {
        let exec = executor(vec![refused()]);
        exec.run("refused").await.unwrap();
        let mut rx = exec.subscribe();
        exec.run("refused").await.unwrap();

        let first = rx.recv().await.unwrap();
        assert_eq!(first.status, ActionStatus::Running);
        let second = rx.recv().await.unwrap();
        assert_eq!(second.status, ActionStatus::Failed);
        assert_eq!(second.message.as_deref(), Some("access denied"));
    }

    #[tokio::test]
    async fn strict_run_distinguishes_failure_kinds() {
        let exec = executor(vec![cleaned(), boom(), refused()]);
        assert!(exec.run_strict("temp-cleanup").await.is_ok());
        assert!(matches!(
            exec.run_strict("refused").await,
            Err(CoreError::ExecutionFailure { .. })
        ));
        assert!(matches!(
            exec.run_strict("bad-op").await,
            Err(CoreError::ExecutionException { ref message, .. }) if message.contains("boom")
        ));
        assert_eq!(exec.status("bad-op").unwrap().status, ActionStatus::Failed);
    }

    #[tokio::test]
    async fn concurrent_run_of_same_id_is_rejected() {
        let (release_tx, release_rx) = tokio::sync::watch::channel(false);
        let slow = action_with(
            "slow",
            operation_fn(move || {
                let mut rx = release_rx.clone();
                async move {
                    let _ = rx.wait_for(|released| *released).await;
                    Ok(OptimizationResult::ok("done"))
                }
            }),
        );
        let exec = Arc::new(executor(vec![slow, cleaned()]));

        let first = exec.begin_run("slow").unwrap();
        let runner = {
            let exec = exec.clone();
            tokio::spawn(async move { exec.finish_run(first).await })
        };

        assert_eq!(exec.status("slow").unwrap().status, ActionStatus::Running);
        let before = exec.status("slow").unwrap();
        let err = exec.run("slow").await.unwrap_err();
        assert!(matches!(err, CoreError::AlreadyRunning(_)));
        assert_eq!(exec.status("slow").unwrap(), before);

        // A different action is not blocked by the running one.
        exec.run("temp-cleanup").await.unwrap();

        release_tx.send(true).unwrap();
        let result = tokio::time::timeout(Duration::from_secs(5), runner)
            .await
            .unwrap()
            .unwrap();
        assert!(result.success);
        assert_eq!(exec.status("slow").unwrap().status, ActionStatus::Completed);
    }

    #[tokio::test]
    async fn panicking_operation_fails_and_can_rerun() {
        let panics = action_with(
            "panics",
            operation_fn(|| async {
                let bytes: Vec<u8> = Vec::new();
                let first = bytes[0];
                Ok(OptimizationResult::ok(format!("first byte {first}")))
            }),
        );
        let exec = Arc::new(executor(vec![panics]));

        let pending = exec.begin_run("panics").unwrap();
        let task = {
            let exec = exec.clone();
            tokio::spawn(async move { exec.finish_run(pending).await })
        };
        let result = task.await.unwrap();
        assert!(!result.success);
        assert!(result.message.contains("panicked"));

        let status = exec.status("panics").unwrap();
        assert_eq!(status.status, ActionStatus::Failed);
        assert_eq!(status.failure, Some(FailureKind::Exception));

        // The slot is free again.
        let again = exec.run("panics").await.unwrap();
        assert!(!again.success);
    }

    #[tokio::test]
    async fn abandoned_run_is_marked_failed() {
        let exec = executor(vec![cleaned()]);
        let pending = exec.begin_run("temp-cleanup").unwrap();
        drop(pending);

        let status = exec.status("temp-cleanup").unwrap();
        assert_eq!(status.status, ActionStatus::Failed);
        assert_eq!(status.failure, Some(FailureKind::Exception));
        assert!(exec.run("temp-cleanup").await.unwrap().success);
    }

    #[tokio::test]
    async fn cancelled_finish_releases_slot() {
        let (_hold_tx, hold_rx) = tokio::sync::watch::channel(());
        let hanging = action_with(
            "hang",
            operation_fn(move || {
                let mut rx = hold_rx.clone();
                async move {
                    let _ = rx.changed().await;
                    Ok(OptimizationResult::ok("never"))
                }
            }),
        );
        let exec = executor(vec![hanging]);
        let pending = exec.begin_run("hang").unwrap();
        let timed_out =
            tokio::time::timeout(Duration::from_millis(20), exec.finish_run(pending)).await;
        assert!(timed_out.is_err());

        let status = exec.status("hang").unwrap();
        assert_eq!(status.status, ActionStatus::Failed);
        assert!(exec.begin_run("hang").is_ok());
    }

    #[tokio::test]
    async fn status_readable_while_running() {
        let (_hold_tx, hold_rx) = tokio::sync::watch::channel(());
        let hanging = action_with(
            "hang",
            operation_fn(move || {
                let mut rx = hold_rx.clone();
                async move {
                    let _ = rx.changed().await;
                    Ok(OptimizationResult::ok("never"))
                }
            }),
        );
        let exec = Arc::new(executor(vec![hanging]));
        let pending = exec.begin_run("hang").unwrap();
        let task = {
            let exec = exec.clone();
            tokio::spawn(async move { exec.finish_run(pending).await })
        };
        tokio::task::yield_now().await;
        assert_eq!(exec.status("hang").unwrap().status, ActionStatus::Running);
        task.abort();
    }
}
