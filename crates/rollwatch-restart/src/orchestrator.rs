//! Orchestrator — brackets a mutation with restart tracking.
//!
//! ```text
//! run(mutation)
//!   ├── wait enabled?  read baseline      (error → abort, mutation not run)
//!   ├── mutation()                        (error → abort, no polling)
//!   └── wait enabled?  poll until restarted or deadline
//!         ├── restarted        → Restarted
//!         ├── deadline passed  → TimedOut  (logged, still Ok)
//!         └── poll error       → Aborted   (logged, still Ok)
//! ```
//!
//! Setup errors fail the call; anything that goes wrong while waiting only
//! degrades the outcome, because the mutation has already taken effect and
//! its result (often a cleanup handle) must reach the caller.

use std::future::Future;
use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use rollwatch_core::RestartConfig;
use rollwatch_core::duration::format_duration;
use rollwatch_fleet::SnapshotCapturer;

use crate::checker::{RestartChecker, Verdict};
use crate::clock::{Clock, SystemClock};
use crate::error::{RestartError, RestartResult};

/// How the restart wait ended.
#[derive(Debug)]
pub enum WaitOutcome {
    /// Restart tracking was disabled.
    Skipped,
    /// Every tracked process restarted and stabilized.
    Restarted { polls: u32 },
    /// The deadline passed without a positive verdict.
    TimedOut { polls: u32 },
    /// A poll failed; the wait stopped early.
    Aborted(RestartError),
}

impl WaitOutcome {
    /// Whether the restart was positively confirmed.
    pub fn is_confirmed(&self) -> bool {
        matches!(self, WaitOutcome::Restarted { .. })
    }
}

/// A successful mutation together with how the restart wait ended.
#[derive(Debug)]
pub struct Completed<T> {
    /// The mutation's own result, unchanged.
    pub result: T,
    pub outcome: WaitOutcome,
}

impl<T> Completed<T> {
    pub fn into_inner(self) -> T {
        self.result
    }
}

/// Runs mutations against one fleet with optional restart tracking.
///
/// Calls against the same fleet must not overlap; each call owns its own
/// checker but they would read each other's restarts.
#[derive(Clone)]
pub struct Orchestrator {
    capturer: SnapshotCapturer,
    config: RestartConfig,
    clock: Arc<dyn Clock>,
}

impl Orchestrator {
    pub fn new(capturer: SnapshotCapturer, config: RestartConfig) -> Self {
        Self {
            capturer,
            config,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &RestartConfig {
        &self.config
    }

    /// A fresh checker for one wait.
    pub fn checker(&self) -> RestartChecker {
        RestartChecker::new(self.capturer.clone(), self.config.stabilization)
            .with_clock(self.clock.clone())
    }

    /// Run `mutation`, waiting for the fleet to restart if configured.
    ///
    /// Fails only when the baseline cannot be captured or the mutation
    /// itself fails. In the latter case the mutation's error is returned
    /// inside [`RestartError::Mutation`] untouched.
    pub async fn run<F, Fut, T>(&self, mutation: F) -> RestartResult<Completed<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let mut checker = if self.config.wait {
            let mut checker = self.checker();
            checker.read_initial_state().await?;
            Some(checker)
        } else {
            None
        };

        let result = mutation().await.map_err(RestartError::Mutation)?;

        let outcome = match checker.as_mut() {
            Some(checker) => self.wait_for_restart(checker).await,
            None => WaitOutcome::Skipped,
        };

        Ok(Completed { result, outcome })
    }

    /// Poll `checker` until it reports a restart or the deadline passes.
    ///
    /// The deadline is measured from the call, i.e. from mutation completion.
    /// At least one poll always happens.
    pub async fn wait_for_restart(&self, checker: &mut RestartChecker) -> WaitOutcome {
        let deadline = Instant::now() + self.config.deadline;
        info!(
            selector = %checker.selector(),
            deadline = %format_duration(self.config.deadline),
            "waiting for fleet restart"
        );

        loop {
            match checker.poll().await {
                Ok(Verdict::RestartedAndStable) => {
                    info!(selector = %checker.selector(), polls = checker.polls(), "fleet restarted");
                    return WaitOutcome::Restarted {
                        polls: checker.polls(),
                    };
                }
                Ok(Verdict::NotYetRestarted { identity, reason }) => {
                    debug!(pod = %identity, ?reason, "fleet restart not detected yet");
                }
                Err(e) => {
                    warn!(selector = %checker.selector(), error = %e, "restart wait aborted");
                    return WaitOutcome::Aborted(e);
                }
            }

            if Instant::now() >= deadline {
                checker.mark_timed_out();
                warn!(
                    selector = %checker.selector(),
                    polls = checker.polls(),
                    deadline = %format_duration(self.config.deadline),
                    "fleet restart not detected before deadline, continuing"
                );
                return WaitOutcome::TimedOut {
                    polls: checker.polls(),
                };
            }

            tokio::time::sleep(self.config.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{DateTime, TimeZone, Utc};
    use rollwatch_fleet::{MemoryFleet, ProcessRecord};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    const SELECTOR: &str = "component=kube-scheduler";

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn reference_config() -> RestartConfig {
        RestartConfig {
            wait: true,
            stabilization: Duration::from_secs(10),
            poll_interval: Duration::from_secs(5),
            deadline: Duration::from_secs(120),
        }
    }

    fn orchestrator(fleet: &MemoryFleet, config: RestartConfig) -> Orchestrator {
        let capturer = SnapshotCapturer::new(Arc::new(fleet.clone()), SELECTOR);
        Orchestrator::new(capturer, config)
    }

    #[derive(Debug, thiserror::Error)]
    #[error("apply rejected by apiserver")]
    struct ApplyRejected;

    #[tokio::test(start_paused = true)]
    async fn wait_disabled_skips_tracking() {
        let fleet = MemoryFleet::new();
        let orch = orchestrator(&fleet, reference_config().without_wait());

        let done = orch.run(|| async { Ok(7) }).await.unwrap();
        assert_eq!(done.result, 7);
        assert!(matches!(done.outcome, WaitOutcome::Skipped));
        assert_eq!(fleet.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_baseline_aborts_before_mutation() {
        let fleet = MemoryFleet::new();
        let orch = orchestrator(&fleet, reference_config());
        let ran = Arc::new(AtomicBool::new(false));

        let flag = ran.clone();
        let err = orch
            .run(move || async move {
                flag.store(true, Ordering::SeqCst);
                Ok(())
            })
            .await
            .unwrap_err();

        assert!(matches!(err, RestartError::EmptyFleet { .. }));
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn baseline_query_error_aborts_before_mutation() {
        let fleet = MemoryFleet::new();
        fleet.fail_with("apiserver down");
        let orch = orchestrator(&fleet, reference_config());
        let ran = Arc::new(AtomicBool::new(false));

        let flag = ran.clone();
        let err = orch
            .run(move || async move {
                flag.store(true, Ordering::SeqCst);
                Ok(())
            })
            .await
            .unwrap_err();

        assert!(matches!(err, RestartError::Query(_)));
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn mutation_error_skips_polling_and_is_passed_through() {
        let fleet = MemoryFleet::new();
        fleet.set(SELECTOR, vec![ProcessRecord::running("s-0", t(0))]);
        let orch = orchestrator(&fleet, reference_config());

        let err = orch
            .run(|| async { Err::<(), _>(anyhow::Error::new(ApplyRejected)) })
            .await
            .unwrap_err();

        match err {
            RestartError::Mutation(inner) => assert!(inner.downcast_ref::<ApplyRejected>().is_some()),
            other => panic!("expected mutation error, got {other:?}"),
        }
        // Baseline only, no polls.
        assert_eq!(fleet.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn detects_restart_performed_by_mutation() {
        let fleet = MemoryFleet::new();
        fleet.set(SELECTOR, vec![ProcessRecord::running("s-0", t(0))]);
        let clock = Arc::new(ManualClock::new(t(100)));
        let orch = orchestrator(&fleet, reference_config()).with_clock(clock);

        let f = fleet.clone();
        let done = orch
            .run(move || async move {
                f.set(SELECTOR, vec![ProcessRecord::running("s-0", t(50))]);
                Ok("cleanup-handle")
            })
            .await
            .unwrap();

        // Up for 50s at the first poll.
        assert!(matches!(done.outcome, WaitOutcome::Restarted { polls: 1 }));
        assert_eq!(done.into_inner(), "cleanup-handle");
    }

    #[tokio::test(start_paused = true)]
    async fn restart_confirmed_on_later_poll() {
        let fleet = MemoryFleet::new();
        fleet.set(SELECTOR, vec![ProcessRecord::running("s-0", t(0))]);
        let clock = Arc::new(ManualClock::new(t(100)));
        let orch = orchestrator(&fleet, reference_config()).with_clock(clock.clone());

        let f = fleet.clone();
        let c = clock.clone();
        let done = orch
            .run(move || async move {
                // Restarted just now: must settle first.
                f.set(SELECTOR, vec![ProcessRecord::running("s-0", t(100))]);
                // Wall clock moves 15s per poll interval from here on.
                tokio::spawn(async move {
                    loop {
                        tokio::time::sleep(Duration::from_secs(5)).await;
                        c.advance(Duration::from_secs(15));
                    }
                });
                Ok(())
            })
            .await
            .unwrap();

        match done.outcome {
            WaitOutcome::Restarted { polls } => assert!(polls >= 2),
            other => panic!("expected restart, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn soft_timeout_returns_mutation_result() {
        let fleet = MemoryFleet::new();
        fleet.set(SELECTOR, vec![ProcessRecord::running("s-0", t(0))]);
        let orch = orchestrator(&fleet, reference_config());

        let started = Instant::now();
        let done = orch.run(|| async { Ok(42) }).await.unwrap();

        assert_eq!(done.result, 42);
        match done.outcome {
            // 120s deadline at 5s intervals: polls at 0, 5, ..., 120.
            WaitOutcome::TimedOut { polls } => assert_eq!(polls, 25),
            other => panic!("expected timeout, got {other:?}"),
        }
        assert!(started.elapsed() >= Duration::from_secs(120));
        assert!(started.elapsed() < Duration::from_secs(130));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_starts_after_slow_mutation() {
        let fleet = MemoryFleet::new();
        fleet.set(SELECTOR, vec![ProcessRecord::running("s-0", t(0))]);
        let orch = orchestrator(&fleet, reference_config());

        let started = Instant::now();
        let done = orch
            .run(|| async {
                tokio::time::sleep(Duration::from_secs(100)).await;
                Ok(())
            })
            .await
            .unwrap();

        // 100s of mutation, then the full 120s wait.
        assert!(matches!(done.outcome, WaitOutcome::TimedOut { polls: 25 }));
        assert!(started.elapsed() >= Duration::from_secs(220));
        assert!(started.elapsed() < Duration::from_secs(230));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_deadline_polls_once() {
        let fleet = MemoryFleet::new();
        fleet.set(SELECTOR, vec![ProcessRecord::running("s-0", t(0))]);
        let config = RestartConfig {
            deadline: Duration::ZERO,
            ..reference_config()
        };
        let orch = orchestrator(&fleet, config);

        let done = orch.run(|| async { Ok(()) }).await.unwrap();
        assert!(matches!(done.outcome, WaitOutcome::TimedOut { polls: 1 }));
    }

    #[tokio::test(start_paused = true)]
    async fn poll_error_aborts_wait_but_keeps_result() {
        let fleet = MemoryFleet::new();
        fleet.set(SELECTOR, vec![ProcessRecord::running("s-0", t(0))]);
        let orch = orchestrator(&fleet, reference_config());

        let f = fleet.clone();
        let done = orch
            .run(move || async move {
                f.fail_with("watch stream closed");
                Ok("handle")
            })
            .await
            .unwrap();

        assert_eq!(done.result, "handle");
        assert!(matches!(
            done.outcome,
            WaitOutcome::Aborted(RestartError::Query(_))
        ));
        assert!(!done.outcome.is_confirmed());
    }
}
