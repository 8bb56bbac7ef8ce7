//! Restart checker — drives the restart detection state machine.
//!
//! The checker captures one baseline snapshot, then re-queries the fleet on
//! every poll and compares the fresh snapshot against that baseline. Only
//! identities present in the baseline are tracked; pods that appear later
//! are ignored.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, info, warn};

use rollwatch_core::{ProcessIdentity, Snapshot, StartTime};
use rollwatch_fleet::SnapshotCapturer;

use crate::clock::{Clock, SystemClock};
use crate::error::{RestartError, RestartResult};

/// Current phase of a restart checker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckerPhase {
    /// No baseline captured.
    Uninitialized,
    /// Baseline capture in flight.
    Reading,
    /// Baseline captured, not polled yet.
    Ready,
    /// Polled at least once without a positive verdict.
    Polling { polls: u32 },
    /// Every tracked process restarted and is stable.
    Restarted { polls: u32 },
    /// The caller gave up waiting.
    TimedOut { polls: u32 },
    /// The last baseline capture or poll failed.
    Failed { reason: String },
}

/// Why a tracked process does not count as restarted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingReason {
    /// Gone from the current listing (possibly recreated under another name).
    Missing,
    /// Start time did not move past the baseline.
    NotRestarted {
        baseline: StartTime,
        current: StartTime,
    },
    /// Restarted, but not up for longer than the stabilization threshold.
    Settling { uptime: TimeDelta },
}

/// Outcome of comparing one snapshot against the baseline.
///
/// Query failures are not a verdict; they come back as
/// [`RestartError::Query`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The first tracked process found still pending.
    NotYetRestarted {
        identity: ProcessIdentity,
        reason: PendingReason,
    },
    /// Every tracked process restarted and outlived the stabilization threshold.
    RestartedAndStable,
}

impl Verdict {
    pub fn is_restarted(&self) -> bool {
        matches!(self, Verdict::RestartedAndStable)
    }
}

/// Holds a baseline snapshot and decides whether the fleet has restarted.
///
/// One checker lives for one wait; it is never reset.
pub struct RestartChecker {
    capturer: SnapshotCapturer,
    clock: Arc<dyn Clock>,
    stabilization: Duration,
    initial: Option<Snapshot>,
    phase: CheckerPhase,
    polls: u32,
}

impl RestartChecker {
    /// Create a checker that uses the system clock.
    pub fn new(capturer: SnapshotCapturer, stabilization: Duration) -> Self {
        Self {
            capturer,
            clock: Arc::new(SystemClock),
            stabilization,
            initial: None,
            phase: CheckerPhase::Uninitialized,
            polls: 0,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn phase(&self) -> &CheckerPhase {
        &self.phase
    }

    /// The baseline snapshot, once captured.
    pub fn initial_state(&self) -> Option<&Snapshot> {
        self.initial.as_ref()
    }

    pub fn polls(&self) -> u32 {
        self.polls
    }

    pub fn selector(&self) -> &str {
        self.capturer.selector()
    }

    /// Capture the baseline snapshot.
    ///
    /// Fails with [`RestartError::EmptyFleet`] when nothing matches: a
    /// restart of zero processes cannot be verified.
    pub async fn read_initial_state(&mut self) -> RestartResult<&Snapshot> {
        if self.initial.is_some() {
            return Err(RestartError::AlreadyInitialized);
        }

        self.phase = CheckerPhase::Reading;
        let snapshot = match self.capturer.capture().await {
            Ok(s) => s,
            Err(e) => {
                self.phase = CheckerPhase::Failed {
                    reason: e.to_string(),
                };
                return Err(e.into());
            }
        };

        if snapshot.is_empty() {
            let err = RestartError::EmptyFleet {
                selector: self.capturer.selector().to_string(),
            };
            self.phase = CheckerPhase::Failed {
                reason: err.to_string(),
            };
            return Err(err);
        }

        info!(
            selector = %self.capturer.selector(),
            pods = snapshot.len(),
            running = snapshot.running_count(),
            "captured restart baseline"
        );
        self.phase = CheckerPhase::Ready;
        Ok(self.initial.insert(snapshot))
    }

    /// Re-query the fleet and report whether every tracked process has
    /// restarted and stabilized.
    pub async fn check_restarted(&mut self) -> RestartResult<bool> {
        Ok(self.poll().await?.is_restarted())
    }

    /// Like [`check_restarted`](Self::check_restarted), keeping the detail.
    ///
    /// `Restarted`, `TimedOut` and `Failed` are final: polling a checker in
    /// one of them is [`RestartError::Finished`]. Retry with a new checker.
    pub async fn poll(&mut self) -> RestartResult<Verdict> {
        if self.initial.is_none() || self.phase == CheckerPhase::Reading {
            return Err(RestartError::NotInitialized);
        }
        if self.is_finished() {
            return Err(RestartError::Finished {
                phase: self.phase.clone(),
            });
        }

        let current = match self.capturer.capture().await {
            Ok(s) => s,
            Err(e) => {
                warn!(selector = %self.capturer.selector(), error = %e, "restart poll failed");
                self.phase = CheckerPhase::Failed {
                    reason: e.to_string(),
                };
                return Err(e.into());
            }
        };

        self.polls += 1;
        let verdict = self.evaluate(&current, self.clock.now())?;
        self.phase = if verdict.is_restarted() {
            CheckerPhase::Restarted { polls: self.polls }
        } else {
            CheckerPhase::Polling { polls: self.polls }
        };
        Ok(verdict)
    }

    /// Compare `current` against the baseline as of `now`.
    ///
    /// Pure: does not query the fleet or change the phase.
    pub fn evaluate(&self, current: &Snapshot, now: DateTime<Utc>) -> RestartResult<Verdict> {
        let initial = self.initial.as_ref().ok_or(RestartError::NotInitialized)?;
        let threshold = TimeDelta::from_std(self.stabilization).unwrap_or(TimeDelta::MAX);

        for (identity, baseline) in initial.iter() {
            let pending = |reason: PendingReason| Verdict::NotYetRestarted {
                identity: identity.to_string(),
                reason,
            };

            let Some(now_start) = current.get(identity) else {
                debug!(pod = identity, "tracked pod missing from listing");
                return Ok(pending(PendingReason::Missing));
            };

            if !now_start.is_later_than(&baseline) {
                debug!(pod = identity, "pod not restarted yet");
                return Ok(pending(PendingReason::NotRestarted {
                    baseline,
                    current: now_start,
                }));
            }

            // A later start time is always a running one.
            let uptime = now_start.uptime(now).unwrap_or_else(TimeDelta::zero);
            if uptime <= threshold {
                debug!(pod = identity, uptime_secs = uptime.num_seconds(), "pod restarted, settling");
                return Ok(pending(PendingReason::Settling { uptime }));
            }
        }

        Ok(Verdict::RestartedAndStable)
    }

    /// Whether the checker reached an end state.
    pub fn is_finished(&self) -> bool {
        matches!(
            self.phase,
            CheckerPhase::Restarted { .. } | CheckerPhase::TimedOut { .. } | CheckerPhase::Failed { .. }
        )
    }

    /// Record that the caller stopped waiting without a positive verdict.
    pub fn mark_timed_out(&mut self) {
        self.phase = CheckerPhase::TimedOut { polls: self.polls };
    }
}
