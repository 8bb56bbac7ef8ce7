//! rollwatch-restart — detecting that a fleet has restarted and settled.
//!
//! A restart is detected purely by comparing snapshots: every process in
//! the baseline must show a strictly later start time, and must have stayed
//! up longer than the stabilization threshold. The threshold keeps a pod in
//! a crash loop from being read as a successful restart.
//!
//! # Components
//!
//! - **`checker`** — `RestartChecker` state machine (baseline, poll, verdict)
//! - **`orchestrator`** — baseline → mutation → bounded restart wait
//! - **`tracked`** — deploy/teardown pairs that both wait for a restart
//! - **`clock`** — wall clock seam for the stabilization check
//!
//! The wait is a soft timeout: when the deadline passes without a positive
//! verdict the mutation's result is still returned, with
//! [`WaitOutcome::TimedOut`] recording that the restart went unconfirmed.

pub mod checker;
pub mod clock;
pub mod error;
pub mod orchestrator;
pub mod tracked;

pub use checker::{CheckerPhase, PendingReason, RestartChecker, Verdict};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{RestartError, RestartResult};
pub use orchestrator::{Completed, Orchestrator, WaitOutcome};
pub use tracked::TrackedCleanup;
