//! Deploy/teardown pairs where both halves wait for a fleet restart.
//!
//! Deploying a patch restarts the fleet once; removing it restarts the
//! fleet again. [`Orchestrator::deploy`] tracks the first restart and hands
//! back a [`TrackedCleanup`] whose [`teardown`](TrackedCleanup::teardown)
//! tracks the second one with a fresh baseline.

use std::future::Future;

use tracing::warn;

use crate::error::RestartResult;
use crate::orchestrator::{Orchestrator, WaitOutcome};

/// A deployed change plus the cleanup that reverts it.
#[must_use = "call teardown() to revert the deployment"]
pub struct TrackedCleanup<C> {
    orchestrator: Orchestrator,
    cleanup: C,
    deploy_outcome: WaitOutcome,
}

impl Orchestrator {
    /// Run `apply` under restart tracking and keep its cleanup for later.
    ///
    /// Fails like [`Orchestrator::run`]: on baseline or apply errors.
    pub async fn deploy<F, Fut, C, CFut>(&self, apply: F) -> RestartResult<TrackedCleanup<C>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<C>>,
        C: FnOnce() -> CFut,
        CFut: Future<Output = ()>,
    {
        let completed = self.run(apply).await?;
        Ok(TrackedCleanup {
            orchestrator: self.clone(),
            cleanup: completed.result,
            deploy_outcome: completed.outcome,
        })
    }
}

impl<C, CFut> TrackedCleanup<C>
where
    C: FnOnce() -> CFut,
    CFut: Future<Output = ()>,
{
    /// How the restart wait after deploying ended.
    pub fn deploy_outcome(&self) -> &WaitOutcome {
        &self.deploy_outcome
    }

    /// Run the cleanup and wait for the fleet to restart again.
    ///
    /// Never fails. If no baseline can be captured the cleanup still runs,
    /// untracked, so the deployed resources are not leaked; the error is
    /// logged and reported as [`WaitOutcome::Aborted`].
    pub async fn teardown(self) -> WaitOutcome {
        let TrackedCleanup {
            orchestrator,
            cleanup,
            ..
        } = self;

        if !orchestrator.config().wait {
            cleanup().await;
            return WaitOutcome::Skipped;
        }

        let mut checker = orchestrator.checker();
        if let Err(e) = checker.read_initial_state().await {
            warn!(error = %e, "failed to capture teardown baseline, cleaning up untracked");
            cleanup().await;
            return WaitOutcome::Aborted(e);
        }

        cleanup().await;
        orchestrator.wait_for_restart(&mut checker).await
    }
}
