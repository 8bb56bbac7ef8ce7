//! Restart detection error types.

use thiserror::Error;

use rollwatch_fleet::FleetError;

use crate::checker::CheckerPhase;

/// Errors that can occur while tracking a restart.
#[derive(Debug, Error)]
pub enum RestartError {
    #[error("fleet query failed: {0}")]
    Query(#[from] FleetError),

    #[error("no pods match selector {selector:?}, cannot verify a restart")]
    EmptyFleet { selector: String },

    #[error("restart checker has no baseline yet")]
    NotInitialized,

    #[error("restart checker baseline already captured")]
    AlreadyInitialized,

    #[error("restart checker already finished ({phase:?}), start a new wait")]
    Finished { phase: CheckerPhase },

    /// The caller's mutation failed. The inner error is passed through untouched.
    #[error("mutation failed: {0}")]
    Mutation(#[source] anyhow::Error),
}

pub type RestartResult<T> = Result<T, RestartError>;
