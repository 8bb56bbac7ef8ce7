//! Fleet query errors.

use std::process::ExitStatus;

use thiserror::Error;

/// Result type alias for fleet queries.
pub type FleetResult<T> = Result<T, FleetError>;

/// Errors returned by a [`crate::FleetQuery`]. Callers surface them verbatim.
#[derive(Debug, Error)]
pub enum FleetError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    Command {
        program: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("failed to decode pod list: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("fleet unavailable: {0}")]
    Unavailable(String),
}
