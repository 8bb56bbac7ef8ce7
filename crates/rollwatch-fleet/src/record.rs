//! Process records as returned by a fleet query.

use chrono::{DateTime, Utc};

use rollwatch_core::{ProcessIdentity, StartTime};

/// One fleet member and its per-container status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRecord {
    pub identity: ProcessIdentity,
    /// Container statuses in pod-spec order. Empty until the kubelet reports.
    pub containers: Vec<ContainerStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerStatus {
    pub name: String,
    pub state: ContainerState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerState {
    /// `started_at` is absent when the runtime has not reported it yet.
    Running { started_at: Option<DateTime<Utc>> },
    Waiting { reason: Option<String> },
    Terminated {
        exit_code: i32,
        reason: Option<String>,
    },
}

impl ProcessRecord {
    pub fn new(identity: impl Into<ProcessIdentity>, containers: Vec<ContainerStatus>) -> Self {
        Self {
            identity: identity.into(),
            containers,
        }
    }

    /// A process whose primary container is running since `started_at`.
    pub fn running(identity: impl Into<ProcessIdentity>, started_at: DateTime<Utc>) -> Self {
        Self::new(
            identity,
            vec![ContainerStatus {
                name: "main".to_string(),
                state: ContainerState::Running {
                    started_at: Some(started_at),
                },
            }],
        )
    }

    /// A process whose primary container is waiting (e.g. CrashLoopBackOff).
    pub fn waiting(identity: impl Into<ProcessIdentity>, reason: &str) -> Self {
        Self::new(
            identity,
            vec![ContainerStatus {
                name: "main".to_string(),
                state: ContainerState::Waiting {
                    reason: Some(reason.to_string()),
                },
            }],
        )
    }

    /// A process that has not reported any container status yet.
    pub fn unreported(identity: impl Into<ProcessIdentity>) -> Self {
        Self::new(identity, Vec::new())
    }

    /// Start time of the primary container.
    ///
    /// `None` when no container status is reported at all, which means
    /// the process must be left out of a snapshot.
    pub fn primary_start(&self) -> Option<StartTime> {
        let primary = self.containers.first()?;
        Some(match primary.state {
            ContainerState::Running {
                started_at: Some(at),
            } => StartTime::Running(at),
            _ => StartTime::NotRunning,
        })
    }
}
