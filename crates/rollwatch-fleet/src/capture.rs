//! Snapshot capture.

use std::sync::Arc;

use tracing::{debug, warn};

use rollwatch_core::Snapshot;

use crate::error::FleetResult;
use crate::query::FleetQuery;
use crate::record::ProcessRecord;

/// Takes snapshots of the fleet matched by one selector.
#[derive(Clone)]
pub struct SnapshotCapturer {
    fleet: Arc<dyn FleetQuery>,
    selector: String,
}

impl SnapshotCapturer {
    pub fn new(fleet: Arc<dyn FleetQuery>, selector: impl Into<String>) -> Self {
        Self {
            fleet,
            selector: selector.into(),
        }
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }

    /// Query the fleet once and build a snapshot from the result.
    pub async fn capture(&self) -> FleetResult<Snapshot> {
        let processes = self.fleet.list_processes(&self.selector).await?;
        debug!(selector = %self.selector, pods = processes.len(), "found fleet pods");
        Ok(build_snapshot(&processes))
    }
}

/// Build a snapshot from one query result.
///
/// Processes without container status are skipped; the rest map to the
/// start time of their primary container.
pub fn build_snapshot(processes: &[ProcessRecord]) -> Snapshot {
    let mut snapshot = Snapshot::new();
    for process in processes {
        let Some(start) = process.primary_start() else {
            debug!(pod = %process.identity, "no container status yet, skipping");
            continue;
        };
        if snapshot.insert(process.identity.clone(), start).is_some() {
            warn!(pod = %process.identity, "duplicate pod identity in one listing");
        }
    }
    snapshot
}
