//! Snapshot model.
//!
//! A snapshot is captured from a single fleet query and never mutated by
//! the restart checker afterwards. Processes that report no container
//! status at all are left out entirely; processes whose primary container
//! is down are recorded as [`StartTime::NotRunning`].

use std::collections::BTreeMap;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Stable name of one fleet member (a pod name, or `namespace/name`).
pub type ProcessIdentity = String;

/// Last-start time of a process's primary container.
///
/// `NotRunning` orders before every `Running` value, so a process that
/// was down at baseline and is up now counts as having started later.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum StartTime {
    /// Status is reported but the primary container is not running.
    NotRunning,
    /// Primary container running since the given instant.
    Running(DateTime<Utc>),
}

impl StartTime {
    /// The start instant, if the container is running.
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        match self {
            StartTime::NotRunning => None,
            StartTime::Running(at) => Some(*at),
        }
    }

    /// Whether `self` is strictly later than `baseline`.
    pub fn is_later_than(&self, baseline: &StartTime) -> bool {
        self > baseline
    }

    /// Time the container has been up as of `now`.
    ///
    /// `None` when not running. A start time in the future (clock skew
    /// between the control plane and this host) yields a zero uptime.
    pub fn uptime(&self, now: DateTime<Utc>) -> Option<TimeDelta> {
        self.started_at()
            .map(|at| (now - at).max(TimeDelta::zero()))
    }
}

/// Point-in-time mapping of fleet identity to start time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    entries: BTreeMap<ProcessIdentity, StartTime>,
}

impl Snapshot {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a process. Returns the previous value for a duplicate identity.
    pub fn insert(
        &mut self,
        identity: impl Into<ProcessIdentity>,
        start: StartTime,
    ) -> Option<StartTime> {
        self.entries.insert(identity.into(), start)
    }

    /// Start time recorded for `identity`.
    pub fn get(&self, identity: &str) -> Option<StartTime> {
        self.entries.get(identity).copied()
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.entries.contains_key(identity)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in identity order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, StartTime)> {
        self.entries.iter().map(|(id, start)| (id.as_str(), *start))
    }

    /// Number of entries whose primary container is running.
    pub fn running_count(&self) -> usize {
        self.entries
            .values()
            .filter(|s| matches!(s, StartTime::Running(_)))
            .count()
    }
}

impl<I: Into<ProcessIdentity>> FromIterator<(I, StartTime)> for Snapshot {
    fn from_iter<T: IntoIterator<Item = (I, StartTime)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().map(|(id, s)| (id.into(), s)).collect(),
        }
    }
}
