//! In-memory fleet.
//!
//! Listings are programmed per selector and can be changed at any time,
//! e.g. from inside a mutation closure to simulate a rollout. Unknown
//! selectors match nothing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::FleetError;
use crate::query::{FleetFuture, FleetQuery};
use crate::record::ProcessRecord;

#[derive(Debug, Default)]
struct Inner {
    listings: HashMap<String, Vec<ProcessRecord>>,
    failure: Option<String>,
    calls: usize,
}

/// Clonable handle to a shared in-memory fleet.
#[derive(Debug, Clone, Default)]
pub struct MemoryFleet {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryFleet {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the listing returned for `selector`.
    pub fn set(&self, selector: &str, processes: Vec<ProcessRecord>) {
        self.lock().listings.insert(selector.to_string(), processes);
    }

    /// Make every subsequent query fail until [`clear_failure`](Self::clear_failure).
    pub fn fail_with(&self, message: &str) {
        self.lock().failure = Some(message.to_string());
    }

    pub fn clear_failure(&self) {
        self.lock().failure = None;
    }

    /// Number of queries served so far, including failed ones.
    pub fn calls(&self) -> usize {
        self.lock().calls
    }
}

impl FleetQuery for MemoryFleet {
    fn list_processes<'a>(&'a self, selector: &'a str) -> FleetFuture<'a> {
        let result = {
            let mut inner = self.lock();
            inner.calls += 1;
            match &inner.failure {
                Some(message) => Err(FleetError::Unavailable(message.clone())),
                None => Ok(inner.listings.get(selector).cloned().unwrap_or_default()),
            }
        };
        Box::pin(async move { result })
    }
}
