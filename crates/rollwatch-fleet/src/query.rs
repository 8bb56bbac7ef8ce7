//! The read-only fleet query seam.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::FleetResult;
use crate::record::ProcessRecord;

/// Boxed future alias for fleet listings.
pub type FleetFuture<'a> =
    Pin<Box<dyn Future<Output = FleetResult<Vec<ProcessRecord>>> + Send + 'a>>;

/// Lists the processes matched by a label selector.
///
/// Implementations must not retry internally; errors go straight back to
/// the caller.
pub trait FleetQuery: Send + Sync {
    fn list_processes<'a>(&'a self, selector: &'a str) -> FleetFuture<'a>;
}

impl<T: FleetQuery + ?Sized> FleetQuery for Arc<T> {
    fn list_processes<'a>(&'a self, selector: &'a str) -> FleetFuture<'a> {
        (**self).list_processes(selector)
    }
}
