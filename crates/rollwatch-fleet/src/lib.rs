//! rollwatch-fleet — reading the current state of a process fleet.
//!
//! The fleet is whatever a label selector matches on the cluster. This
//! crate only ever reads it.
//!
//! # Architecture
//!
//! ```text
//! SnapshotCapturer (selector)
//!   └── FleetQuery::list_processes(selector) → Vec<ProcessRecord>
//!         ├── KubectlFleet  (kubectl get pods -o json)
//!         └── MemoryFleet   (in-process, programmable)
//!   └── build_snapshot() → Snapshot
//! ```
//!
//! Only the primary (first) container of each process is consulted. A
//! process without any container status is skipped so that it cannot be
//! mistaken for "unchanged" later.

pub mod capture;
pub mod error;
pub mod kubectl;
pub mod memory;
pub mod query;
pub mod record;

pub use capture::{SnapshotCapturer, build_snapshot};
pub use error::{FleetError, FleetResult};
pub use kubectl::KubectlFleet;
pub use memory::MemoryFleet;
pub use query::{FleetFuture, FleetQuery};
pub use record::{ContainerState, ContainerStatus, ProcessRecord};
