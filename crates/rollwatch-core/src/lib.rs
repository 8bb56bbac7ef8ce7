//! rollwatch-core — shared types and configuration for rollwatch.
//!
//! A [`Snapshot`] maps every fleet member ([`ProcessIdentity`]) to the
//! [`StartTime`] of its primary container. Snapshots are taken before and
//! after a mutation; comparing them is how a restart is detected without
//! any signal from the workload itself.
//!
//! [`RollwatchConfig`] is parsed from `rollwatch.toml` and carries the
//! fleet selector plus the restart timing knobs.

pub mod config;
pub mod duration;
pub mod error;
pub mod types;

pub use config::{FleetConfig, RestartConfig, RollwatchConfig};
pub use error::{ConfigError, ConfigResult};
pub use types::{ProcessIdentity, Snapshot, StartTime};
