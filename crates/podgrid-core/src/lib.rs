//! podgrid-core — shared types for the podgrid scheduler.
//!
//! - **`types`** — the `ServiceSpec` tree (pods, tasks, resource sets)
//! - **`pod`** — `PodInstance` and `PodInstanceRequirement`
//! - **`cluster`** — offers, operations and task records exchanged with
//!   the cluster manager
//! - **`config`** — `podgrid.toml` and service spec parsing
//! - **`hash`** — content fingerprints for change detection

pub mod cluster;
pub mod config;
pub mod error;
pub mod hash;
pub mod pod;
pub mod types;

pub use cluster::*;
pub use config::{PodgridConfig, SchedulerSettings, StateConfig};
pub use error::{SpecError, SpecResult};
pub use hash::SpecHash;
pub use pod::{PodInstance, PodInstanceRequirement};
pub use types::*;
