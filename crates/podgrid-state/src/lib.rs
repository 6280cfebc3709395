//! podgrid-state — persistent state for the podgrid scheduler.
//!
//! Backed by [redb](https://docs.rs/redb). Provides:
//!
//! - **`ConfigStore<T>`** — immutable configuration versions keyed by UUID
//!   plus a single durable *target* pointer
//! - **`TaskStore`** — launched task records and their latest status
//! - **`ConfigurationUpdater`** — validates a candidate spec and promotes it
//!   to target when it changed
//!
//! All values are JSON-serialized into redb's `&[u8]` value columns. The
//! stores are `Clone` + `Send` + `Sync` (backed by `Arc<Database>`).

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

pub mod config_store;
pub mod error;
pub mod store;
pub mod tables;
pub mod task_store;
pub mod updater;

pub use config_store::ConfigStore;
pub use error::{StateError, StateResult};
pub use store::StateStore;
pub use task_store::TaskStore;
pub use updater::{
    ConfigValidationError, ConfigValidator, ConfigurationUpdater, PodCountCannotShrink,
    ResourceSetVolumesCannotChange, UpdateOutcome, UpdateResult,
};
