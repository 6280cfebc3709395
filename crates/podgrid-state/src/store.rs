//! StateStore — the redb database shared by the config and task stores.
//!
//! The store supports both on-disk and in-memory backends (the latter for
//! testing). Typed views over it are obtained with [`StateStore::config_store`]
//! and [`StateStore::task_store`].

use std::path::Path;
use std::sync::{Arc, RwLock};

use podgrid_core::StateConfig;
use redb::Database;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use uuid::Uuid;

use crate::config_store::{ConfigStore, read_target};
use crate::error::{StateError, StateResult};
use crate::tables::*;
use crate::task_store::TaskStore;

/// Thread-safe handle to the podgrid database.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
    target: Arc<RwLock<Option<Uuid>>>,
}

impl StateStore {
    /// Open (or create) a persistent state store at the given path.
    ///
    /// redb holds an exclusive lock on the file, so a second scheduler
    /// pointed at the same path fails here before touching any state.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self::init(db)?;
        debug!(?path, "state store opened");
        Ok(store)
    }

    /// Open the store named by the `[state]` section of `podgrid.toml`.
    pub fn open_config(config: &StateConfig) -> StateResult<Self> {
        if let Some(dir) = config.path.parent()
            && !dir.as_os_str().is_empty()
        {
            std::fs::create_dir_all(dir).map_err(map_err!(Open))?;
        }
        Self::open(&config.path)
    }

    /// Create an ephemeral in-memory state store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self::init(db)?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    fn init(db: Database) -> StateResult<Self> {
        ensure_tables(&db)?;
        let target = read_target(&db)?;
        Ok(Self {
            db: Arc::new(db),
            target: Arc::new(RwLock::new(target)),
        })
    }

    /// Versioned configuration store. Every view shares one cached target
    /// pointer, loaded when the store was opened.
    pub fn config_store<T>(&self) -> ConfigStore<T>
    where
        T: Serialize + DeserializeOwned,
    {
        ConfigStore::new(Arc::clone(&self.db), Arc::clone(&self.target))
    }

    /// Launched-task and task-status records.
    pub fn task_store(&self) -> TaskStore {
        TaskStore::new(Arc::clone(&self.db))
    }
}

/// Create all tables if they don't exist yet.
fn ensure_tables(db: &Database) -> StateResult<()> {
    let txn = db.begin_write().map_err(map_err!(Transaction))?;
    // Opening a table in a write transaction creates it if absent.
    txn.open_table(CONFIGURATIONS).map_err(map_err!(Table))?;
    txn.open_table(PROPERTIES).map_err(map_err!(Table))?;
    txn.open_table(TASKS).map_err(map_err!(Table))?;
    txn.open_table(TASK_STATUSES).map_err(map_err!(Table))?;
    txn.commit().map_err(map_err!(Transaction))?;
    Ok(())
}
