//! ConfigStore — immutable configuration versions plus a target pointer.
//!
//! Every `store` call writes a new snapshot under a fresh UUID. Exactly one
//! of those versions may be the *target*: the configuration the scheduler
//! drives the cluster toward. The pointer lives in the `properties` table,
//! is read once when the `StateStore` is opened, and every view shares that
//! cached copy.
//! `set_target_config` checks the version and writes the pointer inside one
//! redb write transaction, holding the cache lock across the commit, so a
//! concurrent reader sees either the old pointer or the new one.

use std::marker::PhantomData;
use std::sync::{Arc, PoisonError, RwLock};

use redb::{Database, ReadableDatabase, ReadableTable};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{StateError, StateResult};
use crate::tables::*;

/// Versioned store of configuration snapshots of type `T`.
pub struct ConfigStore<T> {
    db: Arc<Database>,
    target: Arc<RwLock<Option<Uuid>>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for ConfigStore<T> {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
            target: Arc::clone(&self.target),
            _marker: PhantomData,
        }
    }
}

impl<T> ConfigStore<T>
where
    T: Serialize + DeserializeOwned,
{
    /// A view over `db` sharing the store-wide target pointer cache.
    pub(crate) fn new(db: Arc<Database>, target: Arc<RwLock<Option<Uuid>>>) -> Self {
        Self {
            db,
            target,
            _marker: PhantomData,
        }
    }

    /// Persist a new immutable snapshot and return its version id.
    pub fn store(&self, config: &T) -> StateResult<Uuid> {
        let id = Uuid::new_v4();
        let key = id.to_string();
        let value = serde_json::to_vec(config).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(CONFIGURATIONS).map_err(map_err!(Table))?;
            table
                .insert(key.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(version = %id, "configuration stored");
        Ok(id)
    }

    /// Load a stored snapshot.
    pub fn fetch(&self, id: Uuid) -> StateResult<T> {
        let key = id.to_string();
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(CONFIGURATIONS).map_err(map_err!(Table))?;
        match table.get(key.as_str()).map_err(map_err!(Read))? {
            Some(guard) => serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize)),
            None => Err(StateError::InvalidVersion(id)),
        }
    }

    /// All stored version ids.
    pub fn list(&self) -> StateResult<Vec<Uuid>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(CONFIGURATIONS).map_err(map_err!(Table))?;
        let mut ids = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (key, _) = entry.map_err(map_err!(Read))?;
            ids.push(Uuid::parse_str(key.value()).map_err(map_err!(Deserialize))?);
        }
        Ok(ids)
    }

    /// Delete a stored version. Returns true if it existed.
    ///
    /// The current target cannot be cleared.
    pub fn clear(&self, id: Uuid) -> StateResult<bool> {
        let target = self.target.read().unwrap_or_else(PoisonError::into_inner);
        if *target == Some(id) {
            return Err(StateError::TargetInUse(id));
        }
        let key = id.to_string();
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let existed;
        {
            let mut table = txn.open_table(CONFIGURATIONS).map_err(map_err!(Table))?;
            existed = table.remove(key.as_str()).map_err(map_err!(Write))?.is_some();
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(version = %id, existed, "configuration cleared");
        Ok(existed)
    }

    /// Point the target at a stored version.
    pub fn set_target_config(&self, id: Uuid) -> StateResult<()> {
        let mut cached = self.target.write().unwrap_or_else(PoisonError::into_inner);
        let key = id.to_string();
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let exists = {
            let table = txn.open_table(CONFIGURATIONS).map_err(map_err!(Table))?;
            table.get(key.as_str()).map_err(map_err!(Read))?.is_some()
        };
        if !exists {
            txn.abort().map_err(map_err!(Transaction))?;
            return Err(StateError::InvalidVersion(id));
        }
        {
            let mut table = txn.open_table(PROPERTIES).map_err(map_err!(Table))?;
            table
                .insert(TARGET_CONFIG_KEY, key.as_bytes())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        *cached = Some(id);
        info!(version = %id, "target configuration updated");
        Ok(())
    }

    /// The current target version id.
    pub fn get_target_config(&self) -> StateResult<Uuid> {
        let cached = self.target.read().unwrap_or_else(PoisonError::into_inner);
        (*cached).ok_or(StateError::NoTargetConfigured)
    }

    /// The current target version id together with its snapshot.
    pub fn target(&self) -> StateResult<(Uuid, T)> {
        let id = self.get_target_config()?;
        Ok((id, self.fetch(id)?))
    }

    pub fn target_spec(&self) -> StateResult<T> {
        self.fetch(self.get_target_config()?)
    }
}

pub(crate) fn read_target(db: &Database) -> StateResult<Option<Uuid>> {
    let txn = db.begin_read().map_err(map_err!(Transaction))?;
    let table = txn.open_table(PROPERTIES).map_err(map_err!(Table))?;
    match table.get(TARGET_CONFIG_KEY).map_err(map_err!(Read))? {
        Some(guard) => {
            let raw = std::str::from_utf8(guard.value()).map_err(map_err!(Deserialize))?;
            Ok(Some(Uuid::parse_str(raw).map_err(map_err!(Deserialize))?))
        }
        None => Ok(None),
    }
}
