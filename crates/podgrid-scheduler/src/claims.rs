//! Resource-set claims — at most one live step per resource set.
//!
//! A resource set is reserved once per pod instance and shared by every
//! task that references it. Two steps launching against the same set at the
//! same time would race to reserve it, so each step claims its sets when it
//! is built and releases them when it completes, fails, or is dropped.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;
use uuid::Uuid;

use crate::error::InvalidStepError;

/// (pod instance name, resource set id)
type ClaimKey = (String, String);

#[derive(Debug, Clone)]
struct Owner {
    step_id: Uuid,
    step_name: String,
}

/// Shared registry of claimed resource sets.
#[derive(Debug, Clone, Default)]
pub struct ResourceSetClaims {
    inner: Arc<Mutex<HashMap<ClaimKey, Owner>>>,
}

impl ResourceSetClaims {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim every set in `resource_set_ids` for one step, or none of them.
    pub fn acquire(
        &self,
        step_id: Uuid,
        step_name: &str,
        pod_instance: &str,
        resource_set_ids: &[String],
        tasks: &[String],
    ) -> Result<ResourceSetClaim, InvalidStepError> {
        let keys: Vec<ClaimKey> = resource_set_ids
            .iter()
            .map(|id| (pod_instance.to_string(), id.clone()))
            .collect();
        self.claim_keys(step_id, step_name, &keys, tasks)?;
        Ok(ResourceSetClaim {
            claims: self.clone(),
            step_id,
            step_name: step_name.to_string(),
            keys,
            held: true,
        })
    }

    /// Whether a set of a pod instance is currently claimed.
    pub fn is_claimed(&self, pod_instance: &str, resource_set_id: &str) -> bool {
        let map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        map.contains_key(&(pod_instance.to_string(), resource_set_id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn claim_keys(
        &self,
        step_id: Uuid,
        step_name: &str,
        keys: &[ClaimKey],
        tasks: &[String],
    ) -> Result<(), InvalidStepError> {
        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        for key in keys {
            if let Some(owner) = map.get(key)
                && owner.step_id != step_id
            {
                return Err(InvalidStepError::ResourceSetClaimed {
                    pod_instance: key.0.clone(),
                    resource_set_id: key.1.clone(),
                    tasks: tasks.to_vec(),
                    claimed_by: owner.step_name.clone(),
                });
            }
        }
        for key in keys {
            map.insert(
                key.clone(),
                Owner {
                    step_id,
                    step_name: step_name.to_string(),
                },
            );
        }
        Ok(())
    }

    fn release_keys(&self, step_id: Uuid, keys: &[ClaimKey]) {
        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        for key in keys {
            if map.get(key).is_some_and(|owner| owner.step_id == step_id) {
                map.remove(key);
            }
        }
    }
}

/// Guard over the sets claimed by one step. Dropping it releases them.
#[derive(Debug)]
pub struct ResourceSetClaim {
    claims: ResourceSetClaims,
    step_id: Uuid,
    step_name: String,
    keys: Vec<ClaimKey>,
    held: bool,
}

impl ResourceSetClaim {
    pub fn is_held(&self) -> bool {
        self.held
    }

    pub fn release(&mut self) {
        if self.held {
            self.claims.release_keys(self.step_id, &self.keys);
            self.held = false;
            debug!(step = %self.step_name, sets = self.keys.len(), "resource sets released");
        }
    }

    /// Take the sets again after a release.
    pub fn reacquire(&mut self, tasks: &[String]) -> Result<(), InvalidStepError> {
        if !self.held {
            self.claims
                .claim_keys(self.step_id, &self.step_name, &self.keys, tasks)?;
            self.held = true;
        }
        Ok(())
    }
}

impl Drop for ResourceSetClaim {
    fn drop(&mut self) {
        self.release();
    }
}
