//! ConfigurationUpdater — stages a candidate service spec as the new target.
//!
//! A candidate is checked against the structural rules of the service tree and
//! against a list of [`ConfigValidator`]s that compare it with the current
//! target. Only a valid, changed candidate is stored and promoted; otherwise
//! the existing target stays in place.

use std::fmt;

use tracing::{info, warn};
use uuid::Uuid;

use podgrid_core::ServiceSpec;

use crate::config_store::ConfigStore;
use crate::error::{StateError, StateResult};

/// A single reason a candidate configuration was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigValidationError {
    pub validator: String,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.validator, self.field, self.message)
    }
}

/// A rule comparing the current target (if any) with a candidate.
pub trait ConfigValidator: Send + Sync {
    fn validate(&self, current: Option<&ServiceSpec>, candidate: &ServiceSpec)
    -> Vec<ConfigValidationError>;
}

/// Pods may not be removed and their instance count may not decrease.
pub struct PodCountCannotShrink;

impl ConfigValidator for PodCountCannotShrink {
    fn validate(
        &self,
        current: Option<&ServiceSpec>,
        candidate: &ServiceSpec,
    ) -> Vec<ConfigValidationError> {
        let Some(current) = current else {
            return Vec::new();
        };
        let mut errors = Vec::new();
        for old in &current.pods {
            let message = match candidate.pod(&old.pod_type) {
                None => format!("pod type {} cannot be removed", old.pod_type),
                Some(new) if new.count < old.count => {
                    format!("count cannot shrink from {} to {}", old.count, new.count)
                }
                Some(_) => continue,
            };
            errors.push(ConfigValidationError {
                validator: "PodCountCannotShrink".to_string(),
                field: format!("pods.{}.count", old.pod_type),
                message,
            });
        }
        errors
    }
}

/// Volumes of an existing resource set are fixed once reserved.
pub struct ResourceSetVolumesCannotChange;

impl ConfigValidator for ResourceSetVolumesCannotChange {
    fn validate(
        &self,
        current: Option<&ServiceSpec>,
        candidate: &ServiceSpec,
    ) -> Vec<ConfigValidationError> {
        let Some(current) = current else {
            return Vec::new();
        };
        let mut errors = Vec::new();
        for old_pod in &current.pods {
            let Some(new_pod) = candidate.pod(&old_pod.pod_type) else {
                continue;
            };
            for old_set in &old_pod.resource_sets {
                if let Some(new_set) = new_pod.resource_set(&old_set.id)
                    && new_set.volumes != old_set.volumes
                {
                    errors.push(ConfigValidationError {
                        validator: "ResourceSetVolumesCannotChange".to_string(),
                        field: format!("pods.{}.resource_sets.{}.volumes", old_pod.pod_type, old_set.id),
                        message: "volumes cannot change after deployment".to_string(),
                    });
                }
            }
        }
        errors
    }
}

/// What an update did to the target pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// First configuration; there was no target before.
    Deployed,
    /// A new version replaced the previous target.
    Updated,
    /// The candidate equals the current target.
    Unchanged,
    /// The candidate was invalid; the previous target is kept.
    Rejected,
}

#[derive(Debug, Clone)]
pub struct UpdateResult {
    /// The target after the update.
    pub target_id: Uuid,
    pub outcome: UpdateOutcome,
    pub errors: Vec<ConfigValidationError>,
}

pub struct ConfigurationUpdater {
    store: ConfigStore<ServiceSpec>,
    validators: Vec<Box<dyn ConfigValidator>>,
}

impl ConfigurationUpdater {
    /// Updater with the built-in validators.
    pub fn new(store: ConfigStore<ServiceSpec>) -> Self {
        Self::with_validators(
            store,
            vec![
                Box::new(PodCountCannotShrink),
                Box::new(ResourceSetVolumesCannotChange),
            ],
        )
    }

    pub fn with_validators(
        store: ConfigStore<ServiceSpec>,
        validators: Vec<Box<dyn ConfigValidator>>,
    ) -> Self {
        Self { store, validators }
    }

    /// Validate `candidate` and make it the target if it differs from the
    /// current one.
    ///
    /// Fails with `InvalidConfiguration` only when the candidate is invalid
    /// and there is no previous target to fall back to.
    pub fn update(&self, candidate: &ServiceSpec) -> StateResult<UpdateResult> {
        let current = match self.store.target() {
            Ok(target) => Some(target),
            Err(StateError::NoTargetConfigured) => None,
            Err(e) => return Err(e),
        };
        let current_spec = current.as_ref().map(|(_, spec)| spec);

        let mut errors = Vec::new();
        if let Err(e) = candidate.validate() {
            errors.push(ConfigValidationError {
                validator: "ServiceSpec".to_string(),
                field: candidate.name.clone(),
                message: e.to_string(),
            });
        }
        for validator in &self.validators {
            errors.extend(validator.validate(current_spec, candidate));
        }

        if !errors.is_empty() {
            for error in &errors {
                warn!(%error, "configuration validation failed");
            }
            return match current {
                Some((target_id, _)) => Ok(UpdateResult {
                    target_id,
                    outcome: UpdateOutcome::Rejected,
                    errors,
                }),
                None => Err(StateError::InvalidConfiguration(
                    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "),
                )),
            };
        }

        let fingerprint = candidate.fingerprint();
        if let Some((target_id, spec)) = &current
            && spec.fingerprint() == fingerprint
        {
            info!(version = %target_id, %fingerprint, "configuration unchanged");
            return Ok(UpdateResult {
                target_id: *target_id,
                outcome: UpdateOutcome::Unchanged,
                errors,
            });
        }

        let target_id = self.store.store(candidate)?;
        self.store.set_target_config(target_id)?;
        let outcome = if current.is_some() {
            UpdateOutcome::Updated
        } else {
            UpdateOutcome::Deployed
        };
        info!(version = %target_id, %fingerprint, ?outcome, "configuration promoted to target");
        Ok(UpdateResult {
            target_id,
            outcome,
            errors,
        })
    }
}

#[cfg(test)]
mod tests {
    use podgrid_core::*;

    use super::*;
    use crate::store::StateStore;

    fn volume(size_mb: f64) -> VolumeSpec {
        VolumeSpec {
            volume_type: VolumeType::Root,
            size_mb,
            container_path: "data".to_string(),
        }
    }

    fn test_spec(count: u32, cpus: f64) -> ServiceSpec {
        ServiceSpec {
            name: "hello-world".to_string(),
            principal: "principal".to_string(),
            role: "role".to_string(),
            persistence_endpoint: "memory".to_string(),
            api_port: 0,
            pods: vec![PodSpec {
                pod_type: "hello".to_string(),
                count,
                tasks: vec![TaskSpec {
                    name: "server".to_string(),
                    goal_state: GoalState::Running,
                    command: CommandSpec::default(),
                    resource_set_id: "hello-resources".to_string(),
                }],
                resource_sets: vec![ResourceSet {
                    id: "hello-resources".to_string(),
                    cpus,
                    memory_mb: 256.0,
                    volumes: vec![volume(5000.0)],
                }],
            }],
        }
    }

    fn updater() -> (ConfigurationUpdater, ConfigStore<ServiceSpec>) {
        let store: ConfigStore<ServiceSpec> =
            StateStore::open_in_memory().unwrap().config_store();
        (ConfigurationUpdater::new(store.clone()), store)
    }

    #[test]
    fn first_update_deploys() {
        let (updater, store) = updater();
        let result = updater.update(&test_spec(1, 0.5)).unwrap();
        assert_eq!(result.outcome, UpdateOutcome::Deployed);
        assert_eq!(store.get_target_config().unwrap(), result.target_id);
    }

    #[test]
    fn identical_update_keeps_target() {
        let (updater, store) = updater();
        let first = updater.update(&test_spec(1, 0.5)).unwrap();
        let second = updater.update(&test_spec(1, 0.5)).unwrap();
        assert_eq!(second.outcome, UpdateOutcome::Unchanged);
        assert_eq!(second.target_id, first.target_id);
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn changed_update_moves_target() {
        let (updater, store) = updater();
        let first = updater.update(&test_spec(1, 0.5)).unwrap();
        let second = updater.update(&test_spec(2, 0.6)).unwrap();
        assert_eq!(second.outcome, UpdateOutcome::Updated);
        assert_ne!(second.target_id, first.target_id);
        assert_eq!(store.target().unwrap().1.pods[0].count, 2);
    }

    #[test]
    fn shrinking_is_rejected_and_target_kept() {
        let (updater, store) = updater();
        let first = updater.update(&test_spec(3, 0.5)).unwrap();
        let result = updater.update(&test_spec(2, 0.5)).unwrap();
        assert_eq!(result.outcome, UpdateOutcome::Rejected);
        assert_eq!(result.target_id, first.target_id);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].validator, "PodCountCannotShrink");
        assert_eq!(store.get_target_config().unwrap(), first.target_id);
    }

    #[test]
    fn volume_change_is_rejected() {
        let (updater, _) = updater();
        updater.update(&test_spec(1, 0.5)).unwrap();
        let mut candidate = test_spec(1, 0.5);
        candidate.pods[0].resource_sets[0].volumes = vec![volume(10_000.0)];

        let result = updater.update(&candidate).unwrap();
        assert_eq!(result.outcome, UpdateOutcome::Rejected);
        assert_eq!(result.errors[0].validator, "ResourceSetVolumesCannotChange");
    }

    #[test]
    fn invalid_first_config_is_an_error() {
        let (updater, store) = updater();
        let mut candidate = test_spec(1, 0.5);
        candidate.name.clear();
        assert!(matches!(
            updater.update(&candidate),
            Err(StateError::InvalidConfiguration(_))
        ));
        assert!(store.list().unwrap().is_empty());
    }
}
