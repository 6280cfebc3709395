//! Service specification tree.
//!
//! A `ServiceSpec` describes the desired state of a whole service: an
//! ordered list of pod types, each with its tasks and the resource sets
//! those tasks reserve. The tree is plain value data; it is shared across
//! components behind `Arc` and never mutated after construction.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{SpecError, SpecResult};
use crate::hash::SpecHash;

// ── Service ───────────────────────────────────────────────────────

/// Desired state of a whole service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceSpec {
    pub name: String,
    pub principal: String,
    pub role: String,
    /// Connection endpoint of the persistence backend.
    pub persistence_endpoint: String,
    pub api_port: u16,
    #[serde(default)]
    pub pods: Vec<PodSpec>,
}

impl ServiceSpec {
    /// Look up a pod spec by type name.
    pub fn pod(&self, pod_type: &str) -> Option<&PodSpec> {
        self.pods.iter().find(|p| p.pod_type == pod_type)
    }

    /// Check structural invariants of the whole tree.
    pub fn validate(&self) -> SpecResult<()> {
        if self.name.trim().is_empty() {
            return Err(SpecError::EmptyServiceName);
        }

        let mut pod_types = HashSet::new();
        for pod in &self.pods {
            if !pod_types.insert(pod.pod_type.as_str()) {
                return Err(SpecError::DuplicatePodType(pod.pod_type.clone()));
            }
            pod.validate()?;
        }
        Ok(())
    }

    /// Content hash used to detect configuration changes.
    pub fn fingerprint(&self) -> SpecHash {
        SpecHash::of(self)
    }
}

// ── Pod ───────────────────────────────────────────────────────────

/// Template for one pod type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PodSpec {
    #[serde(rename = "type")]
    pub pod_type: String,
    pub count: u32,
    #[serde(default)]
    pub tasks: Vec<TaskSpec>,
    #[serde(default)]
    pub resource_sets: Vec<ResourceSet>,
}

impl PodSpec {
    pub fn task(&self, name: &str) -> Option<&TaskSpec> {
        self.tasks.iter().find(|t| t.name == name)
    }

    pub fn resource_set(&self, id: &str) -> Option<&ResourceSet> {
        self.resource_sets.iter().find(|r| r.id == id)
    }

    /// Names of all tasks, in declaration order.
    pub fn task_names(&self) -> Vec<String> {
        self.tasks.iter().map(|t| t.name.clone()).collect()
    }

    fn validate(&self) -> SpecResult<()> {
        let mut set_ids = HashSet::new();
        for set in &self.resource_sets {
            if !set_ids.insert(set.id.as_str()) {
                return Err(SpecError::DuplicateResourceSet {
                    pod: self.pod_type.clone(),
                    resource_set_id: set.id.clone(),
                });
            }
        }

        let mut task_names = HashSet::new();
        for task in &self.tasks {
            if !task_names.insert(task.name.as_str()) {
                return Err(SpecError::DuplicateTask {
                    pod: self.pod_type.clone(),
                    task: task.name.clone(),
                });
            }
            if !set_ids.contains(task.resource_set_id.as_str()) {
                return Err(SpecError::UnresolvedResourceSet {
                    pod: self.pod_type.clone(),
                    task: task.name.clone(),
                    resource_set_id: task.resource_set_id.clone(),
                });
            }
        }
        Ok(())
    }
}

// ── Task ──────────────────────────────────────────────────────────

/// One task within a pod.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskSpec {
    pub name: String,
    pub goal_state: GoalState,
    pub command: CommandSpec,
    pub resource_set_id: String,
}

/// The state a task is expected to settle in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GoalState {
    /// Long-running: done once the task is up.
    Running,
    /// Run-to-completion: done once the task exits successfully.
    Finished,
}

/// Command line and environment for a task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CommandSpec {
    pub value: String,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

// ── Resources ─────────────────────────────────────────────────────

/// A bundle of resources reserved once and shared by every task that
/// references it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceSet {
    pub id: String,
    pub cpus: f64,
    pub memory_mb: f64,
    #[serde(default)]
    pub volumes: Vec<VolumeSpec>,
}

impl ResourceSet {
    /// Total disk needed by all volumes in this set.
    pub fn disk_mb(&self) -> f64 {
        self.volumes.iter().map(|v| v.size_mb).sum()
    }
}

/// A persistent volume inside a resource set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VolumeSpec {
    pub volume_type: VolumeType,
    pub size_mb: f64,
    pub container_path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VolumeType {
    Root,
    Mount,
}
