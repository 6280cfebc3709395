//! Data exchanged with the cluster resource manager.
//!
//! Only the shape of offers, operations and task records is modeled here;
//! the wire format belongs to the cluster manager.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{CommandSpec, GoalState, VolumeSpec};

/// Identifier of a resource offer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OfferId(pub String);

impl OfferId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OfferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Scalar resource quantities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Resources {
    pub cpus: f64,
    pub memory_mb: f64,
    pub disk_mb: f64,
}

impl Resources {
    pub fn new(cpus: f64, memory_mb: f64, disk_mb: f64) -> Self {
        Self {
            cpus,
            memory_mb,
            disk_mb,
        }
    }

    /// True if every quantity in `other` fits within `self`.
    pub fn contains(&self, other: &Resources) -> bool {
        self.cpus >= other.cpus && self.memory_mb >= other.memory_mb && self.disk_mb >= other.disk_mb
    }

    pub fn saturating_sub(&self, other: &Resources) -> Resources {
        Resources {
            cpus: (self.cpus - other.cpus).max(0.0),
            memory_mb: (self.memory_mb - other.memory_mb).max(0.0),
            disk_mb: (self.disk_mb - other.disk_mb).max(0.0),
        }
    }
}

impl std::ops::Add for Resources {
    type Output = Resources;

    fn add(self, rhs: Resources) -> Resources {
        Resources {
            cpus: self.cpus + rhs.cpus,
            memory_mb: self.memory_mb + rhs.memory_mb,
            disk_mb: self.disk_mb + rhs.disk_mb,
        }
    }
}

impl std::iter::Sum for Resources {
    fn sum<I: Iterator<Item = Resources>>(iter: I) -> Resources {
        iter.fold(Resources::default(), |acc, r| acc + r)
    }
}

/// A time-boxed grant of resources on one cluster host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub id: OfferId,
    pub agent_id: String,
    pub hostname: String,
    pub resources: Resources,
}

/// A directive sent back to the cluster manager when accepting an offer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    /// Reserve a resource set's scalar resources for the service role.
    Reserve {
        resource_set_id: String,
        resources: Resources,
    },
    /// Create a persistent volume inside a reserved resource set.
    CreateVolume {
        resource_set_id: String,
        volume: VolumeSpec,
    },
    /// Launch a task.
    Launch { task: TaskInfo },
}

impl Operation {
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::Reserve { .. } => "reserve",
            Operation::CreateVolume { .. } => "create_volume",
            Operation::Launch { .. } => "launch",
        }
    }

    /// The launched task, for `Launch` operations.
    pub fn launched_task(&self) -> Option<&TaskInfo> {
        match self {
            Operation::Launch { task } => Some(task),
            _ => None,
        }
    }
}

/// Everything the cluster manager needs to run one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskInfo {
    /// Unique per launch attempt.
    pub task_id: String,
    /// Task instance name: `{pod-instance}-{task}`.
    pub name: String,
    pub pod_instance: String,
    pub agent_id: String,
    pub command: CommandSpec,
    pub goal_state: GoalState,
    pub resource_set_id: String,
    /// Target configuration the task was launched from.
    pub config_id: Option<Uuid>,
}

/// Task lifecycle states reported by the cluster manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Staging,
    Starting,
    Running,
    Finished,
    Failed,
    Killed,
    Lost,
    /// The task description was invalid; relaunching will not help.
    Error,
}

impl TaskState {
    /// Whether the task has stopped running for good.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Finished
                | TaskState::Failed
                | TaskState::Killed
                | TaskState::Lost
                | TaskState::Error
        )
    }

    /// Whether a task in this state has reached `goal`.
    pub fn satisfies(&self, goal: GoalState) -> bool {
        match goal {
            GoalState::Running => *self == TaskState::Running,
            GoalState::Finished => *self == TaskState::Finished,
        }
    }
}

/// A status update for one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    pub task_id: String,
    /// Task instance name.
    pub task_name: String,
    pub state: TaskState,
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resources_contains() {
        let offer = Resources::new(2.0, 1024.0, 10_000.0);
        assert!(offer.contains(&Resources::new(2.0, 1024.0, 10_000.0)));
        assert!(offer.contains(&Resources::new(0.5, 256.0, 0.0)));
        assert!(!offer.contains(&Resources::new(2.5, 256.0, 0.0)));
        assert!(!offer.contains(&Resources::new(0.5, 256.0, 10_001.0)));
    }

    #[test]
    fn resources_sum_and_sub() {
        let total: Resources = [Resources::new(1.0, 256.0, 0.0), Resources::new(0.5, 128.0, 100.0)]
            .into_iter()
            .sum();
        assert_eq!(total, Resources::new(1.5, 384.0, 100.0));

        let left = Resources::new(1.0, 100.0, 0.0).saturating_sub(&total);
        assert_eq!(left, Resources::new(0.0, 0.0, 0.0));
    }

    #[test]
    fn task_state_goals() {
        assert!(TaskState::Running.satisfies(GoalState::Running));
        assert!(!TaskState::Running.satisfies(GoalState::Finished));
        assert!(TaskState::Finished.satisfies(GoalState::Finished));
        assert!(TaskState::Lost.is_terminal());
        assert!(!TaskState::Staging.is_terminal());
    }

    #[test]
    fn operation_serializes_with_tag() {
        let op = Operation::Reserve {
            resource_set_id: "rs".to_string(),
            resources: Resources::new(1.0, 2.0, 3.0),
        };
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["type"], "reserve");
        assert_eq!(op.kind(), "reserve");
        assert!(op.launched_task().is_none());
    }
}
