//! Step — the atomic schedulable unit of a plan.
//!
//! A step launches one set of tasks of one pod instance. Its status is only
//! changed through [`Step::start`], [`Step::update_offer_status`],
//! [`Step::requeue`] and the task status signal [`Step::update_task_status`].
//! [`Step::restart`] and [`Step::force_complete`] are operator overrides and
//! never move a step out of COMPLETE.
//! Everything else is a read-only query.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use podgrid_core::{GoalState, Operation, PodInstanceRequirement, TaskState, TaskStatus};

use crate::claims::ResourceSetClaim;
use crate::error::InvalidStepError;
use crate::status::Status;

/// A task this step launched and the last state reported for it.
#[derive(Debug, Clone, PartialEq)]
struct LaunchedTask {
    task_id: String,
    goal: GoalState,
    state: Option<TaskState>,
}

#[derive(Debug)]
pub struct Step {
    id: Uuid,
    name: String,
    status: Status,
    requirement: Option<PodInstanceRequirement>,
    operations: Vec<Operation>,
    /// Task instance name → launch record.
    launched: BTreeMap<String, LaunchedTask>,
    claim: Option<ResourceSetClaim>,
}

impl Step {
    /// A pending step. `requirement` is `None` when there is nothing to launch.
    pub fn new(name: impl Into<String>, requirement: Option<PodInstanceRequirement>) -> Self {
        Self::with_id(Uuid::new_v4(), name, requirement)
    }

    pub(crate) fn with_id(
        id: Uuid,
        name: impl Into<String>,
        requirement: Option<PodInstanceRequirement>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            status: Status::Pending,
            requirement,
            operations: Vec::new(),
            launched: BTreeMap::new(),
            claim: None,
        }
    }

    pub(crate) fn set_claim(&mut self, claim: ResourceSetClaim) {
        self.claim = Some(claim);
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn is_pending(&self) -> bool {
        self.status == Status::Pending
    }

    pub fn is_prepared(&self) -> bool {
        self.status == Status::Prepared
    }

    pub fn is_starting(&self) -> bool {
        self.status == Status::Starting
    }

    pub fn is_complete(&self) -> bool {
        self.status == Status::Complete
    }

    pub fn is_error(&self) -> bool {
        self.status == Status::Error
    }

    pub fn requirement(&self) -> Option<&PodInstanceRequirement> {
        self.requirement.as_ref()
    }

    /// Operations recorded by the last successful offer acceptance.
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Whether the step still holds its resource-set claim.
    pub fn holds_claim(&self) -> bool {
        self.claim.as_ref().is_some_and(ResourceSetClaim::is_held)
    }

    /// Begin an offer cycle: PENDING moves to PREPARED and the launch
    /// requirement is returned, unless there is nothing to launch.
    ///
    /// On any other status this does nothing and returns `None`.
    pub fn start(&mut self) -> Option<PodInstanceRequirement> {
        if !self.is_pending() {
            debug!(step = %self.name, status = %self.status, "start ignored");
            return None;
        }
        self.transition(Status::Prepared);
        self.requirement.clone().filter(|r| !r.is_empty())
    }

    /// Record the outcome of offer acceptance for this step.
    ///
    /// Non-empty `operations` move the step to STARTING; an empty list leaves
    /// it where it is so it is retried with the next batch.
    pub fn update_offer_status(&mut self, operations: Vec<Operation>) {
        if operations.is_empty() {
            return;
        }
        if self.status.is_terminal() {
            warn!(step = %self.name, status = %self.status, "offer status for finished step ignored");
            return;
        }
        self.launched = operations
            .iter()
            .filter_map(Operation::launched_task)
            .map(|task| {
                (
                    task.name.clone(),
                    LaunchedTask {
                        task_id: task.task_id.clone(),
                        goal: task.goal_state,
                        state: None,
                    },
                )
            })
            .collect();
        self.operations = operations;
        self.transition(Status::Starting);
    }

    /// Return a PREPARED step to PENDING so the next offer batch considers it
    /// again. Returns false, changing nothing, for any other status.
    pub fn requeue(&mut self) -> bool {
        if !self.is_prepared() {
            return false;
        }
        debug!(step = %self.name, "no offer matched; requeued");
        self.transition(Status::Pending);
        true
    }

    /// Apply a task status report. Returns true if the task belongs to the
    /// current launch of this step.
    pub fn update_task_status(&mut self, status: &TaskStatus) -> bool {
        let Some(task) = self.launched.get_mut(&status.task_name) else {
            return false;
        };
        if task.task_id != status.task_id {
            debug!(step = %self.name, task_id = %status.task_id, "status for stale launch ignored");
            return false;
        }
        task.state = Some(status.state);
        let goal = task.goal;
        if !self.is_starting() {
            return true;
        }

        if status.state.satisfies(goal) {
            if self
                .launched
                .values()
                .all(|t| t.state.is_some_and(|s| s.satisfies(t.goal)))
            {
                self.transition(Status::Complete);
            }
        } else if status.state == TaskState::Error {
            warn!(
                step = %self.name,
                task = %status.task_name,
                message = status.message.as_deref().unwrap_or(""),
                "task failed permanently"
            );
            self.transition(Status::Error);
        } else if status.state.is_terminal() {
            info!(
                step = %self.name,
                task = %status.task_name,
                state = ?status.state,
                "task stopped before reaching its goal; relaunching"
            );
            self.operations.clear();
            self.launched.clear();
            self.transition(Status::Pending);
        }
        true
    }

    /// Operator override: send the step back to PENDING, claiming its
    /// resource sets again. Recovers a step from ERROR.
    ///
    /// A COMPLETE step is left alone and `Ok(false)` is returned.
    pub fn restart(&mut self) -> Result<bool, InvalidStepError> {
        if self.is_complete() {
            warn!(step = %self.name, "restart of complete step ignored");
            return Ok(false);
        }
        if let Some(claim) = self.claim.as_mut() {
            let tasks = self
                .requirement
                .as_ref()
                .map(|r| r.tasks_to_launch().to_vec())
                .unwrap_or_default();
            claim.reacquire(&tasks)?;
        }
        self.operations.clear();
        self.launched.clear();
        self.transition(Status::Pending);
        Ok(true)
    }

    /// Operator override: mark the step complete without waiting for task
    /// status. A step in ERROR must be restarted first; returns false then.
    pub fn force_complete(&mut self) -> bool {
        if self.is_error() {
            warn!(step = %self.name, "force complete of failed step ignored");
            return false;
        }
        self.transition(Status::Complete);
        true
    }

    pub fn snapshot(&self) -> StepSnapshot {
        StepSnapshot {
            id: self.id,
            name: self.name.clone(),
            status: self.status,
            tasks: self
                .requirement
                .as_ref()
                .map(|r| r.tasks_to_launch().to_vec())
                .unwrap_or_default(),
            operations: self.operations.iter().map(|op| op.kind().to_string()).collect(),
        }
    }

    fn transition(&mut self, to: Status) {
        if self.status == to {
            return;
        }
        debug!(step = %self.name, from = %self.status, %to, "step status changed");
        self.status = to;
        if to.is_terminal()
            && let Some(claim) = self.claim.as_mut()
        {
            claim.release();
        }
    }
}

/// Read-only view of a step for status reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSnapshot {
    pub id: Uuid,
    pub name: String,
    pub status: Status,
    pub tasks: Vec<String>,
    /// Kinds of the recorded operations, in order.
    pub operations: Vec<String>,
}
