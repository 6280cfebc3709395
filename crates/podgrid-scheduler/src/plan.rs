//! Plans and phases — ordered groups of steps.
//!
//! ```text
//! Plan
//!   └── Phase (Serial | Parallel)
//!         └── Step
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use podgrid_core::{PodInstance, ServiceSpec, TaskStatus};

use crate::error::SchedulerResult;
use crate::status::Status;
use crate::step::{Step, StepSnapshot};
use crate::step_factory::StepFactory;

/// How the steps of a phase become candidates for offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// One step at a time, and only after every earlier phase is complete.
    Serial,
    /// Every pending step at once.
    Parallel,
}

#[derive(Debug)]
pub struct Phase {
    name: String,
    steps: Vec<Step>,
    strategy: Strategy,
}

impl Phase {
    pub fn new(name: impl Into<String>, steps: Vec<Step>, strategy: Strategy) -> Self {
        Self {
            name: name.into(),
            steps,
            strategy,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn steps_mut(&mut self) -> &mut [Step] {
        &mut self.steps
    }

    pub fn status(&self) -> Status {
        Status::aggregate(self.steps.iter().map(Step::status))
    }

    pub fn is_complete(&self) -> bool {
        self.status() == Status::Complete
    }

    fn candidates_mut(&mut self, earlier_complete: bool) -> Vec<&mut Step> {
        match self.strategy {
            Strategy::Parallel => self.steps.iter_mut().filter(|s| s.is_pending()).collect(),
            Strategy::Serial if earlier_complete => self
                .steps
                .iter_mut()
                .find(|s| !s.is_complete())
                .filter(|s| s.is_pending())
                .into_iter()
                .collect(),
            Strategy::Serial => Vec::new(),
        }
    }

    pub fn snapshot(&self) -> PhaseSnapshot {
        PhaseSnapshot {
            name: self.name.clone(),
            strategy: self.strategy,
            status: self.status(),
            steps: self.steps.iter().map(Step::snapshot).collect(),
        }
    }
}

#[derive(Debug)]
pub struct Plan {
    name: String,
    phases: Vec<Phase>,
}

impl Plan {
    pub fn new(name: impl Into<String>, phases: Vec<Phase>) -> Self {
        Self {
            name: name.into(),
            phases,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    pub fn phases_mut(&mut self) -> &mut [Phase] {
        &mut self.phases
    }

    pub fn status(&self) -> Status {
        Status::aggregate(self.phases.iter().map(Phase::status))
    }

    pub fn is_complete(&self) -> bool {
        self.status() == Status::Complete
    }

    /// Steps that may be offered resources now, in plan order.
    pub fn candidates_mut(&mut self) -> Vec<&mut Step> {
        let complete: Vec<bool> = self.phases.iter().map(Phase::is_complete).collect();
        let mut candidates = Vec::new();
        for (i, phase) in self.phases.iter_mut().enumerate() {
            let earlier_complete = complete[..i].iter().all(|c| *c);
            candidates.extend(phase.candidates_mut(earlier_complete));
        }
        candidates
    }

    /// Return every PREPARED step to PENDING. Called before each offer batch
    /// so a step the previous batch could not place is offered again.
    pub fn requeue_prepared(&mut self) -> usize {
        self.phases
            .iter_mut()
            .flat_map(|phase| phase.steps.iter_mut())
            .map(Step::requeue)
            .filter(|moved| *moved)
            .count()
    }

    /// Route a task status report to the step that launched the task.
    pub fn update_task_status(&mut self, status: &TaskStatus) -> bool {
        self.phases
            .iter_mut()
            .flat_map(|phase| phase.steps.iter_mut())
            .any(|step| step.update_task_status(status))
    }

    pub fn snapshot(&self) -> PlanSnapshot {
        PlanSnapshot {
            name: self.name.clone(),
            status: self.status(),
            phases: self.phases.iter().map(Phase::snapshot).collect(),
        }
    }
}

/// Read-only view of a plan for status reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanSnapshot {
    pub name: String,
    pub status: Status,
    pub phases: Vec<PhaseSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseSnapshot {
    pub name: String,
    pub strategy: Strategy,
    pub status: Status,
    pub steps: Vec<StepSnapshot>,
}

/// Builds the deploy plan of a service: one serial phase per pod type, one
/// step per pod instance launching all of its tasks.
#[derive(Clone, Default)]
pub struct DeployPlanFactory {
    steps: StepFactory,
}

impl DeployPlanFactory {
    pub fn new(steps: StepFactory) -> Self {
        Self { steps }
    }

    pub fn build(&self, spec: &ServiceSpec) -> SchedulerResult<Plan> {
        spec.validate()?;
        let mut phases = Vec::with_capacity(spec.pods.len());
        for pod in &spec.pods {
            let pod = Arc::new(pod.clone());
            let tasks = pod.task_names();
            let steps = PodInstance::all(&pod)
                .iter()
                .map(|instance| self.steps.get_step(instance, &tasks))
                .collect::<SchedulerResult<Vec<_>>>()?;
            phases.push(Phase::new(pod.pod_type.clone(), steps, Strategy::Serial));
        }
        info!(service = %spec.name, phases = phases.len(), "deploy plan built");
        Ok(Plan::new("deploy", phases))
    }
}
