//! Scheduler error types.

use thiserror::Error;

use podgrid_core::SpecError;
use podgrid_state::StateError;

/// A step could not be built for the requested tasks.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvalidStepError {
    #[error(
        "{pod_instance}: tasks {tasks:?} all reference resource set {resource_set_id}; \
         launch them in separate steps"
    )]
    SharedResourceSet {
        pod_instance: String,
        resource_set_id: String,
        tasks: Vec<String>,
    },

    #[error(
        "{pod_instance}: resource set {resource_set_id} needed by {tasks:?} is already claimed by step {claimed_by}"
    )]
    ResourceSetClaimed {
        pod_instance: String,
        resource_set_id: String,
        tasks: Vec<String>,
        claimed_by: String,
    },

    #[error("{pod_instance}: unknown task {task}")]
    UnknownTask { pod_instance: String, task: String },
}

/// Errors that can occur while building or running plans.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("invalid step: {0}")]
    InvalidStep(#[from] InvalidStepError),

    #[error("spec error: {0}")]
    Spec(#[from] SpecError),

    #[error("state store error: {0}")]
    State(#[from] StateError),

    #[error("plan coordinator is not running")]
    ChannelClosed,
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;
