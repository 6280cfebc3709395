//! Error types for service specification handling.

use thiserror::Error;

/// Result type alias for spec operations.
pub type SpecResult<T> = Result<T, SpecError>;

/// Errors raised while validating or instantiating a service specification.
#[derive(Debug, Error, PartialEq)]
pub enum SpecError {
    #[error("service name must not be empty")]
    EmptyServiceName,

    #[error("duplicate pod type: {0}")]
    DuplicatePodType(String),

    #[error("pod {pod}: duplicate task name {task}")]
    DuplicateTask { pod: String, task: String },

    #[error("pod {pod}: duplicate resource set id {resource_set_id}")]
    DuplicateResourceSet {
        pod: String,
        resource_set_id: String,
    },

    #[error("pod {pod}: task {task} references unknown resource set {resource_set_id}")]
    UnresolvedResourceSet {
        pod: String,
        task: String,
        resource_set_id: String,
    },

    #[error("pod {pod}: index {index} out of range for count {count}")]
    IndexOutOfRange { pod: String, index: u32, count: u32 },

    #[error("pod {pod}: unknown task {task}")]
    UnknownTask { pod: String, task: String },

    #[error("failed to parse spec: {0}")]
    Parse(String),
}
