//! podgrid-scheduler — deploy plans and offer scheduling.
//!
//! Turns a `ServiceSpec` into a [`Plan`] of [`Step`]s and drives those steps
//! through resource offers from the cluster manager:
//!
//! - [`StepFactory`] validates each step and claims its resource sets
//! - [`PlanScheduler`] runs one sequential pass of offers over pending steps
//! - [`PlanCoordinator`] owns the plan and serializes offer passes with
//!   task status updates
//!
//! # Architecture
//!
//! ```text
//! PlanCoordinator (tokio task, mpsc mailbox)
//!   ├── Plan → Phase → Step
//!   ├── PlanScheduler
//!   │     ├── OfferEvaluator (requirement → recommendations)
//!   │     └── OfferAccepter  (recommendations → driver accept call)
//!   └── SchedulerDriver (decline unused offers)
//! ```

pub mod claims;
pub mod coordinator;
pub mod error;
pub mod plan;
pub mod plan_scheduler;
pub mod status;
pub mod step;
pub mod step_factory;

pub use claims::{ResourceSetClaim, ResourceSetClaims};
pub use coordinator::{CoordinatorHandle, PlanCoordinator, PlanMessage};
pub use error::{InvalidStepError, SchedulerError, SchedulerResult};
pub use plan::{DeployPlanFactory, Phase, PhaseSnapshot, Plan, PlanSnapshot, Strategy};
pub use plan_scheduler::PlanScheduler;
pub use status::Status;
pub use step::{Step, StepSnapshot};
pub use step_factory::StepFactory;
