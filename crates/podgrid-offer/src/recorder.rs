//! Operation recorders — side effects run after offers are accepted.

use anyhow::Context;
use tracing::debug;

use podgrid_core::{Offer, Operation};
use podgrid_state::TaskStore;

/// Observes each operation the driver accepted.
pub trait OperationRecorder: Send + Sync {
    fn record(&self, operation: &Operation, offer: &Offer) -> anyhow::Result<()>;
}

/// Persists launched tasks so a restarted scheduler knows what is running.
#[derive(Clone)]
pub struct PersistentOperationRecorder {
    tasks: TaskStore,
}

impl PersistentOperationRecorder {
    pub fn new(tasks: TaskStore) -> Self {
        Self { tasks }
    }
}

impl OperationRecorder for PersistentOperationRecorder {
    fn record(&self, operation: &Operation, offer: &Offer) -> anyhow::Result<()> {
        let Some(task) = operation.launched_task() else {
            return Ok(());
        };
        self.tasks
            .put_task(task)
            .with_context(|| format!("failed to record launch of {}", task.name))?;
        debug!(task = %task.name, offer_id = %offer.id, "launch recorded");
        Ok(())
    }
}
