//! Plan coordinator — the single owner of a plan's steps.
//!
//! Offer batches, task status reports and snapshot requests all go through
//! one mailbox, so step status is only ever mutated by the coordinator task
//! and a completion signal can never interleave with an offer pass.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use podgrid_core::{Offer, OfferId, SchedulerSettings, TaskStatus};
use podgrid_offer::{OfferAccepter, OfferEvaluator, SchedulerDriver};
use podgrid_state::TaskStore;

use crate::error::{SchedulerError, SchedulerResult};
use crate::plan::{Plan, PlanSnapshot};
use crate::plan_scheduler::PlanScheduler;

/// Messages handled by the coordinator.
#[derive(Debug)]
pub enum PlanMessage {
    /// Run one scheduling pass over a batch of offers.
    ResourceOffers {
        offers: Vec<Offer>,
        reply_to: oneshot::Sender<Vec<OfferId>>,
    },

    /// Apply a task status report; replies whether a step claimed it.
    TaskStatus {
        status: TaskStatus,
        reply_to: oneshot::Sender<bool>,
    },

    Snapshot {
        reply_to: oneshot::Sender<PlanSnapshot>,
    },

    Shutdown,
}

/// Cloneable handle for talking to a running coordinator.
#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::Sender<PlanMessage>,
}

impl CoordinatorHandle {
    /// Returns the ids of the offers accepted in this pass.
    pub async fn resource_offers(&self, offers: Vec<Offer>) -> SchedulerResult<Vec<OfferId>> {
        let (reply_to, rx) = oneshot::channel();
        self.send(PlanMessage::ResourceOffers { offers, reply_to }).await?;
        rx.await.map_err(|_| SchedulerError::ChannelClosed)
    }

    pub async fn task_status(&self, status: TaskStatus) -> SchedulerResult<bool> {
        let (reply_to, rx) = oneshot::channel();
        self.send(PlanMessage::TaskStatus { status, reply_to }).await?;
        rx.await.map_err(|_| SchedulerError::ChannelClosed)
    }

    pub async fn snapshot(&self) -> SchedulerResult<PlanSnapshot> {
        let (reply_to, rx) = oneshot::channel();
        self.send(PlanMessage::Snapshot { reply_to }).await?;
        rx.await.map_err(|_| SchedulerError::ChannelClosed)
    }

    pub async fn shutdown(&self) -> SchedulerResult<()> {
        self.send(PlanMessage::Shutdown).await
    }

    async fn send(&self, msg: PlanMessage) -> SchedulerResult<()> {
        self.tx.send(msg).await.map_err(|_| SchedulerError::ChannelClosed)
    }
}

pub struct PlanCoordinator<E, A> {
    plan: Plan,
    scheduler: PlanScheduler<E, A>,
    driver: Arc<dyn SchedulerDriver>,
    settings: SchedulerSettings,
    tasks: Option<TaskStore>,
}

impl<E, A> PlanCoordinator<E, A>
where
    E: OfferEvaluator + 'static,
    A: OfferAccepter + 'static,
{
    pub fn new(
        plan: Plan,
        scheduler: PlanScheduler<E, A>,
        driver: Arc<dyn SchedulerDriver>,
        settings: SchedulerSettings,
    ) -> Self {
        Self {
            plan,
            scheduler,
            driver,
            settings,
            tasks: None,
        }
    }

    /// Persist every task status report before applying it.
    pub fn with_task_store(mut self, tasks: TaskStore) -> Self {
        self.tasks = Some(tasks);
        self
    }

    /// Start the coordinator task. The join handle yields the plan after
    /// shutdown or once every handle is dropped.
    pub fn spawn(self) -> (CoordinatorHandle, JoinHandle<Plan>) {
        let (tx, rx) = mpsc::channel(self.settings.command_buffer.max(1));
        let task = tokio::spawn(self.run(rx));
        (CoordinatorHandle { tx }, task)
    }

    async fn run(mut self, mut rx: mpsc::Receiver<PlanMessage>) -> Plan {
        info!(plan = %self.plan.name(), "plan coordinator started");
        while let Some(msg) = rx.recv().await {
            match msg {
                PlanMessage::ResourceOffers { offers, reply_to } => {
                    let accepted = self.handle_offers(offers).await;
                    let _ = reply_to.send(accepted);
                }
                PlanMessage::TaskStatus { status, reply_to } => {
                    let _ = reply_to.send(self.handle_task_status(&status));
                }
                PlanMessage::Snapshot { reply_to } => {
                    let _ = reply_to.send(self.plan.snapshot());
                }
                PlanMessage::Shutdown => break,
            }
        }
        info!(plan = %self.plan.name(), status = %self.plan.status(), "plan coordinator stopped");
        self.plan
    }

    async fn handle_offers(&mut self, offers: Vec<Offer>) -> Vec<OfferId> {
        let requeued = self.plan.requeue_prepared();
        let candidates = self.plan.candidates_mut();
        debug!(offers = offers.len(), candidates = candidates.len(), requeued, "offer pass");
        let accepted = self
            .scheduler
            .resource_offers(Some(self.driver.as_ref()), Some(&offers), Some(candidates))
            .await;

        if self.settings.decline_unused_offers {
            let unused: Vec<OfferId> = offers
                .iter()
                .map(|o| o.id.clone())
                .filter(|id| !accepted.contains(id))
                .collect();
            if !unused.is_empty()
                && let Err(e) = self.driver.decline_offers(&unused).await
            {
                warn!(error = %e, offers = unused.len(), "failed to decline unused offers");
            }
        }
        accepted
    }

    fn handle_task_status(&mut self, status: &TaskStatus) -> bool {
        if let Some(tasks) = &self.tasks
            && let Err(e) = tasks.put_status(status)
        {
            warn!(task = %status.task_name, error = %e, "failed to persist task status");
        }
        let matched = self.plan.update_task_status(status);
        if !matched {
            debug!(task = %status.task_name, task_id = %status.task_id, "status matched no step");
        }
        matched
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use podgrid_core::{Operation, Resources};
    use podgrid_offer::{DefaultOfferAccepter, DefaultOfferEvaluator, DriverError};

    use super::*;
    use crate::plan::{Phase, Strategy};
    use crate::status::Status;
    use crate::step::Step;

    #[derive(Default)]
    struct DecliningDriver {
        declined: Mutex<Vec<OfferId>>,
    }

    #[async_trait]
    impl SchedulerDriver for DecliningDriver {
        async fn accept_offers(&self, _: &[OfferId], _: &[Operation]) -> Result<(), DriverError> {
            Ok(())
        }

        async fn decline_offers(&self, offer_ids: &[OfferId]) -> Result<(), DriverError> {
            self.declined.lock().unwrap().extend_from_slice(offer_ids);
            Ok(())
        }
    }

    fn coordinator(
        driver: Arc<DecliningDriver>,
        decline_unused_offers: bool,
    ) -> (CoordinatorHandle, JoinHandle<Plan>) {
        let mut done = Step::new("done", None);
        done.force_complete();
        let plan = Plan::new("p", vec![Phase::new("only", vec![done], Strategy::Serial)]);
        let scheduler = PlanScheduler::new(DefaultOfferEvaluator::new(), DefaultOfferAccepter::default());
        let settings = SchedulerSettings {
            command_buffer: 0,
            decline_unused_offers,
        };
        PlanCoordinator::new(plan, scheduler, driver, settings).spawn()
    }

    fn offer(id: &str) -> Offer {
        Offer {
            id: OfferId::new(id),
            agent_id: "agent-1".to_string(),
            hostname: "host".to_string(),
            resources: Resources::new(1.0, 256.0, 0.0),
        }
    }

    #[tokio::test]
    async fn unused_offers_are_declined() {
        let driver = Arc::new(DecliningDriver::default());
        let (handle, _join) = coordinator(driver.clone(), true);

        let accepted = handle.resource_offers(vec![offer("o1"), offer("o2")]).await.unwrap();

        assert!(accepted.is_empty());
        assert_eq!(
            *driver.declined.lock().unwrap(),
            vec![OfferId::new("o1"), OfferId::new("o2")]
        );
    }

    #[tokio::test]
    async fn declining_can_be_disabled() {
        let driver = Arc::new(DecliningDriver::default());
        let (handle, _join) = coordinator(driver.clone(), false);

        handle.resource_offers(vec![offer("o1")]).await.unwrap();

        assert!(driver.declined.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn shutdown_returns_plan_and_closes_handle() {
        let (handle, join) = coordinator(Arc::new(DecliningDriver::default()), true);
        assert_eq!(handle.snapshot().await.unwrap().status, Status::Complete);
        assert!(!handle.task_status(TaskStatus {
            task_id: "x__1".to_string(),
            task_name: "x".to_string(),
            state: podgrid_core::TaskState::Running,
            message: None,
        })
        .await
        .unwrap());

        handle.shutdown().await.unwrap();
        let plan = join.await.unwrap();
        assert_eq!(plan.name(), "p");
        assert!(matches!(handle.snapshot().await, Err(SchedulerError::ChannelClosed)));
    }
}
