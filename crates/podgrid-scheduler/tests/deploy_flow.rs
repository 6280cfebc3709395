//! End-to-end deploy: service spec → target config → plan → offers → tasks.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use podgrid_core::*;
use podgrid_offer::*;
use podgrid_scheduler::*;
use podgrid_state::*;

const HELLO_WORLD: &str = r#"
name = "hello-world"
principal = "hello-world-principal"
role = "hello-world-role"
persistence_endpoint = "memory"
api_port = 0

[[pods]]
type = "hello"
count = 2

[[pods.tasks]]
name = "server"
goal_state = "RUNNING"
resource_set_id = "hello-resources"
command = { value = "echo hello >> hello-container-path/output && sleep 1000" }

[[pods.resource_sets]]
id = "hello-resources"
cpus = 0.1
memory_mb = 256.0
volumes = [{ volume_type = "ROOT", size_mb = 5000.0, container_path = "hello-container-path" }]
"#;

#[derive(Default)]
struct RecordingDriver {
    accepted: Mutex<Vec<(Vec<OfferId>, Vec<Operation>)>>,
    declined: Mutex<Vec<OfferId>>,
}

#[async_trait]
impl SchedulerDriver for RecordingDriver {
    async fn accept_offers(
        &self,
        offer_ids: &[OfferId],
        operations: &[Operation],
    ) -> Result<(), DriverError> {
        self.accepted
            .lock()
            .unwrap()
            .push((offer_ids.to_vec(), operations.to_vec()));
        Ok(())
    }

    async fn decline_offers(&self, offer_ids: &[OfferId]) -> Result<(), DriverError> {
        self.declined.lock().unwrap().extend_from_slice(offer_ids);
        Ok(())
    }
}

fn offer(id: &str, cpus: f64) -> Offer {
    Offer {
        id: OfferId::new(id),
        agent_id: format!("agent-{id}"),
        hostname: format!("{id}.cluster.local"),
        resources: Resources::new(cpus, 1024.0, 10_000.0),
    }
}

fn running(tasks: &TaskStore, name: &str) -> TaskStatus {
    let info = tasks.get_task(name).unwrap().expect("task recorded at launch");
    TaskStatus {
        task_id: info.task_id,
        task_name: info.name,
        state: TaskState::Running,
        message: None,
    }
}

fn spawn_coordinator(
    spec: &ServiceSpec,
    configs: &ConfigStore<ServiceSpec>,
    tasks: &TaskStore,
    driver: Arc<RecordingDriver>,
) -> (CoordinatorHandle, tokio::task::JoinHandle<Plan>) {
    let target = configs.get_target_config().unwrap();
    let plan = DeployPlanFactory::new(StepFactory::with_state(configs.clone(), tasks.clone()))
        .build(spec)
        .unwrap();
    let recorder: Arc<dyn OperationRecorder> =
        Arc::new(PersistentOperationRecorder::new(tasks.clone()));
    let scheduler = PlanScheduler::new(
        DefaultOfferEvaluator::new().with_target_config(target),
        DefaultOfferAccepter::new(vec![recorder]),
    );
    PlanCoordinator::new(plan, scheduler, driver, SchedulerSettings::default())
        .with_task_store(tasks.clone())
        .spawn()
}

#[tokio::test]
async fn hello_world_deploys_one_instance_at_a_time() {
    let spec = ServiceSpec::from_toml_str(HELLO_WORLD).unwrap();
    let store = StateStore::open_in_memory().unwrap();
    let configs = store.config_store::<ServiceSpec>();
    let tasks = store.task_store();

    let update = ConfigurationUpdater::new(configs.clone()).update(&spec).unwrap();
    assert_eq!(update.outcome, UpdateOutcome::Deployed);

    let driver = Arc::new(RecordingDriver::default());
    let (handle, join) = spawn_coordinator(&spec, &configs, &tasks, driver.clone());

    // First pass: only hello-0 is a candidate; the tiny offer is declined.
    let accepted = handle
        .resource_offers(vec![offer("tiny", 0.05), offer("roomy", 2.0)])
        .await
        .unwrap();
    assert_eq!(accepted, vec![OfferId::new("roomy")]);
    assert_eq!(*driver.declined.lock().unwrap(), vec![OfferId::new("tiny")]);

    let snap = handle.snapshot().await.unwrap();
    let steps = &snap.phases[0].steps;
    assert_eq!(steps[0].status, Status::Starting);
    assert_eq!(steps[0].operations, vec!["reserve", "create_volume", "launch"]);
    assert_eq!(steps[1].status, Status::Pending);

    let launched = tasks.get_task("hello-0-server").unwrap().unwrap();
    assert_eq!(launched.agent_id, "agent-roomy");
    assert_eq!(launched.config_id, Some(update.target_id));

    // Offers while hello-0 is still starting go unused.
    assert!(handle.resource_offers(vec![offer("o2", 2.0)]).await.unwrap().is_empty());

    assert!(handle.task_status(running(&tasks, "hello-0-server")).await.unwrap());
    let accepted = handle.resource_offers(vec![offer("o3", 2.0)]).await.unwrap();
    assert_eq!(accepted, vec![OfferId::new("o3")]);

    assert!(handle.task_status(running(&tasks, "hello-1-server")).await.unwrap());
    let snap = handle.snapshot().await.unwrap();
    assert_eq!(snap.status, Status::Complete);

    handle.shutdown().await.unwrap();
    let plan = join.await.unwrap();
    assert!(plan.is_complete());
    assert_eq!(driver.accepted.lock().unwrap().len(), 2);
    assert_eq!(
        tasks.get_status("hello-1-server").unwrap().unwrap().state,
        TaskState::Running
    );
}

#[tokio::test]
async fn unmatched_batch_leaves_step_for_the_next_one() {
    let spec = ServiceSpec::from_toml_str(HELLO_WORLD).unwrap();
    let store = StateStore::open_in_memory().unwrap();
    let configs = store.config_store::<ServiceSpec>();
    let tasks = store.task_store();
    ConfigurationUpdater::new(configs.clone()).update(&spec).unwrap();

    let driver = Arc::new(RecordingDriver::default());
    let (handle, _join) = spawn_coordinator(&spec, &configs, &tasks, driver.clone());

    let accepted = handle.resource_offers(vec![offer("tiny", 0.05)]).await.unwrap();
    assert!(accepted.is_empty());
    let snap = handle.snapshot().await.unwrap();
    assert_eq!(snap.phases[0].steps[0].status, Status::Prepared);

    let accepted = handle.resource_offers(vec![offer("roomy", 2.0)]).await.unwrap();
    assert_eq!(accepted, vec![OfferId::new("roomy")]);
    let snap = handle.snapshot().await.unwrap();
    assert_eq!(snap.phases[0].steps[0].status, Status::Starting);
    assert_eq!(snap.phases[0].steps[1].status, Status::Pending);
    assert_eq!(*driver.declined.lock().unwrap(), vec![OfferId::new("tiny")]);
}

#[tokio::test]
async fn lost_task_is_relaunched() {
    let spec = ServiceSpec::from_toml_str(HELLO_WORLD).unwrap();
    let store = StateStore::open_in_memory().unwrap();
    let configs = store.config_store::<ServiceSpec>();
    let tasks = store.task_store();
    ConfigurationUpdater::new(configs.clone()).update(&spec).unwrap();

    let driver = Arc::new(RecordingDriver::default());
    let (handle, _join) = spawn_coordinator(&spec, &configs, &tasks, driver);

    handle.resource_offers(vec![offer("o1", 2.0)]).await.unwrap();
    let mut lost = running(&tasks, "hello-0-server");
    lost.state = TaskState::Lost;
    assert!(handle.task_status(lost.clone()).await.unwrap());

    let snap = handle.snapshot().await.unwrap();
    assert_eq!(snap.phases[0].steps[0].status, Status::Pending);

    handle.resource_offers(vec![offer("o2", 2.0)]).await.unwrap();
    let relaunched = tasks.get_task("hello-0-server").unwrap().unwrap();
    assert_ne!(relaunched.task_id, lost.task_id);
    assert_eq!(relaunched.agent_id, "agent-o2");
}

#[tokio::test]
async fn restarted_scheduler_skips_running_tasks() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.redb");
    let spec = ServiceSpec::from_toml_str(HELLO_WORLD).unwrap();

    {
        let store = StateStore::open(&path).unwrap();
        let configs = store.config_store::<ServiceSpec>();
        let tasks = store.task_store();
        ConfigurationUpdater::new(configs.clone()).update(&spec).unwrap();

        let driver = Arc::new(RecordingDriver::default());
        let (handle, join) = spawn_coordinator(&spec, &configs, &tasks, driver);
        for (i, offer_id) in ["o1", "o2"].into_iter().enumerate() {
            handle.resource_offers(vec![offer(offer_id, 2.0)]).await.unwrap();
            let name = format!("hello-{i}-server");
            handle.task_status(running(&tasks, &name)).await.unwrap();
        }
        handle.shutdown().await.unwrap();
        assert!(join.await.unwrap().is_complete());
    }

    let store = StateStore::open(&path).unwrap();
    let configs = store.config_store::<ServiceSpec>();
    let tasks = store.task_store();
    let plan = DeployPlanFactory::new(StepFactory::with_state(configs, tasks))
        .build(&spec)
        .unwrap();
    assert!(plan.is_complete());
}

#[test]
fn shared_resource_set_fails_plan_construction() {
    let mut spec = ServiceSpec::from_toml_str(HELLO_WORLD).unwrap();
    let mut sidecar = spec.pods[0].tasks[0].clone();
    sidecar.name = "sidecar".to_string();
    spec.pods[0].tasks.push(sidecar);

    let err = DeployPlanFactory::default().build(&spec).unwrap_err();
    assert!(matches!(
        err,
        SchedulerError::InvalidStep(InvalidStepError::SharedResourceSet { ref resource_set_id, .. })
            if resource_set_id == "hello-resources"
    ));
}
