//! StepFactory — validated construction of steps.

use std::collections::BTreeMap;

use tracing::{debug, info};
use uuid::Uuid;

use podgrid_core::{PodInstance, PodInstanceRequirement, ServiceSpec, TaskSpec};
use podgrid_state::{ConfigStore, StateError, TaskStore};

use crate::claims::ResourceSetClaims;
use crate::error::{InvalidStepError, SchedulerResult};
use crate::step::Step;

/// Builds steps for pod instances.
///
/// Every step claims the resource sets its tasks reference. A set shared by
/// two of the requested tasks, or already claimed by another live step for
/// the same pod instance, is rejected with [`InvalidStepError`].
#[derive(Clone, Default)]
pub struct StepFactory {
    claims: ResourceSetClaims,
    state: Option<(ConfigStore<ServiceSpec>, TaskStore)>,
}

impl StepFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start steps as complete when the task store shows their tasks already
    /// running the target configuration.
    pub fn with_state(configs: ConfigStore<ServiceSpec>, tasks: TaskStore) -> Self {
        Self {
            claims: ResourceSetClaims::new(),
            state: Some((configs, tasks)),
        }
    }

    pub fn claims(&self) -> &ResourceSetClaims {
        &self.claims
    }

    pub fn get_step(&self, pod_instance: &PodInstance, tasks: &[String]) -> SchedulerResult<Step> {
        let instance_name = pod_instance.name();
        let pod = pod_instance.pod();

        let mut by_set: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        for name in tasks {
            let task = pod.task(name).ok_or_else(|| InvalidStepError::UnknownTask {
                pod_instance: instance_name.clone(),
                task: name.clone(),
            })?;
            let users = by_set.entry(task.resource_set_id.as_str()).or_default();
            if !users.contains(name) {
                users.push(name.clone());
            }
        }
        if let Some((set, users)) = by_set.iter().find(|(_, users)| users.len() > 1) {
            return Err(InvalidStepError::SharedResourceSet {
                pod_instance: instance_name,
                resource_set_id: set.to_string(),
                tasks: users.clone(),
            }
            .into());
        }

        let requirement = PodInstanceRequirement::new(pod_instance.clone(), tasks.iter().cloned())?;
        let id = Uuid::new_v4();
        let name = format!("{instance_name}:[{}]", requirement.tasks_to_launch().join(", "));
        let set_ids: Vec<String> = requirement.resource_sets().iter().map(|s| s.id.clone()).collect();

        let claim = self.claims.acquire(
            id,
            &name,
            &instance_name,
            &set_ids,
            requirement.tasks_to_launch(),
        )?;

        let already_running = self.already_running(&requirement)?;
        let mut step = Step::with_id(id, name, Some(requirement));
        step.set_claim(claim);
        if already_running {
            info!(step = %step.name(), "tasks already at goal on target configuration");
            step.force_complete();
        } else {
            debug!(step = %step.name(), sets = set_ids.len(), "step created");
        }
        Ok(step)
    }

    fn already_running(&self, requirement: &PodInstanceRequirement) -> SchedulerResult<bool> {
        let Some((configs, tasks)) = &self.state else {
            return Ok(false);
        };
        let target = match configs.get_target_config() {
            Ok(id) => id,
            Err(StateError::NoTargetConfigured) => return Ok(false),
            Err(e) => return Err(e.into()),
        };
        if requirement.is_empty() {
            return Ok(false);
        }
        let pod_instance = requirement.pod_instance();
        for spec in requirement.task_specs() {
            if !task_at_goal(tasks, pod_instance, spec, target)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

fn task_at_goal(
    tasks: &TaskStore,
    pod_instance: &PodInstance,
    spec: &TaskSpec,
    target: Uuid,
) -> SchedulerResult<bool> {
    let name = pod_instance.task_instance_name(&spec.name);
    let Some(info) = tasks.get_task(&name)? else {
        return Ok(false);
    };
    if info.config_id != Some(target) {
        return Ok(false);
    }
    let Some(status) = tasks.get_status(&name)? else {
        return Ok(false);
    };
    Ok(status.task_id == info.task_id && status.state.satisfies(spec.goal_state))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use podgrid_core::*;
    use podgrid_state::StateStore;

    use super::*;
    use crate::error::SchedulerError;

    fn set(id: &str) -> ResourceSet {
        ResourceSet {
            id: id.to_string(),
            cpus: 0.1,
            memory_mb: 32.0,
            volumes: Vec::new(),
        }
    }

    fn task(name: &str, resource_set_id: &str) -> TaskSpec {
        TaskSpec {
            name: name.to_string(),
            goal_state: GoalState::Running,
            command: CommandSpec::default(),
            resource_set_id: resource_set_id.to_string(),
        }
    }

    /// `server` and `sidecar` share one set; `agent` has its own.
    fn instance() -> PodInstance {
        let pod = Arc::new(PodSpec {
            pod_type: "hello".to_string(),
            count: 2,
            tasks: vec![
                task("server", "shared"),
                task("sidecar", "shared"),
                task("agent", "agent-resources"),
            ],
            resource_sets: vec![set("shared"), set("agent-resources")],
        });
        PodInstance::new(pod, 0).unwrap()
    }

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn builds_pending_step() {
        let factory = StepFactory::new();
        let step = factory.get_step(&instance(), &names(&["server", "agent"])).unwrap();
        assert!(step.is_pending());
        assert_eq!(step.name(), "hello-0:[server, agent]");
        assert!(factory.claims().is_claimed("hello-0", "shared"));
        assert!(factory.claims().is_claimed("hello-0", "agent-resources"));
    }

    #[test]
    fn tasks_sharing_a_set_cannot_launch_together() {
        let factory = StepFactory::new();
        let err = factory
            .get_step(&instance(), &names(&["server", "sidecar"]))
            .unwrap_err();
        match err {
            SchedulerError::InvalidStep(InvalidStepError::SharedResourceSet {
                pod_instance,
                resource_set_id,
                tasks,
            }) => {
                assert_eq!(pod_instance, "hello-0");
                assert_eq!(resource_set_id, "shared");
                assert_eq!(tasks, names(&["server", "sidecar"]));
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(factory.claims().is_empty());
    }

    #[test]
    fn set_claimed_by_live_sibling_is_rejected() {
        let factory = StepFactory::new();
        let first = factory.get_step(&instance(), &names(&["server"])).unwrap();

        let err = factory.get_step(&instance(), &names(&["sidecar"])).unwrap_err();
        assert!(matches!(
            err,
            SchedulerError::InvalidStep(InvalidStepError::ResourceSetClaimed { ref claimed_by, .. })
                if claimed_by == "hello-0:[server]"
        ));

        drop(first);
        assert!(factory.get_step(&instance(), &names(&["sidecar"])).is_ok());
    }

    #[test]
    fn unknown_task_is_rejected() {
        let factory = StepFactory::new();
        let err = factory.get_step(&instance(), &names(&["nope"])).unwrap_err();
        assert!(matches!(
            err,
            SchedulerError::InvalidStep(InvalidStepError::UnknownTask { .. })
        ));
    }

    #[test]
    fn tasks_at_goal_on_target_start_complete() {
        let store = StateStore::open_in_memory().unwrap();
        let configs = store.config_store::<ServiceSpec>();
        let tasks = store.task_store();
        let spec = ServiceSpec {
            name: "hello-world".to_string(),
            principal: "p".to_string(),
            role: "r".to_string(),
            persistence_endpoint: "memory".to_string(),
            api_port: 0,
            pods: vec![instance().pod().clone()],
        };
        let target = configs.store(&spec).unwrap();
        configs.set_target_config(target).unwrap();

        let info = TaskInfo {
            task_id: "hello-0-agent__1".to_string(),
            name: "hello-0-agent".to_string(),
            pod_instance: "hello-0".to_string(),
            agent_id: "agent-1".to_string(),
            command: CommandSpec::default(),
            goal_state: GoalState::Running,
            resource_set_id: "agent-resources".to_string(),
            config_id: Some(target),
        };
        tasks.put_task(&info).unwrap();
        tasks
            .put_status(&TaskStatus {
                task_id: info.task_id.clone(),
                task_name: info.name.clone(),
                state: TaskState::Running,
                message: None,
            })
            .unwrap();

        let factory = StepFactory::with_state(configs, tasks);
        let agent = factory.get_step(&instance(), &names(&["agent"])).unwrap();
        assert!(agent.is_complete());
        assert!(!agent.holds_claim());

        let server = factory.get_step(&instance(), &names(&["server"])).unwrap();
        assert!(server.is_pending());
    }
}
