//! Concrete pod instances and scheduling requests.

use std::sync::Arc;

use crate::error::{SpecError, SpecResult};
use crate::types::{PodSpec, ResourceSet, TaskSpec};

/// One instantiation of a `PodSpec`, identified by its index.
#[derive(Debug, Clone, PartialEq)]
pub struct PodInstance {
    pod: Arc<PodSpec>,
    index: u32,
}

impl PodInstance {
    /// Create the instance at `index`. Fails if `index >= pod.count`.
    pub fn new(pod: Arc<PodSpec>, index: u32) -> SpecResult<Self> {
        if index >= pod.count {
            return Err(SpecError::IndexOutOfRange {
                pod: pod.pod_type.clone(),
                index,
                count: pod.count,
            });
        }
        Ok(Self { pod, index })
    }

    /// Expand a pod spec into all of its instances, in index order.
    pub fn all(pod: &Arc<PodSpec>) -> Vec<PodInstance> {
        (0..pod.count)
            .map(|index| Self {
                pod: Arc::clone(pod),
                index,
            })
            .collect()
    }

    pub fn pod(&self) -> &PodSpec {
        &self.pod
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    /// `{type}-{index}`
    pub fn name(&self) -> String {
        format!("{}-{}", self.pod.pod_type, self.index)
    }

    /// `{type}-{index}-{task}`
    pub fn task_instance_name(&self, task: &str) -> String {
        format!("{}-{}", self.name(), task)
    }
}

/// A request to launch an ordered set of tasks from one pod instance.
#[derive(Debug, Clone, PartialEq)]
pub struct PodInstanceRequirement {
    pod_instance: PodInstance,
    tasks_to_launch: Vec<String>,
}

impl PodInstanceRequirement {
    /// Build a requirement. Every task name must exist on the pod spec;
    /// repeated names are collapsed, keeping first occurrence order.
    pub fn new<I, S>(pod_instance: PodInstance, tasks: I) -> SpecResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut tasks_to_launch: Vec<String> = Vec::new();
        for name in tasks {
            let name = name.into();
            if pod_instance.pod().task(&name).is_none() {
                return Err(SpecError::UnknownTask {
                    pod: pod_instance.pod().pod_type.clone(),
                    task: name,
                });
            }
            if !tasks_to_launch.contains(&name) {
                tasks_to_launch.push(name);
            }
        }
        Ok(Self {
            pod_instance,
            tasks_to_launch,
        })
    }

    pub fn pod_instance(&self) -> &PodInstance {
        &self.pod_instance
    }

    pub fn tasks_to_launch(&self) -> &[String] {
        &self.tasks_to_launch
    }

    pub fn is_empty(&self) -> bool {
        self.tasks_to_launch.is_empty()
    }

    /// Specs of the requested tasks, in request order.
    pub fn task_specs(&self) -> impl Iterator<Item = &TaskSpec> {
        let pod = self.pod_instance.pod();
        self.tasks_to_launch.iter().filter_map(move |name| pod.task(name))
    }

    /// Distinct resource sets referenced by the requested tasks, in first-use order.
    pub fn resource_sets(&self) -> Vec<&ResourceSet> {
        let pod = self.pod_instance.pod();
        let mut sets: Vec<&ResourceSet> = Vec::new();
        for task in self.task_specs() {
            if let Some(set) = pod.resource_set(&task.resource_set_id)
                && !sets.iter().any(|s| s.id == set.id)
            {
                sets.push(set);
            }
        }
        sets
    }
}
