//! Offer evaluation — turns a launch requirement into recommendations.
//!
//! Evaluation never mutates or holds on to the offers it is given, and has
//! no side effects on shared state, so a failed pass can simply be retried
//! with the next batch.

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use podgrid_core::{Offer, PodInstanceRequirement, Resources, TaskInfo};

use crate::error::{OfferError, OfferResult};
use crate::recommendation::OfferRecommendation;
use crate::scorer::{ScoringWeights, rank_offers};

/// Matches a requirement against a batch of offers.
#[async_trait]
pub trait OfferEvaluator: Send + Sync {
    /// Produce ordered recommendations for `requirement`, or none if no
    /// offer can satisfy every resource set it references.
    async fn evaluate(
        &self,
        requirement: &PodInstanceRequirement,
        offers: &[Offer],
    ) -> OfferResult<Vec<OfferRecommendation>>;
}

/// Places a whole pod instance on the single best-fitting offer.
///
/// For the chosen offer it recommends, in order: one reserve per resource
/// set, one volume creation per volume, and one launch per requested task.
#[derive(Debug, Clone, Default)]
pub struct DefaultOfferEvaluator {
    target_config: Option<Uuid>,
    weights: ScoringWeights,
}

impl DefaultOfferEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp launched tasks with the configuration version they come from.
    pub fn with_target_config(mut self, id: Uuid) -> Self {
        self.target_config = Some(id);
        self
    }

    pub fn with_weights(mut self, weights: ScoringWeights) -> Self {
        self.weights = weights;
        self
    }

    fn recommend(&self, requirement: &PodInstanceRequirement, offer: &Offer) -> Vec<OfferRecommendation> {
        let pod_instance = requirement.pod_instance();
        let sets = requirement.resource_sets();
        let mut recs = Vec::new();

        for set in &sets {
            recs.push(OfferRecommendation::reserve(offer.clone(), set));
        }
        for set in &sets {
            for volume in &set.volumes {
                recs.push(OfferRecommendation::create_volume(offer.clone(), set, volume));
            }
        }
        for task in requirement.task_specs() {
            let name = pod_instance.task_instance_name(&task.name);
            let info = TaskInfo {
                task_id: format!("{name}__{}", Uuid::new_v4()),
                name,
                pod_instance: pod_instance.name(),
                agent_id: offer.agent_id.clone(),
                command: task.command.clone(),
                goal_state: task.goal_state,
                resource_set_id: task.resource_set_id.clone(),
                config_id: self.target_config,
            };
            recs.push(OfferRecommendation::launch(offer.clone(), info));
        }
        recs
    }
}

#[async_trait]
impl OfferEvaluator for DefaultOfferEvaluator {
    async fn evaluate(
        &self,
        requirement: &PodInstanceRequirement,
        offers: &[Offer],
    ) -> OfferResult<Vec<OfferRecommendation>> {
        let pod_instance = requirement.pod_instance().name();
        if requirement.is_empty() {
            return Err(OfferError::InvalidRequirement(format!(
                "{pod_instance}: no tasks to launch"
            )));
        }

        let needed: Resources = requirement
            .resource_sets()
            .iter()
            .map(|set| Resources::new(set.cpus, set.memory_mb, set.disk_mb()))
            .sum();

        let ranked = rank_offers(offers, &needed, &self.weights);
        let Some(best) = ranked.first() else {
            debug!(
                %pod_instance,
                offers = offers.len(),
                cpus = needed.cpus,
                memory_mb = needed.memory_mb,
                disk_mb = needed.disk_mb,
                "no offer satisfies requirement"
            );
            return Ok(Vec::new());
        };

        let offer = &offers[best.index];
        debug!(
            %pod_instance,
            offer_id = %offer.id,
            score = best.score,
            "offer selected"
        );
        Ok(self.recommend(requirement, offer))
    }
}
