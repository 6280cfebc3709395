//! Offer recommendations — a proposed operation tied to the offer it consumes.

use podgrid_core::{Offer, OfferId, Operation, ResourceSet, Resources, TaskInfo, VolumeSpec};

/// A proposed cluster operation against one offer.
///
/// The operation kind (reserve, create volume, launch) lives in
/// [`Operation`]; the scheduler only looks at the offer linkage.
#[derive(Debug, Clone, PartialEq)]
pub struct OfferRecommendation {
    offer: Offer,
    operation: Operation,
}

impl OfferRecommendation {
    pub fn new(offer: Offer, operation: Operation) -> Self {
        Self { offer, operation }
    }

    /// Reserve the scalar resources of `set`.
    pub fn reserve(offer: Offer, set: &ResourceSet) -> Self {
        let resources = Resources::new(set.cpus, set.memory_mb, set.disk_mb());
        Self::new(
            offer,
            Operation::Reserve {
                resource_set_id: set.id.clone(),
                resources,
            },
        )
    }

    /// Create one persistent volume of `set`.
    pub fn create_volume(offer: Offer, set: &ResourceSet, volume: &VolumeSpec) -> Self {
        Self::new(
            offer,
            Operation::CreateVolume {
                resource_set_id: set.id.clone(),
                volume: volume.clone(),
            },
        )
    }

    pub fn launch(offer: Offer, task: TaskInfo) -> Self {
        Self::new(offer, Operation::Launch { task })
    }

    pub fn offer(&self) -> &Offer {
        &self.offer
    }

    pub fn offer_id(&self) -> &OfferId {
        &self.offer.id
    }

    pub fn operation(&self) -> &Operation {
        &self.operation
    }
}

/// Operations of a batch of recommendations, in order.
pub fn operations_of(recommendations: &[OfferRecommendation]) -> Vec<Operation> {
    recommendations.iter().map(|r| r.operation().clone()).collect()
}

/// Distinct offer ids referenced by a batch, in first-use order.
pub fn offer_ids_of(recommendations: &[OfferRecommendation]) -> Vec<OfferId> {
    let mut ids: Vec<OfferId> = Vec::new();
    for rec in recommendations {
        if !ids.contains(rec.offer_id()) {
            ids.push(rec.offer_id().clone());
        }
    }
    ids
}
