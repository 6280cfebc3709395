//! Offer acceptance — hands recommendations to the cluster manager.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use podgrid_core::OfferId;

use crate::driver::SchedulerDriver;
use crate::recommendation::{OfferRecommendation, offer_ids_of, operations_of};
use crate::recorder::OperationRecorder;

/// Accepts the offers a batch of recommendations refers to.
#[async_trait]
pub trait OfferAccepter: Send + Sync {
    /// Returns the ids of the offers actually consumed. Empty when nothing
    /// was accepted, including when the driver refused the call.
    async fn accept(
        &self,
        driver: &dyn SchedulerDriver,
        recommendations: &[OfferRecommendation],
    ) -> Vec<OfferId>;
}

/// Issues one accept call covering every offer and operation of the batch,
/// then runs the configured recorders over the accepted operations.
#[derive(Clone, Default)]
pub struct DefaultOfferAccepter {
    recorders: Vec<Arc<dyn OperationRecorder>>,
}

impl DefaultOfferAccepter {
    pub fn new(recorders: Vec<Arc<dyn OperationRecorder>>) -> Self {
        Self { recorders }
    }
}

#[async_trait]
impl OfferAccepter for DefaultOfferAccepter {
    async fn accept(
        &self,
        driver: &dyn SchedulerDriver,
        recommendations: &[OfferRecommendation],
    ) -> Vec<OfferId> {
        let offer_ids = offer_ids_of(recommendations);
        let operations = operations_of(recommendations);
        if offer_ids.is_empty() || operations.is_empty() {
            return Vec::new();
        }

        if let Err(e) = driver.accept_offers(&offer_ids, &operations).await {
            warn!(error = %e, offers = offer_ids.len(), "driver refused offer acceptance");
            return Vec::new();
        }

        for rec in recommendations {
            for recorder in &self.recorders {
                if let Err(e) = recorder.record(rec.operation(), rec.offer()) {
                    warn!(error = %e, offer_id = %rec.offer_id(), "failed to record operation");
                }
            }
        }

        info!(
            offers = offer_ids.len(),
            operations = operations.len(),
            "offers accepted"
        );
        offer_ids
    }
}
