//! Handle to the cluster manager.

use async_trait::async_trait;

use podgrid_core::{OfferId, Operation};

use crate::error::DriverError;

/// Accept/decline calls issued back to the cluster manager.
#[async_trait]
pub trait SchedulerDriver: Send + Sync {
    /// Consume `offer_ids`, applying `operations` to them.
    async fn accept_offers(
        &self,
        offer_ids: &[OfferId],
        operations: &[Operation],
    ) -> Result<(), DriverError>;

    /// Return unused offers to the cluster manager.
    async fn decline_offers(&self, offer_ids: &[OfferId]) -> Result<(), DriverError>;
}
