//! PlanScheduler — one sequential offer pass over a list of steps.
//!
//! Steps are visited in order. Each step that accepts offers removes them
//! from the pool before the next step is evaluated, so no offer is ever
//! consumed twice within a pass.

use tracing::{debug, info, warn};

use podgrid_core::{Offer, OfferId};
use podgrid_offer::{OfferAccepter, OfferEvaluator, SchedulerDriver, operations_of};

use crate::step::Step;

pub struct PlanScheduler<E, A> {
    evaluator: E,
    accepter: A,
}

impl<E, A> PlanScheduler<E, A>
where
    E: OfferEvaluator,
    A: OfferAccepter,
{
    pub fn new(evaluator: E, accepter: A) -> Self {
        Self { evaluator, accepter }
    }

    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }

    pub fn accepter(&self) -> &A {
        &self.accepter
    }

    /// Offer `offers` to each pending step in `steps` and return the ids of
    /// every offer accepted along the way.
    ///
    /// A missing driver, offer batch or step list makes this a no-op that
    /// returns nothing. Steps that are not PENDING are left untouched. A step
    /// whose evaluation or acceptance comes back empty stays PREPARED.
    pub async fn resource_offers<'a, I>(
        &self,
        driver: Option<&dyn SchedulerDriver>,
        offers: Option<&[Offer]>,
        steps: Option<I>,
    ) -> Vec<OfferId>
    where
        I: IntoIterator<Item = &'a mut Step>,
    {
        let (Some(driver), Some(offers), Some(steps)) = (driver, offers, steps) else {
            debug!("offer pass skipped: missing driver, offers or steps");
            return Vec::new();
        };

        let mut remaining: Vec<Offer> = offers.to_vec();
        let mut accepted: Vec<OfferId> = Vec::new();

        for step in steps {
            if !step.is_pending() {
                continue;
            }
            let Some(requirement) = step.start() else {
                debug!(step = %step.name(), "nothing to launch");
                continue;
            };

            let recommendations = match self.evaluator.evaluate(&requirement, &remaining).await {
                Ok(recs) => recs,
                Err(e) => {
                    warn!(step = %step.name(), error = %e, "offer evaluation failed");
                    continue;
                }
            };
            if recommendations.is_empty() {
                debug!(step = %step.name(), offers = remaining.len(), "no matching offers");
                continue;
            }

            let consumed = self.accepter.accept(driver, &recommendations).await;
            if consumed.is_empty() {
                debug!(step = %step.name(), "no offers accepted");
                continue;
            }

            step.update_offer_status(operations_of(&recommendations));
            remaining.retain(|offer| !consumed.contains(&offer.id));
            info!(step = %step.name(), offers = consumed.len(), "step launching");
            for id in consumed {
                if !accepted.contains(&id) {
                    accepted.push(id);
                }
            }
        }

        accepted
    }
}
