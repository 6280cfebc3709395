//! podgrid-offer — matching launch requirements against resource offers.
//!
//! Offers arrive from the cluster manager in batches. For each pending
//! requirement the scheduler asks an [`OfferEvaluator`] for recommendations,
//! then hands them to an [`OfferAccepter`], which calls back into the
//! cluster manager through a [`SchedulerDriver`].
//!
//! # Components
//!
//! - **`scorer`** — Best-fit offer ranking
//! - **`evaluator`** — Requirement to recommendations
//! - **`accepter`** — Recommendations to an accept call
//! - **`recorder`** — Side effects of accepted operations

pub mod accepter;
pub mod driver;
pub mod error;
pub mod evaluator;
pub mod recommendation;
pub mod recorder;
pub mod scorer;

pub use accepter::{DefaultOfferAccepter, OfferAccepter};
pub use driver::SchedulerDriver;
pub use error::{DriverError, OfferError, OfferResult};
pub use evaluator::{DefaultOfferEvaluator, OfferEvaluator};
pub use recommendation::{OfferRecommendation, offer_ids_of, operations_of};
pub use recorder::{OperationRecorder, PersistentOperationRecorder};
pub use scorer::{OfferScore, ScoreBreakdown, ScoringWeights, rank_offers, score_offer};
