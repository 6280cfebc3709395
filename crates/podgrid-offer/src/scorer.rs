//! Offer scoring for requirement matching.
//!
//! An offer is feasible when it can hold the combined resources of every
//! resource set a requirement references. Feasible offers are ranked
//! best-fit: the offer left most fully used after the reservation wins,
//! keeping larger offers free for larger pods.

use podgrid_core::{Offer, Resources};

/// Scored feasible offer.
#[derive(Debug, Clone)]
pub struct OfferScore {
    /// Position of the offer in the evaluated slice.
    pub index: usize,
    /// Composite score (higher = better). Range: 0.0..=100.0.
    pub score: f64,
    pub breakdown: ScoreBreakdown,
}

/// Individual score components for debugging.
#[derive(Debug, Clone)]
pub struct ScoreBreakdown {
    /// Share of the offer's CPUs the reservation would use (0-100).
    pub cpu_packing: f64,
    /// Share of the offer's memory the reservation would use (0-100).
    pub memory_packing: f64,
    /// Share of the offer's disk the reservation would use (0-100).
    pub disk_packing: f64,
}

/// Weights for the scoring components.
#[derive(Debug, Clone)]
pub struct ScoringWeights {
    pub cpu: f64,
    pub memory: f64,
    pub disk: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            cpu: 0.4,
            memory: 0.4,
            disk: 0.2,
        }
    }
}

/// Score a single offer against the resources a requirement needs.
///
/// Returns `None` if the offer cannot hold `needed`.
pub fn score_offer(
    index: usize,
    offer: &Offer,
    needed: &Resources,
    weights: &ScoringWeights,
) -> Option<OfferScore> {
    if !offer.resources.contains(needed) {
        return None;
    }

    let cpu_packing = packing(needed.cpus, offer.resources.cpus);
    let memory_packing = packing(needed.memory_mb, offer.resources.memory_mb);
    let disk_packing = packing(needed.disk_mb, offer.resources.disk_mb);

    let score = weights.cpu * cpu_packing + weights.memory * memory_packing + weights.disk * disk_packing;

    Some(OfferScore {
        index,
        score,
        breakdown: ScoreBreakdown {
            cpu_packing,
            memory_packing,
            disk_packing,
        },
    })
}

/// Score all offers and return the feasible ones, best first.
///
/// Equal scores keep the order of `offers`.
pub fn rank_offers(offers: &[Offer], needed: &Resources, weights: &ScoringWeights) -> Vec<OfferScore> {
    let mut scores: Vec<OfferScore> = offers
        .iter()
        .enumerate()
        .filter_map(|(i, o)| score_offer(i, o, needed, weights))
        .collect();

    // Stable sort, descending by score.
    scores.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    scores
}

fn packing(needed: f64, available: f64) -> f64 {
    if available > 0.0 {
        (needed / available).min(1.0) * 100.0
    } else {
        // Nothing offered and nothing needed.
        100.0
    }
}
