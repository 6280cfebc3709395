//! Offer handling error types.

use thiserror::Error;

use podgrid_core::SpecError;

pub type OfferResult<T> = Result<T, OfferError>;

/// Errors raised while turning a requirement into recommendations.
#[derive(Debug, Error)]
pub enum OfferError {
    #[error("invalid requirement: {0}")]
    InvalidRequirement(String),

    #[error("spec error: {0}")]
    Spec(#[from] SpecError),
}

/// Errors reported by the cluster manager driver.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("offers rejected: {0}")]
    Rejected(String),

    #[error("driver disconnected: {0}")]
    Disconnected(String),
}
