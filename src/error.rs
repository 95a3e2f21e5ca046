//! Error types for the savings optimizer

use crate::products::ProductKind;
use thiserror::Error;

/// Result type alias for calculator and optimizer operations
pub type Result<T> = std::result::Result<T, OptimizerError>;

#[derive(Error, Debug)]
pub enum OptimizerError {

    // =============================
    // Rate Sheet Errors
    // =============================

    #[error("{product}: required tier '{tier_type}' is missing from the rate sheet")]
    MissingTier {
        product: ProductKind,
        tier_type: String,
    },

    #[error("Unknown product: {0}")]
    UnknownProduct(String),

    #[error("Invalid interest rate: {0}")]
    InvalidRate(String),

    #[error("Invalid amount in '{field}': {value}")]
    InvalidAmount { field: &'static str, value: String },

    // =============================
    // Caller Errors
    // =============================

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Optimization exceeded deadline of {0}s")]
    Timeout(u64),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl OptimizerError {
    pub(crate) fn missing_tier(product: ProductKind, tier_type: impl Into<String>) -> Self {
        Self::MissingTier {
            product,
            tier_type: tier_type.into(),
        }
    }
}
