use thiserror::Error;

/// Validation failures raised before any simulation arithmetic runs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("{field} must be {requirement}, got {value}")]
    InvalidInput {
        field: &'static str,
        requirement: &'static str,
        value: f64,
    },
    #[error("down payment {down_payment:.2} exceeds purchase price {purchase_price:.2}")]
    DownPaymentExceedsPrice {
        down_payment: f64,
        purchase_price: f64,
    },
    #[error("expected {expected} variances (one per macro assumption), got {actual}")]
    VarianceCount { expected: usize, actual: usize },
    #[error("variance for {field} must be finite and >= 0, got {value}")]
    InvalidVariance { field: &'static str, value: f64 },
    #[error("simulation {run} sampled an invalid {field}: {value}")]
    InvalidSample {
        run: usize,
        field: &'static str,
        value: f64,
    },
}
