use thiserror::Error;
use time::Date;

/// Typed failure kinds of the risk engine.
///
/// Per-instrument calculation failures never abort a batch: the calculators
/// log them, count them and continue. Configuration and period errors
/// propagate to the caller.
#[derive(Error, Debug)]
pub enum AlmError {
    #[error("data validation failed: {0}")]
    DataValidation(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("calculation failed for instrument {instrument_id}: {reason}")]
    Calculation {
        instrument_id: String,
        reason: String,
    },

    #[error("comparison date {comparison} must be after base date {base}")]
    InvalidPeriod { base: Date, comparison: Date },

    #[error("no instruments provided")]
    EmptyPortfolio,
}
