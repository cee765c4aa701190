/// Numeric aliases used across the crate.
///
/// All monetary amounts, rates and sensitivities are `f64`. Aggregated totals
/// are reproducible up to a 1e-6 relative tolerance when the parallel
/// contribution pass is enabled; the sequential path is bit-stable.
pub type Real = f64;
pub type Integer = i64;

/// Day-count base for converting day differences into year fractions.
pub const DAYS_PER_YEAR: Real = 365.25;

/// One basis point expressed as a decimal rate.
pub const BASIS_POINT: Real = 0.0001;
