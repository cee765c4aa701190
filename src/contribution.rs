use crate::currency::Currency;
use crate::definitions::Real;
use crate::instruments::InstrumentType;
use crate::time::buckets::LiquidityBucket;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use time::Date;

/// Per-instrument contribution to the portfolio risk metrics.
///
/// Produced fresh by `compute_contribution` and never mutated afterwards.
/// Sign conventions: positive cash flow = inflow, negative = outflow;
/// positive currency exposure = long, negative = short; `repricing_amount`
/// carries the asset/liability sign of the instrument.
///
/// `currency` records the instrument (primary) currency and is the key under
/// which the aggregator books this contribution's cash flows. Multi-currency
/// derivatives still report both legs in `currency_exposure`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Contribution {
    pub instrument_id: String,
    pub instrument_type: InstrumentType,
    pub currency: Currency,

    // Interest rate risk
    pub repricing_amount: Real,
    pub repricing_date: Option<Date>,
    pub duration: Option<Real>,
    pub modified_duration: Option<Real>,
    pub dv01: Option<Real>,

    // Liquidity risk, keyed by bucket in canonical order
    pub cash_flows: BTreeMap<LiquidityBucket, Real>,

    // FX risk
    pub currency_exposure: FxHashMap<Currency, Real>,
}

impl Contribution {
    pub fn new(
        instrument_id: impl Into<String>,
        instrument_type: InstrumentType,
        currency: Currency,
    ) -> Contribution {
        Contribution {
            instrument_id: instrument_id.into(),
            instrument_type,
            currency,
            repricing_amount: 0.0,
            repricing_date: None,
            duration: None,
            modified_duration: None,
            dv01: None,
            cash_flows: BTreeMap::new(),
            currency_exposure: FxHashMap::default(),
        }
    }

    /// Adds a dated cash flow into its liquidity bucket.
    pub fn add_cash_flow(&mut self, base: Date, flow_date: Date, amount: Real) {
        let bucket = LiquidityBucket::assign(base, flow_date);
        *self.cash_flows.entry(bucket).or_insert(0.0) += amount;
    }

    pub fn add_currency_exposure(&mut self, currency: Currency, amount: Real) {
        *self.currency_exposure.entry(currency).or_insert(0.0) += amount;
    }

    /// Exposure in the instrument's own currency, zero when absent.
    pub fn primary_exposure(&self) -> Real {
        self.currency_exposure.get(&self.currency).copied().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn test_cash_flows_accumulate_per_bucket() {
        let base = date!(2025 - 01 - 15);
        let mut contribution =
            Contribution::new("L-1", InstrumentType::Loan, Currency::RUB);
        contribution.add_cash_flow(base, date!(2025 - 02 - 01), 100.0);
        contribution.add_cash_flow(base, date!(2025 - 02 - 10), 50.0);
        assert_eq!(
            contribution.cash_flows.get(&LiquidityBucket::Days15To30),
            Some(&150.0)
        );
    }

    #[test]
    fn test_primary_exposure() {
        let mut contribution =
            Contribution::new("D-1", InstrumentType::Deposit, Currency::USD);
        contribution.add_currency_exposure(Currency::USD, -500.0);
        contribution.add_currency_exposure(Currency::EUR, 200.0);
        assert_eq!(contribution.primary_exposure(), -500.0);
    }
}
