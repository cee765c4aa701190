use crate::contribution::Contribution;
use crate::definitions::{Real, BASIS_POINT, DAYS_PER_YEAR};
use crate::instrument::InstrumentTrait;
use crate::instruments::inst_info::InstInfo;
use crate::risks::assumptions::AssumptionSet;
use crate::time::buckets::LiquidityBucket;
use crate::time::{add_days, year_fraction};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use time::Date;

/// Residual maturity assumed for the stable part of a demand deposit when no
/// average life is configured.
const DEFAULT_STABLE_LIFE_DAYS: i64 = 3 * 365;

/// A customer deposit, term or demand (NMD). Liability.
///
/// `amount` follows the common sign convention (liabilities negative); all
/// contribution formulas work on the absolute volume and re-apply the
/// liability sign, so rows that store deposits as positive magnitudes behave
/// the same.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Deposit {
    pub info: InstInfo,
    pub is_demand_deposit: bool,
    /// Stable fraction of a non-maturing balance, 0..=1.
    pub core_portion: Option<Real>,
    /// Behavioral average life of the stable part, in years.
    pub avg_life_years: Option<Real>,
    pub withdrawal_rates: Option<BTreeMap<LiquidityBucket, Real>>,
    pub early_withdrawal_allowed: bool,
    pub minimum_balance: Option<Real>,
}

impl Deposit {
    /// Demand treatment applies to flagged NMDs and to deposits without a
    /// contractual maturity.
    pub fn is_demand(&self) -> bool {
        self.is_demand_deposit || self.info.maturity_date.is_none()
    }

    fn effective_core_portion(&self, assumptions: &AssumptionSet) -> Option<Real> {
        self.core_portion
            .or(assumptions.core_portion)
            .or(assumptions.stable_portion)
    }

    fn effective_avg_life_days(&self, assumptions: &AssumptionSet) -> Option<i64> {
        self.avg_life_years
            .or(assumptions.avg_life_years)
            .map(|y| (y * DAYS_PER_YEAR) as i64)
            .or(assumptions.avg_life_days)
    }

    fn effective_withdrawal_rates<'a>(
        &'a self,
        assumptions: &'a AssumptionSet,
    ) -> Option<&'a BTreeMap<LiquidityBucket, Real>> {
        self.withdrawal_rates
            .as_ref()
            .or(assumptions.withdrawal_rates.as_ref())
            .or_else(|| assumptions.runoff_rates.as_ref().and_then(|r| r.flat()))
    }
}

impl InstrumentTrait for Deposit {
    fn get_inst_info(&self) -> &InstInfo {
        &self.info
    }

    fn get_inst_info_mut(&mut self) -> &mut InstInfo {
        &mut self.info
    }

    fn compute_contribution(
        &self,
        calculation_date: Date,
        assumptions: &AssumptionSet,
    ) -> Result<Contribution> {
        let mut contribution = Contribution::new(
            self.info.instrument_id.clone(),
            self.info.instrument_type,
            self.info.currency,
        );
        let volume = self.info.volume();

        // A counterparty maturity override forces the whole balance to a
        // fixed horizon, bypassing the behavioral model.
        if let Some(days) = assumptions.maturity_override {
            let horizon = add_days(calculation_date, days);
            contribution.repricing_date = Some(horizon);
            contribution.repricing_amount = -volume;
            contribution.add_cash_flow(calculation_date, horizon, -volume);
            contribution.add_currency_exposure(self.info.currency, -volume);
            return Ok(contribution);
        }

        let avg_life_days = self.effective_avg_life_days(assumptions);

        // Interest rate risk. Liabilities reprice with a negative amount; for
        // NMDs only the core portion is rate-sensitive.
        if self.is_demand() {
            let repricing_days = avg_life_days.unwrap_or(1);
            contribution.repricing_date = Some(add_days(calculation_date, repricing_days));
            let core = self.effective_core_portion(assumptions).unwrap_or(1.0);
            contribution.repricing_amount = -volume * core;
        } else if let Some(maturity) = self.info.maturity_date {
            contribution.repricing_date = Some(maturity);
            contribution.repricing_amount = -volume;

            if let Some(rate) = self.info.interest_rate {
                let years = year_fraction(calculation_date, maturity);
                let duration = years;
                let modified = duration / (1.0 + rate);
                contribution.duration = Some(duration);
                contribution.modified_duration = Some(modified);
                contribution.dv01 = Some(-volume * modified * BASIS_POINT);
            }
        }

        // Liquidity risk: all deposit flows are outflows.
        if let Some(rate) = assumptions.runoff_override {
            // Full (or partial) forced outflow overnight; the remainder sits
            // at the behavioral life.
            let outflow = volume * rate.clamp(0.0, 1.0);
            contribution.add_cash_flow(calculation_date, add_days(calculation_date, 1), -outflow);
            let remaining = volume - outflow;
            if remaining > 0.0 {
                let stable_date =
                    add_days(calculation_date, avg_life_days.unwrap_or(DEFAULT_STABLE_LIFE_DAYS));
                contribution.add_cash_flow(calculation_date, stable_date, -remaining);
            }
        } else if self.is_demand() {
            if let Some(rates) = self.effective_withdrawal_rates(assumptions) {
                let mut remaining = volume;
                for (&bucket, &rate) in rates {
                    let withdrawal = remaining * rate;
                    let flow_date = add_days(calculation_date, bucket.midpoint_days());
                    contribution.add_cash_flow(calculation_date, flow_date, -withdrawal);
                    remaining -= withdrawal;
                }
                if remaining > 0.0 {
                    let stable_date = add_days(
                        calculation_date,
                        avg_life_days.unwrap_or(DEFAULT_STABLE_LIFE_DAYS),
                    );
                    contribution.add_cash_flow(calculation_date, stable_date, -remaining);
                }
            } else {
                contribution.add_cash_flow(
                    calculation_date,
                    add_days(calculation_date, 1),
                    -volume,
                );
            }
        } else if let Some(maturity) = self.info.maturity_date {
            if maturity >= calculation_date {
                contribution.add_cash_flow(calculation_date, maturity, -volume);
            }
        }

        contribution.add_currency_exposure(self.info.currency, -volume);
        Ok(contribution)
    }
}
