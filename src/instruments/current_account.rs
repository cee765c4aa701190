use crate::contribution::Contribution;
use crate::definitions::{Real, BASIS_POINT, DAYS_PER_YEAR};
use crate::instrument::InstrumentTrait;
use crate::instruments::inst_info::InstInfo;
use crate::risks::assumptions::AssumptionSet;
use crate::time::add_days;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use time::Date;

const DEFAULT_STABLE_PORTION: Real = 0.3;
const DEFAULT_AVG_LIFE_DAYS: i64 = 180;
/// The unstable residual left after bucketed runoff drains within a month.
const UNSTABLE_RESIDUAL_DAYS: i64 = 30;

/// A transactional current account. Liability without contractual maturity;
/// its stability is entirely behavioral.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CurrentAccount {
    pub info: InstInfo,
    pub is_transactional: bool,
    pub avg_balance_30d: Option<Real>,
    pub volatility_coefficient: Option<Real>,
    /// Stable fraction of the balance, 0..=1.
    pub stable_portion: Option<Real>,
    /// Behavioral life of the stable part, in days.
    pub avg_life_days: Option<i64>,
}

impl Default for CurrentAccount {
    fn default() -> CurrentAccount {
        CurrentAccount {
            info: InstInfo::default(),
            is_transactional: true,
            avg_balance_30d: None,
            volatility_coefficient: None,
            stable_portion: None,
            avg_life_days: None,
        }
    }
}

impl CurrentAccount {
    fn effective_stable_portion(&self, assumptions: &AssumptionSet) -> Real {
        self.stable_portion
            .or(assumptions.stable_portion)
            .unwrap_or(DEFAULT_STABLE_PORTION)
    }

    fn effective_avg_life_days(&self, assumptions: &AssumptionSet) -> i64 {
        self.avg_life_days
            .or(assumptions.avg_life_days)
            .unwrap_or(DEFAULT_AVG_LIFE_DAYS)
    }
}

impl InstrumentTrait for CurrentAccount {
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
        let stable_portion = self.effective_stable_portion(assumptions);
        let avg_life_days = self.effective_avg_life_days(assumptions);

        if let Some(rate) = assumptions.runoff_override {
            let outflow = volume * rate.clamp(0.0, 1.0);
            contribution.repricing_date = Some(add_days(calculation_date, 1));
            contribution.repricing_amount = -outflow;
            contribution.add_cash_flow(calculation_date, add_days(calculation_date, 1), -outflow);
            let remaining = volume - outflow;
            if remaining > 0.0 {
                contribution.add_cash_flow(
                    calculation_date,
                    add_days(calculation_date, avg_life_days),
                    -remaining,
                );
            }
            contribution.add_currency_exposure(self.info.currency, -volume);
            return Ok(contribution);
        }

        let stable = volume * stable_portion;
        let unstable = volume - stable;

        // Interest rate risk: only the stable part is modeled as rate-bearing
        // at the behavioral life.
        contribution.repricing_date = Some(add_days(calculation_date, avg_life_days));
        contribution.repricing_amount = -stable;

        let years = avg_life_days as Real / DAYS_PER_YEAR;
        let duration = years * stable_portion;
        contribution.duration = Some(duration);
        if let Some(rate) = self.info.interest_rate {
            let modified = duration / (1.0 + rate);
            contribution.modified_duration = Some(modified);
            contribution.dv01 = Some(-volume * modified * BASIS_POINT);
        }

        // Liquidity: the unstable part drains by runoff rates (or overnight),
        // the stable part leaves at the behavioral life.
        let runoff_table = assumptions
            .runoff_rates
            .as_ref()
            .and_then(|rates| rates.flat());
        if let Some(table) = runoff_table {
            let mut remaining = unstable;
            for (&bucket, &rate) in table {
                let runoff = remaining * rate;
                let flow_date = add_days(calculation_date, bucket.midpoint_days());
                contribution.add_cash_flow(calculation_date, flow_date, -runoff);
                remaining -= runoff;
            }
            if remaining > 0.0 {
                contribution.add_cash_flow(
                    calculation_date,
                    add_days(calculation_date, UNSTABLE_RESIDUAL_DAYS),
                    -remaining,
                );
            }
        } else {
            contribution.add_cash_flow(calculation_date, add_days(calculation_date, 1), -unstable);
        }
        contribution.add_cash_flow(
            calculation_date,
            add_days(calculation_date, avg_life_days),
            -stable,
        );

        contribution.add_currency_exposure(self.info.currency, -volume);
        Ok(contribution)
    }
}
