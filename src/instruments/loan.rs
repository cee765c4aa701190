use crate::contribution::Contribution;
use crate::definitions::{Real, BASIS_POINT};
use crate::instrument::InstrumentTrait;
use crate::instruments::inst_info::InstInfo;
use crate::risks::assumptions::AssumptionSet;
use crate::time::year_fraction;
use anyhow::Result;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use time::Date;

/// A customer loan. Asset; may carry a repayment schedule and a floating
/// rate leg.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Loan {
    pub info: InstInfo,
    /// Next rate-reset date; maturity is used when absent.
    pub repricing_date: Option<Date>,
    pub repayment_schedule: Option<BTreeMap<Date, Real>>,
    pub prepayment_rate: Option<Real>,
    pub is_fix: bool,
    pub float_indicator: Option<String>,
    pub float_margin: Option<Real>,
}

impl Default for Loan {
    fn default() -> Loan {
        Loan {
            info: InstInfo::default(),
            repricing_date: None,
            repayment_schedule: None,
            prepayment_rate: None,
            is_fix: true,
            float_indicator: None,
            float_margin: None,
        }
    }
}

impl InstrumentTrait for Loan {
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

        // Interest rate risk: repricing at the next reset, else at maturity.
        if let Some(repricing) = self.repricing_date.or(self.info.maturity_date) {
            contribution.repricing_date = Some(repricing);
            contribution.repricing_amount = volume;
        }

        if let (Some(maturity), Some(rate)) = (self.info.maturity_date, self.info.interest_rate) {
            let years = year_fraction(calculation_date, maturity);
            let duration = years;
            let modified = duration / (1.0 + rate);
            contribution.duration = Some(duration);
            contribution.modified_duration = Some(modified);
            contribution.dv01 = Some(volume * modified * BASIS_POINT);
        }

        // Liquidity risk: the schedule when present, a bullet otherwise.
        if let Some(schedule) = &self.repayment_schedule {
            for (&flow_date, &amount) in schedule.range(calculation_date..) {
                contribution.add_cash_flow(calculation_date, flow_date, amount);
            }
        } else if let Some(maturity) = self.info.maturity_date {
            if maturity >= calculation_date {
                contribution.add_cash_flow(calculation_date, maturity, volume);
            }
        }

        // A prepayment assumption is resolved and carried, but the reduction
        // model is deliberately not applied to the schedule yet.
        if let Some(rate) = self.prepayment_rate.or(assumptions.prepayment_rate) {
            debug!(
                "prepayment rate {} noted for loan {}, cash flows unchanged",
                rate, self.info.instrument_id
            );
        }

        contribution.add_currency_exposure(self.info.currency, volume);
        Ok(contribution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::currency::Currency;
    use crate::instruments::InstrumentType;
    use crate::time::buckets::LiquidityBucket;
    use assert_approx_eq::assert_approx_eq;
    use time::macros::date;

    fn loan(amount: f64, maturity: Option<Date>, rate: Option<f64>) -> Loan {
        Loan {
            info: InstInfo {
                instrument_id: "L-1".to_string(),
                instrument_type: InstrumentType::Loan,
                balance_account: "45502".to_string(),
                amount,
                currency: Currency::RUB,
                start_date: date!(2024 - 01 - 15),
                as_of_date: date!(2025 - 01 - 15),
                maturity_date: maturity,
                interest_rate: rate,
                ..InstInfo::default()
            },
            ..Loan::default()
        }
    }

    #[test]
    fn test_bullet_loan_contribution() {
        let cdate = date!(2025 - 01 - 15);
        let loan = loan(1000.0, Some(date!(2026 - 01 - 15)), Some(0.10));
        let contribution = loan
            .compute_contribution(cdate, &AssumptionSet::default())
            .unwrap();

        assert_eq!(contribution.repricing_date, Some(date!(2026 - 01 - 15)));
        assert_approx_eq!(contribution.repricing_amount, 1000.0);
        assert_eq!(
            contribution.cash_flows.get(&LiquidityBucket::Days180To365),
            Some(&1000.0)
        );
        assert_eq!(contribution.currency_exposure[&Currency::RUB], 1000.0);

        let years = 365.0 / 365.25;
        assert_approx_eq!(contribution.duration.unwrap(), years);
        assert_approx_eq!(contribution.modified_duration.unwrap(), years / 1.10);
        assert_approx_eq!(
            contribution.dv01.unwrap(),
            1000.0 * years / 1.10 * 0.0001
        );
    }

    #[test]
    fn test_schedule_overrides_bullet_and_skips_past_flows() {
        let cdate = date!(2025 - 01 - 15);
        let mut l = loan(1000.0, Some(date!(2026 - 01 - 15)), None);
        l.repayment_schedule = Some(BTreeMap::from([
            (date!(2024 - 12 - 15), 100.0),
            (date!(2025 - 02 - 15), 400.0),
            (date!(2026 - 01 - 15), 500.0),
        ]));
        let contribution = l
            .compute_contribution(cdate, &AssumptionSet::default())
            .unwrap();

        let total: f64 = contribution.cash_flows.values().sum();
        assert_approx_eq!(total, 900.0);
        assert_eq!(
            contribution.cash_flows.get(&LiquidityBucket::Days30To90),
            Some(&400.0)
        );
        assert!(contribution.duration.is_none());
    }

    #[test]
    fn test_explicit_repricing_date_wins() {
        let cdate = date!(2025 - 01 - 15);
        let mut l = loan(1000.0, Some(date!(2026 - 01 - 15)), Some(0.10));
        l.repricing_date = Some(date!(2025 - 04 - 15));
        l.is_fix = false;
        let contribution = l
            .compute_contribution(cdate, &AssumptionSet::default())
            .unwrap();
        assert_eq!(contribution.repricing_date, Some(date!(2025 - 04 - 15)));
    }
}
