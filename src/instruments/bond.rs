use crate::contribution::Contribution;
use crate::definitions::{Real, BASIS_POINT};
use crate::instrument::InstrumentTrait;
use crate::instruments::inst_info::InstInfo;
use crate::risks::assumptions::AssumptionSet;
use crate::time::{add_days, year_fraction};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use time::Date;

/// A bond held on the balance sheet. Asset with coupon cash flows and a
/// redemption at maturity.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Bond {
    pub info: InstInfo,
    pub isin: Option<String>,
    /// Face value of one paper.
    pub nominal_value: Option<Real>,
    pub quantity: Option<Real>,
    pub coupon_rate: Option<Real>,
    /// Coupon period length in days.
    pub coupon_frequency: Option<i64>,
    /// Redemption date when it differs from the contractual maturity.
    pub date_close: Option<Date>,
}

impl Bond {
    /// Effective redemption date.
    pub fn redemption_date(&self) -> Option<Date> {
        self.date_close.or(self.info.maturity_date)
    }
}

/// Macaulay duration of a coupon bond under the par-yield approximation
/// (yield per period taken equal to the coupon per period), converted from
/// periods to years. Zero-coupon papers fall back to years-to-maturity.
fn macaulay_duration(years_to_maturity: Real, coupon_rate: Real, coupon_frequency: i64) -> Real {
    if coupon_frequency <= 0 || coupon_rate <= 0.0 {
        return years_to_maturity;
    }
    let payments_per_year = 365.0 / coupon_frequency as Real;
    let n = (years_to_maturity * payments_per_year).round().max(1.0);
    let y = coupon_rate / payments_per_year;
    let c = y;
    let growth = (1.0 + y).powf(n);
    let duration_periods =
        (1.0 + y) / y - (1.0 + y + n * (c - y)) / (c * (growth - 1.0) + y);
    duration_periods / payments_per_year
}

impl InstrumentTrait for Bond {
    fn get_inst_info(&self) -> &InstInfo {
        &self.info
    }

    fn get_inst_info_mut(&mut self) -> &mut InstInfo {
        &mut self.info
    }

    fn compute_contribution(
        &self,
        calculation_date: Date,
        _assumptions: &AssumptionSet,
    ) -> Result<Contribution> {
        let mut contribution = Contribution::new(
            self.info.instrument_id.clone(),
            self.info.instrument_type,
            self.info.currency,
        );
        let volume = self.info.volume();
        contribution.add_currency_exposure(self.info.currency, volume);

        // Matured papers keep their balance exposure but contribute neither
        // cash flows nor a repricing entry.
        let Some(maturity) = self.redemption_date() else {
            return Ok(contribution);
        };
        if maturity < calculation_date {
            return Ok(contribution);
        }

        contribution.repricing_date = Some(maturity);
        contribution.repricing_amount = volume;

        if let Some(coupon_rate) = self.coupon_rate {
            let years = year_fraction(calculation_date, maturity);
            let duration =
                macaulay_duration(years, coupon_rate, self.coupon_frequency.unwrap_or(0));
            let modified = duration / (1.0 + coupon_rate);
            contribution.duration = Some(duration);
            contribution.modified_duration = Some(modified);
            contribution.dv01 = Some(volume * modified * BASIS_POINT);
        }

        // Coupon strip.
        if let (Some(frequency), Some(coupon_rate), Some(nominal), Some(quantity)) = (
            self.coupon_frequency,
            self.coupon_rate,
            self.nominal_value,
            self.quantity,
        ) {
            if frequency > 0 {
                let coupon = nominal * coupon_rate * quantity * frequency as Real / 365.0;
                let mut flow_date = add_days(calculation_date, frequency);
                while flow_date <= maturity {
                    contribution.add_cash_flow(calculation_date, flow_date, coupon);
                    flow_date = add_days(flow_date, frequency);
                }
            }
        }

        // Redemption: face value when known, balance value otherwise.
        let redemption = match (self.nominal_value, self.quantity) {
            (Some(nominal), Some(quantity)) => nominal * quantity,
            _ => volume,
        };
        contribution.add_cash_flow(calculation_date, maturity, redemption);

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

    fn bond(maturity: Date) -> Bond {
        Bond {
            info: InstInfo {
                instrument_id: "B-1".to_string(),
                instrument_type: InstrumentType::Bond,
                balance_account: "50205".to_string(),
                amount: 1000.0,
                currency: Currency::RUB,
                start_date: date!(2024 - 01 - 15),
                as_of_date: date!(2025 - 01 - 15),
                maturity_date: Some(maturity),
                ..InstInfo::default()
            },
            ..Bond::default()
        }
    }

    #[test]
    fn test_coupon_strip_and_redemption() {
        let cdate = date!(2025 - 01 - 15);
        let mut b = bond(date!(2026 - 01 - 15));
        b.nominal_value = Some(1000.0);
        b.quantity = Some(1.0);
        b.coupon_rate = Some(0.08);
        b.coupon_frequency = Some(182);

        let contribution = b
            .compute_contribution(cdate, &AssumptionSet::default())
            .unwrap();

        // Two coupons of 1000 * 0.08 * 182/365 (days 182 and 364) plus the
        // redemption land in the 180-365d bucket.
        let coupon = 1000.0 * 0.08 * 182.0 / 365.0;
        assert_eq!(contribution.cash_flows.len(), 1);
        assert_approx_eq!(
            contribution.cash_flows[&LiquidityBucket::Days180To365],
            2.0 * coupon + 1000.0
        );
        assert!(contribution.duration.unwrap() < 1.0);
        assert!(contribution.duration.unwrap() > 0.9);
    }

    #[test]
    fn test_zero_coupon_duration_is_years_to_maturity() {
        let cdate = date!(2025 - 01 - 15);
        let mut b = bond(date!(2027 - 01 - 15));
        b.coupon_rate = Some(0.0);
        let contribution = b
            .compute_contribution(cdate, &AssumptionSet::default())
            .unwrap();
        assert_approx_eq!(
            contribution.duration.unwrap(),
            year_fraction(cdate, date!(2027 - 01 - 15))
        );
    }

    #[test]
    fn test_matured_bond_is_excluded_from_risk_ladders() {
        let cdate = date!(2025 - 01 - 15);
        let b = bond(date!(2024 - 12 - 31));
        let contribution = b
            .compute_contribution(cdate, &AssumptionSet::default())
            .unwrap();
        assert!(contribution.cash_flows.is_empty());
        assert!(contribution.repricing_date.is_none());
        assert_eq!(contribution.repricing_amount, 0.0);
        assert_eq!(contribution.currency_exposure[&Currency::RUB], 1000.0);
    }
}
