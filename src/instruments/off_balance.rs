use crate::contribution::Contribution;
use crate::currency::Currency;
use crate::definitions::{Real, BASIS_POINT};
use crate::enums::OffBalanceKind;
use crate::instrument::InstrumentTrait;
use crate::instruments::inst_info::InstInfo;
use crate::risks::assumptions::AssumptionSet;
use crate::time::{add_days, days_between, year_fraction};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use time::Date;

const DEFAULT_DRAW_DOWN_PROBABILITY: Real = 0.5;
const DEFAULT_DRAW_DOWN_DAYS: i64 = 30;
/// Placeholder delta-equivalent for options; not a pricing surface.
const OPTION_DELTA: Real = 0.5;

/// An off-balance position: guarantees, undrawn credit lines, and
/// derivative-shaped commitments booked off balance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OffBalance {
    pub info: InstInfo,
    pub off_balance_type: OffBalanceKind,
    pub notional_amount: Real,
    pub draw_down_probability: Option<Real>,
    pub expiry_date: Option<Date>,
    pub settlement_date: Option<Date>,

    /// Derivative subtype tag for swap-shaped positions (e.g. "IRS").
    pub derivative_type: Option<String>,
    pub pay_leg_currency: Option<Currency>,
    pub receive_leg_currency: Option<Currency>,
    pub pay_leg_amount: Option<Real>,
    pub receive_leg_amount: Option<Real>,
    pub is_payer: Option<bool>,

    pub utilized_amount: Option<Real>,
    pub available_amount: Option<Real>,
}

impl Default for OffBalance {
    fn default() -> OffBalance {
        OffBalance {
            info: InstInfo::default(),
            off_balance_type: OffBalanceKind::Other,
            notional_amount: 0.0,
            draw_down_probability: None,
            expiry_date: None,
            settlement_date: None,
            derivative_type: None,
            pay_leg_currency: None,
            receive_leg_currency: None,
            pay_leg_amount: None,
            receive_leg_amount: None,
            is_payer: None,
            utilized_amount: None,
            available_amount: None,
        }
    }
}

impl OffBalance {
    fn contingent_contribution(
        &self,
        contribution: &mut Contribution,
        calculation_date: Date,
        assumptions: &AssumptionSet,
    ) {
        let probability = self
            .draw_down_probability
            .or(assumptions.draw_down_probability)
            .unwrap_or(DEFAULT_DRAW_DOWN_PROBABILITY);
        let exposed = self.available_amount.unwrap_or(self.notional_amount);
        let expected_outflow = exposed * probability;

        let draw_down_date = if let Some(settlement) = self.settlement_date {
            settlement
        } else if let Some(expiry) = self.expiry_date {
            add_days(calculation_date, days_between(calculation_date, expiry) / 2)
        } else {
            add_days(calculation_date, DEFAULT_DRAW_DOWN_DAYS)
        };

        contribution.add_cash_flow(calculation_date, draw_down_date, -expected_outflow);
        contribution.add_currency_exposure(self.info.currency, -expected_outflow);
    }

    fn forward_contribution(&self, contribution: &mut Contribution, calculation_date: Date) {
        if let (Some(settlement), Some(pay_amount)) = (self.settlement_date, self.pay_leg_amount) {
            if settlement >= calculation_date {
                contribution.add_cash_flow(calculation_date, settlement, -pay_amount);
            }
        }
        if let (Some(currency), Some(amount)) = (self.pay_leg_currency, self.pay_leg_amount) {
            contribution.add_currency_exposure(currency, -amount);
        }
        if let (Some(currency), Some(amount)) =
            (self.receive_leg_currency, self.receive_leg_amount)
        {
            contribution.add_currency_exposure(currency, amount);
        }
    }

    fn swap_contribution(&self, contribution: &mut Contribution, calculation_date: Date) {
        let Some(repricing) = self.settlement_date.or(self.info.maturity_date) else {
            return;
        };
        // Payer-of-fixed reprices as a liability on the fixed leg.
        let sign: Real = if self.is_payer.unwrap_or(true) { -1.0 } else { 1.0 };
        contribution.repricing_date = Some(repricing);
        contribution.repricing_amount = self.notional_amount * sign;

        if let Some(rate) = self.info.interest_rate {
            let years = year_fraction(calculation_date, repricing);
            let modified = years / (1.0 + rate);
            contribution.duration = Some(years);
            contribution.modified_duration = Some(modified);
            contribution.dv01 = Some(self.notional_amount * modified * BASIS_POINT * sign);
        }
    }

    fn option_contribution(&self, contribution: &mut Contribution, calculation_date: Date) {
        if let Some(expiry) = self.expiry_date {
            if expiry >= calculation_date {
                contribution.add_cash_flow(
                    calculation_date,
                    expiry,
                    self.notional_amount * OPTION_DELTA,
                );
            }
        }
    }
}

impl InstrumentTrait for OffBalance {
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

        match self.off_balance_type {
            OffBalanceKind::Guarantee | OffBalanceKind::CreditLine => {
                self.contingent_contribution(&mut contribution, calculation_date, assumptions);
            }
            OffBalanceKind::Forward => {
                self.forward_contribution(&mut contribution, calculation_date);
            }
            OffBalanceKind::Swap => {
                self.swap_contribution(&mut contribution, calculation_date);
            }
            OffBalanceKind::Option => {
                self.option_contribution(&mut contribution, calculation_date);
            }
            OffBalanceKind::Other => {}
        }

        Ok(contribution)
    }
}
