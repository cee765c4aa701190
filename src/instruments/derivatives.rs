use crate::contribution::Contribution;
use crate::currency::Currency;
use crate::definitions::{Real, BASIS_POINT};
use crate::instrument::InstrumentTrait;
use crate::instruments::inst_info::InstInfo;
use crate::risks::assumptions::AssumptionSet;
use crate::time::{add_days, year_fraction};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use time::Date;

/// An interest-rate swap. The payer-of-fixed side reprices as a liability on
/// the fixed leg; the half-life approximation stands in for a proper swap
/// duration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Irs {
    pub info: InstInfo,
    pub notional_amount: Option<Real>,
    pub settlement_date: Option<Date>,
    pub fixed_rate: Option<Real>,
    pub fixed_leg_frequency: Option<i64>,
    pub floating_rate_index: Option<String>,
    pub floating_spread: Option<Real>,
    pub floating_leg_frequency: Option<i64>,
    pub is_payer: bool,
}

impl Default for Irs {
    fn default() -> Irs {
        Irs {
            info: InstInfo::default(),
            notional_amount: None,
            settlement_date: None,
            fixed_rate: None,
            fixed_leg_frequency: None,
            floating_rate_index: None,
            floating_spread: None,
            floating_leg_frequency: None,
            is_payer: true,
        }
    }
}

fn swap_contribution(
    contribution: &mut Contribution,
    calculation_date: Date,
    info: &InstInfo,
    notional_amount: Option<Real>,
    settlement_date: Option<Date>,
    fixed_rate: Option<Real>,
    is_payer: bool,
) {
    let notional = notional_amount.unwrap_or(info.volume());
    let sign: Real = if is_payer { -1.0 } else { 1.0 };

    if let Some(repricing) = settlement_date.or(info.maturity_date) {
        contribution.repricing_date = Some(repricing);
        contribution.repricing_amount = notional * sign;

        if let Some(rate) = fixed_rate {
            let years = year_fraction(calculation_date, repricing);
            let duration = years / 2.0;
            let modified = duration / (1.0 + rate);
            contribution.duration = Some(duration);
            contribution.modified_duration = Some(modified);
            contribution.dv01 = Some(notional * modified * BASIS_POINT * sign);
        }
    }

    contribution.add_currency_exposure(info.currency, info.amount);
}

impl InstrumentTrait for Irs {
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
        swap_contribution(
            &mut contribution,
            calculation_date,
            &self.info,
            self.notional_amount,
            self.settlement_date,
            self.fixed_rate,
            self.is_payer,
        );
        Ok(contribution)
    }
}

/// An overnight-index swap; same gap treatment as an IRS.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ois {
    pub info: InstInfo,
    pub notional_amount: Option<Real>,
    pub settlement_date: Option<Date>,
    pub fixed_rate: Option<Real>,
    pub overnight_index: Option<String>,
    pub compounding_method: Option<String>,
    pub is_payer: bool,
}

impl Default for Ois {
    fn default() -> Ois {
        Ois {
            info: InstInfo::default(),
            notional_amount: None,
            settlement_date: None,
            fixed_rate: None,
            overnight_index: None,
            compounding_method: None,
            is_payer: true,
        }
    }
}

impl InstrumentTrait for Ois {
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
        swap_contribution(
            &mut contribution,
            calculation_date,
            &self.info,
            self.notional_amount,
            self.settlement_date,
            self.fixed_rate,
            self.is_payer,
        );
        Ok(contribution)
    }
}

/// An FX swap: spot leg plus an opposite forward leg in the base currency.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FxSwap {
    pub info: InstInfo,
    pub notional_amount: Option<Real>,
    pub base_currency: Option<Currency>,
    pub quote_currency: Option<Currency>,
    pub spot_rate: Option<Real>,
    pub forward_rate: Option<Real>,
    pub swap_points: Option<Real>,
    pub near_leg_date: Option<Date>,
    pub far_leg_date: Option<Date>,
    pub is_buy: bool,
}

impl Default for FxSwap {
    fn default() -> FxSwap {
        FxSwap {
            info: InstInfo::default(),
            notional_amount: None,
            base_currency: None,
            quote_currency: None,
            spot_rate: None,
            forward_rate: None,
            swap_points: None,
            near_leg_date: None,
            far_leg_date: None,
            is_buy: true,
        }
    }
}

impl InstrumentTrait for FxSwap {
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
        let notional = self.notional_amount.unwrap_or(self.info.volume());
        let sign: Real = if self.is_buy { 1.0 } else { -1.0 };

        if let (Some(base), Some(quote)) = (self.base_currency, self.quote_currency) {
            contribution.add_currency_exposure(base, notional * sign);
            contribution.add_currency_exposure(quote, -notional * sign);
        }

        if let Some(near) = self.near_leg_date {
            if near >= calculation_date {
                contribution.add_cash_flow(calculation_date, near, notional * sign);
            }
        }
        if let Some(far) = self.far_leg_date {
            if far >= calculation_date {
                contribution.add_cash_flow(calculation_date, far, -notional * sign);
            }
        }

        Ok(contribution)
    }
}

/// An exchange-traded futures position settling at expiry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FuturesContract {
    pub info: InstInfo,
    pub notional_amount: Option<Real>,
    pub contract_size: Option<Real>,
    pub tick_size: Option<Real>,
    pub futures_price: Option<Real>,
    pub expiration_date: Option<Date>,
    pub futures_type: Option<String>,
    pub quantity: Option<Real>,
    pub is_long: bool,
}

impl Default for FuturesContract {
    fn default() -> FuturesContract {
        FuturesContract {
            info: InstInfo::default(),
            notional_amount: None,
            contract_size: None,
            tick_size: None,
            futures_price: None,
            expiration_date: None,
            futures_type: None,
            quantity: None,
            is_long: true,
        }
    }
}

impl InstrumentTrait for FuturesContract {
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
        let sign: Real = if self.is_long { 1.0 } else { -1.0 };
        let exposure = self.notional_amount.unwrap_or(self.info.volume()) * sign;

        if let Some(expiry) = self.expiration_date {
            if expiry >= calculation_date {
                contribution.add_cash_flow(calculation_date, expiry, exposure);
            }
        }
        contribution.add_currency_exposure(self.info.currency, exposure);
        Ok(contribution)
    }
}

/// A T+1 FX conversion deal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tom {
    pub info: InstInfo,
    pub notional_amount: Option<Real>,
    pub base_currency: Option<Currency>,
    pub quote_currency: Option<Currency>,
    pub exchange_rate: Option<Real>,
    pub is_buy: bool,
}

impl Default for Tom {
    fn default() -> Tom {
        Tom {
            info: InstInfo::default(),
            notional_amount: None,
            base_currency: None,
            quote_currency: None,
            exchange_rate: None,
            is_buy: true,
        }
    }
}

impl InstrumentTrait for Tom {
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
        let notional = self.notional_amount.unwrap_or(self.info.volume());
        let sign: Real = if self.is_buy { 1.0 } else { -1.0 };

        if let (Some(base), Some(quote)) = (self.base_currency, self.quote_currency) {
            contribution.add_currency_exposure(base, notional * sign);
            contribution.add_currency_exposure(quote, -notional * sign);
        }
        contribution.add_cash_flow(
            calculation_date,
            add_days(calculation_date, 1),
            notional * sign,
        );
        Ok(contribution)
    }
}

/// Margin posted at a clearing house against derivative positions. Asset
/// with mid-term liquidity: it returns when the related deals close.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DepositMargin {
    pub info: InstInfo,
    pub margin_type: Option<String>,
    pub clearing_house: Option<String>,
    pub margin_currency: Option<Currency>,
    pub related_contracts: Option<String>,
}

impl InstrumentTrait for DepositMargin {
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

        if let Some(maturity) = self.info.maturity_date {
            if maturity >= calculation_date {
                contribution.add_cash_flow(calculation_date, maturity, volume);
            }
        }
        contribution
            .add_currency_exposure(self.margin_currency.unwrap_or(self.info.currency), volume);
        Ok(contribution)
    }
}

/// An OTC forward settling at delivery.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Forward {
    pub info: InstInfo,
    pub notional_amount: Option<Real>,
    pub forward_price: Option<Real>,
    pub spot_price: Option<Real>,
    pub delivery_date: Option<Date>,
    pub settlement_date: Option<Date>,
    pub forward_type: Option<String>,
    pub settlement_type: Option<String>,
    pub is_long: bool,
}

impl Default for Forward {
    fn default() -> Forward {
        Forward {
            info: InstInfo::default(),
            notional_amount: None,
            forward_price: None,
            spot_price: None,
            delivery_date: None,
            settlement_date: None,
            forward_type: None,
            settlement_type: None,
            is_long: true,
        }
    }
}

impl InstrumentTrait for Forward {
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
        let sign: Real = if self.is_long { 1.0 } else { -1.0 };
        let exposure = self.notional_amount.unwrap_or(self.info.volume()) * sign;

        let delivery = self
            .delivery_date
            .or(self.settlement_date)
            .or(self.info.maturity_date);
        if let Some(delivery) = delivery {
            if delivery >= calculation_date {
                contribution.add_cash_flow(calculation_date, delivery, exposure);
            }
        }
        contribution.add_currency_exposure(self.info.currency, exposure);
        Ok(contribution)
    }
}

/// A cross-currency swap: two opposite notional exposures and a repricing at
/// settlement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Xccy {
    pub info: InstInfo,
    pub settlement_date: Option<Date>,
    pub leg1_currency: Option<Currency>,
    pub leg1_notional: Option<Real>,
    pub leg1_rate: Option<Real>,
    pub leg1_is_fixed: bool,
    pub leg2_currency: Option<Currency>,
    pub leg2_notional: Option<Real>,
    pub leg2_rate: Option<Real>,
    pub leg2_is_fixed: bool,
    pub exchange_notional_at_start: bool,
    pub exchange_notional_at_maturity: bool,
    pub fx_rate: Option<Real>,
}

impl Default for Xccy {
    fn default() -> Xccy {
        Xccy {
            info: InstInfo::default(),
            settlement_date: None,
            leg1_currency: None,
            leg1_notional: None,
            leg1_rate: None,
            leg1_is_fixed: true,
            leg2_currency: None,
            leg2_notional: None,
            leg2_rate: None,
            leg2_is_fixed: false,
            exchange_notional_at_start: true,
            exchange_notional_at_maturity: true,
            fx_rate: None,
        }
    }
}

impl InstrumentTrait for Xccy {
    fn get_inst_info(&self) -> &InstInfo {
        &self.info
    }

    fn get_inst_info_mut(&mut self) -> &mut InstInfo {
        &mut self.info
    }

    fn compute_contribution(
        &self,
        _calculation_date: Date,
        _assumptions: &AssumptionSet,
    ) -> Result<Contribution> {
        let mut contribution = Contribution::new(
            self.info.instrument_id.clone(),
            self.info.instrument_type,
            self.info.currency,
        );

        if let Some(repricing) = self.settlement_date.or(self.info.maturity_date) {
            contribution.repricing_date = Some(repricing);
            contribution.repricing_amount = self.info.amount;
        }

        if let (Some(leg1), Some(leg2)) = (self.leg1_currency, self.leg2_currency) {
            contribution
                .add_currency_exposure(leg1, self.leg1_notional.unwrap_or(self.info.volume()));
            contribution
                .add_currency_exposure(leg2, -self.leg2_notional.unwrap_or(self.info.volume()));
        }

        Ok(contribution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruments::InstrumentType;
    use crate::time::buckets::LiquidityBucket;
    use assert_approx_eq::assert_approx_eq;
    use time::macros::date;

    fn info(id: &str, amount: f64, currency: Currency) -> InstInfo {
        InstInfo {
            instrument_id: id.to_string(),
            instrument_type: InstrumentType::Derivative,
            balance_account: "52601".to_string(),
            amount,
            currency,
            start_date: date!(2024 - 06 - 01),
            as_of_date: date!(2025 - 01 - 15),
            ..InstInfo::default()
        }
    }

    #[test]
    fn test_payer_irs_reprices_negative_with_half_life_duration() {
        let cdate = date!(2025 - 01 - 15);
        let irs = Irs {
            info: info("IRS-1", 0.0, Currency::RUB),
            notional_amount: Some(10_000.0),
            settlement_date: Some(date!(2027 - 01 - 15)),
            fixed_rate: Some(0.10),
            is_payer: true,
            ..Irs::default()
        };
        let contribution = irs
            .compute_contribution(cdate, &AssumptionSet::default())
            .unwrap();
        assert_approx_eq!(contribution.repricing_amount, -10_000.0);
        let years = year_fraction(cdate, date!(2027 - 01 - 15));
        assert_approx_eq!(contribution.duration.unwrap(), years / 2.0);
        assert!(contribution.dv01.unwrap() < 0.0);
    }

    #[test]
    fn test_fx_swap_legs_and_flows() {
        let cdate = date!(2025 - 01 - 15);
        let swap = FxSwap {
            info: info("FXS-1", 0.0, Currency::RUB),
            notional_amount: Some(100.0),
            base_currency: Some(Currency::USD),
            quote_currency: Some(Currency::RUB),
            near_leg_date: Some(date!(2025 - 01 - 16)),
            far_leg_date: Some(date!(2025 - 02 - 16)),
            is_buy: true,
            ..FxSwap::default()
        };
        let contribution = swap
            .compute_contribution(cdate, &AssumptionSet::default())
            .unwrap();
        assert_eq!(contribution.currency_exposure[&Currency::USD], 100.0);
        assert_eq!(contribution.currency_exposure[&Currency::RUB], -100.0);
        assert_approx_eq!(contribution.cash_flows[&LiquidityBucket::Overnight], 100.0);
        assert_approx_eq!(
            contribution.cash_flows[&LiquidityBucket::Days30To90],
            -100.0
        );
    }

    #[test]
    fn test_tom_settles_next_day() {
        let cdate = date!(2025 - 01 - 15);
        let tom = Tom {
            info: info("TOM-1", 0.0, Currency::RUB),
            notional_amount: Some(50.0),
            base_currency: Some(Currency::CNY),
            quote_currency: Some(Currency::RUB),
            is_buy: false,
            ..Tom::default()
        };
        let contribution = tom
            .compute_contribution(cdate, &AssumptionSet::default())
            .unwrap();
        assert_eq!(contribution.currency_exposure[&Currency::CNY], -50.0);
        assert_approx_eq!(contribution.cash_flows[&LiquidityBucket::Overnight], -50.0);
    }

    #[test]
    fn test_xccy_opposite_exposures() {
        let xccy = Xccy {
            info: info("XCCY-1", 1000.0, Currency::RUB),
            settlement_date: Some(date!(2026 - 01 - 15)),
            leg1_currency: Some(Currency::RUB),
            leg1_notional: Some(9000.0),
            leg2_currency: Some(Currency::USD),
            leg2_notional: Some(100.0),
            ..Xccy::default()
        };
        let contribution = xccy
            .compute_contribution(date!(2025 - 01 - 15), &AssumptionSet::default())
            .unwrap();
        assert_eq!(contribution.currency_exposure[&Currency::RUB], 9000.0);
        assert_eq!(contribution.currency_exposure[&Currency::USD], -100.0);
        assert_eq!(contribution.repricing_date, Some(date!(2026 - 01 - 15)));
    }
}
