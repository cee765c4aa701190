use crate::contribution::Contribution;
use crate::definitions::{Real, BASIS_POINT};
use crate::enums::{AssetCategory, LiabilityCategory};
use crate::instrument::InstrumentTrait;
use crate::instruments::inst_info::InstInfo;
use crate::risks::assumptions::AssumptionSet;
use crate::time::{add_days, year_fraction};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use time::Date;

const DEFAULT_RECEIVABLES_DAYS: i64 = 90;
const DEFAULT_PAYABLES_DAYS: i64 = 30;
const DEFAULT_PAYROLL_DAYS: i64 = 15;
const DEFAULT_RESERVES_DAYS: i64 = 365;
const DEFAULT_LIQUIDITY_HAIRCUT: Real = 0.5;

/// Miscellaneous asset positions: fixed assets, intangibles, receivables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OtherAsset {
    pub info: InstInfo,
    pub asset_category: Option<AssetCategory>,
    /// Non-monetary items carry no FX exposure.
    pub is_monetary: bool,
    pub liquidation_value: Option<Real>,
    /// Discount applied on a forced sale, 0..=1.
    pub liquidity_haircut: Option<Real>,
}

impl Default for OtherAsset {
    fn default() -> OtherAsset {
        OtherAsset {
            info: InstInfo::default(),
            asset_category: None,
            is_monetary: true,
            liquidation_value: None,
            liquidity_haircut: None,
        }
    }
}

impl InstrumentTrait for OtherAsset {
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

        if let (Some(maturity), Some(rate)) = (self.info.maturity_date, self.info.interest_rate) {
            contribution.repricing_date = Some(maturity);
            contribution.repricing_amount = volume;
            let years = year_fraction(calculation_date, maturity);
            let modified = years / (1.0 + rate);
            contribution.duration = Some(years);
            contribution.modified_duration = Some(modified);
            contribution.dv01 = Some(volume * modified * BASIS_POINT);
        }

        match (self.info.maturity_date, self.asset_category) {
            (Some(maturity), _) if maturity >= calculation_date => {
                contribution.add_cash_flow(calculation_date, maturity, volume);
            }
            (_, Some(AssetCategory::FixedAssets)) => {
                // Only salable within the model when a liquidation horizon is
                // configured; the haircut discounts the recovered value.
                if let Some(horizon) = assumptions.fixed_assets_liquidation_horizon_days {
                    let haircut = self
                        .liquidity_haircut
                        .or(assumptions.liquidity_haircut)
                        .unwrap_or(DEFAULT_LIQUIDITY_HAIRCUT);
                    contribution.add_cash_flow(
                        calculation_date,
                        add_days(calculation_date, horizon),
                        volume * (1.0 - haircut),
                    );
                }
            }
            (_, Some(AssetCategory::Receivables)) => {
                let collection_days = assumptions
                    .receivables_collection_days
                    .unwrap_or(DEFAULT_RECEIVABLES_DAYS);
                contribution.add_cash_flow(
                    calculation_date,
                    add_days(calculation_date, collection_days),
                    volume,
                );
            }
            _ => {}
        }

        if self.is_monetary {
            contribution.add_currency_exposure(self.info.currency, volume);
        }
        Ok(contribution)
    }
}

/// Miscellaneous liability positions: payables, payroll, reserves.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OtherLiability {
    pub info: InstInfo,
    pub liability_category: Option<LiabilityCategory>,
    pub is_monetary: bool,
    pub priority_level: Option<String>,
}

impl Default for OtherLiability {
    fn default() -> OtherLiability {
        OtherLiability {
            info: InstInfo::default(),
            liability_category: None,
            is_monetary: true,
            priority_level: None,
        }
    }
}

impl InstrumentTrait for OtherLiability {
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

        if let (Some(maturity), Some(rate)) = (self.info.maturity_date, self.info.interest_rate) {
            contribution.repricing_date = Some(maturity);
            contribution.repricing_amount = -volume;
            let years = year_fraction(calculation_date, maturity);
            let modified = years / (1.0 + rate);
            contribution.duration = Some(years);
            contribution.modified_duration = Some(modified);
            contribution.dv01 = Some(-volume * modified * BASIS_POINT);
        }

        match (self.info.maturity_date, self.liability_category) {
            (Some(maturity), _) if maturity >= calculation_date => {
                contribution.add_cash_flow(calculation_date, maturity, -volume);
            }
            (_, Some(LiabilityCategory::Payables)) => {
                let days = assumptions
                    .payables_payment_days
                    .unwrap_or(DEFAULT_PAYABLES_DAYS);
                contribution.add_cash_flow(
                    calculation_date,
                    add_days(calculation_date, days),
                    -volume,
                );
            }
            (_, Some(LiabilityCategory::Payroll)) => {
                let days = assumptions
                    .payroll_payment_days
                    .unwrap_or(DEFAULT_PAYROLL_DAYS);
                contribution.add_cash_flow(
                    calculation_date,
                    add_days(calculation_date, days),
                    -volume,
                );
            }
            (_, Some(LiabilityCategory::Reserves)) => {
                let days = assumptions
                    .reserves_utilization_days
                    .unwrap_or(DEFAULT_RESERVES_DAYS);
                contribution.add_cash_flow(
                    calculation_date,
                    add_days(calculation_date, days),
                    -volume,
                );
            }
            _ => {}
        }

        if self.is_monetary {
            contribution.add_currency_exposure(self.info.currency, -volume);
        }
        Ok(contribution)
    }
}
