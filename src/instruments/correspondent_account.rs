use crate::contribution::Contribution;
use crate::definitions::{Real, DAYS_PER_YEAR};
use crate::enums::CorrespondentAccountType;
use crate::instrument::InstrumentTrait;
use crate::instruments::inst_info::InstInfo;
use crate::risks::assumptions::AssumptionSet;
use crate::time::add_days;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use time::Date;

const DEFAULT_RESERVE_HORIZON_DAYS: i64 = 365;
const DEFAULT_LORO_RUNOFF_DAYS: i64 = 7;
const NOSTRO_STABLE_HORIZON_DAYS: i64 = 90;

/// A correspondent account: nostro/loro balances and the central-bank
/// required-reserve and operational accounts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CorrespondentAccount {
    pub info: InstInfo,
    pub account_type: CorrespondentAccountType,
    pub correspondent_bank: Option<String>,
    pub is_required_reserve: bool,
    pub reserve_ratio: Option<Real>,
}

impl Default for CorrespondentAccount {
    fn default() -> CorrespondentAccount {
        CorrespondentAccount {
            info: InstInfo::default(),
            account_type: CorrespondentAccountType::Nostro,
            correspondent_bank: None,
            is_required_reserve: false,
            reserve_ratio: None,
        }
    }
}

impl InstrumentTrait for CorrespondentAccount {
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
        let sign: Real = if self.account_type.is_asset() { 1.0 } else { -1.0 };

        // Overnight repricing for all correspondent balances.
        contribution.repricing_date = Some(add_days(calculation_date, 1));
        contribution.repricing_amount = volume * sign;
        let duration = 1.0 / DAYS_PER_YEAR;
        contribution.duration = Some(duration);
        contribution.modified_duration = Some(duration);

        match self.account_type {
            CorrespondentAccountType::CbrRequiredReserve => {
                // The required reserve is immobilized over the configured
                // horizon; control of the cash returns only then.
                let horizon = assumptions
                    .required_reserve_horizon_days
                    .unwrap_or(DEFAULT_RESERVE_HORIZON_DAYS);
                contribution.add_cash_flow(
                    calculation_date,
                    add_days(calculation_date, horizon),
                    volume,
                );
            }
            CorrespondentAccountType::CbrOperational => {
                contribution.add_cash_flow(
                    calculation_date,
                    add_days(calculation_date, 1),
                    volume,
                );
            }
            CorrespondentAccountType::Nostro => {
                if let Some(stable_portion) = assumptions.nostro_stable_portion {
                    let stable = volume * stable_portion;
                    let operational = volume - stable;
                    contribution.add_cash_flow(
                        calculation_date,
                        add_days(calculation_date, 1),
                        operational,
                    );
                    contribution.add_cash_flow(
                        calculation_date,
                        add_days(calculation_date, NOSTRO_STABLE_HORIZON_DAYS),
                        stable,
                    );
                } else {
                    contribution.add_cash_flow(
                        calculation_date,
                        add_days(calculation_date, 1),
                        volume,
                    );
                }
            }
            CorrespondentAccountType::Loro => {
                let runoff_days = assumptions
                    .loro_runoff_days
                    .unwrap_or(DEFAULT_LORO_RUNOFF_DAYS);
                contribution.add_cash_flow(
                    calculation_date,
                    add_days(calculation_date, runoff_days),
                    -volume,
                );
            }
        }

        contribution.add_currency_exposure(self.info.currency, volume * sign);
        Ok(contribution)
    }
}
