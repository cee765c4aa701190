use crate::contribution::Contribution;
use crate::definitions::{Real, BASIS_POINT};
use crate::instrument::InstrumentTrait;
use crate::instruments::inst_info::InstInfo;
use crate::risks::assumptions::AssumptionSet;
use crate::time::year_fraction;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use time::Date;

/// A direct repo: cash borrowed against collateral. Liability; the bullet
/// outflow at maturity is the repurchase obligation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Repo {
    pub info: InstInfo,
    /// Deal rate when it differs from the booked interest rate.
    pub repo_rate: Option<Real>,
    pub collateral_type: Option<String>,
    pub collateral_value: Option<Real>,
    pub haircut: Option<Real>,
}

impl Repo {
    fn rate(&self) -> Option<Real> {
        self.repo_rate.or(self.info.interest_rate)
    }
}

impl InstrumentTrait for Repo {
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
        let maturity = self
            .info
            .maturity_date
            .ok_or_else(|| anyhow!("repo {} has no maturity date", self.info.instrument_id))?;

        let mut contribution = Contribution::new(
            self.info.instrument_id.clone(),
            self.info.instrument_type,
            self.info.currency,
        );
        let volume = self.info.volume();

        contribution.repricing_date = Some(maturity);
        contribution.repricing_amount = -volume;

        if let Some(rate) = self.rate() {
            let years = year_fraction(calculation_date, maturity);
            let duration = years;
            let modified = duration / (1.0 + rate);
            contribution.duration = Some(duration);
            contribution.modified_duration = Some(modified);
            contribution.dv01 = Some(-volume * modified * BASIS_POINT);
        }

        if maturity >= calculation_date {
            contribution.add_cash_flow(calculation_date, maturity, -volume);
        }

        contribution.add_currency_exposure(self.info.currency, -volume);
        Ok(contribution)
    }
}

/// A reverse repo: cash placed against collateral. Asset; cash returns at
/// maturity.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReverseRepo {
    pub info: InstInfo,
    pub repo_rate: Option<Real>,
    pub collateral_type: Option<String>,
    pub collateral_value: Option<Real>,
    pub haircut: Option<Real>,
}

impl ReverseRepo {
    fn rate(&self) -> Option<Real> {
        self.repo_rate.or(self.info.interest_rate)
    }
}

impl InstrumentTrait for ReverseRepo {
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
        let maturity = self.info.maturity_date.ok_or_else(|| {
            anyhow!(
                "reverse repo {} has no maturity date",
                self.info.instrument_id
            )
        })?;

        let mut contribution = Contribution::new(
            self.info.instrument_id.clone(),
            self.info.instrument_type,
            self.info.currency,
        );
        let volume = self.info.volume();

        contribution.repricing_date = Some(maturity);
        contribution.repricing_amount = volume;

        if let Some(rate) = self.rate() {
            let years = year_fraction(calculation_date, maturity);
            let duration = years;
            let modified = duration / (1.0 + rate);
            contribution.duration = Some(duration);
            contribution.modified_duration = Some(modified);
            contribution.dv01 = Some(volume * modified * BASIS_POINT);
        }

        if maturity >= calculation_date {
            contribution.add_cash_flow(calculation_date, maturity, volume);
        }

        contribution.add_currency_exposure(self.info.currency, volume);
        Ok(contribution)
    }
}
