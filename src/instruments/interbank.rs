use crate::contribution::Contribution;
use crate::definitions::{Real, BASIS_POINT};
use crate::instrument::InstrumentTrait;
use crate::instruments::inst_info::InstInfo;
use crate::risks::assumptions::AssumptionSet;
use crate::time::year_fraction;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use time::Date;

/// An interbank money-market deal: a placement (asset) or a borrowing
/// (liability), always a bullet with a contractual maturity.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct InterbankLoan {
    pub info: InstInfo,
    /// Placement when true; derived from the amount sign when absent.
    pub is_placement: Option<bool>,
    pub counterparty_bank: Option<String>,
    pub credit_rating: Option<String>,
}

impl InterbankLoan {
    pub fn placement(&self) -> bool {
        self.is_placement.unwrap_or(self.info.amount > 0.0)
    }
}

impl InstrumentTrait for InterbankLoan {
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
                "interbank loan {} has no maturity date",
                self.info.instrument_id
            )
        })?;

        let mut contribution = Contribution::new(
            self.info.instrument_id.clone(),
            self.info.instrument_type,
            self.info.currency,
        );
        let volume = self.info.volume();
        let sign: Real = if self.placement() { 1.0 } else { -1.0 };

        contribution.repricing_date = Some(maturity);
        contribution.repricing_amount = volume * sign;

        if let Some(rate) = self.info.interest_rate {
            let years = year_fraction(calculation_date, maturity);
            let duration = years;
            let modified = duration / (1.0 + rate);
            contribution.duration = Some(duration);
            contribution.modified_duration = Some(modified);
            contribution.dv01 = Some(volume * modified * BASIS_POINT * sign);
        }

        if maturity >= calculation_date {
            contribution.add_cash_flow(calculation_date, maturity, volume * sign);
        }

        contribution.add_currency_exposure(self.info.currency, volume * sign);
        Ok(contribution)
    }
}
