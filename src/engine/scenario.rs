use crate::currency::Currency;
use crate::definitions::Real;
use crate::instrument::{Instrument, InstrumentTrait};
use log::debug;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use time::Date;

/// A stress scenario over the balance sheet.
///
/// Rate shocks are quoted in basis points per currency; FX shocks are
/// recorded for reporting but do not translate exposures (reporting stays in
/// instrument currency).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScenarioParameters {
    pub scenario_name: String,
    pub calculation_date: Date,

    #[serde(default)]
    pub interest_rate_shock_bps: FxHashMap<Currency, Real>,
    #[serde(default)]
    pub fx_rate_shock_pct: FxHashMap<Currency, Real>,

    /// Immediate deposit outflow, percent of balance.
    #[serde(default)]
    pub deposit_runoff_pct: Real,
    /// Drawdown of undrawn committed lines, percent of the available amount.
    #[serde(default)]
    pub credit_line_drawdown_pct: Real,
    #[serde(default)]
    pub default_rate_increase: Real,
    #[serde(default)]
    pub haircut_increase: FxHashMap<String, Real>,
    #[serde(default)]
    pub market_liquidity_stress: bool,
}

impl ScenarioParameters {
    pub fn baseline(calculation_date: Date) -> ScenarioParameters {
        ScenarioParameters {
            scenario_name: "Baseline".to_string(),
            calculation_date,
            interest_rate_shock_bps: FxHashMap::default(),
            fx_rate_shock_pct: FxHashMap::default(),
            deposit_runoff_pct: 0.0,
            credit_line_drawdown_pct: 0.0,
            default_rate_increase: 0.0,
            haircut_increase: FxHashMap::default(),
            market_liquidity_stress: false,
        }
    }

    /// A parallel rate shock, halved for the hard currencies.
    pub fn parallel_rate_shock(calculation_date: Date, shock_bps: Real) -> ScenarioParameters {
        let mut scenario = ScenarioParameters::baseline(calculation_date);
        scenario.scenario_name = format!("IR Shock {:+}bp", shock_bps);
        scenario.interest_rate_shock_bps = FxHashMap::from_iter([
            (Currency::RUB, shock_bps),
            (Currency::USD, shock_bps * 0.5),
            (Currency::EUR, shock_bps * 0.5),
        ]);
        scenario
    }

    pub fn deposit_run(calculation_date: Date, runoff_pct: Real) -> ScenarioParameters {
        let mut scenario = ScenarioParameters::baseline(calculation_date);
        scenario.scenario_name = format!("Deposit Run {}%", runoff_pct);
        scenario.deposit_runoff_pct = runoff_pct;
        scenario
    }

    pub fn combined_stress(calculation_date: Date) -> ScenarioParameters {
        let mut scenario = ScenarioParameters::baseline(calculation_date);
        scenario.scenario_name = "Combined Stress".to_string();
        scenario.interest_rate_shock_bps = FxHashMap::from_iter([
            (Currency::RUB, 300.0),
            (Currency::USD, 150.0),
            (Currency::EUR, 150.0),
        ]);
        scenario.fx_rate_shock_pct = FxHashMap::from_iter([
            (Currency::USD, 30.0),
            (Currency::EUR, 25.0),
            (Currency::CNY, 35.0),
        ]);
        scenario.deposit_runoff_pct = 30.0;
        scenario.credit_line_drawdown_pct = 50.0;
        scenario.market_liquidity_stress = true;
        scenario
    }
}

/// Applies the scenario to a deep copy of each instrument, in order: rate
/// shock, deposit run-off, credit-line drawdown. Inputs are never mutated.
pub fn apply_stress(
    instruments: &[Instrument],
    scenario: &ScenarioParameters,
) -> Vec<Instrument> {
    debug!(
        "applying scenario '{}' to {} instruments",
        scenario.scenario_name,
        instruments.len()
    );

    instruments
        .iter()
        .map(|instrument| {
            let mut stressed = instrument.clone();

            if !scenario.interest_rate_shock_bps.is_empty() {
                let currency = stressed.get_currency();
                if let Some(&shock_bps) = scenario.interest_rate_shock_bps.get(&currency) {
                    let info = stressed.get_inst_info_mut();
                    if let Some(rate) = info.interest_rate {
                        info.interest_rate = Some(rate + shock_bps / 10_000.0);
                    }
                }
            }

            if scenario.deposit_runoff_pct > 0.0 {
                if let Instrument::Deposit(deposit) = &mut stressed {
                    deposit.info.amount *= 1.0 - scenario.deposit_runoff_pct / 100.0;
                }
            }

            if scenario.credit_line_drawdown_pct > 0.0 {
                if let Instrument::OffBalance(off_balance) = &mut stressed {
                    if let Some(available) = off_balance.available_amount {
                        let drawdown = available * scenario.credit_line_drawdown_pct / 100.0;
                        off_balance.utilized_amount =
                            Some(off_balance.utilized_amount.unwrap_or(0.0) + drawdown);
                        off_balance.available_amount = Some(available - drawdown);
                    }
                }
            }

            stressed
        })
        .collect()
}
