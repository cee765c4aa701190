use crate::definitions::Real;
use crate::enums::FundingScenario;
use crate::time::add_days;
use anyhow::Result;
use log::info;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use time::Date;

/// One preprocessed daily flow row. Amounts are signed, in base currency,
/// keyed by the funding scenario columns present in the input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DailyFlow {
    pub flow_day: i64,
    pub amounts: FxHashMap<FundingScenario, Real>,
    /// Flows already counted inside the liquidity buffer.
    #[serde(default)]
    pub in_buffer: bool,
}

impl DailyFlow {
    pub fn new(flow_day: i64, amounts: impl IntoIterator<Item = (FundingScenario, Real)>) -> Self {
        DailyFlow {
            flow_day,
            amounts: amounts.into_iter().collect(),
            in_buffer: false,
        }
    }
}

/// The high-quality liquid-asset stock available on day zero.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct LiquidityBuffer {
    pub value: Real,
    #[serde(default)]
    pub impairment: Real,
}

impl LiquidityBuffer {
    pub fn impaired_value(&self) -> Real {
        self.value - self.impairment
    }
}

/// One row of the cumulative survival report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CumulativeRow {
    pub flow_day: i64,
    pub flow_date: Date,
    pub values: FxHashMap<FundingScenario, Real>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurvivalHorizonResult {
    pub horizon_days: FxHashMap<FundingScenario, i64>,
    pub cumulative: Vec<CumulativeRow>,
    pub calculation_date: Date,
    pub buffer_value: Real,
    pub buffer_impaired_value: Real,
}

/// Computes, per funding scenario, the last day on which the cumulative
/// liquidity position is still strictly positive, starting from the buffer.
///
/// The NAME column starts from the full buffer value; MARKET and COMBO start
/// from the impaired value. A horizon outside `[0, max_horizon_days]` is
/// reported as `max_horizon_days`.
pub struct SurvivalHorizonCalculator {
    calculation_date: Date,
    max_horizon_days: i64,
    scenarios: Vec<FundingScenario>,
}

impl SurvivalHorizonCalculator {
    pub const DEFAULT_MAX_HORIZON_DAYS: i64 = 90;

    pub fn new(
        calculation_date: Date,
        max_horizon_days: i64,
        scenarios: Option<Vec<FundingScenario>>,
    ) -> SurvivalHorizonCalculator {
        SurvivalHorizonCalculator {
            calculation_date,
            max_horizon_days,
            scenarios: scenarios.unwrap_or_else(|| FundingScenario::ALL.to_vec()),
        }
    }

    pub fn with_defaults(calculation_date: Date) -> SurvivalHorizonCalculator {
        SurvivalHorizonCalculator::new(
            calculation_date,
            SurvivalHorizonCalculator::DEFAULT_MAX_HORIZON_DAYS,
            None,
        )
    }

    pub fn calculate(
        &self,
        daily_flows: &[DailyFlow],
        buffer: &LiquidityBuffer,
        exclude_buffer_flows: bool,
    ) -> Result<SurvivalHorizonResult> {
        // Which scenario columns actually occur in the input.
        let columns: Vec<FundingScenario> = self
            .scenarios
            .iter()
            .copied()
            .filter(|scenario| {
                daily_flows
                    .iter()
                    .any(|flow| flow.amounts.contains_key(scenario))
            })
            .collect();

        // Group by day, optionally dropping buffer-internal flows.
        let mut by_day: BTreeMap<i64, FxHashMap<FundingScenario, Real>> = BTreeMap::new();
        for flow in daily_flows {
            if exclude_buffer_flows && flow.in_buffer {
                continue;
            }
            let day = by_day.entry(flow.flow_day).or_default();
            for column in &columns {
                if let Some(&amount) = flow.amounts.get(column) {
                    *day.entry(*column).or_insert(0.0) += amount;
                }
            }
        }

        // Day zero carries the buffer; stressed columns start impaired.
        let mut day_zero: FxHashMap<FundingScenario, Real> = FxHashMap::default();
        for column in &columns {
            let start = if column.uses_impaired_buffer() {
                buffer.impaired_value()
            } else {
                buffer.value
            };
            day_zero.insert(*column, start);
        }
        if let Some(existing) = by_day.remove(&0) {
            for (column, amount) in existing {
                *day_zero.entry(column).or_insert(0.0) += amount;
            }
        }

        // Cumulative positions, row-indexed from day zero.
        let mut cumulative: Vec<CumulativeRow> = Vec::with_capacity(by_day.len() + 1);
        let mut running = day_zero.clone();
        cumulative.push(CumulativeRow {
            flow_day: 0,
            flow_date: self.calculation_date,
            values: running.clone(),
        });
        for (index, (_, amounts)) in by_day.iter().enumerate() {
            for column in &columns {
                let amount = amounts.get(column).copied().unwrap_or(0.0);
                *running.entry(*column).or_insert(0.0) += amount;
            }
            let flow_day = index as i64 + 1;
            cumulative.push(CumulativeRow {
                flow_day,
                flow_date: add_days(self.calculation_date, flow_day),
                values: running.clone(),
            });
        }

        // Horizon: the last index with all positions so far strictly positive.
        let mut horizon_days = FxHashMap::default();
        for column in &columns {
            let first_nonpositive = cumulative.iter().position(|row| {
                row.values.get(column).copied().unwrap_or(0.0) <= 0.0
            });
            let mut horizon = match first_nonpositive {
                Some(index) => index as i64 - 1,
                None => self.max_horizon_days,
            };
            if horizon < 0 || horizon > self.max_horizon_days {
                horizon = self.max_horizon_days;
            }
            info!(
                "survival horizon {}: {} days (buffer {:.0})",
                column.as_str(),
                horizon,
                buffer.value
            );
            horizon_days.insert(*column, horizon);
        }

        Ok(SurvivalHorizonResult {
            horizon_days,
            cumulative,
            calculation_date: self.calculation_date,
            buffer_value: buffer.value,
            buffer_impaired_value: buffer.impaired_value(),
        })
    }
}
