use crate::currency::Currency;
use crate::definitions::Real;
use crate::instrument::{Instrument, InstrumentTrait};
use crate::risks::assumptions::{AssumptionSet, AssumptionsResolver};
use crate::time::buckets::LiquidityBucket;
use anyhow::Result;
use log::{info, warn};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use time::Date;

/// One row of a per-currency liquidity flow ladder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LiquidityFlowRow {
    pub bucket: LiquidityBucket,
    pub inflow: Real,
    pub outflow: Real,
    pub net_gap: Real,
    pub cumulative_gap: Real,
    /// Inflows over outflows; `None` when the bucket has no outflow.
    pub coverage_ratio: Option<Real>,
}

/// Builds per-currency inflow/outflow ladders from instrument contributions.
///
/// This is the flow-detail companion of the scenario aggregator: it keeps
/// inflows and outflows separate and reports bucket coverage.
pub struct CurrencyLiquidityGapCalculator {
    calculation_date: Date,
    /// Empty means every currency encountered.
    target_currencies: Vec<Currency>,
}

impl CurrencyLiquidityGapCalculator {
    pub fn new(calculation_date: Date, target_currencies: Vec<Currency>) -> Self {
        CurrencyLiquidityGapCalculator {
            calculation_date,
            target_currencies,
        }
    }

    pub fn calculate(
        &self,
        instruments: &[Instrument],
        resolver: Option<&AssumptionsResolver>,
    ) -> Result<FxHashMap<Currency, Vec<LiquidityFlowRow>>> {
        let mut flows: FxHashMap<Currency, BTreeMap<LiquidityBucket, (Real, Real)>> =
            FxHashMap::default();

        for instrument in instruments {
            let currency = instrument.get_currency();
            if !self.target_currencies.is_empty() && !self.target_currencies.contains(&currency)
            {
                continue;
            }

            let assumptions = match resolver {
                Some(resolver) => resolver.resolve(instrument),
                None => AssumptionSet::default(),
            };
            let contribution =
                match instrument.compute_contribution(self.calculation_date, &assumptions) {
                    Ok(contribution) => contribution,
                    Err(e) => {
                        warn!(
                            "skipping instrument {} in liquidity gap calculation: {:#}",
                            instrument.get_id(),
                            e
                        );
                        continue;
                    }
                };

            let entry = flows.entry(currency).or_default();
            for (&bucket, &amount) in &contribution.cash_flows {
                let cell = entry.entry(bucket).or_insert((0.0, 0.0));
                if amount > 0.0 {
                    cell.0 += amount;
                } else {
                    cell.1 += amount.abs();
                }
            }
        }

        let mut ladders = FxHashMap::default();
        for (currency, cells) in flows {
            let mut rows = Vec::with_capacity(LiquidityBucket::ALL.len());
            let mut cumulative = 0.0;
            for bucket in LiquidityBucket::ALL {
                let (inflow, outflow) = cells.get(&bucket).copied().unwrap_or((0.0, 0.0));
                let net_gap = inflow - outflow;
                cumulative += net_gap;
                let coverage_ratio = (outflow > 0.0).then(|| inflow / outflow);
                rows.push(LiquidityFlowRow {
                    bucket,
                    inflow,
                    outflow,
                    net_gap,
                    cumulative_gap: cumulative,
                    coverage_ratio,
                });
            }
            info!(
                "liquidity ladder {}: final cumulative gap {:.0}",
                currency,
                rows.last().map(|r| r.cumulative_gap).unwrap_or(0.0)
            );
            ladders.insert(currency, rows);
        }
        Ok(ladders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruments::deposit::Deposit;
    use crate::instruments::inst_info::InstInfo;
    use crate::instruments::loan::Loan;
    use crate::instruments::InstrumentType;
    use assert_approx_eq::assert_approx_eq;
    use time::macros::date;

    const CDATE: Date = date!(2025 - 01 - 15);

    #[test]
    fn test_inflow_outflow_ladder() {
        let loan = Instrument::Loan(Loan {
            info: InstInfo {
                instrument_id: "L-1".to_string(),
                instrument_type: InstrumentType::Loan,
                balance_account: "45502".to_string(),
                amount: 1000.0,
                currency: Currency::RUB,
                start_date: date!(2024 - 01 - 15),
                as_of_date: CDATE,
                maturity_date: Some(date!(2025 - 03 - 01)),
                ..InstInfo::default()
            },
            ..Loan::default()
        });
        let deposit = Instrument::Deposit(Deposit {
            info: InstInfo {
                instrument_id: "D-1".to_string(),
                instrument_type: InstrumentType::Deposit,
                balance_account: "42301".to_string(),
                amount: -400.0,
                currency: Currency::RUB,
                start_date: date!(2024 - 06 - 01),
                as_of_date: CDATE,
                maturity_date: Some(date!(2025 - 02 - 20)),
                ..InstInfo::default()
            },
            ..Deposit::default()
        });

        let calculator = CurrencyLiquidityGapCalculator::new(CDATE, vec![]);
        let ladders = calculator.calculate(&[loan, deposit], None).unwrap();
        let rows = &ladders[&Currency::RUB];
        let row = |bucket: LiquidityBucket| rows.iter().find(|r| r.bucket == bucket).unwrap();

        // Both flows land in 30-90d: inflow 1000 and outflow 400.
        let busy = row(LiquidityBucket::Days30To90);
        assert_approx_eq!(busy.inflow, 1000.0);
        assert_approx_eq!(busy.outflow, 400.0);
        assert_approx_eq!(busy.net_gap, 600.0);
        assert_approx_eq!(busy.coverage_ratio.unwrap(), 2.5);

        let quiet = row(LiquidityBucket::Overnight);
        assert!(quiet.coverage_ratio.is_none());
        assert_approx_eq!(rows.last().unwrap().cumulative_gap, 600.0);
    }
}
