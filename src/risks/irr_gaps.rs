use crate::currency::Currency;
use crate::definitions::Real;
use crate::instrument::{Instrument, InstrumentTrait};
use crate::risks::assumptions::{AssumptionSet, AssumptionsResolver};
use crate::time::buckets::RepricingBucket;
use anyhow::Result;
use log::{info, warn};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use time::Date;

/// Gap ratios beyond this bound flag a limit breach.
const GAP_RATIO_LIMIT: Real = 0.20;

/// One row of a repricing-gap ladder, in canonical bucket order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GapRow {
    pub bucket: RepricingBucket,
    /// Rate-sensitive assets repricing in the bucket.
    pub rsa: Real,
    /// Rate-sensitive liabilities repricing in the bucket (absolute value).
    pub rsl: Real,
    pub gap: Real,
    /// Gap over total rate-sensitive assets, zero when there are none.
    pub gap_ratio: Real,
    pub cumulative_gap: Real,
}

/// Sensitivity of the gap ladder to a parallel rate shock.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RateSensitivity {
    pub nii_impact_1y: Real,
    pub eve_impact: Real,
    pub gap_limits_breached: bool,
    pub rate_shock_bps: Real,
}

/// Builds per-currency repricing-gap ladders from instrument contributions
/// and evaluates their NII and EVE sensitivity.
pub struct InterestRateGapCalculator {
    calculation_date: Date,
    /// Empty means every currency encountered.
    target_currencies: Vec<Currency>,
}

impl InterestRateGapCalculator {
    pub fn new(calculation_date: Date, target_currencies: Vec<Currency>) -> Self {
        InterestRateGapCalculator {
            calculation_date,
            target_currencies,
        }
    }

    /// The per-currency gap ladder. Instruments that fail to compute are
    /// logged and omitted; repricing dates in the past are discarded.
    pub fn calculate(
        &self,
        instruments: &[Instrument],
        resolver: Option<&AssumptionsResolver>,
    ) -> Result<FxHashMap<Currency, Vec<GapRow>>> {
        let mut repricing: FxHashMap<Currency, BTreeMap<RepricingBucket, (Real, Real)>> =
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
                            "skipping instrument {} in gap calculation: {:#}",
                            instrument.get_id(),
                            e
                        );
                        continue;
                    }
                };

            let Some(repricing_date) = contribution.repricing_date else {
                continue;
            };
            let Some(bucket) = RepricingBucket::assign(self.calculation_date, repricing_date)
            else {
                continue;
            };

            let cell = repricing
                .entry(currency)
                .or_default()
                .entry(bucket)
                .or_insert((0.0, 0.0));
            if contribution.repricing_amount > 0.0 {
                cell.0 += contribution.repricing_amount;
            } else {
                cell.1 += contribution.repricing_amount.abs();
            }
        }

        let mut ladders = FxHashMap::default();
        for (currency, cells) in repricing {
            let total_rsa: Real = cells.values().map(|(rsa, _)| rsa).sum();
            let mut rows = Vec::with_capacity(RepricingBucket::ALL.len());
            let mut cumulative = 0.0;
            for bucket in RepricingBucket::ALL {
                let (rsa, rsl) = cells.get(&bucket).copied().unwrap_or((0.0, 0.0));
                let gap = rsa - rsl;
                let gap_ratio = if total_rsa > 0.0 { gap / total_rsa } else { 0.0 };
                cumulative += gap;
                rows.push(GapRow {
                    bucket,
                    rsa,
                    rsl,
                    gap,
                    gap_ratio,
                    cumulative_gap: cumulative,
                });
            }
            info!(
                "repricing ladder {}: total RSA {:.0}, cumulative gap {:.0}",
                currency,
                total_rsa,
                rows.last().map(|r| r.cumulative_gap).unwrap_or(0.0)
            );
            ladders.insert(currency, rows);
        }
        Ok(ladders)
    }

    /// Sensitivity of each ladder under one parallel shock in basis points.
    pub fn calculate_sensitivity(
        &self,
        ladders: &FxHashMap<Currency, Vec<GapRow>>,
        rate_shock_bps: Real,
    ) -> FxHashMap<Currency, RateSensitivity> {
        ladders
            .iter()
            .map(|(&currency, rows)| {
                (currency, sensitivity_of(rows, rate_shock_bps))
            })
            .collect()
    }

    /// Sensitivity with a per-currency shock lookup; currencies without an
    /// entry use the default shock.
    pub fn calculate_sensitivity_with_shocks(
        &self,
        ladders: &FxHashMap<Currency, Vec<GapRow>>,
        rate_shocks: &FxHashMap<Currency, Real>,
        default_shock_bps: Real,
    ) -> FxHashMap<Currency, RateSensitivity> {
        ladders
            .iter()
            .map(|(&currency, rows)| {
                let shock = rate_shocks.get(&currency).copied().unwrap_or(default_shock_bps);
                (currency, sensitivity_of(rows, shock))
            })
            .collect()
    }
}

fn sensitivity_of(rows: &[GapRow], rate_shock_bps: Real) -> RateSensitivity {
    let rate_shock = rate_shock_bps / 10_000.0;

    let nii_impact_1y: Real = rows
        .iter()
        .filter(|row| RepricingBucket::WITHIN_1Y.contains(&row.bucket))
        .map(|row| row.gap)
        .sum::<Real>()
        * rate_shock;

    let eve_impact: Real = -rows
        .iter()
        .map(|row| row.gap * row.bucket.duration_midpoint_years() * rate_shock)
        .sum::<Real>();

    let gap_limits_breached = rows.iter().any(|row| row.gap_ratio.abs() > GAP_RATIO_LIMIT);

    RateSensitivity {
        nii_impact_1y,
        eve_impact,
        gap_limits_breached,
        rate_shock_bps,
    }
}
