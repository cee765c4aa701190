use crate::contribution::Contribution;
use crate::currency::Currency;
use crate::definitions::Real;
use crate::engine::scenario::{apply_stress, ScenarioParameters};
use crate::error::AlmError;
use crate::instrument::{Instrument, InstrumentTrait};
use crate::risks::assumptions::{AssumptionSet, AssumptionsResolver};
use crate::time::buckets::{LiquidityBucket, RepricingBucket};
use anyhow::{anyhow, Result};
use log::{info, warn};
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use time::Date;

/// Survival horizon reported when no cumulative bucket turns negative.
const MAX_CONTRIBUTION_HORIZON_DAYS: i64 = 1095;

/// Calculation-wide parameters.
#[derive(Debug, Clone, Default)]
pub struct RiskParameters {
    /// Restrict the per-currency gap tables to these currencies; empty means
    /// every currency encountered.
    pub target_currencies: Vec<Currency>,
    /// Run the per-instrument contribution pass on the rayon pool. The
    /// sequential default is bit-stable; the parallel pass is reproducible to
    /// 1e-6 relative tolerance on aggregated totals.
    pub parallel: bool,
}

/// One row of a per-currency liquidity ladder, in canonical bucket order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LiquidityGapRow {
    pub bucket: LiquidityBucket,
    pub gap: Real,
    pub cumulative_gap: Real,
}

/// Aggregated results of one scenario run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub calculation_date: Date,
    /// FX shock metadata carried through from the scenario; exposures are
    /// not translated.
    pub fx_rate_shock_pct: FxHashMap<Currency, Real>,

    pub liquidity_gaps: FxHashMap<Currency, Vec<LiquidityGapRow>>,
    pub survival_horizon_days: FxHashMap<Currency, i64>,

    pub interest_rate_gaps: FxHashMap<Currency, BTreeMap<RepricingBucket, Real>>,
    pub repricing_gap_total: Real,
    /// Simple mean of the reported durations.
    pub duration_gap: Option<Real>,
    pub dv01_total: Real,

    pub fx_positions: FxHashMap<Currency, Real>,
    pub fx_exposure_total: Real,

    pub total_assets: Real,
    pub total_liabilities: Real,
    pub net_position: Real,

    /// Instruments omitted from aggregation after a calculation failure.
    pub skipped_instruments: usize,
}

/// Commutative accumulator for the contribution fold; merging two
/// accumulators is associative, so the parallel reduce is order-insensitive
/// up to floating-point associativity.
#[derive(Debug, Default)]
struct Aggregates {
    liquidity: FxHashMap<Currency, BTreeMap<LiquidityBucket, Real>>,
    repricing: FxHashMap<Currency, BTreeMap<RepricingBucket, Real>>,
    repricing_total: Real,
    duration_sum: Real,
    duration_count: usize,
    dv01_total: Real,
    fx_positions: FxHashMap<Currency, Real>,
    total_assets: Real,
    total_liabilities: Real,
    skipped: usize,
}

impl Aggregates {
    fn add_contribution(&mut self, calculation_date: Date, contribution: &Contribution) {
        for (&bucket, &amount) in &contribution.cash_flows {
            *self
                .liquidity
                .entry(contribution.currency)
                .or_default()
                .entry(bucket)
                .or_insert(0.0) += amount;
        }

        if let Some(repricing_date) = contribution.repricing_date {
            if contribution.repricing_amount != 0.0 {
                if let Some(bucket) = RepricingBucket::assign(calculation_date, repricing_date) {
                    *self
                        .repricing
                        .entry(contribution.currency)
                        .or_default()
                        .entry(bucket)
                        .or_insert(0.0) += contribution.repricing_amount;
                    self.repricing_total += contribution.repricing_amount;
                }
            }
        }

        if let Some(duration) = contribution.duration {
            self.duration_sum += duration;
            self.duration_count += 1;
        }
        if let Some(dv01) = contribution.dv01 {
            self.dv01_total += dv01;
        }

        for (&currency, &exposure) in &contribution.currency_exposure {
            *self.fx_positions.entry(currency).or_insert(0.0) += exposure;
            if exposure > 0.0 {
                self.total_assets += exposure;
            } else {
                self.total_liabilities += exposure.abs();
            }
        }
    }

    fn merge(mut self, other: Aggregates) -> Aggregates {
        for (currency, buckets) in other.liquidity {
            let entry = self.liquidity.entry(currency).or_default();
            for (bucket, amount) in buckets {
                *entry.entry(bucket).or_insert(0.0) += amount;
            }
        }
        for (currency, buckets) in other.repricing {
            let entry = self.repricing.entry(currency).or_default();
            for (bucket, amount) in buckets {
                *entry.entry(bucket).or_insert(0.0) += amount;
            }
        }
        self.repricing_total += other.repricing_total;
        self.duration_sum += other.duration_sum;
        self.duration_count += other.duration_count;
        self.dv01_total += other.dv01_total;
        for (currency, exposure) in other.fx_positions {
            *self.fx_positions.entry(currency).or_insert(0.0) += exposure;
        }
        self.total_assets += other.total_assets;
        self.total_liabilities += other.total_liabilities;
        self.skipped += other.skipped;
        self
    }

    fn finalize(self, scenario: &ScenarioParameters, target: &[Currency]) -> ScenarioResult {
        let in_scope = |currency: &Currency| target.is_empty() || target.contains(currency);

        let mut liquidity_gaps = FxHashMap::default();
        let mut survival_horizon_days = FxHashMap::default();
        for (currency, buckets) in self
            .liquidity
            .iter()
            .filter(|(currency, _)| in_scope(currency))
        {
            let mut rows = Vec::with_capacity(LiquidityBucket::ALL.len());
            let mut cumulative = 0.0;
            let mut horizon = MAX_CONTRIBUTION_HORIZON_DAYS;
            let mut breached = false;
            for bucket in LiquidityBucket::ALL {
                let gap = buckets.get(&bucket).copied().unwrap_or(0.0);
                cumulative += gap;
                if !breached && cumulative < 0.0 {
                    horizon = bucket.horizon_days();
                    breached = true;
                }
                rows.push(LiquidityGapRow {
                    bucket,
                    gap,
                    cumulative_gap: cumulative,
                });
            }
            liquidity_gaps.insert(*currency, rows);
            survival_horizon_days.insert(*currency, horizon);
        }

        let interest_rate_gaps: FxHashMap<Currency, BTreeMap<RepricingBucket, Real>> = self
            .repricing
            .into_iter()
            .filter(|(currency, _)| in_scope(currency))
            .collect();

        let fx_exposure_total = self.fx_positions.values().map(|p| p.abs()).sum();
        let duration_gap = (self.duration_count > 0)
            .then(|| self.duration_sum / self.duration_count as Real);

        ScenarioResult {
            scenario_name: scenario.scenario_name.clone(),
            calculation_date: scenario.calculation_date,
            fx_rate_shock_pct: scenario.fx_rate_shock_pct.clone(),
            liquidity_gaps,
            survival_horizon_days,
            interest_rate_gaps,
            repricing_gap_total: self.repricing_total,
            duration_gap,
            dv01_total: self.dv01_total,
            fx_positions: self.fx_positions,
            fx_exposure_total,
            total_assets: self.total_assets,
            total_liabilities: self.total_liabilities,
            net_position: self.total_assets - self.total_liabilities,
            skipped_instruments: self.skipped,
        }
    }
}

/// Drives stress application, per-instrument contributions and aggregation
/// for one or more scenarios over a fixed instrument set.
pub struct ScenarioCalculator {
    instruments: Vec<Instrument>,
    risk_params: RiskParameters,
}

impl ScenarioCalculator {
    pub fn new(
        instruments: Vec<Instrument>,
        risk_params: RiskParameters,
    ) -> Result<ScenarioCalculator> {
        if instruments.is_empty() {
            return Err(anyhow!(AlmError::EmptyPortfolio));
        }
        info!(
            "initialized scenario calculator with {} instruments",
            instruments.len()
        );
        Ok(ScenarioCalculator {
            instruments,
            risk_params,
        })
    }

    pub fn instruments(&self) -> &[Instrument] {
        &self.instruments
    }

    /// Runs one scenario: stress, per-instrument contributions, aggregation.
    ///
    /// Per-instrument failures are logged, counted and excluded; the run
    /// itself only fails on empty input.
    pub fn calculate_scenario(
        &self,
        scenario: &ScenarioParameters,
        resolver: Option<&AssumptionsResolver>,
    ) -> Result<ScenarioResult> {
        info!("calculating scenario '{}'", scenario.scenario_name);
        let stressed = apply_stress(&self.instruments, scenario);
        let calculation_date = scenario.calculation_date;

        let contribution_of = |instrument: &Instrument| -> Result<Contribution> {
            let assumptions = match resolver {
                Some(resolver) => resolver.resolve(instrument),
                None => AssumptionSet::default(),
            };
            instrument.compute_contribution(calculation_date, &assumptions)
        };

        let fold_one = |mut acc: Aggregates, instrument: &Instrument| -> Aggregates {
            match contribution_of(instrument) {
                Ok(contribution) => acc.add_contribution(calculation_date, &contribution),
                Err(e) => {
                    warn!(
                        "skipping instrument {} ({}): {:#}",
                        instrument.get_id(),
                        instrument.get_type(),
                        e
                    );
                    acc.skipped += 1;
                }
            }
            acc
        };

        let aggregates = if self.risk_params.parallel {
            stressed
                .par_iter()
                .fold(Aggregates::default, fold_one)
                .reduce(Aggregates::default, Aggregates::merge)
        } else {
            stressed.iter().fold(Aggregates::default(), fold_one)
        };

        let result = aggregates.finalize(scenario, &self.risk_params.target_currencies);
        info!(
            "scenario '{}': assets {:.0}, liabilities {:.0}, net {:.0}, skipped {}",
            result.scenario_name,
            result.total_assets,
            result.total_liabilities,
            result.net_position,
            result.skipped_instruments
        );
        Ok(result)
    }

    /// Runs a list of scenarios against the same instrument set.
    pub fn compare_scenarios(
        &self,
        scenarios: &[ScenarioParameters],
        resolver: Option<&AssumptionsResolver>,
    ) -> Result<Vec<ScenarioResult>> {
        scenarios
            .iter()
            .map(|scenario| self.calculate_scenario(scenario, resolver))
            .collect()
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

    fn loan(id: &str, amount: f64, maturity: Date, rate: f64) -> Instrument {
        Instrument::Loan(Loan {
            info: InstInfo {
                instrument_id: id.to_string(),
                instrument_type: InstrumentType::Loan,
                balance_account: "45502".to_string(),
                amount,
                currency: Currency::RUB,
                start_date: date!(2024 - 01 - 15),
                as_of_date: CDATE,
                maturity_date: Some(maturity),
                interest_rate: Some(rate),
                ..InstInfo::default()
            },
            ..Loan::default()
        })
    }

    fn deposit(id: &str, amount: f64, maturity: Date, rate: f64) -> Instrument {
        Instrument::Deposit(Deposit {
            info: InstInfo {
                instrument_id: id.to_string(),
                instrument_type: InstrumentType::Deposit,
                balance_account: "42301".to_string(),
                amount,
                currency: Currency::RUB,
                start_date: date!(2024 - 06 - 01),
                as_of_date: CDATE,
                maturity_date: Some(maturity),
                interest_rate: Some(rate),
                ..InstInfo::default()
            },
            ..Deposit::default()
        })
    }

    /// One asset and one liability, the canonical smoke portfolio.
    fn small_portfolio() -> Vec<Instrument> {
        vec![
            loan("L-1", 1000.0, date!(2026 - 01 - 15), 0.10),
            deposit("D-1", -600.0, date!(2025 - 04 - 15), 0.05),
        ]
    }

    #[test]
    fn test_baseline_single_asset_single_liability() {
        let calculator =
            ScenarioCalculator::new(small_portfolio(), RiskParameters::default()).unwrap();
        let result = calculator
            .calculate_scenario(&ScenarioParameters::baseline(CDATE), None)
            .unwrap();

        assert_approx_eq!(result.fx_positions[&Currency::RUB], 400.0);
        assert_approx_eq!(result.net_position, 400.0);
        assert_approx_eq!(result.total_assets, 1000.0);
        assert_approx_eq!(result.total_liabilities, 600.0);
        assert_approx_eq!(result.repricing_gap_total, 400.0);

        let irr = &result.interest_rate_gaps[&Currency::RUB];
        assert_approx_eq!(irr[&RepricingBucket::Months6To12], 1000.0);
        assert_approx_eq!(irr[&RepricingBucket::Months1To3], -600.0);

        let liquidity = &result.liquidity_gaps[&Currency::RUB];
        let row = |bucket: LiquidityBucket| {
            liquidity.iter().find(|r| r.bucket == bucket).unwrap().clone()
        };
        assert_approx_eq!(row(LiquidityBucket::Days180To365).gap, 1000.0);
        assert_approx_eq!(row(LiquidityBucket::Days30To90).gap, -600.0);

        // The deposit outflow precedes the loan inflow, so the cumulative
        // position dips negative in 30-90d.
        assert_eq!(result.survival_horizon_days[&Currency::RUB], 90);
        assert_eq!(result.skipped_instruments, 0);
    }

    #[test]
    fn test_deposit_run_scenario() {
        let calculator =
            ScenarioCalculator::new(small_portfolio(), RiskParameters::default()).unwrap();
        let result = calculator
            .calculate_scenario(&ScenarioParameters::deposit_run(CDATE, 50.0), None)
            .unwrap();

        let irr = &result.interest_rate_gaps[&Currency::RUB];
        assert_approx_eq!(irr[&RepricingBucket::Months1To3], -300.0);
        assert_approx_eq!(result.net_position, 700.0);
    }

    #[test]
    fn test_compare_scenarios_preserves_order() {
        let calculator =
            ScenarioCalculator::new(small_portfolio(), RiskParameters::default()).unwrap();
        let scenarios = [
            ScenarioParameters::baseline(CDATE),
            ScenarioParameters::deposit_run(CDATE, 50.0),
            ScenarioParameters::combined_stress(CDATE),
        ];
        let results = calculator.compare_scenarios(&scenarios, None).unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].scenario_name, "Baseline");
        assert_approx_eq!(results[1].net_position, 700.0);
        assert!(results[2].net_position > results[0].net_position);
    }

    #[test]
    fn test_rate_shock_leaves_gaps_unchanged() {
        let calculator =
            ScenarioCalculator::new(small_portfolio(), RiskParameters::default()).unwrap();
        let baseline = calculator
            .calculate_scenario(&ScenarioParameters::baseline(CDATE), None)
            .unwrap();
        let shocked = calculator
            .calculate_scenario(&ScenarioParameters::parallel_rate_shock(CDATE, 100.0), None)
            .unwrap();

        assert_eq!(baseline.interest_rate_gaps, shocked.interest_rate_gaps);
        assert_eq!(baseline.fx_positions, shocked.fx_positions);
        // The shock lowers modified duration slightly, so DV01 moves.
        assert!(baseline.dv01_total != shocked.dv01_total);
    }

    #[test]
    fn test_aggregation_linearity() {
        let part_a = vec![loan("L-1", 1000.0, date!(2026 - 01 - 15), 0.10)];
        let part_b = vec![deposit("D-1", -600.0, date!(2025 - 04 - 15), 0.05)];
        let scenario = ScenarioParameters::baseline(CDATE);

        let whole = ScenarioCalculator::new(small_portfolio(), RiskParameters::default())
            .unwrap()
            .calculate_scenario(&scenario, None)
            .unwrap();
        let a = ScenarioCalculator::new(part_a, RiskParameters::default())
            .unwrap()
            .calculate_scenario(&scenario, None)
            .unwrap();
        let b = ScenarioCalculator::new(part_b, RiskParameters::default())
            .unwrap()
            .calculate_scenario(&scenario, None)
            .unwrap();

        assert_approx_eq!(whole.net_position, a.net_position + b.net_position);
        assert_approx_eq!(
            whole.repricing_gap_total,
            a.repricing_gap_total + b.repricing_gap_total
        );
        assert_approx_eq!(whole.dv01_total, a.dv01_total + b.dv01_total);
        assert_approx_eq!(
            whole.fx_positions[&Currency::RUB],
            a.fx_positions[&Currency::RUB] + b.fx_positions[&Currency::RUB]
        );
    }

    #[test]
    fn test_parallel_pass_matches_sequential_within_tolerance() {
        let mut instruments = Vec::new();
        for i in 0..200 {
            instruments.push(loan(
                &format!("L-{}", i),
                1000.0 + i as f64,
                date!(2026 - 01 - 15),
                0.10,
            ));
            instruments.push(deposit(
                &format!("D-{}", i),
                -600.0 - i as f64,
                date!(2025 - 04 - 15),
                0.05,
            ));
        }
        let scenario = ScenarioParameters::baseline(CDATE);

        let sequential = ScenarioCalculator::new(instruments.clone(), RiskParameters::default())
            .unwrap()
            .calculate_scenario(&scenario, None)
            .unwrap();
        let parallel_params = RiskParameters {
            parallel: true,
            ..RiskParameters::default()
        };
        let parallel = ScenarioCalculator::new(instruments, parallel_params)
            .unwrap()
            .calculate_scenario(&scenario, None)
            .unwrap();

        let tolerance = 1e-6 * sequential.total_assets.abs();
        assert!((sequential.total_assets - parallel.total_assets).abs() <= tolerance);
        assert!((sequential.net_position - parallel.net_position).abs() <= tolerance);
        assert!(
            (sequential.repricing_gap_total - parallel.repricing_gap_total).abs() <= tolerance
        );
    }

    #[test]
    fn test_failing_instrument_is_isolated() {
        let mut broken = small_portfolio();
        // An interbank deal without a maturity cannot be computed.
        broken.push(Instrument::InterbankLoan(
            crate::instruments::interbank::InterbankLoan {
                info: InstInfo {
                    instrument_id: "MBK-broken".to_string(),
                    instrument_type: InstrumentType::InterbankLoan,
                    balance_account: "32002".to_string(),
                    amount: 100.0,
                    currency: Currency::RUB,
                    start_date: date!(2025 - 01 - 10),
                    as_of_date: CDATE,
                    ..InstInfo::default()
                },
                ..crate::instruments::interbank::InterbankLoan::default()
            },
        ));

        let calculator = ScenarioCalculator::new(broken, RiskParameters::default()).unwrap();
        let result = calculator
            .calculate_scenario(&ScenarioParameters::baseline(CDATE), None)
            .unwrap();
        assert_eq!(result.skipped_instruments, 1);
        assert_approx_eq!(result.net_position, 400.0);
    }

    #[test]
    fn test_empty_portfolio_is_fatal() {
        assert!(ScenarioCalculator::new(vec![], RiskParameters::default()).is_err());
    }
}
