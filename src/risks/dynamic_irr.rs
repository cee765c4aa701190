use crate::currency::Currency;
use crate::definitions::Real;
use crate::enums::{BookType, CustomerSegment, DepositType};
use crate::instrument::{Instrument, InstrumentTrait};
use crate::risks::assumptions::AssumptionsResolver;
use crate::risks::elasticity::{
    default_elasticity_config, DepositElasticityCalculator, DepositVolumeChange,
    ElasticityParameters,
};
use crate::risks::irr_gaps::{GapRow, InterestRateGapCalculator, RateSensitivity};
use anyhow::Result;
use log::info;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use time::Date;

/// Shock applied to a ladder whose currency has no entry in the shock map.
const DEFAULT_SENSITIVITY_SHOCK_BPS: Real = 100.0;

/// Per-bucket difference between the dynamic and the static ladder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GapDeltaRow {
    pub bucket: crate::time::buckets::RepricingBucket,
    pub rsa_diff: Real,
    pub rsl_diff: Real,
    pub gap_diff: Real,
    pub gap_ratio_diff: Real,
}

/// Differences between the static and dynamic runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IrrComparison {
    pub gap_differences: FxHashMap<Currency, Vec<GapDeltaRow>>,
    pub nii_impact_difference: FxHashMap<Currency, Real>,
    pub eve_impact_difference: FxHashMap<Currency, Real>,
}

/// One leg (static or dynamic) of the dynamic-balance result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrrLeg {
    pub gaps: FxHashMap<Currency, Vec<GapRow>>,
    pub sensitivity: FxHashMap<Currency, RateSensitivity>,
}

/// Result of the dynamic-balance IRR run: the static ladder, the ladder on
/// the elasticity-adjusted balance sheet, and their differences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DynamicIrrResult {
    pub static_leg: IrrLeg,
    pub dynamic_leg: IrrLeg,
    pub volume_changes: Vec<DepositVolumeChange>,
    pub comparison: IrrComparison,
}

/// Composes the elasticity engine with the gap calculator: the deposit base
/// is re-priced against the rate shocks and the gap ladder is rebuilt on the
/// resulting dynamic balance sheet.
pub struct DynamicBalanceIrrCalculator {
    gap_calculator: InterestRateGapCalculator,
    elasticity_calculator: DepositElasticityCalculator,
}

impl DynamicBalanceIrrCalculator {
    pub fn new(
        calculation_date: Date,
        target_currencies: Vec<Currency>,
        elasticity_params: Option<
            FxHashMap<(CustomerSegment, DepositType), ElasticityParameters>,
        >,
    ) -> DynamicBalanceIrrCalculator {
        let params = elasticity_params.unwrap_or_else(default_elasticity_config);
        DynamicBalanceIrrCalculator {
            gap_calculator: InterestRateGapCalculator::new(calculation_date, target_currencies),
            elasticity_calculator: DepositElasticityCalculator::new(calculation_date, params),
        }
    }

    /// Runs the static/dynamic/comparison triple. With all-zero shocks the
    /// deposit base is unchanged and both legs are identical.
    pub fn calculate(
        &self,
        instruments: &[Instrument],
        rate_shocks: &FxHashMap<Currency, Real>,
        resolver: Option<&AssumptionsResolver>,
        book_filter: Option<BookType>,
    ) -> Result<DynamicIrrResult> {
        let scoped: Vec<Instrument> = match book_filter {
            Some(book) => instruments
                .iter()
                .filter(|inst| inst.get_book() == book)
                .cloned()
                .collect(),
            None => instruments.to_vec(),
        };

        info!(
            "dynamic balance IRR over {} instruments ({} shocked currencies)",
            scoped.len(),
            rate_shocks.len()
        );

        // 1. Static ladder on the raw balance sheet.
        let static_gaps = self.gap_calculator.calculate(&scoped, resolver)?;
        let static_sensitivity = self.gap_calculator.calculate_sensitivity_with_shocks(
            &static_gaps,
            rate_shocks,
            DEFAULT_SENSITIVITY_SHOCK_BPS,
        );

        // 2. Elasticity: re-price the deposit base.
        let mut deposits = Vec::new();
        let mut non_deposits = Vec::new();
        for instrument in scoped {
            match instrument {
                Instrument::Deposit(deposit) => deposits.push(deposit),
                other => non_deposits.push(other),
            }
        }
        let (dynamic_deposits, volume_changes) = self
            .elasticity_calculator
            .create_dynamic_deposits(&deposits, rate_shocks);

        // 3. Dynamic ladder on non-deposits plus the re-priced deposits.
        let mut dynamic_instruments = non_deposits;
        dynamic_instruments.extend(dynamic_deposits.into_iter().map(Instrument::Deposit));
        let dynamic_gaps = self.gap_calculator.calculate(&dynamic_instruments, resolver)?;
        let dynamic_sensitivity = self.gap_calculator.calculate_sensitivity_with_shocks(
            &dynamic_gaps,
            rate_shocks,
            DEFAULT_SENSITIVITY_SHOCK_BPS,
        );

        // 4. Element-wise comparison.
        let comparison = compare_legs(
            &static_gaps,
            &static_sensitivity,
            &dynamic_gaps,
            &dynamic_sensitivity,
        );

        Ok(DynamicIrrResult {
            static_leg: IrrLeg {
                gaps: static_gaps,
                sensitivity: static_sensitivity,
            },
            dynamic_leg: IrrLeg {
                gaps: dynamic_gaps,
                sensitivity: dynamic_sensitivity,
            },
            volume_changes,
            comparison,
        })
    }

    /// Runs the triple for several named shock sets.
    pub fn calculate_scenarios(
        &self,
        instruments: &[Instrument],
        scenarios: &[(String, FxHashMap<Currency, Real>)],
        resolver: Option<&AssumptionsResolver>,
        book_filter: Option<BookType>,
    ) -> Result<Vec<(String, DynamicIrrResult)>> {
        scenarios
            .iter()
            .map(|(name, shocks)| {
                info!("dynamic IRR scenario '{}'", name);
                self.calculate(instruments, shocks, resolver, book_filter)
                    .map(|result| (name.clone(), result))
            })
            .collect()
    }
}

fn compare_legs(
    static_gaps: &FxHashMap<Currency, Vec<GapRow>>,
    static_sensitivity: &FxHashMap<Currency, RateSensitivity>,
    dynamic_gaps: &FxHashMap<Currency, Vec<GapRow>>,
    dynamic_sensitivity: &FxHashMap<Currency, RateSensitivity>,
) -> IrrComparison {
    let mut comparison = IrrComparison::default();

    for (currency, static_rows) in static_gaps {
        let Some(dynamic_rows) = dynamic_gaps.get(currency) else {
            continue;
        };
        let deltas = static_rows
            .iter()
            .zip(dynamic_rows)
            .map(|(s, d)| GapDeltaRow {
                bucket: s.bucket,
                rsa_diff: d.rsa - s.rsa,
                rsl_diff: d.rsl - s.rsl,
                gap_diff: d.gap - s.gap,
                gap_ratio_diff: d.gap_ratio - s.gap_ratio,
            })
            .collect();
        comparison.gap_differences.insert(*currency, deltas);

        if let (Some(s), Some(d)) = (
            static_sensitivity.get(currency),
            dynamic_sensitivity.get(currency),
        ) {
            comparison
                .nii_impact_difference
                .insert(*currency, d.nii_impact_1y - s.nii_impact_1y);
            comparison
                .eve_impact_difference
                .insert(*currency, d.eve_impact - s.eve_impact);
        }
    }

    comparison
}
