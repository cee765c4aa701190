use crate::currency::Currency;
use crate::definitions::Real;
use crate::enums::{CustomerSegment, DepositType};
use crate::error::AlmError;
use crate::instruments::deposit::Deposit;
use anyhow::{anyhow, Result};
use log::{debug, info, warn};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::Date;

/// Shocks below this size (in bps) are treated as no change.
const MIN_SHOCK_BPS: Real = 0.01;

/// Volume response parameters for one (segment, deposit type) cell.
///
/// Elasticity is the percent change of deposit volume per percentage point of
/// rate change; deposits normally carry a negative value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ElasticityParameters {
    pub customer_segment: CustomerSegment,
    pub deposit_type: DepositType,

    pub base_elasticity: Real,

    pub elasticity_ceiling: Option<Real>,
    pub elasticity_floor: Option<Real>,

    // Piecewise model around a rate-change threshold (percentage points)
    pub threshold_rate_change: Option<Real>,
    pub below_threshold_elasticity: Option<Real>,
    pub above_threshold_elasticity: Option<Real>,

    // Sign-dependent model
    pub asymmetric: bool,
    pub positive_shock_elasticity: Option<Real>,
    pub negative_shock_elasticity: Option<Real>,

    /// Fraction of the full response realized over the period, 0..=1.
    pub adjustment_speed: Real,
    pub lag_days: i64,

    /// Market competitiveness multiplier, > 1 in contested markets.
    pub competitive_factor: Real,

    /// Symmetric cap on the relative volume change.
    pub max_volume_change: Option<Real>,
    /// Floor on the remaining volume as a fraction of the original.
    pub min_remaining_volume: Option<Real>,
}

impl Default for ElasticityParameters {
    fn default() -> ElasticityParameters {
        ElasticityParameters {
            customer_segment: CustomerSegment::Retail,
            deposit_type: DepositType::Demand,
            base_elasticity: 0.0,
            elasticity_ceiling: None,
            elasticity_floor: None,
            threshold_rate_change: None,
            below_threshold_elasticity: None,
            above_threshold_elasticity: None,
            asymmetric: false,
            positive_shock_elasticity: None,
            negative_shock_elasticity: None,
            adjustment_speed: 1.0,
            lag_days: 0,
            competitive_factor: 1.0,
            max_volume_change: None,
            min_remaining_volume: None,
        }
    }
}

impl ElasticityParameters {
    /// Retail demand deposits: inert on rising rates, quicker to leave on
    /// falling ones.
    pub fn retail_demand_default() -> ElasticityParameters {
        ElasticityParameters {
            customer_segment: CustomerSegment::Retail,
            deposit_type: DepositType::Demand,
            base_elasticity: -0.3,
            asymmetric: true,
            positive_shock_elasticity: Some(-0.2),
            negative_shock_elasticity: Some(-0.4),
            adjustment_speed: 0.5,
            lag_days: 30,
            max_volume_change: Some(0.15),
            min_remaining_volume: Some(0.60),
            ..ElasticityParameters::default()
        }
    }

    /// Retail term deposits: threshold response, repricing-driven churn.
    pub fn retail_term_default(deposit_type: DepositType) -> ElasticityParameters {
        ElasticityParameters {
            customer_segment: CustomerSegment::Retail,
            deposit_type,
            base_elasticity: -0.5,
            asymmetric: true,
            positive_shock_elasticity: Some(-0.6),
            negative_shock_elasticity: Some(-0.4),
            threshold_rate_change: Some(1.0),
            below_threshold_elasticity: Some(-0.3),
            above_threshold_elasticity: Some(-0.8),
            adjustment_speed: 0.7,
            lag_days: 7,
            max_volume_change: Some(0.25),
            min_remaining_volume: Some(0.50),
            ..ElasticityParameters::default()
        }
    }

    /// Corporate balances: rate-shopped, near-instant adjustment.
    pub fn corporate_default(deposit_type: DepositType) -> ElasticityParameters {
        ElasticityParameters {
            customer_segment: CustomerSegment::Corporate,
            deposit_type,
            base_elasticity: -0.8,
            adjustment_speed: 0.9,
            lag_days: 1,
            competitive_factor: 1.5,
            max_volume_change: Some(0.40),
            min_remaining_volume: Some(0.30),
            ..ElasticityParameters::default()
        }
    }
}

/// The default per-segment configuration table.
pub fn default_elasticity_config(
) -> FxHashMap<(CustomerSegment, DepositType), ElasticityParameters> {
    let mut config = FxHashMap::default();

    config.insert(
        (CustomerSegment::Retail, DepositType::Demand),
        ElasticityParameters::retail_demand_default(),
    );
    config.insert(
        (CustomerSegment::Retail, DepositType::ShortTerm),
        ElasticityParameters::retail_term_default(DepositType::ShortTerm),
    );
    config.insert(
        (CustomerSegment::Retail, DepositType::MediumTerm),
        ElasticityParameters::retail_term_default(DepositType::MediumTerm),
    );
    config.insert(
        (CustomerSegment::Retail, DepositType::LongTerm),
        ElasticityParameters {
            customer_segment: CustomerSegment::Retail,
            deposit_type: DepositType::LongTerm,
            base_elasticity: -0.3,
            adjustment_speed: 0.3,
            lag_days: 90,
            max_volume_change: Some(0.10),
            min_remaining_volume: Some(0.70),
            ..ElasticityParameters::default()
        },
    );

    for deposit_type in [
        DepositType::Demand,
        DepositType::ShortTerm,
        DepositType::MediumTerm,
        DepositType::LongTerm,
    ] {
        config.insert(
            (CustomerSegment::Corporate, deposit_type),
            ElasticityParameters::corporate_default(deposit_type),
        );
    }

    config.insert(
        (CustomerSegment::Sme, DepositType::ShortTerm),
        ElasticityParameters {
            customer_segment: CustomerSegment::Sme,
            deposit_type: DepositType::ShortTerm,
            base_elasticity: -0.6,
            adjustment_speed: 0.8,
            lag_days: 3,
            max_volume_change: Some(0.30),
            min_remaining_volume: Some(0.40),
            ..ElasticityParameters::default()
        },
    );

    config
}

/// Parses an `elasticity.<segment>.<type>` configuration object into the
/// parameter table.
pub fn elasticity_config_from_json(
    config: &Value,
) -> Result<FxHashMap<(CustomerSegment, DepositType), ElasticityParameters>> {
    let Value::Object(segments) = config else {
        return Err(anyhow!(AlmError::Configuration(
            "elasticity configuration must be an object".to_string()
        )));
    };

    let mut table = FxHashMap::default();
    for (segment_key, types) in segments {
        let segment: CustomerSegment = serde_json::from_value(Value::from(segment_key.as_str()))
            .map_err(|_| {
                anyhow!(AlmError::Configuration(format!(
                    "unknown customer segment '{}'",
                    segment_key
                )))
            })?;
        let Value::Object(types) = types else {
            return Err(anyhow!(AlmError::Configuration(format!(
                "elasticity.{} must be an object",
                segment_key
            ))));
        };
        for (type_key, params) in types {
            let deposit_type: DepositType =
                serde_json::from_value(Value::from(type_key.as_str())).map_err(|_| {
                    anyhow!(AlmError::Configuration(format!(
                        "unknown deposit type '{}'",
                        type_key
                    )))
                })?;
            let mut params: ElasticityParameters = serde_json::from_value(params.clone())
                .map_err(|e| {
                    anyhow!(AlmError::Configuration(format!(
                        "elasticity.{}.{}: {}",
                        segment_key, type_key, e
                    )))
                })?;
            params.customer_segment = segment;
            params.deposit_type = deposit_type;
            table.insert((segment, deposit_type), params);
        }
    }
    Ok(table)
}

/// One deposit's volume response to a rate shock.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DepositVolumeChange {
    pub instrument_id: String,
    pub currency: Currency,
    /// Signed amounts, matching the instrument's storage convention.
    pub original_amount: Real,
    pub new_amount: Real,
    pub volume_change: Real,
    pub volume_change_pct: Real,
    pub rate_change_bps: Real,
    pub elasticity_used: Real,
    pub customer_segment: CustomerSegment,
    pub deposit_type: DepositType,
}

/// Applies the volume-response model to deposits under per-currency rate
/// shocks, producing the dynamic deposit set.
pub struct DepositElasticityCalculator {
    calculation_date: Date,
    parameters: FxHashMap<(CustomerSegment, DepositType), ElasticityParameters>,
}

impl DepositElasticityCalculator {
    pub fn new(
        calculation_date: Date,
        parameters: FxHashMap<(CustomerSegment, DepositType), ElasticityParameters>,
    ) -> DepositElasticityCalculator {
        DepositElasticityCalculator {
            calculation_date,
            parameters,
        }
    }

    pub fn with_defaults(calculation_date: Date) -> DepositElasticityCalculator {
        DepositElasticityCalculator::new(calculation_date, default_elasticity_config())
    }

    /// Volume changes for every deposit whose currency is shocked and whose
    /// segment has parameters. `segment_mapper` overrides the default
    /// counterparty-type segmentation.
    pub fn calculate_volume_changes(
        &self,
        deposits: &[Deposit],
        rate_shocks: &FxHashMap<Currency, Real>,
        segment_mapper: Option<&dyn Fn(&Deposit) -> CustomerSegment>,
    ) -> Vec<DepositVolumeChange> {
        let mut changes = Vec::new();

        for deposit in deposits {
            let shock_bps = rate_shocks
                .get(&deposit.info.currency)
                .copied()
                .unwrap_or(0.0);
            if shock_bps.abs() < MIN_SHOCK_BPS {
                continue;
            }

            let segment = self.determine_segment(deposit, segment_mapper);
            let deposit_type = self.determine_deposit_type(deposit);

            let params = self
                .parameters
                .get(&(segment, deposit_type))
                .or_else(|| self.parameters.get(&(segment, DepositType::Demand)));
            let Some(params) = params else {
                warn!(
                    "no elasticity parameters for {}/{}, skipping deposit {}",
                    segment.as_str(),
                    deposit_type.as_str(),
                    deposit.info.instrument_id
                );
                continue;
            };

            changes.push(self.single_deposit_change(
                deposit,
                shock_bps,
                params,
                segment,
                deposit_type,
            ));
        }

        info!(
            "elasticity pass produced {} volume changes out of {} deposits",
            changes.len(),
            deposits.len()
        );
        changes
    }

    /// The dynamic deposit set: affected deposits cloned with the shocked
    /// amount, everything else cloned unchanged.
    pub fn create_dynamic_deposits(
        &self,
        deposits: &[Deposit],
        rate_shocks: &FxHashMap<Currency, Real>,
    ) -> (Vec<Deposit>, Vec<DepositVolumeChange>) {
        let changes = self.calculate_volume_changes(deposits, rate_shocks, None);
        let by_id: FxHashMap<&str, &DepositVolumeChange> = changes
            .iter()
            .map(|c| (c.instrument_id.as_str(), c))
            .collect();

        let dynamic = deposits
            .iter()
            .map(|deposit| {
                let mut copy = deposit.clone();
                if let Some(change) = by_id.get(deposit.info.instrument_id.as_str()) {
                    copy.info.amount = change.new_amount;
                }
                copy
            })
            .collect();
        (dynamic, changes)
    }

    fn determine_segment(
        &self,
        deposit: &Deposit,
        mapper: Option<&dyn Fn(&Deposit) -> CustomerSegment>,
    ) -> CustomerSegment {
        match mapper {
            Some(f) => f(deposit),
            None => CustomerSegment::from_counterparty(deposit.info.counterparty_type),
        }
    }

    fn determine_deposit_type(&self, deposit: &Deposit) -> DepositType {
        if deposit.is_demand_deposit {
            return DepositType::Demand;
        }
        DepositType::from_days_to_maturity(deposit.info.days_to_maturity(self.calculation_date))
    }

    fn single_deposit_change(
        &self,
        deposit: &Deposit,
        shock_bps: Real,
        params: &ElasticityParameters,
        segment: CustomerSegment,
        deposit_type: DepositType,
    ) -> DepositVolumeChange {
        let rate_change_pp = shock_bps / 100.0;
        let elasticity = select_elasticity(rate_change_pp, params);

        let mut volume_change_pct =
            elasticity * rate_change_pp * params.adjustment_speed * params.competitive_factor;
        if let Some(cap) = params.max_volume_change {
            volume_change_pct = volume_change_pct.clamp(-cap, cap);
        }

        // The response is computed on the volume and the stored sign is
        // re-applied, so signed and magnitude storage behave identically.
        let original_amount = deposit.info.amount;
        let sign: Real = if original_amount < 0.0 { -1.0 } else { 1.0 };
        let volume = original_amount.abs();

        let mut new_volume = volume * (1.0 + volume_change_pct);
        if let Some(floor) = params.min_remaining_volume {
            new_volume = new_volume.max(volume * floor);
        }
        new_volume = new_volume.max(0.0);

        let new_amount = new_volume * sign;
        let volume_change = new_amount - original_amount;
        let volume_change_pct_actual = if volume > 0.0 {
            (new_volume - volume) / volume
        } else {
            0.0
        };

        debug!(
            "deposit {}: shock {} bps, elasticity {}, volume {} -> {}",
            deposit.info.instrument_id, shock_bps, elasticity, volume, new_volume
        );

        DepositVolumeChange {
            instrument_id: deposit.info.instrument_id.clone(),
            currency: deposit.info.currency,
            original_amount,
            new_amount,
            volume_change,
            volume_change_pct: volume_change_pct_actual,
            rate_change_bps: shock_bps,
            elasticity_used: elasticity,
            customer_segment: segment,
            deposit_type,
        }
    }
}

/// Elasticity selection order: asymmetric, then threshold, then base; the
/// result is clipped into the configured ceiling/floor band.
fn select_elasticity(rate_change_pp: Real, params: &ElasticityParameters) -> Real {
    let mut elasticity = if params.asymmetric
        && rate_change_pp > 0.0
        && params.positive_shock_elasticity.is_some()
    {
        params.positive_shock_elasticity.unwrap_or(params.base_elasticity)
    } else if params.asymmetric
        && rate_change_pp < 0.0
        && params.negative_shock_elasticity.is_some()
    {
        params.negative_shock_elasticity.unwrap_or(params.base_elasticity)
    } else if let (Some(threshold), Some(below), Some(above)) = (
        params.threshold_rate_change,
        params.below_threshold_elasticity,
        params.above_threshold_elasticity,
    ) {
        if rate_change_pp.abs() < threshold {
            below
        } else {
            above
        }
    } else {
        params.base_elasticity
    };

    if let Some(ceiling) = params.elasticity_ceiling {
        elasticity = elasticity.min(ceiling);
    }
    if let Some(floor) = params.elasticity_floor {
        elasticity = elasticity.max(floor);
    }
    elasticity
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::CounterpartyType;
    use crate::instruments::inst_info::InstInfo;
    use crate::instruments::InstrumentType;
    use assert_approx_eq::assert_approx_eq;
    use serde_json::json;
    use time::macros::date;

    fn deposit(id: &str, amount: f64, counterparty: CounterpartyType) -> Deposit {
        Deposit {
            info: InstInfo {
                instrument_id: id.to_string(),
                instrument_type: InstrumentType::Deposit,
                balance_account: "40817".to_string(),
                amount,
                currency: Currency::RUB,
                start_date: date!(2024 - 01 - 01),
                as_of_date: date!(2025 - 01 - 15),
                counterparty_type: Some(counterparty),
                ..InstInfo::default()
            },
            is_demand_deposit: true,
            ..Deposit::default()
        }
    }

    fn symmetric_params(
        min_remaining: Option<f64>,
    ) -> FxHashMap<(CustomerSegment, DepositType), ElasticityParameters> {
        let mut table = FxHashMap::default();
        table.insert(
            (CustomerSegment::Retail, DepositType::Demand),
            ElasticityParameters {
                base_elasticity: -0.5,
                adjustment_speed: 1.0,
                competitive_factor: 1.0,
                min_remaining_volume: min_remaining,
                ..ElasticityParameters::default()
            },
        );
        table
    }

    #[test]
    fn test_symmetric_case_drains_to_zero_without_floor() {
        let calc = DepositElasticityCalculator::new(
            date!(2025 - 01 - 15),
            symmetric_params(None),
        );
        let deposits = vec![deposit("D-1", 1000.0, CounterpartyType::Retail)];
        let shocks = FxHashMap::from_iter([(Currency::RUB, 200.0)]);

        let changes = calc.calculate_volume_changes(&deposits, &shocks, None);
        assert_eq!(changes.len(), 1);
        // -0.5 * 2pp = -100% of the volume.
        assert_approx_eq!(changes[0].new_amount, 0.0);
        assert_approx_eq!(changes[0].elasticity_used, -0.5);
    }

    #[test]
    fn test_min_remaining_volume_floor_binds() {
        let calc = DepositElasticityCalculator::new(
            date!(2025 - 01 - 15),
            symmetric_params(Some(0.6)),
        );
        let deposits = vec![deposit("D-1", 1000.0, CounterpartyType::Retail)];
        let shocks = FxHashMap::from_iter([(Currency::RUB, 200.0)]);

        let changes = calc.calculate_volume_changes(&deposits, &shocks, None);
        assert_approx_eq!(changes[0].new_amount, 600.0);
    }

    #[test]
    fn test_monotonicity_in_the_shock() {
        let calc = DepositElasticityCalculator::new(
            date!(2025 - 01 - 15),
            symmetric_params(None),
        );
        let deposits = vec![deposit("D-1", 1000.0, CounterpartyType::Retail)];

        let mut previous_change = Real::MAX;
        for shock in [25.0, 50.0, 75.0, 100.0] {
            let shocks = FxHashMap::from_iter([(Currency::RUB, shock)]);
            let changes = calc.calculate_volume_changes(&deposits, &shocks, None);
            let change = changes[0].volume_change;
            assert!(
                change < previous_change,
                "larger positive shock must shrink volume more"
            );
            previous_change = change;
        }
    }

    #[test]
    fn test_asymmetric_and_threshold_selection() {
        let params = ElasticityParameters {
            base_elasticity: -0.5,
            asymmetric: true,
            positive_shock_elasticity: Some(-0.2),
            negative_shock_elasticity: Some(-0.7),
            ..ElasticityParameters::default()
        };
        assert_approx_eq!(select_elasticity(1.0, &params), -0.2);
        assert_approx_eq!(select_elasticity(-1.0, &params), -0.7);

        let params = ElasticityParameters {
            base_elasticity: -0.5,
            threshold_rate_change: Some(1.0),
            below_threshold_elasticity: Some(-0.3),
            above_threshold_elasticity: Some(-0.8),
            ..ElasticityParameters::default()
        };
        assert_approx_eq!(select_elasticity(0.5, &params), -0.3);
        assert_approx_eq!(select_elasticity(2.0, &params), -0.8);

        let params = ElasticityParameters {
            base_elasticity: -0.9,
            elasticity_floor: Some(-0.6),
            ..ElasticityParameters::default()
        };
        assert_approx_eq!(select_elasticity(1.0, &params), -0.6);
    }

    #[test]
    fn test_max_volume_change_clips_the_response() {
        let mut table = symmetric_params(None);
        table
            .get_mut(&(CustomerSegment::Retail, DepositType::Demand))
            .unwrap()
            .max_volume_change = Some(0.15);
        let calc = DepositElasticityCalculator::new(date!(2025 - 01 - 15), table);
        let deposits = vec![deposit("D-1", 1000.0, CounterpartyType::Retail)];
        let shocks = FxHashMap::from_iter([(Currency::RUB, 200.0)]);

        let changes = calc.calculate_volume_changes(&deposits, &shocks, None);
        assert_approx_eq!(changes[0].new_amount, 850.0);
        assert!(changes[0].volume_change_pct.abs() <= 0.15 + 1e-12);
    }

    #[test]
    fn test_zero_shock_and_missing_parameters_are_skipped() {
        let calc = DepositElasticityCalculator::new(
            date!(2025 - 01 - 15),
            symmetric_params(None),
        );
        let deposits = vec![
            deposit("D-1", 1000.0, CounterpartyType::Retail),
            deposit("D-2", 1000.0, CounterpartyType::Government),
        ];

        let no_shock = calc.calculate_volume_changes(
            &deposits,
            &FxHashMap::from_iter([(Currency::RUB, 0.0)]),
            None,
        );
        assert!(no_shock.is_empty());

        // Government has no parameter cell and no demand fallback here.
        let shocked = calc.calculate_volume_changes(
            &deposits,
            &FxHashMap::from_iter([(Currency::RUB, 100.0)]),
            None,
        );
        assert_eq!(shocked.len(), 1);
        assert_eq!(shocked[0].instrument_id, "D-1");
    }

    #[test]
    fn test_dynamic_deposits_keep_sign_convention() {
        let calc = DepositElasticityCalculator::new(
            date!(2025 - 01 - 15),
            symmetric_params(Some(0.6)),
        );
        let deposits = vec![deposit("D-1", -1000.0, CounterpartyType::Retail)];
        let shocks = FxHashMap::from_iter([(Currency::RUB, 200.0)]);

        let (dynamic, changes) = calc.create_dynamic_deposits(&deposits, &shocks);
        assert_approx_eq!(dynamic[0].info.amount, -600.0);
        assert_approx_eq!(changes[0].new_amount, -600.0);
    }

    #[test]
    fn test_config_from_json() {
        let config = json!({
            "retail": {
                "demand": {
                    "base_elasticity": -0.4,
                    "adjustment_speed": 0.5,
                    "max_volume_change": 0.2
                }
            },
            "corporate": {
                "short_term": {"base_elasticity": -0.9}
            }
        });
        let table = elasticity_config_from_json(&config).unwrap();
        assert_eq!(table.len(), 2);
        let retail = &table[&(CustomerSegment::Retail, DepositType::Demand)];
        assert_approx_eq!(retail.base_elasticity, -0.4);
        assert_eq!(retail.customer_segment, CustomerSegment::Retail);

        assert!(elasticity_config_from_json(&json!({"martian": {}})).is_err());
    }
}
