use crate::definitions::Real;
use crate::enums::FundingScenario;
use crate::error::AlmError;
use crate::instrument::{Instrument, InstrumentTrait};
use crate::instruments::InstrumentType;
use crate::time::buckets::LiquidityBucket;
use anyhow::{anyhow, Result};
use log::{debug, warn};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Runoff-rate table, either flat or keyed by funding scenario.
///
/// Configuration may supply `{"overnight": 0.05, ...}` or
/// `{"NAME": {...}, "MARKET": {...}, "COMBO": {...}}`; the two shapes are
/// distinguished by their keys.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RunoffRates {
    Flat(BTreeMap<LiquidityBucket, Real>),
    ByScenario(FxHashMap<FundingScenario, BTreeMap<LiquidityBucket, Real>>),
}

impl RunoffRates {
    /// The table applicable to one scenario; a flat table applies to all.
    pub fn for_scenario(
        &self,
        scenario: FundingScenario,
    ) -> Option<&BTreeMap<LiquidityBucket, Real>> {
        match self {
            RunoffRates::Flat(table) => Some(table),
            RunoffRates::ByScenario(tables) => tables.get(&scenario),
        }
    }

    /// The table used when no scenario is in scope (NAME for scenario-keyed).
    pub fn flat(&self) -> Option<&BTreeMap<LiquidityBucket, Real>> {
        self.for_scenario(FundingScenario::Name)
    }
}

/// Behavioral parameters resolved for one instrument.
///
/// This is the typed materialization of the free-form `assumptions` maps
/// carried by rules and counterparty overrides; unknown keys are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AssumptionSet {
    // Non-maturing balances
    pub stable_portion: Option<Real>,
    pub avg_life_days: Option<i64>,
    pub avg_life_years: Option<Real>,
    pub core_portion: Option<Real>,
    pub withdrawal_rates: Option<BTreeMap<LiquidityBucket, Real>>,
    pub runoff_rates: Option<RunoffRates>,

    // Hard overrides from counterparty assumptions
    pub maturity_override: Option<i64>,
    pub runoff_override: Option<Real>,

    // Loans
    pub prepayment_rate: Option<Real>,

    // Off-balance
    pub draw_down_probability: Option<Real>,

    // Correspondent accounts
    pub required_reserve_horizon_days: Option<i64>,
    pub nostro_stable_portion: Option<Real>,
    pub loro_runoff_days: Option<i64>,

    // Other balance items
    pub receivables_collection_days: Option<i64>,
    pub payables_payment_days: Option<i64>,
    pub payroll_payment_days: Option<i64>,
    pub reserves_utilization_days: Option<i64>,
    pub fixed_assets_liquidation_horizon_days: Option<i64>,
    pub liquidity_haircut: Option<Real>,

    // Elasticity overrides carried through to the deposit elasticity model
    pub elasticity_enabled: bool,
    pub base_elasticity: Option<Real>,
    pub elasticity_asymmetric: bool,
    pub elasticity_positive_shock: Option<Real>,
    pub elasticity_negative_shock: Option<Real>,
    pub elasticity_threshold: Option<Real>,
    pub elasticity_adjustment_speed: Option<Real>,
    pub elasticity_max_change: Option<Real>,
}

impl AssumptionSet {
    /// Deserializes a free-form assumption map, ignoring unknown keys.
    pub fn from_map(map: &FxHashMap<String, Value>) -> Result<AssumptionSet> {
        let value = Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect::<serde_json::Map<String, Value>>(),
        );
        serde_json::from_value(value)
            .map_err(|e| anyhow!(AlmError::Configuration(format!("bad assumptions map: {}", e))))
    }
}

/// One matching condition of an assumption rule: an exact value, a membership
/// list, or an operator map over `>=`, `<=`, `>`, `<`, `in`, `not_in`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MatchSpec {
    List(Vec<Value>),
    Ops(FxHashMap<String, Value>),
    Exact(Value),
}

const SUPPORTED_OPERATORS: [&str; 6] = [">=", "<=", ">", "<", "in", "not_in"];

fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

impl MatchSpec {
    fn matches(&self, value: Option<&Value>) -> bool {
        match self {
            MatchSpec::Exact(expected) => value == Some(expected),
            MatchSpec::List(allowed) => value.is_some_and(|v| allowed.contains(v)),
            MatchSpec::Ops(ops) => {
                let Some(v) = value else { return false };
                ops.iter().all(|(op, threshold)| match op.as_str() {
                    ">=" => compare_values(v, threshold)
                        .is_some_and(|o| o != Ordering::Less),
                    "<=" => compare_values(v, threshold)
                        .is_some_and(|o| o != Ordering::Greater),
                    ">" => compare_values(v, threshold) == Some(Ordering::Greater),
                    "<" => compare_values(v, threshold) == Some(Ordering::Less),
                    "in" => threshold.as_array().is_some_and(|arr| arr.contains(v)),
                    "not_in" => threshold.as_array().is_some_and(|arr| !arr.contains(v)),
                    other => {
                        warn!("unknown match operator '{}' treated as non-matching", other);
                        false
                    }
                })
            }
        }
    }

    fn validate(&self) -> Result<(), AlmError> {
        if let MatchSpec::Ops(ops) = self {
            for op in ops.keys() {
                if !SUPPORTED_OPERATORS.contains(&op.as_str()) {
                    return Err(AlmError::Configuration(format!(
                        "unknown match operator '{}'",
                        op
                    )));
                }
            }
        }
        Ok(())
    }
}

/// A priority-ordered behavioral assumption rule. All conditions must match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssumptionRule {
    pub rule_id: String,
    #[serde(default)]
    pub priority: i64,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub conditions: FxHashMap<String, MatchSpec>,
    #[serde(default)]
    pub assumptions: FxHashMap<String, Value>,
    #[serde(default)]
    pub description: Option<String>,
}

fn default_active() -> bool {
    true
}

impl AssumptionRule {
    pub fn matches(&self, fields: &FxHashMap<&'static str, Value>) -> bool {
        if !self.active {
            return false;
        }
        self.conditions
            .iter()
            .all(|(field, spec)| spec.matches(fields.get(field.as_str())))
    }
}

/// Direct per-counterparty override that short-circuits rule matching.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CounterpartyAssumption {
    pub counterparty_name: String,

    pub stable_portion: Option<Real>,
    pub avg_life_days: Option<i64>,
    pub runoff_rates: Option<FxHashMap<FundingScenario, BTreeMap<LiquidityBucket, Real>>>,

    pub minimum_balance: Option<Real>,
    pub maximum_outflow: Option<Real>,
    pub early_withdrawal_probability: Option<Real>,
    pub early_withdrawal_portion: Option<Real>,

    /// Treat the whole balance as repayable overnight.
    pub overnight_treatment: bool,
    /// Model a complete outflow of the balance.
    pub full_outflow: bool,

    pub elasticity_enabled: bool,
    pub base_elasticity: Option<Real>,
    pub elasticity_asymmetric: bool,
    pub elasticity_positive_shock: Option<Real>,
    pub elasticity_negative_shock: Option<Real>,
    pub elasticity_threshold: Option<Real>,
    pub elasticity_adjustment_speed: Option<Real>,
    pub elasticity_max_change: Option<Real>,
}

impl CounterpartyAssumption {
    pub fn to_assumption_set(&self) -> AssumptionSet {
        AssumptionSet {
            stable_portion: self.stable_portion,
            avg_life_days: self.avg_life_days,
            runoff_rates: self.runoff_rates.clone().map(RunoffRates::ByScenario),
            maturity_override: self.overnight_treatment.then_some(1),
            runoff_override: self.full_outflow.then_some(1.0),
            elasticity_enabled: self.elasticity_enabled,
            base_elasticity: self.base_elasticity,
            elasticity_asymmetric: self.elasticity_asymmetric,
            elasticity_positive_shock: self.elasticity_positive_shock,
            elasticity_negative_shock: self.elasticity_negative_shock,
            elasticity_threshold: self.elasticity_threshold,
            elasticity_adjustment_speed: self.elasticity_adjustment_speed,
            elasticity_max_change: self.elasticity_max_change,
            ..AssumptionSet::default()
        }
    }
}

/// Resolves the behavioral parameters applicable to an instrument.
///
/// Resolution is deterministic and total:
/// 1. a counterparty-name override, if present, wins outright;
/// 2. otherwise the first active rule (descending priority) whose conditions
///    all match supplies the assumptions;
/// 3. otherwise a default set derived from instrument type × counterparty
///    type applies (possibly empty).
#[derive(Debug, Clone, Default)]
pub struct AssumptionsResolver {
    rules: Vec<AssumptionRule>,
    counterparty_assumptions: FxHashMap<String, CounterpartyAssumption>,
}

impl AssumptionsResolver {
    pub fn new() -> AssumptionsResolver {
        AssumptionsResolver::default()
    }

    pub fn add_rule(&mut self, rule: AssumptionRule) {
        debug!("adding assumption rule {} (priority {})", rule.rule_id, rule.priority);
        self.rules.push(rule);
        // Stable sort keeps insertion order among equal priorities.
        self.rules.sort_by_key(|r| std::cmp::Reverse(r.priority));
    }

    pub fn add_counterparty_assumption(&mut self, assumption: CounterpartyAssumption) {
        self.counterparty_assumptions
            .insert(assumption.counterparty_name.clone(), assumption);
    }

    pub fn rules(&self) -> &[AssumptionRule] {
        &self.rules
    }

    /// Loads rules and counterparty overrides from a configuration value of
    /// the shape `{"rules": [...], "counterparty_assumptions": {name: {...}}}`.
    /// Malformed conditions or assumption payloads fail here, not at resolve
    /// time.
    pub fn from_config(config: &Value) -> Result<AssumptionsResolver> {
        let mut resolver = AssumptionsResolver::new();

        if let Some(rules) = config.get("rules") {
            let rules: Vec<AssumptionRule> = serde_json::from_value(rules.clone())
                .map_err(|e| anyhow!(AlmError::Configuration(format!("bad rules: {}", e))))?;
            for rule in rules {
                for spec in rule.conditions.values() {
                    spec.validate().map_err(|e| {
                        anyhow!(AlmError::Configuration(format!(
                            "rule {}: {}",
                            rule.rule_id, e
                        )))
                    })?;
                }
                AssumptionSet::from_map(&rule.assumptions)
                    .map_err(|e| anyhow!(AlmError::Configuration(format!(
                        "rule {}: {}",
                        rule.rule_id, e
                    ))))?;
                resolver.add_rule(rule);
            }
        }

        if let Some(Value::Object(entries)) = config.get("counterparty_assumptions") {
            for (name, payload) in entries {
                let mut assumption: CounterpartyAssumption =
                    serde_json::from_value(payload.clone()).map_err(|e| {
                        anyhow!(AlmError::Configuration(format!(
                            "counterparty {}: {}",
                            name, e
                        )))
                    })?;
                assumption.counterparty_name = name.clone();
                resolver.add_counterparty_assumption(assumption);
            }
        }

        debug!(
            "loaded assumption configuration: {} rules, {} counterparty overrides",
            resolver.rules.len(),
            resolver.counterparty_assumptions.len()
        );
        Ok(resolver)
    }

    /// Resolves the assumption set for one instrument.
    pub fn resolve(&self, instrument: &Instrument) -> AssumptionSet {
        if let Some(name) = instrument.get_counterparty_name() {
            if let Some(assumption) = self.counterparty_assumptions.get(name) {
                return assumption.to_assumption_set();
            }
        }

        let fields = instrument_match_fields(instrument);
        for rule in &self.rules {
            if rule.matches(&fields) {
                match AssumptionSet::from_map(&rule.assumptions) {
                    Ok(set) => {
                        debug!(
                            "rule {} applied to instrument {}",
                            rule.rule_id,
                            instrument.get_id()
                        );
                        return set;
                    }
                    Err(e) => {
                        warn!("rule {} has a bad assumptions map: {}", rule.rule_id, e);
                        break;
                    }
                }
            }
        }

        default_assumptions(instrument)
    }

    /// Resolves assumptions with scenario-keyed runoff tables flattened to
    /// the table of the given funding scenario.
    pub fn resolve_for_scenario(
        &self,
        instrument: &Instrument,
        scenario: FundingScenario,
    ) -> AssumptionSet {
        let mut set = self.resolve(instrument);
        if let Some(rates) = set.runoff_rates.take() {
            set.runoff_rates = rates
                .for_scenario(scenario)
                .cloned()
                .map(RunoffRates::Flat);
        }
        set
    }
}

/// Field view of an instrument for rule matching.
fn instrument_match_fields(instrument: &Instrument) -> FxHashMap<&'static str, Value> {
    let info = instrument.get_inst_info();
    let mut fields: FxHashMap<&'static str, Value> = FxHashMap::default();
    fields.insert("instrument_type", Value::from(info.instrument_type.as_str()));
    fields.insert("balance_account", Value::from(info.balance_account.as_str()));
    fields.insert("currency", Value::from(info.currency.as_str()));
    fields.insert("amount", Value::from(info.amount));
    fields.insert("volume", Value::from(info.volume()));
    fields.insert("book", Value::from(info.book().as_str()));
    if let Some(name) = &info.counterparty_name {
        fields.insert("counterparty_name", Value::from(name.as_str()));
    }
    if let Some(id) = &info.counterparty_id {
        fields.insert("counterparty_id", Value::from(id.as_str()));
    }
    if let Some(ct) = info.counterparty_type {
        fields.insert("counterparty_type", Value::from(ct.as_str()));
    }
    if let Some(days) = info.days_to_maturity(info.as_of_date) {
        fields.insert("maturity_days", Value::from(days));
    }
    fields
}

/// Default parameters by instrument type × counterparty type.
fn default_assumptions(instrument: &Instrument) -> AssumptionSet {
    use crate::enums::CounterpartyType;

    let info = instrument.get_inst_info();
    match (info.instrument_type, info.counterparty_type) {
        (InstrumentType::Deposit, Some(CounterpartyType::Retail)) => AssumptionSet {
            stable_portion: Some(0.6),
            avg_life_days: Some(180),
            runoff_rates: Some(RunoffRates::ByScenario(default_runoff_tables(
                [0.05, 0.10, 0.15],
                [0.10, 0.15, 0.20],
                [0.15, 0.20, 0.25],
            ))),
            ..AssumptionSet::default()
        },
        (InstrumentType::Deposit, Some(CounterpartyType::Corporate)) => AssumptionSet {
            stable_portion: Some(0.4),
            avg_life_days: Some(90),
            runoff_rates: Some(RunoffRates::ByScenario(default_runoff_tables(
                [0.10, 0.15, 0.20],
                [0.20, 0.25, 0.30],
                [0.30, 0.35, 0.40],
            ))),
            ..AssumptionSet::default()
        },
        (InstrumentType::CurrentAccount, _) => AssumptionSet {
            stable_portion: Some(0.3),
            avg_life_days: Some(30),
            runoff_rates: Some(RunoffRates::ByScenario(default_runoff_tables(
                [0.20, 0.30, 0.0],
                [0.30, 0.40, 0.0],
                [0.40, 0.50, 0.0],
            ))),
            ..AssumptionSet::default()
        },
        _ => AssumptionSet::default(),
    }
}

/// Builds NAME/MARKET/COMBO runoff tables over the three shortest buckets.
fn default_runoff_tables(
    name: [Real; 3],
    market: [Real; 3],
    combo: [Real; 3],
) -> FxHashMap<FundingScenario, BTreeMap<LiquidityBucket, Real>> {
    let buckets = [
        LiquidityBucket::Overnight,
        LiquidityBucket::Days2To7,
        LiquidityBucket::Days8To14,
    ];
    let build = |rates: [Real; 3]| -> BTreeMap<LiquidityBucket, Real> {
        buckets
            .iter()
            .zip(rates)
            .filter(|(_, r)| *r > 0.0)
            .map(|(b, r)| (*b, r))
            .collect()
    };
    let mut tables = FxHashMap::default();
    tables.insert(FundingScenario::Name, build(name));
    tables.insert(FundingScenario::Market, build(market));
    tables.insert(FundingScenario::Combo, build(combo));
    tables
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::currency::Currency;
    use crate::enums::CounterpartyType;
    use crate::instruments::deposit::Deposit;
    use crate::instruments::inst_info::InstInfo;
    use crate::instruments::loan::Loan;
    use serde_json::json;
    use time::macros::date;

    fn deposit(counterparty_name: Option<&str>, amount: f64) -> Instrument {
        Instrument::Deposit(Deposit {
            info: InstInfo {
                instrument_id: "D-1".to_string(),
                instrument_type: InstrumentType::Deposit,
                balance_account: "40817".to_string(),
                amount,
                currency: Currency::RUB,
                start_date: date!(2024 - 01 - 01),
                as_of_date: date!(2025 - 01 - 15),
                counterparty_name: counterparty_name.map(str::to_string),
                counterparty_type: Some(CounterpartyType::Retail),
                ..InstInfo::default()
            },
            ..Deposit::default()
        })
    }

    #[test]
    fn test_counterparty_override_short_circuits_rules() {
        let config = json!({
            "rules": [{
                "rule_id": "retail_deposits",
                "priority": 10,
                "conditions": {"counterparty_type": "retail"},
                "assumptions": {"stable_portion": 0.9}
            }],
            "counterparty_assumptions": {
                "MEGACORP": {"stable_portion": 0.8, "avg_life_days": 365, "overnight_treatment": false}
            }
        });
        let resolver = AssumptionsResolver::from_config(&config).unwrap();

        let direct = resolver.resolve(&deposit(Some("MEGACORP"), -100.0));
        assert_eq!(direct.stable_portion, Some(0.8));
        assert_eq!(direct.avg_life_days, Some(365));

        let via_rule = resolver.resolve(&deposit(Some("SOMEONE"), -100.0));
        assert_eq!(via_rule.stable_portion, Some(0.9));
    }

    #[test]
    fn test_rule_priority_and_operator_conditions() {
        let config = json!({
            "rules": [
                {
                    "rule_id": "low",
                    "priority": 1,
                    "conditions": {"instrument_type": "deposit"},
                    "assumptions": {"avg_life_days": 30}
                },
                {
                    "rule_id": "large_deposits",
                    "priority": 100,
                    "conditions": {
                        "instrument_type": "deposit",
                        "volume": {">=": 1000.0}
                    },
                    "assumptions": {"avg_life_days": 720}
                }
            ]
        });
        let resolver = AssumptionsResolver::from_config(&config).unwrap();

        assert_eq!(
            resolver.resolve(&deposit(None, -5000.0)).avg_life_days,
            Some(720)
        );
        assert_eq!(
            resolver.resolve(&deposit(None, -10.0)).avg_life_days,
            Some(30)
        );
    }

    #[test]
    fn test_inactive_rules_are_skipped_and_list_conditions_match() {
        let mut resolver = AssumptionsResolver::new();
        resolver.add_rule(AssumptionRule {
            rule_id: "inactive".to_string(),
            priority: 100,
            active: false,
            conditions: FxHashMap::default(),
            assumptions: [("avg_life_days".to_string(), json!(999))]
                .into_iter()
                .collect(),
            description: None,
        });
        resolver.add_rule(AssumptionRule {
            rule_id: "currencies".to_string(),
            priority: 1,
            active: true,
            conditions: [(
                "currency".to_string(),
                MatchSpec::List(vec![json!("RUB"), json!("USD")]),
            )]
            .into_iter()
            .collect(),
            assumptions: [("avg_life_days".to_string(), json!(14))]
                .into_iter()
                .collect(),
            description: None,
        });

        let resolved = resolver.resolve(&deposit(None, -100.0));
        assert_eq!(resolved.avg_life_days, Some(14));
    }

    #[test]
    fn test_defaults_by_instrument_and_counterparty() {
        let resolver = AssumptionsResolver::new();
        let resolved = resolver.resolve(&deposit(None, -100.0));
        assert_eq!(resolved.stable_portion, Some(0.6));
        assert_eq!(resolved.avg_life_days, Some(180));

        // Loans without any rule fall through to the empty set.
        let loan = Instrument::Loan(Loan {
            info: InstInfo {
                instrument_id: "L-1".to_string(),
                instrument_type: InstrumentType::Loan,
                balance_account: "45502".to_string(),
                amount: 100.0,
                currency: Currency::RUB,
                start_date: date!(2024 - 01 - 01),
                as_of_date: date!(2025 - 01 - 15),
                ..InstInfo::default()
            },
            ..Loan::default()
        });
        assert_eq!(resolver.resolve(&loan), AssumptionSet::default());
    }

    #[test]
    fn test_scenario_runoff_flattening() {
        let resolver = AssumptionsResolver::new();
        let resolved =
            resolver.resolve_for_scenario(&deposit(None, -100.0), FundingScenario::Combo);
        let Some(RunoffRates::Flat(table)) = resolved.runoff_rates else {
            panic!("expected a flat runoff table");
        };
        assert_eq!(table.get(&LiquidityBucket::Overnight), Some(&0.15));
    }

    #[test]
    fn test_unknown_operator_is_a_configuration_error() {
        let config = json!({
            "rules": [{
                "rule_id": "bad",
                "conditions": {"amount": {"~=": 5}},
                "assumptions": {}
            }]
        });
        assert!(AssumptionsResolver::from_config(&config).is_err());
    }
}
