use crate::currency::Currency;
use crate::definitions::Real;
use crate::error::AlmError;
use crate::instrument::{Instrument, InstrumentTrait};
use crate::instruments::InstrumentType;
use anyhow::Result;
use log::info;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::hash::Hash;
use time::Date;

/// A metric value that supports factor decomposition: element-wise
/// differences and a magnitude for ranking.
pub trait MetricDelta: Clone {
    /// `self - earlier`, element-wise.
    fn delta(&self, earlier: &Self) -> Self;
    /// Absolute size used to order per-product impacts.
    fn magnitude(&self) -> Real;
}

impl MetricDelta for Real {
    fn delta(&self, earlier: &Self) -> Self {
        self - earlier
    }

    fn magnitude(&self) -> Real {
        self.abs()
    }
}

/// Keyed metrics subtract key-wise with zero defaults.
impl<K: Clone + Eq + Hash> MetricDelta for FxHashMap<K, Real> {
    fn delta(&self, earlier: &Self) -> Self {
        let mut delta = FxHashMap::default();
        for key in self.keys().chain(earlier.keys()) {
            if delta.contains_key(key) {
                continue;
            }
            let new = self.get(key).copied().unwrap_or(0.0);
            let old = earlier.get(key).copied().unwrap_or(0.0);
            delta.insert(key.clone(), new - old);
        }
        delta
    }

    fn magnitude(&self) -> Real {
        self.values().map(|v| v.abs()).sum()
    }
}

/// Impact of a single new product on the metric.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProductImpact<M> {
    pub product_id: String,
    pub product_type: InstrumentType,
    pub amount: Real,
    pub currency: Currency,
    pub maturity_date: Option<Date>,
    pub impact: M,
}

/// Result of a factor decomposition run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactorAnalysisResult<M> {
    pub metric_name: String,
    pub base_date: Date,
    pub comparison_date: Date,
    pub days_elapsed: i64,

    pub metric_base: M,
    pub metric_aged: M,
    pub metric_full: M,

    pub total_change: M,
    pub aging_effect: M,
    pub new_deals_effect: M,

    pub existing_products_count: usize,
    pub new_products_count: usize,
    pub new_products: Vec<String>,

    pub new_products_breakdown: Option<Vec<NewProductImpact<M>>>,
}

/// Decomposes the change of a metric between two portfolio snapshots into an
/// aging effect (existing deals rolling down) and a new-deals effect.
///
/// The metric is any function of (instruments, date); its return type decides
/// how deltas combine via [`MetricDelta`].
#[derive(Debug)]
pub struct FactorAnalyzer {
    base_date: Date,
    comparison_date: Date,
    days_elapsed: i64,
}

impl FactorAnalyzer {
    pub fn new(base_date: Date, comparison_date: Date) -> Result<FactorAnalyzer> {
        let days_elapsed = (comparison_date - base_date).whole_days();
        if days_elapsed <= 0 {
            return Err(AlmError::InvalidPeriod {
                base: base_date,
                comparison: comparison_date,
            }
            .into());
        }
        Ok(FactorAnalyzer {
            base_date,
            comparison_date,
            days_elapsed,
        })
    }

    pub fn days_elapsed(&self) -> i64 {
        self.days_elapsed
    }

    /// Aging + new-deals decomposition of `metric` between the snapshots.
    pub fn analyze<M, F>(
        &self,
        base_instruments: &[Instrument],
        comparison_instruments: &[Instrument],
        metric: F,
        metric_name: &str,
    ) -> Result<FactorAnalysisResult<M>>
    where
        M: MetricDelta,
        F: Fn(&[Instrument], Date) -> Result<M>,
    {
        let base_ids: FxHashSet<&str> =
            base_instruments.iter().map(|i| i.get_id()).collect();
        let comparison_ids: FxHashSet<&str> =
            comparison_instruments.iter().map(|i| i.get_id()).collect();

        let existing_ids: FxHashSet<&str> =
            base_ids.intersection(&comparison_ids).copied().collect();
        let mut new_products: Vec<String> = comparison_ids
            .difference(&base_ids)
            .map(|id| id.to_string())
            .collect();
        new_products.sort();

        info!(
            "factor analysis '{}': {} existing, {} new, {} disappeared",
            metric_name,
            existing_ids.len(),
            new_products.len(),
            base_ids.difference(&comparison_ids).count()
        );

        let aged_instruments = self.age_instruments(base_instruments, &existing_ids);

        let metric_base = metric(base_instruments, self.base_date)?;
        let metric_aged = metric(&aged_instruments, self.comparison_date)?;
        let metric_full = metric(comparison_instruments, self.comparison_date)?;

        let aging_effect = metric_aged.delta(&metric_base);
        let new_deals_effect = metric_full.delta(&metric_aged);
        let total_change = metric_full.delta(&metric_base);

        Ok(FactorAnalysisResult {
            metric_name: metric_name.to_string(),
            base_date: self.base_date,
            comparison_date: self.comparison_date,
            days_elapsed: self.days_elapsed,
            metric_base,
            metric_aged,
            metric_full,
            total_change,
            aging_effect,
            new_deals_effect,
            existing_products_count: existing_ids.len(),
            new_products_count: new_products.len(),
            new_products,
            new_products_breakdown: None,
        })
    }

    /// The decomposition plus the marginal impact of each new product on the
    /// aged portfolio, ranked by magnitude and optionally truncated.
    pub fn analyze_individual_impact<M, F>(
        &self,
        base_instruments: &[Instrument],
        comparison_instruments: &[Instrument],
        metric: F,
        metric_name: &str,
        top_n: Option<usize>,
    ) -> Result<FactorAnalysisResult<M>>
    where
        M: MetricDelta,
        F: Fn(&[Instrument], Date) -> Result<M>,
    {
        let mut result =
            self.analyze(base_instruments, comparison_instruments, &metric, metric_name)?;

        let existing_ids: FxHashSet<&str> = {
            let base_ids: FxHashSet<&str> =
                base_instruments.iter().map(|i| i.get_id()).collect();
            comparison_instruments
                .iter()
                .map(|i| i.get_id())
                .filter(|id| base_ids.contains(id))
                .collect()
        };
        let aged_instruments = self.age_instruments(base_instruments, &existing_ids);
        let metric_aged = metric(&aged_instruments, self.comparison_date)?;

        let mut breakdown = Vec::with_capacity(result.new_products.len());
        for new_id in &result.new_products {
            let Some(new_instrument) = comparison_instruments
                .iter()
                .find(|inst| inst.get_id() == new_id)
            else {
                continue;
            };

            let mut with_product = aged_instruments.clone();
            with_product.push(new_instrument.clone());
            let metric_with = metric(&with_product, self.comparison_date)?;

            breakdown.push(NewProductImpact {
                product_id: new_id.clone(),
                product_type: new_instrument.get_type(),
                amount: new_instrument.get_amount(),
                currency: new_instrument.get_currency(),
                maturity_date: new_instrument.get_maturity(),
                impact: metric_with.delta(&metric_aged),
            });
        }

        breakdown.sort_by(|a, b| {
            b.impact
                .magnitude()
                .partial_cmp(&a.impact.magnitude())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        if let Some(top_n) = top_n {
            breakdown.truncate(top_n);
        }

        result.new_products_breakdown = Some(breakdown);
        Ok(result)
    }

    /// Deep copies of the surviving base instruments moved to the comparison
    /// date. Maturity dates are left alone; positions simply get closer to
    /// them.
    fn age_instruments(
        &self,
        instruments: &[Instrument],
        existing_ids: &FxHashSet<&str>,
    ) -> Vec<Instrument> {
        instruments
            .iter()
            .filter(|inst| existing_ids.contains(inst.get_id()))
            .map(|inst| {
                let mut aged = inst.clone();
                aged.get_inst_info_mut().as_of_date = self.comparison_date;
                aged
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruments::deposit::Deposit;
    use crate::instruments::inst_info::InstInfo;
    use crate::instruments::loan::Loan;
    use assert_approx_eq::assert_approx_eq;
    use time::macros::date;

    const BASE: Date = date!(2025 - 01 - 15);
    const COMPARISON: Date = date!(2025 - 02 - 15);

    fn loan(id: &str, amount: f64, as_of: Date) -> Instrument {
        Instrument::Loan(Loan {
            info: InstInfo {
                instrument_id: id.to_string(),
                instrument_type: InstrumentType::Loan,
                balance_account: "45502".to_string(),
                amount,
                currency: Currency::RUB,
                start_date: date!(2024 - 01 - 15),
                as_of_date: as_of,
                maturity_date: Some(date!(2026 - 01 - 15)),
                interest_rate: Some(0.10),
                ..InstInfo::default()
            },
            ..Loan::default()
        })
    }

    fn deposit(id: &str, amount: f64, as_of: Date) -> Instrument {
        Instrument::Deposit(Deposit {
            info: InstInfo {
                instrument_id: id.to_string(),
                instrument_type: InstrumentType::Deposit,
                balance_account: "42301".to_string(),
                amount,
                currency: Currency::RUB,
                start_date: date!(2024 - 06 - 01),
                as_of_date: as_of,
                maturity_date: Some(date!(2025 - 06 - 15)),
                interest_rate: Some(0.05),
                ..InstInfo::default()
            },
            ..Deposit::default()
        })
    }

    fn total_amount(instruments: &[Instrument], _date: Date) -> Result<f64> {
        Ok(instruments.iter().map(|i| i.get_amount()).sum())
    }

    #[test]
    fn test_sum_of_amounts_decomposition() {
        let base = vec![
            loan("L1", 1000.0, BASE),
            loan("L2", 500.0, BASE),
            deposit("D1", -800.0, BASE),
        ];
        let mut comparison: Vec<Instrument> = base
            .iter()
            .map(|inst| {
                let mut aged = inst.clone();
                aged.get_inst_info_mut().as_of_date = COMPARISON;
                aged
            })
            .collect();
        comparison.push(loan("L3", 300.0, COMPARISON));

        let analyzer = FactorAnalyzer::new(BASE, COMPARISON).unwrap();
        let result = analyzer
            .analyze_individual_impact(
                &base,
                &comparison,
                total_amount,
                "Total Amount",
                None,
            )
            .unwrap();

        assert_approx_eq!(result.metric_base, 700.0);
        assert_approx_eq!(result.metric_aged, 700.0);
        assert_approx_eq!(result.metric_full, 1000.0);
        assert_approx_eq!(result.aging_effect, 0.0);
        assert_approx_eq!(result.new_deals_effect, 300.0);
        assert_approx_eq!(result.total_change, 300.0);
        assert_eq!(result.existing_products_count, 3);
        assert_eq!(result.new_products, vec!["L3".to_string()]);

        let breakdown = result.new_products_breakdown.unwrap();
        assert_eq!(breakdown.len(), 1);
        assert_eq!(breakdown[0].product_id, "L3");
        assert_approx_eq!(breakdown[0].impact, 300.0);
    }

    #[test]
    fn test_decomposition_identity_for_mapping_metric() {
        let base = vec![loan("L1", 1000.0, BASE), deposit("D1", -800.0, BASE)];
        let comparison = vec![
            loan("L1", 1000.0, COMPARISON),
            deposit("D2", -500.0, COMPARISON),
        ];

        let by_currency = |instruments: &[Instrument], _date: Date| -> Result<FxHashMap<Currency, Real>> {
            let mut totals = FxHashMap::default();
            for inst in instruments {
                *totals.entry(inst.get_currency()).or_insert(0.0) += inst.get_amount();
            }
            Ok(totals)
        };

        let analyzer = FactorAnalyzer::new(BASE, COMPARISON).unwrap();
        let result = analyzer
            .analyze(&base, &comparison, by_currency, "Amount by Currency")
            .unwrap();

        // D1 disappeared (aging -(-800)), D2 is new (-500).
        assert_approx_eq!(result.aging_effect[&Currency::RUB], 800.0);
        assert_approx_eq!(result.new_deals_effect[&Currency::RUB], -500.0);
        let recomposed = result.aging_effect[&Currency::RUB]
            + result.new_deals_effect[&Currency::RUB];
        assert_approx_eq!(result.total_change[&Currency::RUB], recomposed);
    }

    #[test]
    fn test_top_n_ranks_by_magnitude() {
        let base = vec![loan("L1", 1000.0, BASE)];
        let comparison = vec![
            loan("L1", 1000.0, COMPARISON),
            loan("N-small", 100.0, COMPARISON),
            loan("N-large", 900.0, COMPARISON),
            deposit("N-mid", -400.0, COMPARISON),
        ];

        let analyzer = FactorAnalyzer::new(BASE, COMPARISON).unwrap();
        let result = analyzer
            .analyze_individual_impact(&base, &comparison, total_amount, "Total", Some(2))
            .unwrap();

        let breakdown = result.new_products_breakdown.unwrap();
        assert_eq!(breakdown.len(), 2);
        assert_eq!(breakdown[0].product_id, "N-large");
        assert_eq!(breakdown[1].product_id, "N-mid");
    }

    #[test]
    fn test_inverted_period_is_rejected() {
        let error = FactorAnalyzer::new(COMPARISON, BASE).unwrap_err();
        assert!(matches!(
            error.downcast_ref::<AlmError>(),
            Some(AlmError::InvalidPeriod { .. })
        ));
        assert!(FactorAnalyzer::new(BASE, BASE).is_err());
    }
}
