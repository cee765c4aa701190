//! # almetrics
//!
//! `almetrics` is a Rust crate for asset-liability management (ALM) risk
//! calculation over a bank balance sheet: interest-rate risk, liquidity risk
//! and FX exposure, for the current portfolio and under stress scenarios.
//!
//! ## Features
//!
//! - Per-instrument risk contributions for the common balance-sheet families:
//!   loans, deposits, interbank deals, repo / reverse repo, bonds, current
//!   and correspondent accounts, other balance items, off-balance positions
//!   and plain derivatives (IRS, OIS, FX swaps, futures, TOM, forwards, XCCY)
//! - Scenario calculation: rate shocks, deposit run-off, credit-line
//!   drawdown, with aggregation into liquidity gaps, repricing gaps, DV01 and
//!   FX positions per currency
//! - Deposit elasticity: a dynamic balance sheet where deposit volumes
//!   respond to rate shocks, and the static/dynamic gap comparison on top
//! - Survival horizon over preprocessed daily flows with a liquidity buffer
//! - Factor decomposition of metric changes into aging and new-deals effects
//!
//! ## Design Philosophy
//!
//! The core is a pure data transform: behavioral assumptions, elasticity
//! configuration and scenario parameters come in as explicit data, results go
//! out as plain records, and nothing in between touches shared mutable state.
//! Per-instrument computation is dispatched over the [`Instrument`] enum and
//! is embarrassingly parallel; the scenario calculator can fold contributions
//! on a thread pool, and aggregation is a commutative merge.
//!
//! ## Crate Structure
//!
//! - `instruments`: typed balance-sheet entities and their contributions
//! - `engine`: scenario parameters, the stressor and the scenario calculator
//! - `risks`: the assumptions resolver, elasticity model, gap calculators,
//!   survival horizon and factor analysis
//! - `time`: the bucket contracts and date parsing
//! - `data`: the balance-row loader
//!
//! Key structs:
//! - `ScenarioCalculator`: stress, per-instrument contributions, aggregation
//! - `Contribution`: one instrument's effect on every risk metric
//! - `AssumptionsResolver`: priority rules + counterparty overrides
//! - `DynamicBalanceIrrCalculator`: static/dynamic/comparison gap triple
//! - `FactorAnalyzer`: aging vs. new-deals decomposition
//!
//! ## License
//!
//! This project is dual-licensed under Apache License, Version 2.0 and MIT
//! license.

pub mod definitions;
pub mod currency;
pub mod enums;
pub mod error;
pub mod contribution;
pub mod instrument;
pub mod instruments;
pub mod time;
pub mod engine;
pub mod risks;
pub mod data;

pub use definitions::{Integer, Real};

pub use crate::currency::Currency;
pub use crate::contribution::Contribution;
pub use crate::error::AlmError;
pub use crate::instrument::{Instrument, InstrumentTrait, Portfolio};
pub use crate::instruments::{inst_info::InstInfo, InstrumentType};

pub use crate::enums::{
    BookType,
    CounterpartyType,
    CustomerSegment,
    DepositType,
    FundingScenario,
};

pub use crate::time::buckets::{LiquidityBucket, RepricingBucket};

pub use crate::engine::calculator::{
    RiskParameters,
    ScenarioCalculator,
    ScenarioResult,
};
pub use crate::engine::scenario::{apply_stress, ScenarioParameters};

pub use crate::risks::assumptions::{
    AssumptionRule,
    AssumptionSet,
    AssumptionsResolver,
    CounterpartyAssumption,
};
pub use crate::risks::dynamic_irr::{DynamicBalanceIrrCalculator, DynamicIrrResult};
pub use crate::risks::elasticity::{
    default_elasticity_config,
    elasticity_config_from_json,
    DepositElasticityCalculator,
    DepositVolumeChange,
    ElasticityParameters,
};
pub use crate::risks::factor::{FactorAnalysisResult, FactorAnalyzer, MetricDelta};
pub use crate::risks::irr_gaps::{GapRow, InterestRateGapCalculator, RateSensitivity};
pub use crate::risks::liquidity_gaps::CurrencyLiquidityGapCalculator;
pub use crate::risks::survival::{
    DailyFlow,
    LiquidityBuffer,
    SurvivalHorizonCalculator,
    SurvivalHorizonResult,
};

pub use crate::data::loader::{BalanceRow, InstrumentLoader, LoadReport};
