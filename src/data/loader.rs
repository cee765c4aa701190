use crate::currency::Currency;
use crate::definitions::Real;
use crate::enums::{
    AssetCategory, CorrespondentAccountType, CounterpartyType, LiabilityCategory, OffBalanceKind,
};
use crate::error::AlmError;
use crate::instrument::Instrument;
use crate::instruments::bond::Bond;
use crate::instruments::correspondent_account::CorrespondentAccount;
use crate::instruments::current_account::CurrentAccount;
use crate::instruments::deposit::Deposit;
use crate::instruments::derivatives::{
    DepositMargin, Forward, FuturesContract, FxSwap, Irs, Ois, Tom, Xccy,
};
use crate::instruments::inst_info::InstInfo;
use crate::instruments::interbank::InterbankLoan;
use crate::instruments::loan::Loan;
use crate::instruments::off_balance::OffBalance;
use crate::instruments::other_items::{OtherAsset, OtherLiability};
use crate::instruments::repo::{Repo, ReverseRepo};
use crate::instruments::InstrumentType;
use crate::time::buckets::LiquidityBucket;
use crate::time::dateparse::parse_date;
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::str::FromStr;
use time::Date;

/// A balance-sheet row: named string fields as they arrive from tabular data.
pub type BalanceRow = FxHashMap<String, String>;

/// One skipped row with its reason.
#[derive(Debug, Clone)]
pub struct RowError {
    pub row_index: usize,
    pub instrument_id: Option<String>,
    pub reason: String,
}

/// Result of a load pass: built instruments plus the per-row error report.
/// Malformed rows are never fatal.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub instruments: Vec<Instrument>,
    pub errors: Vec<RowError>,
}

/// Key/value pairs of a mapping literal like `{'overnight': 0.1, '2-7d': 0.2}`.
static MAPPING_ENTRY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"['"]?([A-Za-z0-9+.\-]+)['"]?\s*:\s*(-?[0-9]+(?:\.[0-9]+)?(?:[eE][+-]?[0-9]+)?)"#)
        .expect("mapping literal regex")
});

/// Builds typed instruments out of balance-sheet rows.
///
/// Classification: an explicit `instrument_type` field wins; otherwise the
/// longest configured balance-account prefix decides; otherwise the row is
/// reported and skipped.
#[derive(Debug, Clone, Default)]
pub struct InstrumentLoader {
    /// Prefix patterns sorted longest-first for longest-prefix matching.
    patterns: Vec<(String, InstrumentType)>,
}

impl InstrumentLoader {
    pub fn new(balance_account_patterns: FxHashMap<String, InstrumentType>) -> InstrumentLoader {
        let mut patterns: Vec<(String, InstrumentType)> =
            balance_account_patterns.into_iter().collect();
        patterns.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
        InstrumentLoader { patterns }
    }

    pub fn load_rows(&self, rows: &[BalanceRow]) -> LoadReport {
        let mut report = LoadReport::default();
        for (row_index, row) in rows.iter().enumerate() {
            match self.build_instrument(row) {
                Ok(instrument) => report.instruments.push(instrument),
                Err(e) => {
                    let instrument_id = field(row, "instrument_id")
                        .or_else(|| field(row, "position_id"))
                        .map(str::to_string);
                    warn!("skipping row {}: {}", row_index, e);
                    report.errors.push(RowError {
                        row_index,
                        instrument_id,
                        reason: e.to_string(),
                    });
                }
            }
        }
        info!(
            "loaded {} instruments, skipped {} rows",
            report.instruments.len(),
            report.errors.len()
        );
        report
    }

    pub fn build_instrument(&self, row: &BalanceRow) -> Result<Instrument, AlmError> {
        let instrument_type = self.classify(row)?;
        let info = build_info(row, instrument_type)?;
        info.validate()?;

        let instrument = match instrument_type {
            InstrumentType::Loan => Instrument::Loan(Loan {
                repricing_date: opt_date(row, "repricing_date")?,
                repayment_schedule: opt_date_mapping(row, "repayment_schedule")?,
                prepayment_rate: opt_real(row, "prepayment_rate")?,
                is_fix: opt_bool(row, "is_fix")?.unwrap_or(true),
                float_indicator: field(row, "float_indicator").map(str::to_string),
                float_margin: opt_real(row, "float_margin")?,
                info,
            }),
            InstrumentType::Deposit => Instrument::Deposit(Deposit {
                is_demand_deposit: opt_bool(row, "is_demand_deposit")?.unwrap_or(false),
                core_portion: opt_real(row, "core_portion")?,
                avg_life_years: opt_real(row, "avg_life_years")?,
                withdrawal_rates: opt_bucket_mapping(row, "withdrawal_rates")?,
                early_withdrawal_allowed: opt_bool(row, "early_withdrawal_allowed")?
                    .unwrap_or(false),
                minimum_balance: opt_real(row, "minimum_balance")?,
                info,
            }),
            InstrumentType::InterbankLoan => {
                require_maturity(&info)?;
                Instrument::InterbankLoan(InterbankLoan {
                    is_placement: opt_bool(row, "is_placement")?,
                    counterparty_bank: field(row, "counterparty_bank").map(str::to_string),
                    credit_rating: field(row, "credit_rating").map(str::to_string),
                    info,
                })
            }
            InstrumentType::Repo => {
                require_maturity(&info)?;
                Instrument::Repo(Repo {
                    repo_rate: opt_real(row, "repo_rate")?,
                    collateral_type: field(row, "collateral_type").map(str::to_string),
                    collateral_value: opt_real(row, "collateral_value")?,
                    haircut: opt_real(row, "haircut")?,
                    info,
                })
            }
            InstrumentType::ReverseRepo => {
                require_maturity(&info)?;
                Instrument::ReverseRepo(ReverseRepo {
                    repo_rate: opt_real(row, "repo_rate")?,
                    collateral_type: field(row, "collateral_type").map(str::to_string),
                    collateral_value: opt_real(row, "collateral_value")?,
                    haircut: opt_real(row, "haircut")?,
                    info,
                })
            }
            InstrumentType::Bond => Instrument::Bond(Bond {
                isin: field(row, "isin").map(str::to_string),
                nominal_value: opt_real(row, "nominal_value")?,
                quantity: opt_real(row, "quantity")?,
                coupon_rate: opt_real(row, "coupon_rate")?,
                coupon_frequency: opt_integer(row, "coupon_frequency")?,
                date_close: opt_date(row, "date_close")?,
                info,
            }),
            InstrumentType::CurrentAccount => Instrument::CurrentAccount(CurrentAccount {
                is_transactional: opt_bool(row, "is_transactional")?.unwrap_or(true),
                avg_balance_30d: opt_real(row, "avg_balance_30d")?,
                volatility_coefficient: opt_real(row, "volatility_coefficient")?,
                stable_portion: opt_real(row, "stable_portion")?,
                avg_life_days: opt_integer(row, "avg_life_days")?,
                info,
            }),
            InstrumentType::CorrespondentAccount => {
                let account_type = require_field(row, "account_type")?;
                let account_type = CorrespondentAccountType::from_str(account_type)
                    .map_err(AlmError::DataValidation)?;
                Instrument::CorrespondentAccount(CorrespondentAccount {
                    account_type,
                    correspondent_bank: field(row, "correspondent_bank").map(str::to_string),
                    is_required_reserve: opt_bool(row, "is_required_reserve")?.unwrap_or(false),
                    reserve_ratio: opt_real(row, "reserve_ratio")?,
                    info,
                })
            }
            InstrumentType::OtherAsset => Instrument::OtherAsset(OtherAsset {
                asset_category: match field(row, "asset_category") {
                    Some(s) => Some(AssetCategory::from_str(s).map_err(AlmError::DataValidation)?),
                    None => None,
                },
                is_monetary: opt_bool(row, "is_monetary")?.unwrap_or(true),
                liquidation_value: opt_real(row, "liquidation_value")?,
                liquidity_haircut: opt_real(row, "liquidity_haircut")?,
                info,
            }),
            InstrumentType::OtherLiability => Instrument::OtherLiability(OtherLiability {
                liability_category: match field(row, "liability_category") {
                    Some(s) => {
                        Some(LiabilityCategory::from_str(s).map_err(AlmError::DataValidation)?)
                    }
                    None => None,
                },
                is_monetary: opt_bool(row, "is_monetary")?.unwrap_or(true),
                priority_level: field(row, "priority_level").map(str::to_string),
                info,
            }),
            InstrumentType::OffBalance => {
                let kind = require_field(row, "off_balance_type")?;
                let kind = OffBalanceKind::from_str(kind).map_err(AlmError::DataValidation)?;
                Instrument::OffBalance(OffBalance {
                    off_balance_type: kind,
                    notional_amount: require_real(row, "notional_amount")?,
                    draw_down_probability: opt_real(row, "draw_down_probability")?,
                    expiry_date: opt_date(row, "expiry_date")?,
                    settlement_date: opt_date(row, "settlement_date")?,
                    derivative_type: field(row, "derivative_type").map(str::to_string),
                    pay_leg_currency: opt_currency(row, "pay_leg_currency")?,
                    receive_leg_currency: opt_currency(row, "receive_leg_currency")?,
                    pay_leg_amount: opt_real(row, "pay_leg_amount")?,
                    receive_leg_amount: opt_real(row, "receive_leg_amount")?,
                    is_payer: opt_bool(row, "is_payer")?,
                    utilized_amount: opt_real(row, "utilized_amount")?,
                    available_amount: opt_real(row, "available_amount")?,
                    info,
                })
            }
            InstrumentType::Derivative => build_derivative(row, info)?,
            InstrumentType::Other => {
                return Err(AlmError::DataValidation(
                    "unsupported instrument type 'other'".to_string(),
                ));
            }
        };
        Ok(instrument)
    }

    fn classify(&self, row: &BalanceRow) -> Result<InstrumentType, AlmError> {
        if let Some(explicit) = field(row, "instrument_type") {
            return InstrumentType::from_str(explicit).map_err(AlmError::DataValidation);
        }
        let account = require_field(row, "balance_account")?;
        for (prefix, instrument_type) in &self.patterns {
            if account.starts_with(prefix.as_str()) {
                return Ok(*instrument_type);
            }
        }
        Ok(InstrumentType::Other)
    }
}

/// Derivative rows dispatch on their subtype tag.
fn build_derivative(row: &BalanceRow, info: InstInfo) -> Result<Instrument, AlmError> {
    let subtype = field(row, "derivative_type")
        .or_else(|| field(row, "instrument_subclass"))
        .ok_or_else(|| {
            AlmError::DataValidation("derivative row without derivative_type".to_string())
        })?;

    let instrument = match subtype {
        "IRS" => Instrument::Irs(Irs {
            notional_amount: opt_real(row, "notional_amount")?,
            settlement_date: opt_date(row, "settlement_date")?,
            fixed_rate: opt_real(row, "fixed_rate")?,
            fixed_leg_frequency: opt_integer(row, "fixed_leg_frequency")?,
            floating_rate_index: field(row, "floating_rate_index").map(str::to_string),
            floating_spread: opt_real(row, "floating_spread")?,
            floating_leg_frequency: opt_integer(row, "floating_leg_frequency")?,
            is_payer: opt_bool(row, "is_payer")?.unwrap_or(true),
            info,
        }),
        "OIS" => Instrument::Ois(Ois {
            notional_amount: opt_real(row, "notional_amount")?,
            settlement_date: opt_date(row, "settlement_date")?,
            fixed_rate: opt_real(row, "fixed_rate")?,
            overnight_index: field(row, "overnight_index").map(str::to_string),
            compounding_method: field(row, "compounding_method").map(str::to_string),
            is_payer: opt_bool(row, "is_payer")?.unwrap_or(true),
            info,
        }),
        "FxSwap" => Instrument::FxSwap(FxSwap {
            notional_amount: opt_real(row, "notional_amount")?,
            base_currency: opt_currency(row, "base_currency")?,
            quote_currency: opt_currency(row, "quote_currency")?,
            spot_rate: opt_real(row, "spot_rate")?,
            forward_rate: opt_real(row, "forward_rate")?,
            swap_points: opt_real(row, "swap_points")?,
            near_leg_date: opt_date(row, "near_leg_date")?,
            far_leg_date: opt_date(row, "far_leg_date")?,
            is_buy: opt_bool(row, "is_buy")?.unwrap_or(true),
            info,
        }),
        "Futures" => Instrument::FuturesContract(FuturesContract {
            notional_amount: opt_real(row, "notional_amount")?,
            contract_size: opt_real(row, "contract_size")?,
            tick_size: opt_real(row, "tick_size")?,
            futures_price: opt_real(row, "futures_price")?,
            expiration_date: opt_date(row, "expiration_date")?,
            futures_type: field(row, "futures_type").map(str::to_string),
            quantity: opt_real(row, "quantity")?,
            is_long: opt_bool(row, "is_long")?.unwrap_or(true),
            info,
        }),
        "TOM" => Instrument::Tom(Tom {
            notional_amount: opt_real(row, "notional_amount")?,
            base_currency: opt_currency(row, "base_currency")?,
            quote_currency: opt_currency(row, "quote_currency")?,
            exchange_rate: opt_real(row, "exchange_rate")?,
            is_buy: opt_bool(row, "is_buy")?.unwrap_or(true),
            info,
        }),
        "DepositMargin" => Instrument::DepositMargin(DepositMargin {
            margin_type: field(row, "margin_type").map(str::to_string),
            clearing_house: field(row, "clearing_house").map(str::to_string),
            margin_currency: opt_currency(row, "margin_currency")?,
            related_contracts: field(row, "related_contracts").map(str::to_string),
            info,
        }),
        "Forward" => Instrument::Forward(Forward {
            notional_amount: opt_real(row, "notional_amount")?,
            forward_price: opt_real(row, "forward_price")?,
            spot_price: opt_real(row, "spot_price")?,
            delivery_date: opt_date(row, "delivery_date")?,
            settlement_date: opt_date(row, "settlement_date")?,
            forward_type: field(row, "forward_type").map(str::to_string),
            settlement_type: field(row, "settlement_type").map(str::to_string),
            is_long: opt_bool(row, "is_long")?.unwrap_or(true),
            info,
        }),
        "XCCY" => Instrument::Xccy(Xccy {
            settlement_date: opt_date(row, "settlement_date")?,
            leg1_currency: opt_currency(row, "leg1_currency")?,
            leg1_notional: opt_real(row, "leg1_notional")?,
            leg1_rate: opt_real(row, "leg1_rate")?,
            leg1_is_fixed: opt_bool(row, "leg1_is_fixed")?.unwrap_or(true),
            leg2_currency: opt_currency(row, "leg2_currency")?,
            leg2_notional: opt_real(row, "leg2_notional")?,
            leg2_rate: opt_real(row, "leg2_rate")?,
            leg2_is_fixed: opt_bool(row, "leg2_is_fixed")?.unwrap_or(false),
            exchange_notional_at_start: opt_bool(row, "exchange_notional_at_start")?
                .unwrap_or(true),
            exchange_notional_at_maturity: opt_bool(row, "exchange_notional_at_maturity")?
                .unwrap_or(true),
            fx_rate: opt_real(row, "fx_rate")?,
            info,
        }),
        other => {
            return Err(AlmError::DataValidation(format!(
                "unknown derivative type '{}'",
                other
            )));
        }
    };
    Ok(instrument)
}

fn build_info(row: &BalanceRow, instrument_type: InstrumentType) -> Result<InstInfo, AlmError> {
    let instrument_id = field(row, "instrument_id")
        .or_else(|| field(row, "position_id"))
        .ok_or_else(|| AlmError::DataValidation("row without instrument_id".to_string()))?;

    let currency = require_field(row, "currency")?;
    let currency = Currency::from_str(currency).map_err(AlmError::DataValidation)?;

    let counterparty_type = match field(row, "counterparty_type") {
        Some(s) => Some(CounterpartyType::from_str(s).map_err(AlmError::DataValidation)?),
        None => None,
    };

    Ok(InstInfo {
        instrument_id: instrument_id.to_string(),
        instrument_type,
        balance_account: field(row, "balance_account").unwrap_or_default().to_string(),
        amount: require_real(row, "amount")?,
        currency,
        start_date: require_date(row, "start_date")?,
        as_of_date: require_date(row, "as_of_date")?,
        maturity_date: opt_date(row, "maturity_date")?,
        interest_rate: opt_real(row, "interest_rate")?,
        counterparty_id: field(row, "counterparty_id").map(str::to_string),
        counterparty_name: field(row, "counterparty_name").map(str::to_string),
        counterparty_type,
        trading_portfolio: field(row, "trading_portfolio").map(str::to_string),
        book: None,
    })
}

fn require_maturity(info: &InstInfo) -> Result<(), AlmError> {
    if info.maturity_date.is_none() {
        return Err(AlmError::DataValidation(format!(
            "{}: maturity_date is required for {}",
            info.instrument_id, info.instrument_type
        )));
    }
    Ok(())
}

/// A field value; empty strings and the usual null spellings count as missing.
fn field<'a>(row: &'a BalanceRow, key: &str) -> Option<&'a str> {
    let value = row.get(key)?.trim();
    if value.is_empty() || matches!(value, "None" | "null" | "nan" | "NaN" | "NULL") {
        return None;
    }
    Some(value)
}

fn require_field<'a>(row: &'a BalanceRow, key: &str) -> Result<&'a str, AlmError> {
    field(row, key)
        .ok_or_else(|| AlmError::DataValidation(format!("missing required field '{}'", key)))
}

fn opt_real(row: &BalanceRow, key: &str) -> Result<Option<Real>, AlmError> {
    let Some(raw) = field(row, key) else {
        return Ok(None);
    };
    let value: Real = raw
        .parse()
        .map_err(|_| AlmError::DataValidation(format!("bad number in '{}': {}", key, raw)))?;
    if !value.is_finite() {
        return Err(AlmError::DataValidation(format!(
            "non-finite number in '{}': {}",
            key, raw
        )));
    }
    Ok(Some(value))
}

fn require_real(row: &BalanceRow, key: &str) -> Result<Real, AlmError> {
    opt_real(row, key)?
        .ok_or_else(|| AlmError::DataValidation(format!("missing required field '{}'", key)))
}

fn opt_integer(row: &BalanceRow, key: &str) -> Result<Option<i64>, AlmError> {
    Ok(opt_real(row, key)?.map(|v| v as i64))
}

fn opt_date(row: &BalanceRow, key: &str) -> Result<Option<Date>, AlmError> {
    match field(row, key) {
        Some(raw) => parse_date(raw).map(Some),
        None => Ok(None),
    }
}

fn require_date(row: &BalanceRow, key: &str) -> Result<Date, AlmError> {
    opt_date(row, key)?
        .ok_or_else(|| AlmError::DataValidation(format!("missing required field '{}'", key)))
}

fn opt_bool(row: &BalanceRow, key: &str) -> Result<Option<bool>, AlmError> {
    let Some(raw) = field(row, key) else {
        return Ok(None);
    };
    match raw {
        "true" | "True" | "TRUE" | "1" | "yes" => Ok(Some(true)),
        "false" | "False" | "FALSE" | "0" | "no" => Ok(Some(false)),
        other => Err(AlmError::DataValidation(format!(
            "bad boolean in '{}': {}",
            key, other
        ))),
    }
}

fn opt_currency(row: &BalanceRow, key: &str) -> Result<Option<Currency>, AlmError> {
    match field(row, key) {
        Some(raw) => Currency::from_str(raw)
            .map(Some)
            .map_err(AlmError::DataValidation),
        None => Ok(None),
    }
}

/// Parses a bucket-keyed mapping literal like `{'overnight': 0.1, '2-7d': 0.2}`.
fn opt_bucket_mapping(
    row: &BalanceRow,
    key: &str,
) -> Result<Option<BTreeMap<LiquidityBucket, Real>>, AlmError> {
    let Some(raw) = field(row, key) else {
        return Ok(None);
    };
    let mut table = BTreeMap::new();
    for capture in MAPPING_ENTRY.captures_iter(raw) {
        let bucket = LiquidityBucket::from_str(&capture[1]).map_err(AlmError::DataValidation)?;
        let rate: Real = capture[2]
            .parse()
            .map_err(|_| AlmError::DataValidation(format!("bad rate in '{}': {}", key, raw)))?;
        table.insert(bucket, rate);
    }
    if table.is_empty() {
        return Err(AlmError::DataValidation(format!(
            "unparseable mapping in '{}': {}",
            key, raw
        )));
    }
    Ok(Some(table))
}

/// Parses a date-keyed mapping literal like `{'2025-03-01': 500.0}`.
fn opt_date_mapping(
    row: &BalanceRow,
    key: &str,
) -> Result<Option<BTreeMap<Date, Real>>, AlmError> {
    let Some(raw) = field(row, key) else {
        return Ok(None);
    };
    let mut table = BTreeMap::new();
    for capture in MAPPING_ENTRY.captures_iter(raw) {
        let date = parse_date(&capture[1])?;
        let amount: Real = capture[2]
            .parse()
            .map_err(|_| AlmError::DataValidation(format!("bad amount in '{}': {}", key, raw)))?;
        table.insert(date, amount);
    }
    if table.is_empty() {
        return Err(AlmError::DataValidation(format!(
            "unparseable mapping in '{}': {}",
            key, raw
        )));
    }
    Ok(Some(table))
}
