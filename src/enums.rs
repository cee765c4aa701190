use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Book classification of an instrument.
///
/// An instrument belongs to the trading book iff its `trading_portfolio`
/// begins with the literal prefix `TRADING_`; everything else is banking book.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum BookType {
    Trading,
    #[default]
    Banking,
}

impl BookType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookType::Trading => "trading",
            BookType::Banking => "banking",
        }
    }
}

/// Counterparty classification carried on balance-sheet rows.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CounterpartyType {
    Retail,
    Corporate,
    Sme,
    Government,
    Bank,
    CentralBank,
}

impl CounterpartyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CounterpartyType::Retail => "retail",
            CounterpartyType::Corporate => "corporate",
            CounterpartyType::Sme => "sme",
            CounterpartyType::Government => "government",
            CounterpartyType::Bank => "bank",
            CounterpartyType::CentralBank => "central_bank",
        }
    }
}

impl FromStr for CounterpartyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "retail" => Ok(CounterpartyType::Retail),
            "corporate" => Ok(CounterpartyType::Corporate),
            "sme" => Ok(CounterpartyType::Sme),
            "government" => Ok(CounterpartyType::Government),
            "bank" => Ok(CounterpartyType::Bank),
            "central_bank" => Ok(CounterpartyType::CentralBank),
            _ => Err(format!("Invalid counterparty type: {}", s)),
        }
    }
}

/// Customer segments used by the deposit elasticity model.
///
/// Kept here, in a leaf module, because both the elasticity engine and the
/// dynamic-balance orchestrator depend on it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CustomerSegment {
    Retail,
    Corporate,
    Sme,
    Government,
    Bank,
}

impl CustomerSegment {
    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerSegment::Retail => "retail",
            CustomerSegment::Corporate => "corporate",
            CustomerSegment::Sme => "sme",
            CustomerSegment::Government => "government",
            CustomerSegment::Bank => "bank",
        }
    }

    /// Default segment mapping from the counterparty classification.
    pub fn from_counterparty(counterparty: Option<CounterpartyType>) -> CustomerSegment {
        match counterparty {
            Some(CounterpartyType::Retail) => CustomerSegment::Retail,
            Some(CounterpartyType::Corporate) => CustomerSegment::Corporate,
            Some(CounterpartyType::Sme) => CustomerSegment::Sme,
            Some(CounterpartyType::Government) => CustomerSegment::Government,
            Some(CounterpartyType::Bank) | Some(CounterpartyType::CentralBank) => {
                CustomerSegment::Bank
            }
            None => CustomerSegment::Retail,
        }
    }
}

/// Maturity classification of a deposit for the elasticity model.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DepositType {
    Demand,
    ShortTerm,
    MediumTerm,
    LongTerm,
}

impl DepositType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DepositType::Demand => "demand",
            DepositType::ShortTerm => "short_term",
            DepositType::MediumTerm => "medium_term",
            DepositType::LongTerm => "long_term",
        }
    }

    /// Classification by remaining days to maturity. `None` means no maturity.
    pub fn from_days_to_maturity(days: Option<i64>) -> DepositType {
        match days {
            None => DepositType::Demand,
            Some(d) if d <= 90 => DepositType::ShortTerm,
            Some(d) if d <= 365 => DepositType::MediumTerm,
            Some(_) => DepositType::LongTerm,
        }
    }
}

/// Funding stress scenarios used by the flow-oriented survival horizon path.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FundingScenario {
    #[serde(rename = "NAME")]
    Name,
    #[serde(rename = "MARKET")]
    Market,
    #[serde(rename = "COMBO")]
    Combo,
}

impl FundingScenario {
    pub const ALL: [FundingScenario; 3] = [
        FundingScenario::Name,
        FundingScenario::Market,
        FundingScenario::Combo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FundingScenario::Name => "NAME",
            FundingScenario::Market => "MARKET",
            FundingScenario::Combo => "COMBO",
        }
    }

    /// MARKET and COMBO start from the impaired buffer value.
    pub fn uses_impaired_buffer(&self) -> bool {
        !matches!(self, FundingScenario::Name)
    }
}

impl FromStr for FundingScenario {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NAME" => Ok(FundingScenario::Name),
            "MARKET" => Ok(FundingScenario::Market),
            "COMBO" => Ok(FundingScenario::Combo),
            _ => Err(format!("Invalid funding scenario: {}", s)),
        }
    }
}

/// Correspondent account sub-type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CorrespondentAccountType {
    Nostro,
    Loro,
    CbrRequiredReserve,
    CbrOperational,
}

impl CorrespondentAccountType {
    /// Nostro accounts and central-bank balances are assets; loro is a liability.
    pub fn is_asset(&self) -> bool {
        !matches!(self, CorrespondentAccountType::Loro)
    }
}

impl FromStr for CorrespondentAccountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nostro" => Ok(CorrespondentAccountType::Nostro),
            "loro" => Ok(CorrespondentAccountType::Loro),
            "cbr_required_reserve" => Ok(CorrespondentAccountType::CbrRequiredReserve),
            "cbr_operational" => Ok(CorrespondentAccountType::CbrOperational),
            _ => Err(format!("Invalid correspondent account type: {}", s)),
        }
    }
}

/// Category of an other-asset position, driving its default liquidity horizon.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AssetCategory {
    FixedAssets,
    Intangible,
    Receivables,
    Other,
}

impl FromStr for AssetCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fixed_assets" => Ok(AssetCategory::FixedAssets),
            "intangible" => Ok(AssetCategory::Intangible),
            "receivables" => Ok(AssetCategory::Receivables),
            "other" => Ok(AssetCategory::Other),
            _ => Err(format!("Invalid asset category: {}", s)),
        }
    }
}

/// Category of an other-liability position.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LiabilityCategory {
    Payables,
    Reserves,
    Payroll,
    Other,
}

impl FromStr for LiabilityCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "payables" => Ok(LiabilityCategory::Payables),
            "reserves" => Ok(LiabilityCategory::Reserves),
            "payroll" => Ok(LiabilityCategory::Payroll),
            "other" => Ok(LiabilityCategory::Other),
            _ => Err(format!("Invalid liability category: {}", s)),
        }
    }
}

/// Kind of an off-balance position.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OffBalanceKind {
    Guarantee,
    CreditLine,
    Forward,
    Swap,
    Option,
    Other,
}

impl FromStr for OffBalanceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "guarantee" => Ok(OffBalanceKind::Guarantee),
            "credit_line" => Ok(OffBalanceKind::CreditLine),
            "forward" => Ok(OffBalanceKind::Forward),
            "swap" => Ok(OffBalanceKind::Swap),
            "option" => Ok(OffBalanceKind::Option),
            "other" => Ok(OffBalanceKind::Other),
            _ => Err(format!("Invalid off-balance kind: {}", s)),
        }
    }
}
