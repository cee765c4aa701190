pub mod inst_info;

pub mod bond;
pub mod correspondent_account;
pub mod current_account;
pub mod deposit;
pub mod derivatives;
pub mod interbank;
pub mod loan;
pub mod off_balance;
pub mod other_items;
pub mod repo;

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Type tag shared by every balance-sheet entity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentType {
    Loan,
    Deposit,
    InterbankLoan,
    Repo,
    ReverseRepo,
    Bond,
    CurrentAccount,
    CorrespondentAccount,
    OtherAsset,
    OtherLiability,
    OffBalance,
    Derivative,
    #[default]
    Other,
}

impl InstrumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstrumentType::Loan => "loan",
            InstrumentType::Deposit => "deposit",
            InstrumentType::InterbankLoan => "interbank_loan",
            InstrumentType::Repo => "repo",
            InstrumentType::ReverseRepo => "reverse_repo",
            InstrumentType::Bond => "bond",
            InstrumentType::CurrentAccount => "current_account",
            InstrumentType::CorrespondentAccount => "correspondent_account",
            InstrumentType::OtherAsset => "other_asset",
            InstrumentType::OtherLiability => "other_liability",
            InstrumentType::OffBalance => "off_balance",
            InstrumentType::Derivative => "derivative",
            InstrumentType::Other => "other",
        }
    }
}

impl FromStr for InstrumentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "loan" => Ok(InstrumentType::Loan),
            "deposit" => Ok(InstrumentType::Deposit),
            "interbank_loan" => Ok(InstrumentType::InterbankLoan),
            "repo" => Ok(InstrumentType::Repo),
            "reverse_repo" => Ok(InstrumentType::ReverseRepo),
            "bond" => Ok(InstrumentType::Bond),
            "current_account" => Ok(InstrumentType::CurrentAccount),
            "correspondent_account" => Ok(InstrumentType::CorrespondentAccount),
            "other_asset" => Ok(InstrumentType::OtherAsset),
            "other_liability" => Ok(InstrumentType::OtherLiability),
            "off_balance" => Ok(InstrumentType::OffBalance),
            "derivative" => Ok(InstrumentType::Derivative),
            "other" => Ok(InstrumentType::Other),
            _ => Err(format!("Invalid instrument type: {}", s)),
        }
    }
}

impl std::fmt::Display for InstrumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
