use crate::contribution::Contribution;
use crate::currency::Currency;
use crate::definitions::Real;
use crate::enums::{BookType, CounterpartyType};
use crate::error::AlmError;
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
use crate::risks::assumptions::AssumptionSet;
//
use anyhow::Result;
use enum_dispatch::enum_dispatch;
use rustc_hash::FxHashSet;
use std::ops::Index;
use time::Date;

#[enum_dispatch]
pub trait InstrumentTrait {
    // The following methods are mandatory for all instruments
    fn get_inst_info(&self) -> &InstInfo;
    fn get_inst_info_mut(&mut self) -> &mut InstInfo;

    /// Computes this instrument's contribution to the risk metrics as of the
    /// calculation date, under the resolved behavioral assumptions.
    fn compute_contribution(
        &self,
        calculation_date: Date,
        assumptions: &AssumptionSet,
    ) -> Result<Contribution>;

    fn get_id(&self) -> &str {
        &self.get_inst_info().instrument_id
    }
    fn get_type(&self) -> InstrumentType {
        self.get_inst_info().instrument_type
    }
    fn get_currency(&self) -> Currency {
        self.get_inst_info().currency
    }
    fn get_amount(&self) -> Real {
        self.get_inst_info().amount
    }
    fn get_volume(&self) -> Real {
        self.get_inst_info().volume()
    }
    fn get_maturity(&self) -> Option<Date> {
        self.get_inst_info().maturity_date
    }
    fn get_book(&self) -> BookType {
        self.get_inst_info().book()
    }
    fn get_counterparty_name(&self) -> Option<&str> {
        self.get_inst_info().counterparty_name.as_deref()
    }
    fn get_counterparty_type(&self) -> Option<CounterpartyType> {
        self.get_inst_info().counterparty_type
    }
    fn is_asset(&self) -> bool {
        self.get_inst_info().is_asset()
    }
    fn days_to_maturity(&self, as_of: Date) -> Option<i64> {
        self.get_inst_info().days_to_maturity(as_of)
    }
}

#[enum_dispatch(InstrumentTrait)]
#[derive(Clone, Debug)]
pub enum Instrument {
    Loan(Loan),
    Deposit(Deposit),
    InterbankLoan(InterbankLoan),
    Repo(Repo),
    ReverseRepo(ReverseRepo),
    Bond(Bond),
    CurrentAccount(CurrentAccount),
    CorrespondentAccount(CorrespondentAccount),
    OtherAsset(OtherAsset),
    OtherLiability(OtherLiability),
    OffBalance(OffBalance),
    Irs(Irs),
    Ois(Ois),
    FxSwap(FxSwap),
    FuturesContract(FuturesContract),
    Tom(Tom),
    DepositMargin(DepositMargin),
    Forward(Forward),
    Xccy(Xccy),
}

/// A balance-sheet snapshot: the full instrument set on one reference date.
#[derive(Clone, Debug, Default)]
pub struct Portfolio {
    instruments: Vec<Instrument>,
}

impl Index<usize> for Portfolio {
    type Output = Instrument;

    fn index(&self, index: usize) -> &Self::Output {
        &self.instruments[index]
    }
}

impl From<Vec<Instrument>> for Portfolio {
    fn from(instruments: Vec<Instrument>) -> Portfolio {
        Portfolio::new(instruments)
    }
}

impl Portfolio {
    pub fn new(instruments: Vec<Instrument>) -> Portfolio {
        Portfolio { instruments }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Instrument> {
        self.instruments.iter()
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }

    pub fn instruments(&self) -> &[Instrument] {
        &self.instruments
    }

    /// Structural validation: at least one instrument, per-instrument
    /// invariants, unique ids across the snapshot.
    pub fn validate(&self) -> Result<(), AlmError> {
        if self.instruments.is_empty() {
            return Err(AlmError::EmptyPortfolio);
        }
        let mut seen: FxHashSet<&str> = FxHashSet::default();
        for instrument in &self.instruments {
            instrument.get_inst_info().validate()?;
            if !seen.insert(instrument.get_id()) {
                return Err(AlmError::DataValidation(format!(
                    "duplicate instrument_id: {}",
                    instrument.get_id()
                )));
            }
        }
        Ok(())
    }

    /// All currencies present, in first-seen order.
    pub fn currencies(&self) -> Vec<Currency> {
        let mut currencies = Vec::<Currency>::new();
        for instrument in &self.instruments {
            let currency = instrument.get_currency();
            if !currencies.contains(&currency) {
                currencies.push(currency);
            }
        }
        currencies
    }

    pub fn instruments_with_book(&self, book: BookType) -> Vec<&Instrument> {
        self.instruments
            .iter()
            .filter(|inst| inst.get_book() == book)
            .collect()
    }

    /// Clones the snapshot split into deposits and everything else, the
    /// partition consumed by the dynamic-balance orchestrator.
    pub fn partition_deposits(&self) -> (Vec<Deposit>, Vec<Instrument>) {
        let mut deposits = Vec::new();
        let mut rest = Vec::new();
        for instrument in &self.instruments {
            match instrument {
                Instrument::Deposit(deposit) => deposits.push(deposit.clone()),
                other => rest.push(other.clone()),
            }
        }
        (deposits, rest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruments::InstrumentType;
    use time::macros::date;

    fn make_loan(id: &str, amount: f64) -> Instrument {
        Instrument::Loan(Loan {
            info: InstInfo {
                instrument_id: id.to_string(),
                instrument_type: InstrumentType::Loan,
                balance_account: "45502".to_string(),
                amount,
                currency: Currency::RUB,
                start_date: date!(2024 - 01 - 01),
                as_of_date: date!(2025 - 01 - 15),
                maturity_date: Some(date!(2026 - 01 - 15)),
                ..InstInfo::default()
            },
            ..Loan::default()
        })
    }

    #[test]
    fn test_portfolio_validation_catches_duplicates() {
        let portfolio = Portfolio::new(vec![make_loan("A", 100.0), make_loan("A", 200.0)]);
        assert!(matches!(
            portfolio.validate(),
            Err(AlmError::DataValidation(_))
        ));

        let portfolio = Portfolio::new(vec![make_loan("A", 100.0), make_loan("B", 200.0)]);
        assert!(portfolio.validate().is_ok());

        assert!(matches!(
            Portfolio::new(vec![]).validate(),
            Err(AlmError::EmptyPortfolio)
        ));
    }

    #[test]
    fn test_book_filter() {
        let mut trading = make_loan("T", 100.0);
        trading.get_inst_info_mut().trading_portfolio = Some("TRADING_DESK_1".to_string());
        let portfolio = Portfolio::new(vec![make_loan("B", 100.0), trading]);

        let trading_book = portfolio.instruments_with_book(BookType::Trading);
        assert_eq!(trading_book.len(), 1);
        assert_eq!(trading_book[0].get_id(), "T");
        assert_eq!(portfolio.instruments_with_book(BookType::Banking).len(), 1);
    }

    #[test]
    fn test_partition_deposits() {
        let deposit = Instrument::Deposit(Deposit {
            info: InstInfo {
                instrument_id: "D".to_string(),
                instrument_type: InstrumentType::Deposit,
                balance_account: "40817".to_string(),
                amount: -100.0,
                currency: Currency::RUB,
                start_date: date!(2024 - 01 - 01),
                as_of_date: date!(2025 - 01 - 15),
                ..InstInfo::default()
            },
            ..Deposit::default()
        });
        let portfolio = Portfolio::new(vec![make_loan("L", 100.0), deposit]);
        let (deposits, rest) = portfolio.partition_deposits();
        assert_eq!(deposits.len(), 1);
        assert_eq!(rest.len(), 1);
    }
}
