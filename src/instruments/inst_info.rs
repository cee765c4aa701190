use crate::currency::Currency;
use crate::definitions::Real;
use crate::enums::{BookType, CounterpartyType};
use crate::error::AlmError;
use crate::instruments::InstrumentType;
use serde::{Deserialize, Serialize};
use time::Date;

/// Prefix of `trading_portfolio` that puts an instrument into the trading book.
pub const TRADING_PORTFOLIO_PREFIX: &str = "TRADING_";

/// Common attributes shared by every instrument.
///
/// `amount` is signed: positive = asset, negative = liability. Volume-style
/// formulas use `volume()` (the absolute value), so rows that store
/// liabilities as positive magnitudes and rows that store them signed behave
/// identically.
/// # Example
/// ```
/// use almetrics::{Currency, InstInfo, InstrumentType};
/// use time::macros::date;
///
/// let info = InstInfo {
///     instrument_id: "L-001".to_string(),
///     instrument_type: InstrumentType::Loan,
///     balance_account: "45502".to_string(),
///     amount: 1_000_000.0,
///     currency: Currency::RUB,
///     start_date: date!(2024 - 06 - 01),
///     as_of_date: date!(2025 - 01 - 15),
///     maturity_date: Some(date!(2026 - 01 - 15)),
///     interest_rate: Some(0.12),
///     ..InstInfo::default()
/// };
/// assert!(info.is_asset());
/// assert!(info.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstInfo {
    pub instrument_id: String,
    pub instrument_type: InstrumentType,
    pub balance_account: String,
    pub amount: Real,
    pub currency: Currency,
    pub start_date: Date,
    pub as_of_date: Date,
    pub maturity_date: Option<Date>,
    pub interest_rate: Option<Real>,
    pub counterparty_id: Option<String>,
    pub counterparty_name: Option<String>,
    pub counterparty_type: Option<CounterpartyType>,
    pub trading_portfolio: Option<String>,
    pub book: Option<BookType>,
}

impl Default for InstInfo {
    fn default() -> InstInfo {
        InstInfo {
            instrument_id: String::new(),
            instrument_type: InstrumentType::default(),
            balance_account: String::new(),
            amount: 0.0,
            currency: Currency::default(),
            start_date: Date::MIN,
            as_of_date: Date::MIN,
            maturity_date: None,
            interest_rate: None,
            counterparty_id: None,
            counterparty_name: None,
            counterparty_type: None,
            trading_portfolio: None,
            book: None,
        }
    }
}

impl InstInfo {
    #[inline]
    pub fn is_asset(&self) -> bool {
        self.amount > 0.0
    }

    /// Absolute position size in instrument currency.
    #[inline]
    pub fn volume(&self) -> Real {
        self.amount.abs()
    }

    /// Book classification; derived from `trading_portfolio` when not set
    /// explicitly.
    pub fn book(&self) -> BookType {
        if let Some(book) = self.book {
            return book;
        }
        match &self.trading_portfolio {
            Some(portfolio) if portfolio.starts_with(TRADING_PORTFOLIO_PREFIX) => {
                BookType::Trading
            }
            _ => BookType::Banking,
        }
    }

    pub fn days_to_maturity(&self, as_of: Date) -> Option<i64> {
        self.maturity_date.map(|m| (m - as_of).whole_days())
    }

    /// Checks the structural invariants of the common attribute set.
    pub fn validate(&self) -> Result<(), AlmError> {
        if self.instrument_id.is_empty() {
            return Err(AlmError::DataValidation("empty instrument_id".to_string()));
        }
        if self.start_date > self.as_of_date {
            return Err(AlmError::DataValidation(format!(
                "{}: start_date {} is after as_of_date {}",
                self.instrument_id, self.start_date, self.as_of_date
            )));
        }
        if let Some(maturity) = self.maturity_date {
            if self.start_date > maturity {
                return Err(AlmError::DataValidation(format!(
                    "{}: start_date {} is after maturity_date {}",
                    self.instrument_id, self.start_date, maturity
                )));
            }
        }
        if self.currency == Currency::NIL {
            return Err(AlmError::DataValidation(format!(
                "{}: currency is not set",
                self.instrument_id
            )));
        }
        if !self.amount.is_finite() {
            return Err(AlmError::DataValidation(format!(
                "{}: amount is not finite",
                self.instrument_id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn base_info() -> InstInfo {
        InstInfo {
            instrument_id: "X-1".to_string(),
            instrument_type: InstrumentType::Loan,
            balance_account: "45502".to_string(),
            amount: 100.0,
            currency: Currency::RUB,
            start_date: date!(2024 - 01 - 01),
            as_of_date: date!(2025 - 01 - 15),
            ..InstInfo::default()
        }
    }

    #[test]
    fn test_book_is_derived_from_trading_portfolio_prefix() {
        let mut info = base_info();
        assert_eq!(info.book(), BookType::Banking);

        info.trading_portfolio = Some("TRADING_FX_DESK".to_string());
        assert_eq!(info.book(), BookType::Trading);

        // The prefix must match exactly; lowercase or embedded matches do not count.
        info.trading_portfolio = Some("trading_fx".to_string());
        assert_eq!(info.book(), BookType::Banking);
        info.trading_portfolio = Some("DESK_TRADING_FX".to_string());
        assert_eq!(info.book(), BookType::Banking);

        // An explicit book wins over the derivation.
        info.book = Some(BookType::Trading);
        assert_eq!(info.book(), BookType::Trading);
    }

    #[test]
    fn test_validation_rejects_inverted_dates() {
        let mut info = base_info();
        info.start_date = date!(2025 - 06 - 01);
        assert!(info.validate().is_err());

        let mut info = base_info();
        info.maturity_date = Some(date!(2023 - 01 - 01));
        assert!(info.validate().is_err());
    }

    #[test]
    fn test_volume_is_unsigned() {
        let mut info = base_info();
        info.amount = -250.0;
        assert!(!info.is_asset());
        assert_eq!(info.volume(), 250.0);
    }
}
