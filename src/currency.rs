use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Enum representing the currencies a balance sheet may be denominated in.
/// # Example
/// ```
/// use serde_json;
/// use almetrics::Currency;
///
/// let currency = Currency::RUB;
/// let serialized = serde_json::to_string(&currency).unwrap();
/// assert_eq!(serialized, "\"RUB\"");
/// let deserialized: Currency = serde_json::from_str(&serialized).unwrap();
/// assert_eq!(deserialized, currency);
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Currency {
    /// Default value representing no currency.
    #[default]
    NIL,
    RUB,
    USD,
    EUR,
    CNY,
    KZT,
    GBP,
    CHF,
    JPY,
    TRY,
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::NIL => "NIL",
            Currency::RUB => "RUB",
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::CNY => "CNY",
            Currency::KZT => "KZT",
            Currency::GBP => "GBP",
            Currency::CHF => "CHF",
            Currency::JPY => "JPY",
            Currency::TRY => "TRY",
        }
    }
}

impl FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RUB" => Ok(Currency::RUB),
            "USD" => Ok(Currency::USD),
            "EUR" => Ok(Currency::EUR),
            "CNY" => Ok(Currency::CNY),
            "KZT" => Ok(Currency::KZT),
            "GBP" => Ok(Currency::GBP),
            "CHF" => Ok(Currency::CHF),
            "JPY" => Ok(Currency::JPY),
            "TRY" => Ok(Currency::TRY),
            _ => Err(format!("Invalid currency: {}", s)),
        }
    }
}

/// Implement conversion from &str to Currency. Unknown codes map to NIL.
impl From<&str> for Currency {
    fn from(s: &str) -> Self {
        Currency::from_str(s).unwrap_or(Currency::NIL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_roundtrip() {
        for code in ["RUB", "USD", "EUR", "CNY", "KZT"] {
            let currency = Currency::from_str(code).unwrap();
            assert_eq!(currency.as_str(), code);
        }
        assert!(Currency::from_str("XXX").is_err());
        assert_eq!(Currency::from("XXX"), Currency::NIL);
    }
}
