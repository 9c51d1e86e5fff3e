//! Supported currencies and currency pairs

use crate::core::error::RateError;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// Every cross rate is computed through this currency when no direct rate is known.
pub const PIVOT: Currency = Currency::Usd;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Currency {
    Sgd,
    Usd,
    Eur,
    Gbp,
    Jpy,
    Cny,
    Rub,
    Aud,
    Cad,
    Chf,
    Inr,
}

impl Currency {
    pub const ALL: [Currency; 11] = [
        Currency::Sgd,
        Currency::Usd,
        Currency::Eur,
        Currency::Gbp,
        Currency::Jpy,
        Currency::Cny,
        Currency::Rub,
        Currency::Aud,
        Currency::Cad,
        Currency::Chf,
        Currency::Inr,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Currency::Sgd => "SGD",
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
            Currency::Jpy => "JPY",
            Currency::Cny => "CNY",
            Currency::Rub => "RUB",
            Currency::Aud => "AUD",
            Currency::Cad => "CAD",
            Currency::Chf => "CHF",
            Currency::Inr => "INR",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Currency::Sgd => "Singapore dollar",
            Currency::Usd => "US dollar",
            Currency::Eur => "Euro",
            Currency::Gbp => "Pound sterling",
            Currency::Jpy => "Japanese yen",
            Currency::Cny => "Chinese yuan",
            Currency::Rub => "Russian ruble",
            Currency::Aud => "Australian dollar",
            Currency::Cad => "Canadian dollar",
            Currency::Chf => "Swiss franc",
            Currency::Inr => "Indian rupee",
        }
    }

    /// Currencies whose simulated trends swing harder than the rest.
    pub fn is_high_volatility(&self) -> bool {
        matches!(self, Currency::Jpy)
    }
}

impl Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = RateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_uppercase();
        Currency::ALL
            .into_iter()
            .find(|c| c.code() == code)
            .ok_or_else(|| RateError::Invalid(format!("unsupported currency: {s}")))
    }
}

impl TryFrom<String> for Currency {
    type Error = RateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Currency> for String {
    fn from(value: Currency) -> Self {
        value.code().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CurrencyPair {
    pub base: Currency,
    pub quote: Currency,
}

impl CurrencyPair {
    pub fn new(base: Currency, quote: Currency) -> Self {
        Self { base, quote }
    }

    pub fn inverse(&self) -> Self {
        Self::new(self.quote, self.base)
    }

    pub fn involves(&self, currency: Currency) -> bool {
        self.base == currency || self.quote == currency
    }

    pub fn is_identity(&self) -> bool {
        self.base == self.quote
    }

    pub fn is_high_volatility(&self) -> bool {
        self.base.is_high_volatility() || self.quote.is_high_volatility()
    }
}

impl Display for CurrencyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("usd".parse::<Currency>().unwrap(), Currency::Usd);
        assert_eq!(" Jpy ".parse::<Currency>().unwrap(), Currency::Jpy);
        assert!(matches!(
            "XYZ".parse::<Currency>(),
            Err(RateError::Invalid(_))
        ));
    }

    #[test]
    fn test_serde_uses_iso_codes() {
        let json = serde_json::to_string(&Currency::Chf).unwrap();
        assert_eq!(json, "\"CHF\"");
        let parsed: Currency = serde_json::from_str("\"inr\"").unwrap();
        assert_eq!(parsed, Currency::Inr);
    }

    #[test]
    fn test_pair_helpers() {
        let pair = CurrencyPair::new(Currency::Sgd, Currency::Jpy);
        assert_eq!(pair.to_string(), "SGD/JPY");
        assert_eq!(pair.inverse(), CurrencyPair::new(Currency::Jpy, Currency::Sgd));
        assert!(pair.involves(Currency::Jpy));
        assert!(!pair.involves(PIVOT));
        assert!(pair.is_high_volatility());
        assert!(!CurrencyPair::new(Currency::Eur, Currency::Usd).is_high_volatility());
    }
}
