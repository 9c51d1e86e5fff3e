//! Bank buy/sell quotes

use crate::core::currency::Currency;
use crate::core::error::RateError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const SENTINEL_BANK: &str = "Data temporarily unavailable";

/// Buy and sell prices as published by a bank, before they are attributed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuotePrices {
    pub buy: f64,
    pub sell: f64,
}

impl QuotePrices {
    /// Rejects prices that cannot be shown. Inverted spreads pass through.
    pub fn checked(buy: f64, sell: f64) -> Result<Self, RateError> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if !valid(buy) || !valid(sell) {
            return Err(RateError::Unavailable(format!(
                "implausible quote buy={buy} sell={sell}"
            )));
        }
        Ok(Self { buy, sell })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankQuote {
    pub bank: String,
    pub currency: Currency,
    pub buy: f64,
    pub sell: f64,
    pub observed_at: Option<DateTime<Utc>>,
}

impl BankQuote {
    pub fn new(
        bank: impl Into<String>,
        currency: Currency,
        prices: QuotePrices,
        observed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            bank: bank.into(),
            currency,
            buy: prices.buy,
            sell: prices.sell,
            observed_at: Some(observed_at),
        }
    }

    /// Placeholder row shown when no bank answered.
    pub fn sentinel(currency: Currency) -> Self {
        Self {
            bank: SENTINEL_BANK.to_string(),
            currency,
            buy: 0.0,
            sell: 0.0,
            observed_at: None,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.observed_at.is_none() && self.bank == SENTINEL_BANK
    }

    pub fn is_inverted(&self) -> bool {
        self.buy > self.sell
    }
}

#[async_trait]
pub trait BankQuoteProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch_quote(&self, currency: Currency) -> Result<QuotePrices, RateError>;
}
