//! Live rate tables and the provider abstraction that fetches them

use crate::core::currency::{Currency, CurrencyPair};
use crate::core::derive::cross_rate;
use crate::core::error::RateError;
use async_trait::async_trait;
use std::collections::HashMap;

/// Rates between every pair of supported currencies.
///
/// The table is always square over [`Currency::ALL`] and its diagonal is
/// exactly `1.0`; both are checked when the table is built.
#[derive(Debug, Clone, PartialEq)]
pub struct RateTable {
    rates: HashMap<CurrencyPair, f64>,
}

impl RateTable {
    /// Builds the full table from one snapshot of `pivot -> X` rates.
    pub fn from_pivot_rates(
        pivot: Currency,
        pivot_rates: &HashMap<Currency, f64>,
    ) -> Result<Self, RateError> {
        let lookup = |c: Currency| {
            if c == pivot {
                Some(1.0)
            } else {
                pivot_rates.get(&c).copied()
            }
        };

        let mut rates = HashMap::with_capacity(Currency::ALL.len() * Currency::ALL.len());
        for base in Currency::ALL {
            for quote in Currency::ALL {
                let rate = if base == quote {
                    1.0
                } else {
                    cross_rate(lookup(base), lookup(quote)).ok_or_else(|| {
                        RateError::Unavailable(format!(
                            "no usable {pivot} rate for {}",
                            if lookup(base).is_some_and(|r| r.is_finite() && r > 0.0) {
                                quote
                            } else {
                                base
                            }
                        ))
                    })?
                };
                rates.insert(CurrencyPair::new(base, quote), rate);
            }
        }
        Self::from_entries(rates)
    }

    /// Rebuilds a table from stored pair rates. Diagonal entries are forced to `1.0`.
    pub fn from_entries(
        entries: impl IntoIterator<Item = (CurrencyPair, f64)>,
    ) -> Result<Self, RateError> {
        let mut rates: HashMap<CurrencyPair, f64> = entries
            .into_iter()
            .filter(|(pair, _)| !pair.is_identity())
            .collect();

        for base in Currency::ALL {
            rates.insert(CurrencyPair::new(base, base), 1.0);
            for quote in Currency::ALL {
                let pair = CurrencyPair::new(base, quote);
                match rates.get(&pair) {
                    Some(r) if r.is_finite() && *r > 0.0 => {}
                    Some(r) => {
                        return Err(RateError::Unavailable(format!("bad rate {r} for {pair}")));
                    }
                    None => {
                        return Err(RateError::Unavailable(format!("missing rate for {pair}")));
                    }
                }
            }
        }
        Ok(Self { rates })
    }

    pub fn rate(&self, from: Currency, to: Currency) -> f64 {
        if from == to {
            return 1.0;
        }
        // Construction guarantees every pair is present.
        self.rates
            .get(&CurrencyPair::new(from, to))
            .copied()
            .unwrap_or(1.0)
    }

    /// Converts `amount` and rounds to cents.
    pub fn convert(&self, amount: f64, from: Currency, to: Currency) -> f64 {
        round_cents(amount * self.rate(from, to))
    }

    pub fn entries(&self) -> impl Iterator<Item = (CurrencyPair, f64)> + '_ {
        self.rates.iter().map(|(pair, rate)| (*pair, *rate))
    }
}

pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[async_trait]
pub trait RateTableProvider: Send + Sync {
    async fn fetch_rate_table(&self) -> Result<RateTable, RateError>;
}
