//! Bank buy/sell quote aggregation.

use crate::cache::CacheLayer;
use crate::core::{BankQuote, BankQuoteProvider, Currency};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Banks quote retail rates against RUB for USD and EUR only; any other
/// source currency is shown with USD quotes.
pub fn bank_currency(from: Currency) -> Currency {
    match from {
        Currency::Usd | Currency::Eur => from,
        _ => Currency::Usd,
    }
}

pub struct BankQuoteAggregator {
    banks: Vec<Arc<dyn BankQuoteProvider>>,
    cache: Arc<CacheLayer>,
    delay: Duration,
}

impl BankQuoteAggregator {
    /// `banks` are queried in the given order, pausing `delay` between them.
    pub fn new(
        banks: Vec<Arc<dyn BankQuoteProvider>>,
        cache: Arc<CacheLayer>,
        delay: Duration,
    ) -> Self {
        Self {
            banks,
            cache,
            delay,
        }
    }

    /// Cached quotes for `currency`, collected from the banks when stale.
    pub async fn quotes(&self, currency: Currency) -> Vec<BankQuote> {
        self.cache
            .bank_quotes(currency, move || self.collect(currency))
            .await
    }

    /// Queries every bank once. Failures are skipped; when no bank answers the
    /// result is a single sentinel row.
    #[instrument(name = "CollectQuotes", skip(self), fields(currency = %currency))]
    pub async fn collect(&self, currency: Currency) -> Vec<BankQuote> {
        let mut quotes = Vec::with_capacity(self.banks.len());

        for (i, bank) in self.banks.iter().enumerate() {
            if i > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            match bank.fetch_quote(currency).await {
                Ok(prices) => {
                    let now = self.cache.clock().now();
                    let quote = BankQuote::new(bank.name(), currency, prices, now);
                    if quote.is_inverted() {
                        warn!(
                            bank = bank.name(),
                            buy = quote.buy,
                            sell = quote.sell,
                            "Bank quotes buy above sell"
                        );
                    }
                    quotes.push(quote);
                }
                Err(e) => debug!(bank = bank.name(), outcome = e.outcome(), "Skipping bank"),
            }
        }

        if quotes.is_empty() {
            warn!(outcome = "unavailable", "No bank returned a quote");
            quotes.push(BankQuote::sentinel(currency));
        }
        quotes
    }
}
