use super::{
    RateStore, Stamped, StoredQuote, StoredRate, quotes_from_rows, series_from_points,
    table_from_rows,
};
use crate::core::{BankQuote, Currency, CurrencyPair, HistoricalSeries, RatePoint, RateTable};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::Mutex;
use tracing::debug;

/// Process-local store, used when no data directory is available and in tests.
#[derive(Default)]
pub struct MemoryStore {
    rates: Mutex<HashMap<CurrencyPair, StoredRate>>,
    history: Mutex<HashMap<CurrencyPair, PairHistory>>,
    quotes: Mutex<HashMap<(Currency, String), StoredQuote>>,
}

#[derive(Default)]
struct PairHistory {
    fetched_at: Option<DateTime<Utc>>,
    points: BTreeMap<NaiveDate, f64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RateStore for MemoryStore {
    async fn load_rate_table(&self) -> Result<Option<Stamped<RateTable>>> {
        let rates = self.rates.lock().await;
        Ok(table_from_rows(
            rates.iter().map(|(pair, row)| (*pair, row.clone())),
        ))
    }

    async fn save_rate_table(&self, table: &RateTable, at: DateTime<Utc>) -> Result<()> {
        let mut rates = self.rates.lock().await;
        for (pair, rate) in table.entries() {
            rates.insert(
                pair,
                StoredRate {
                    rate,
                    updated_at: at,
                },
            );
        }
        debug!("Stored rate table in memory");
        Ok(())
    }

    async fn load_series(
        &self,
        pair: CurrencyPair,
        min_days: usize,
    ) -> Result<Option<Stamped<HistoricalSeries>>> {
        let history = self.history.lock().await;
        let Some(stored) = history.get(&pair) else {
            return Ok(None);
        };
        let points = stored
            .points
            .iter()
            .map(|(date, rate)| RatePoint::new(*date, *rate))
            .collect();
        Ok(series_from_points(pair, points, min_days, stored.fetched_at))
    }

    async fn save_series(&self, series: &HistoricalSeries, at: DateTime<Utc>) -> Result<()> {
        let mut history = self.history.lock().await;
        let stored = history.entry(series.pair()).or_default();
        for point in series.points() {
            stored.points.insert(point.date, point.rate);
        }
        stored.fetched_at = Some(at);
        Ok(())
    }

    async fn load_bank_quotes(
        &self,
        currency: Currency,
        since: DateTime<Utc>,
    ) -> Result<Vec<BankQuote>> {
        let quotes = self.quotes.lock().await;
        Ok(quotes_from_rows(
            quotes
                .iter()
                .filter(|((c, _), _)| *c == currency)
                .map(|(_, row)| row.clone()),
            since,
        ))
    }

    async fn save_bank_quotes(&self, quotes: &[BankQuote]) -> Result<()> {
        let mut stored = self.quotes.lock().await;
        for (slot, quote) in quotes.iter().enumerate() {
            stored.insert(
                (quote.currency, quote.bank.clone()),
                StoredQuote {
                    slot,
                    quote: quote.clone(),
                },
            );
        }
        Ok(())
    }
}
