//! Durable tier: current rate table, daily history points and bank quotes.

pub mod disk;
pub mod memory;

use crate::core::{
    BankQuote, Currency, CurrencyPair, HistoricalSeries, RatePoint, RateTable, SeriesOrigin,
};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use disk::DiskStore;
pub use memory::MemoryStore;

/// A value together with the time it was produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Stamped<T> {
    pub value: T,
    pub at: DateTime<Utc>,
}

#[async_trait]
pub trait RateStore: Send + Sync {
    async fn load_rate_table(&self) -> Result<Option<Stamped<RateTable>>>;

    /// Upserts one row per currency pair.
    async fn save_rate_table(&self, table: &RateTable, at: DateTime<Utc>) -> Result<()>;

    /// The `min_days` most recent points for `pair`, stamped with the last
    /// time the pair was saved, or `None` if fewer are stored.
    async fn load_series(
        &self,
        pair: CurrencyPair,
        min_days: usize,
    ) -> Result<Option<Stamped<HistoricalSeries>>>;

    /// Upserts one row per date and records `at` as the pair's fetch time.
    async fn save_series(&self, series: &HistoricalSeries, at: DateTime<Utc>) -> Result<()>;

    /// Quotes for `currency` observed after `since`, in the order they were saved.
    async fn load_bank_quotes(
        &self,
        currency: Currency,
        since: DateTime<Utc>,
    ) -> Result<Vec<BankQuote>>;

    /// Upserts one row per (bank, currency).
    async fn save_bank_quotes(&self, quotes: &[BankQuote]) -> Result<()>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct StoredRate {
    pub rate: f64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct StoredQuote {
    pub slot: usize,
    pub quote: BankQuote,
}

pub(crate) fn table_from_rows(
    rows: impl IntoIterator<Item = (CurrencyPair, StoredRate)>,
) -> Option<Stamped<RateTable>> {
    let mut oldest: Option<DateTime<Utc>> = None;
    let entries: Vec<(CurrencyPair, f64)> = rows
        .into_iter()
        .map(|(pair, row)| {
            oldest = Some(oldest.map_or(row.updated_at, |t| t.min(row.updated_at)));
            (pair, row.rate)
        })
        .collect();

    let at = oldest?;
    match RateTable::from_entries(entries) {
        Ok(value) => Some(Stamped { value, at }),
        Err(e) => {
            debug!("Stored rate table is incomplete: {}", e);
            None
        }
    }
}

/// Points saved without a fetch time are treated as long expired.
pub(crate) fn series_from_points(
    pair: CurrencyPair,
    points: Vec<RatePoint>,
    min_days: usize,
    fetched_at: Option<DateTime<Utc>>,
) -> Option<Stamped<HistoricalSeries>> {
    if points.is_empty() || points.len() < min_days {
        return None;
    }
    let series = HistoricalSeries::new(pair, points, SeriesOrigin::Stored, min_days);
    (series.len() >= min_days).then(|| Stamped {
        value: series,
        at: fetched_at.unwrap_or(DateTime::<Utc>::MIN_UTC),
    })
}

pub(crate) fn quotes_from_rows(
    rows: impl IntoIterator<Item = StoredQuote>,
    since: DateTime<Utc>,
) -> Vec<BankQuote> {
    let mut rows: Vec<StoredQuote> = rows
        .into_iter()
        .filter(|row| row.quote.observed_at.is_some_and(|t| t > since))
        .collect();
    rows.sort_by_key(|row| row.slot);
    rows.into_iter().map(|row| row.quote).collect()
}

pub(crate) fn pair_key(pair: CurrencyPair) -> String {
    pair.to_string()
}

pub(crate) fn parse_pair_key(key: &str) -> Result<CurrencyPair> {
    let (base, quote) = key
        .split_once('/')
        .ok_or_else(|| anyhow!("Malformed pair key: {key}"))?;
    Ok(CurrencyPair::new(
        base.parse().with_context(|| format!("Bad base in key {key}"))?,
        quote.parse().with_context(|| format!("Bad quote in key {key}"))?,
    ))
}
