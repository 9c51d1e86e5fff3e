use super::{
    RateStore, Stamped, StoredQuote, StoredRate, pair_key, parse_pair_key, quotes_from_rows,
    series_from_points, table_from_rows,
};
use crate::core::{BankQuote, Currency, CurrencyPair, HistoricalSeries, RatePoint, RateTable};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use std::path::Path;
use tracing::debug;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// fjall-backed store with one partition per table.
///
/// Keys: `rates` holds `BASE/QUOTE`, `history` holds `BASE/QUOTE/YYYY-MM-DD`
/// plus the pair's fetch time under the bare `BASE/QUOTE`, `bank_quotes`
/// holds `CUR/bank`. Values are JSON.
pub struct DiskStore {
    keyspace: Keyspace,
    rates: PartitionHandle,
    history: PartitionHandle,
    quotes: PartitionHandle,
}

impl DiskStore {
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create store directory: {}", path.display()))?;
        let keyspace = fjall::Config::new(path)
            .open()
            .with_context(|| format!("Failed to open store at {}", path.display()))?;
        let rates = keyspace.open_partition("rates", PartitionCreateOptions::default())?;
        let history = keyspace.open_partition("history", PartitionCreateOptions::default())?;
        let quotes = keyspace.open_partition("bank_quotes", PartitionCreateOptions::default())?;
        debug!("Opened rate store at {}", path.display());

        Ok(Self {
            keyspace,
            rates,
            history,
            quotes,
        })
    }

    fn flush(&self) -> Result<()> {
        self.keyspace.persist(PersistMode::SyncAll)?;
        Ok(())
    }
}

fn key_str(key: &[u8]) -> Result<&str> {
    std::str::from_utf8(key).map_err(|e| anyhow!("Non UTF-8 store key: {e}"))
}

#[async_trait]
impl RateStore for DiskStore {
    async fn load_rate_table(&self) -> Result<Option<Stamped<RateTable>>> {
        let mut rows = Vec::new();
        for item in self.rates.iter() {
            let (key, value) = item?;
            let pair = parse_pair_key(key_str(&key)?)?;
            let row: StoredRate = serde_json::from_slice(&value)?;
            rows.push((pair, row));
        }
        Ok(table_from_rows(rows))
    }

    async fn save_rate_table(&self, table: &RateTable, at: DateTime<Utc>) -> Result<()> {
        for (pair, rate) in table.entries() {
            let row = StoredRate {
                rate,
                updated_at: at,
            };
            self.rates.insert(pair_key(pair), serde_json::to_vec(&row)?)?;
        }
        self.flush()?;
        debug!("Stored rate table on disk");
        Ok(())
    }

    async fn load_series(
        &self,
        pair: CurrencyPair,
        min_days: usize,
    ) -> Result<Option<Stamped<HistoricalSeries>>> {
        let fetched_at = match self.history.get(pair_key(pair))? {
            Some(value) => Some(serde_json::from_slice::<DateTime<Utc>>(&value)?),
            None => None,
        };
        let prefix = format!("{}/", pair_key(pair));
        let mut points = Vec::new();
        // Dates sort lexicographically, so walking backwards yields the newest first.
        for item in self.history.prefix(&prefix).rev().take(min_days) {
            let (key, value) = item?;
            let key = key_str(&key)?;
            let date_str = key.strip_prefix(&prefix).unwrap_or(key);
            let date = NaiveDate::parse_from_str(date_str, DATE_FORMAT)
                .with_context(|| format!("Bad date in history key {key}"))?;
            let rate: f64 = serde_json::from_slice(&value)?;
            points.push(RatePoint::new(date, rate));
        }
        Ok(series_from_points(pair, points, min_days, fetched_at))
    }

    async fn save_series(&self, series: &HistoricalSeries, at: DateTime<Utc>) -> Result<()> {
        let prefix = pair_key(series.pair());
        for point in series.points() {
            let key = format!("{prefix}/{}", point.date.format(DATE_FORMAT));
            self.history.insert(key, serde_json::to_vec(&point.rate)?)?;
        }
        self.history.insert(&prefix, serde_json::to_vec(&at)?)?;
        self.flush()?;
        debug!(pair = %series.pair(), points = series.len(), "Stored series on disk");
        Ok(())
    }

    async fn load_bank_quotes(
        &self,
        currency: Currency,
        since: DateTime<Utc>,
    ) -> Result<Vec<BankQuote>> {
        let mut rows = Vec::new();
        for item in self.quotes.prefix(format!("{currency}/")) {
            let (_, value) = item?;
            rows.push(serde_json::from_slice::<StoredQuote>(&value)?);
        }
        Ok(quotes_from_rows(rows, since))
    }

    async fn save_bank_quotes(&self, quotes: &[BankQuote]) -> Result<()> {
        for (slot, quote) in quotes.iter().enumerate() {
            let key = format!("{}/{}", quote.currency, quote.bank);
            let row = StoredQuote {
                slot,
                quote: quote.clone(),
            };
            self.quotes.insert(key, serde_json::to_vec(&row)?)?;
        }
        self.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rates::tests::sample_table;
    use crate::core::{QuotePrices, SeriesOrigin};
    use chrono::{Duration, TimeZone};
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_disk_rate_table_round_trip() {
        let dir = tempdir().unwrap();
        let store = DiskStore::open(dir.path()).unwrap();
        assert!(store.load_rate_table().await.unwrap().is_none());

        let at = Utc.with_ymd_and_hms(2024, 4, 1, 8, 0, 0).unwrap();
        store.save_rate_table(&sample_table(), at).await.unwrap();

        let loaded = store.load_rate_table().await.unwrap().unwrap();
        assert_eq!(loaded.at, at);
        for (pair, rate) in sample_table().entries() {
            assert_eq!(loaded.value.rate(pair.base, pair.quote), rate);
        }
    }

    #[tokio::test]
    async fn test_disk_series_returns_most_recent_points() {
        let dir = tempdir().unwrap();
        let store = DiskStore::open(dir.path()).unwrap();
        let pair = CurrencyPair::new(Currency::Usd, Currency::Jpy);
        let start = NaiveDate::from_ymd_opt(2024, 1, 28).unwrap();
        let series = HistoricalSeries::new(
            pair,
            (0..10).map(|i| RatePoint::new(start + Duration::days(i), 148.0 + i as f64)),
            SeriesOrigin::Direct,
            10,
        );
        let at = Utc.with_ymd_and_hms(2024, 2, 7, 8, 0, 0).unwrap();
        store.save_series(&series, at).await.unwrap();

        let stored = store.load_series(pair, 4).await.unwrap().unwrap();
        assert_eq!(stored.at, at);
        let loaded = stored.value;
        assert_eq!(loaded.len(), 4);
        assert_eq!(loaded.first().unwrap().date, start + Duration::days(6));
        assert_eq!(loaded.latest(), series.latest());

        assert!(store.load_series(pair, 11).await.unwrap().is_none());
        let other = CurrencyPair::new(Currency::Usd, Currency::Eur);
        assert!(store.load_series(other, 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_disk_series_fetch_time_survives_reopen() {
        let dir = tempdir().unwrap();
        let pair = CurrencyPair::new(Currency::Eur, Currency::Usd);
        let day = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let first = Utc.with_ymd_and_hms(2024, 3, 5, 8, 0, 0).unwrap();
        let later = first + Duration::hours(2);
        {
            let store = DiskStore::open(dir.path()).unwrap();
            let series = HistoricalSeries::new(
                pair,
                [RatePoint::new(day, 1.08)],
                SeriesOrigin::Direct,
                1,
            );
            store.save_series(&series, first).await.unwrap();
            store.save_series(&series, later).await.unwrap();
        }

        let store = DiskStore::open(dir.path()).unwrap();
        let stored = store.load_series(pair, 1).await.unwrap().unwrap();
        assert_eq!(stored.at, later);
        assert_eq!(stored.value.points(), &[RatePoint::new(day, 1.08)]);
    }

    #[tokio::test]
    async fn test_disk_bank_quotes_round_trip() {
        let dir = tempdir().unwrap();
        let now = Utc.with_ymd_and_hms(2024, 4, 1, 8, 0, 0).unwrap();
        let quotes = vec![
            BankQuote::new("Uralsib", Currency::Usd, QuotePrices::checked(90.1, 93.2).unwrap(), now),
            BankQuote::new("Alfa-Bank", Currency::Usd, QuotePrices::checked(90.4, 92.9).unwrap(), now),
        ];
        let store = DiskStore::open(dir.path()).unwrap();
        store.save_bank_quotes(&quotes).await.unwrap();

        let loaded = store
            .load_bank_quotes(Currency::Usd, now - Duration::minutes(30))
            .await
            .unwrap();
        assert_eq!(loaded, quotes);

        let expired = store
            .load_bank_quotes(Currency::Usd, now + Duration::minutes(1))
            .await
            .unwrap();
        assert!(expired.is_empty());
    }
}
