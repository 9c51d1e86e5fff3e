//! Tiered cache service shared by the resolvers.
//!
//! Every lookup walks the same tiers: the durable store (fresh by its stored
//! timestamp), then the in-memory entry, then the live fetch. A successful
//! fetch is written through to both tiers. When the fetch fails, the last
//! stale value is served if one exists; only then is the lookup exhausted.

use crate::core::cache::{CacheKey, CacheTtls, TtlCache};
use crate::core::{BankQuote, Clock, Currency, CurrencyPair, HistoricalSeries, RateError, RateTable};
use crate::store::RateStore;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct CacheLayer {
    rates: TtlCache<CacheKey, RateTable>,
    series: TtlCache<CacheKey, HistoricalSeries>,
    quotes: TtlCache<CacheKey, Vec<BankQuote>>,
    store: Arc<dyn RateStore>,
    clock: Arc<dyn Clock>,
    ttls: CacheTtls,
}

impl CacheLayer {
    pub fn new(store: Arc<dyn RateStore>, clock: Arc<dyn Clock>, ttls: CacheTtls) -> Self {
        Self {
            rates: TtlCache::new(ttls.rate_table, Arc::clone(&clock)),
            series: TtlCache::new(ttls.series, Arc::clone(&clock)),
            quotes: TtlCache::new(ttls.bank_quotes, Arc::clone(&clock)),
            store,
            clock,
            ttls,
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// The current rate table, fetching it only when no tier holds a fresh one.
    ///
    /// Fails with [`RateError::Exhausted`] only when the fetch fails and no
    /// table was ever cached or stored.
    pub async fn rate_table<F, Fut>(&self, fetch: F) -> Result<RateTable, RateError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<RateTable, RateError>>,
    {
        let key = CacheKey::RateTable;
        let now = self.clock.now();

        let stored = self.store.load_rate_table().await.unwrap_or_else(|e| {
            warn!(tier = "durable", error = %e, "Failed to read stored rate table");
            None
        });
        if let Some(stored) = &stored
            && now.signed_duration_since(stored.at) < self.ttls.rate_table
        {
            debug!("Serving rate table from durable store");
            self.rates.put_at(key, stored.value.clone(), stored.at).await;
            return Ok(stored.value.clone());
        }

        let cached = self.rates.get(&key).await;
        if let Some((table, true)) = &cached {
            return Ok(table.clone());
        }

        match fetch().await {
            Ok(table) => {
                self.put_rate_table(table.clone()).await;
                Ok(table)
            }
            Err(e) => {
                warn!(
                    source = "rate_table",
                    outcome = e.outcome(),
                    error = %e,
                    "Live rate fetch failed"
                );
                match cached.map(|(table, _)| table).or(stored.map(|s| s.value)) {
                    Some(table) => {
                        warn!(
                            source = "rate_table",
                            outcome = "stale",
                            "Serving expired rate table"
                        );
                        Ok(table)
                    }
                    None => {
                        let err = RateError::Exhausted("rate table".to_string());
                        warn!(
                            source = "rate_table",
                            outcome = err.outcome(),
                            "No rate table in any tier"
                        );
                        Err(err)
                    }
                }
            }
        }
    }

    /// Writes a table through to memory and the durable store.
    pub async fn put_rate_table(&self, table: RateTable) {
        let now = self.clock.now();
        if let Err(e) = self.store.save_rate_table(&table, now).await {
            warn!(tier = "durable", error = %e, "Failed to persist rate table");
        }
        self.rates.put_at(CacheKey::RateTable, table, now).await;
    }

    /// A real (non-simulated) series of at most `days` points for `pair`.
    ///
    /// Returns `None` when no tier has one and `fetch` fails; the caller
    /// decides whether to simulate.
    pub async fn series<F, Fut>(
        &self,
        pair: CurrencyPair,
        days: usize,
        fetch: F,
    ) -> Option<HistoricalSeries>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Option<HistoricalSeries>>,
    {
        let key = CacheKey::Series { pair, days };

        let stored = self.store.load_series(pair, days).await.unwrap_or_else(|e| {
            warn!(tier = "durable", %pair, error = %e, "Failed to read stored series");
            None
        });
        if let Some(stored) = &stored
            && self.clock.now().signed_duration_since(stored.at) < self.ttls.series
        {
            debug!(%pair, days, "Serving series from durable store");
            self.series.put_at(key, stored.value.clone(), stored.at).await;
            return Some(stored.value.clone());
        }

        let cached = self.series.get(&key).await;
        if let Some((series, true)) = &cached {
            return Some(series.clone());
        }

        match fetch().await {
            Some(series) => {
                if !series.is_simulated() {
                    let now = self.clock.now();
                    if let Err(e) = self.store.save_series(&series, now).await {
                        warn!(tier = "durable", %pair, error = %e, "Failed to persist series");
                    }
                    self.series.put_at(key, series.clone(), now).await;
                }
                Some(series)
            }
            None => {
                let stale = cached
                    .map(|(series, _)| series)
                    .or(stored.map(|s| s.value));
                if stale.is_some() {
                    warn!(%pair, outcome = "stale", "Serving expired series");
                }
                stale
            }
        }
    }

    /// Bank quotes for `currency`. Aggregates holding at least one real quote
    /// are cached and persisted; a sentinel-only aggregate is never cached.
    pub async fn bank_quotes<F, Fut>(&self, currency: Currency, fetch: F) -> Vec<BankQuote>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Vec<BankQuote>>,
    {
        let key = CacheKey::BankQuotes(currency);
        let since = self.clock.now() - self.ttls.bank_quotes;

        match self.store.load_bank_quotes(currency, since).await {
            Ok(stored) if !stored.is_empty() => {
                debug!(%currency, count = stored.len(), "Serving bank quotes from durable store");
                let created_at = stored
                    .iter()
                    .filter_map(|q| q.observed_at)
                    .min()
                    .unwrap_or(since);
                self.quotes.put_at(key, stored.clone(), created_at).await;
                return stored;
            }
            Ok(_) => {}
            Err(e) => {
                warn!(tier = "durable", %currency, error = %e, "Failed to read stored quotes")
            }
        }

        let cached = self.quotes.get(&key).await;
        if let Some((quotes, true)) = &cached {
            return quotes.clone();
        }

        let quotes = fetch().await;
        if quotes.iter().any(|q| !q.is_sentinel()) {
            if let Err(e) = self.store.save_bank_quotes(&quotes).await {
                warn!(tier = "durable", %currency, error = %e, "Failed to persist bank quotes");
            }
            self.quotes.put(key, quotes.clone()).await;
            return quotes;
        }

        match cached {
            Some((stale, _)) => {
                warn!(%currency, outcome = "stale", "Serving expired bank quotes");
                stale
            }
            None => quotes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rates::tests::sample_table;
    use crate::core::{ManualClock, QuotePrices, RatePoint, SeriesOrigin};
    use crate::store::{MemoryStore, Stamped};
    use anyhow::{Result, anyhow};
    use async_trait::async_trait;
    use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap(),
        ))
    }

    fn layer(clock: &Arc<ManualClock>) -> CacheLayer {
        CacheLayer::new(
            Arc::new(MemoryStore::new()),
            clock.clone(),
            CacheTtls::default(),
        )
    }

    struct BrokenStore;

    #[async_trait]
    impl RateStore for BrokenStore {
        async fn load_rate_table(&self) -> Result<Option<Stamped<RateTable>>> {
            Err(anyhow!("disk on fire"))
        }
        async fn save_rate_table(&self, _: &RateTable, _: DateTime<Utc>) -> Result<()> {
            Err(anyhow!("disk on fire"))
        }
        async fn load_series(
            &self,
            _: CurrencyPair,
            _: usize,
        ) -> Result<Option<Stamped<HistoricalSeries>>> {
            Err(anyhow!("disk on fire"))
        }
        async fn save_series(&self, _: &HistoricalSeries, _: DateTime<Utc>) -> Result<()> {
            Err(anyhow!("disk on fire"))
        }
        async fn load_bank_quotes(&self, _: Currency, _: DateTime<Utc>) -> Result<Vec<BankQuote>> {
            Err(anyhow!("disk on fire"))
        }
        async fn save_bank_quotes(&self, _: &[BankQuote]) -> Result<()> {
            Err(anyhow!("disk on fire"))
        }
    }

    #[tokio::test]
    async fn test_fresh_rate_table_skips_fetch() {
        let clock = clock();
        let cache = layer(&clock);
        cache.put_rate_table(sample_table()).await;

        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let table = cache
            .rate_table(move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(RateError::Unavailable("should not be called".into()))
            })
            .await
            .unwrap();
        assert_eq!(table, sample_table());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_expired_rate_table_fetches_once() {
        let clock = clock();
        let cache = layer(&clock);
        cache.put_rate_table(sample_table()).await;
        clock.advance(Duration::minutes(31));

        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let fetch = move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(sample_table())
        };
        cache.rate_table(fetch).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        cache.rate_table(fetch).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stale_rate_table_served_when_fetch_fails() {
        let clock = clock();
        let cache = layer(&clock);
        cache.put_rate_table(sample_table()).await;
        clock.advance(Duration::hours(5));

        let table = cache
            .rate_table(|| async { Err(RateError::Unavailable("timeout".into())) })
            .await
            .unwrap();
        assert_eq!(table, sample_table());
    }

    #[tokio::test]
    async fn test_rate_table_exhausted_without_any_tier() {
        let clock = clock();
        let cache = layer(&clock);
        let result = cache
            .rate_table(|| async { Err(RateError::Unavailable("timeout".into())) })
            .await;
        assert!(matches!(result, Err(RateError::Exhausted(_))));
    }

    #[tokio::test]
    async fn test_broken_store_degrades_to_memory() {
        let clock = clock();
        let cache = CacheLayer::new(Arc::new(BrokenStore), clock.clone(), CacheTtls::default());

        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let fetch = move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(sample_table())
        };
        cache.rate_table(fetch).await.unwrap();
        cache.rate_table(fetch).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let quotes = cache
            .bank_quotes(Currency::Usd, || async { vec![BankQuote::sentinel(Currency::Usd)] })
            .await;
        assert!(quotes[0].is_sentinel());
    }

    #[tokio::test]
    async fn test_series_is_persisted_and_reused() {
        let clock = clock();
        let cache = layer(&clock);
        let pair = CurrencyPair::new(Currency::Usd, Currency::Eur);
        let start = NaiveDate::from_ymd_opt(2024, 6, 24).unwrap();
        let series = HistoricalSeries::new(
            pair,
            (0..7).map(|i| RatePoint::new(start + Duration::days(i), 0.92)),
            SeriesOrigin::Direct,
            7,
        );

        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let fetched = cache
            .series(pair, 7, move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Some(series)
            })
            .await
            .unwrap();
        assert_eq!(fetched.origin(), SeriesOrigin::Direct);

        clock.advance(Duration::minutes(45));
        let again = cache
            .series(pair, 5, move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                None
            })
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(again.origin(), SeriesOrigin::Stored);
        assert_eq!(again.len(), 5);
    }

    fn usd_eur_week(start: NaiveDate, rate: f64) -> HistoricalSeries {
        HistoricalSeries::new(
            CurrencyPair::new(Currency::Usd, Currency::Eur),
            (0..7).map(|i| RatePoint::new(start + Duration::days(i), rate)),
            SeriesOrigin::Direct,
            7,
        )
    }

    #[tokio::test]
    async fn test_stored_series_is_refetched_after_ttl() {
        let clock = clock();
        let cache = layer(&clock);
        let pair = CurrencyPair::new(Currency::Usd, Currency::Eur);
        let first_week = NaiveDate::from_ymd_opt(2024, 6, 24).unwrap();

        let calls = AtomicUsize::new(0);
        let counter = &calls;
        cache
            .series(pair, 7, move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Some(usd_eur_week(first_week, 0.92))
            })
            .await
            .unwrap();

        clock.advance(CacheTtls::default().series + Duration::minutes(1));
        let next_week = first_week + Duration::days(7);
        let refreshed = cache
            .series(pair, 7, move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Some(usd_eur_week(next_week, 0.93))
            })
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(refreshed.origin(), SeriesOrigin::Direct);
        assert_eq!(refreshed.first().unwrap().date, next_week);

        // The refetch restamps the stored copy, so it is fresh again.
        clock.advance(Duration::minutes(30));
        let reused = cache
            .series(pair, 7, move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                None
            })
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(reused.latest().unwrap().rate, 0.93);
    }

    #[tokio::test]
    async fn test_expired_stored_series_is_the_stale_fallback() {
        let clock = clock();
        let store: Arc<dyn RateStore> = Arc::new(MemoryStore::new());
        let pair = CurrencyPair::new(Currency::Usd, Currency::Eur);
        let start = NaiveDate::from_ymd_opt(2024, 6, 24).unwrap();
        store
            .save_series(&usd_eur_week(start, 0.92), clock.now())
            .await
            .unwrap();

        // A fresh layer has nothing in memory, like a new process.
        let cache = CacheLayer::new(store, clock.clone(), CacheTtls::default());
        clock.advance(Duration::days(30));

        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let stale = cache
            .series(pair, 7, move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                None
            })
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(stale.origin(), SeriesOrigin::Stored);
        assert_eq!(stale.latest().unwrap().date, start + Duration::days(6));
    }

    #[tokio::test]
    async fn test_sentinel_quotes_are_not_cached() {
        let clock = clock();
        let cache = layer(&clock);
        let calls = AtomicUsize::new(0);
        let counter = &calls;

        for _ in 0..2 {
            let quotes = cache
                .bank_quotes(Currency::Eur, move || async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    vec![BankQuote::sentinel(Currency::Eur)]
                })
                .await;
            assert_eq!(quotes.len(), 1);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_bank_quotes_cached_for_ttl() {
        let clock = clock();
        let cache = layer(&clock);
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let now = clock.now();
        let fetch = move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            vec![BankQuote::new(
                "VTB",
                Currency::Usd,
                QuotePrices::checked(91.0, 93.0).unwrap(),
                now,
            )]
        };

        cache.bank_quotes(Currency::Usd, fetch).await;
        clock.advance(Duration::minutes(10));
        let quotes = cache.bank_quotes(Currency::Usd, fetch).await;
        assert_eq!(quotes[0].bank, "VTB");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        clock.advance(Duration::minutes(25));
        cache.bank_quotes(Currency::Usd, fetch).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
