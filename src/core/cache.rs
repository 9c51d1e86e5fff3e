use crate::core::clock::Clock;
use crate::core::currency::{Currency, CurrencyPair};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataKind {
    RateTable,
    Series,
    BankQuotes,
}

/// What a cached value is and which request parameters produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    RateTable,
    Series { pair: CurrencyPair, days: usize },
    BankQuotes(Currency),
}

impl CacheKey {
    pub fn kind(&self) -> DataKind {
        match self {
            CacheKey::RateTable => DataKind::RateTable,
            CacheKey::Series { .. } => DataKind::Series,
            CacheKey::BankQuotes(_) => DataKind::BankQuotes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    pub rate_table: Duration,
    pub series: Duration,
    pub bank_quotes: Duration,
}

impl CacheTtls {
    pub fn for_kind(&self, kind: DataKind) -> Duration {
        match kind {
            DataKind::RateTable => self.rate_table,
            DataKind::Series => self.series,
            DataKind::BankQuotes => self.bank_quotes,
        }
    }
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            rate_table: Duration::minutes(30),
            series: Duration::minutes(60),
            bank_quotes: Duration::minutes(30),
        }
    }
}

#[derive(Debug)]
pub struct CacheEntry<V> {
    pub value: V,
    pub created_at: DateTime<Utc>,
    pub ttl: Duration,
}

impl<V> CacheEntry<V> {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.created_at) < self.ttl
    }
}

/// In-memory tier with lazy expiry.
///
/// Entries are swapped as whole `Arc`s, so a reader sees either the old or
/// the new entry, never a mix.
pub struct TtlCache<K, V>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    inner: RwLock<HashMap<K, Arc<CacheEntry<V>>>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Send + Sync + Debug,
    V: Clone + Send + Sync,
{
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    /// Returns the cached value together with whether it is still fresh.
    pub async fn get(&self, key: &K) -> Option<(V, bool)> {
        let entry = self.inner.read().await.get(key).cloned();
        match entry {
            Some(entry) => {
                let valid = entry.is_valid_at(self.clock.now());
                debug!(?key, valid, "Cache HIT");
                Some((entry.value.clone(), valid))
            }
            None => {
                debug!(?key, "Cache MISS");
                None
            }
        }
    }

    pub async fn get_valid(&self, key: &K) -> Option<V> {
        self.get(key)
            .await
            .and_then(|(value, valid)| valid.then_some(value))
    }

    pub async fn put(&self, key: K, value: V) {
        let now = self.clock.now();
        self.put_at(key, value, now).await;
    }

    /// Stores a value that was created earlier, e.g. one loaded from disk.
    pub async fn put_at(&self, key: K, value: V, created_at: DateTime<Utc>) {
        let entry = Arc::new(CacheEntry {
            value,
            created_at,
            ttl: self.ttl,
        });
        debug!(?key, "Cache PUT");
        self.inner.write().await.insert(key, entry);
    }
}
