//! Historical series resolution.
//!
//! Tries the cache tiers and the direct provider first. A pair that does not
//! involve the pivot falls back to deriving it from the two pivot legs, each
//! resolved through the same tiers. Whatever is resolved is then anchored to
//! today with the live rate.

use crate::cache::CacheLayer;
use crate::core::derive::cross_series;
use crate::core::{
    Currency, CurrencyPair, HistoricalSeries, RatePoint, SeriesOrigin, SeriesProvider,
};
use chrono::Days;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

pub struct SeriesResolver {
    cache: Arc<CacheLayer>,
    provider: Arc<dyn SeriesProvider>,
    pivot: Currency,
}

impl SeriesResolver {
    pub fn new(cache: Arc<CacheLayer>, provider: Arc<dyn SeriesProvider>, pivot: Currency) -> Self {
        Self {
            cache,
            provider,
            pivot,
        }
    }

    /// Resolves up to `days` daily rates for `pair`, or `None` when no real
    /// data exists and the caller has to simulate.
    #[instrument(name = "ResolveSeries", skip_all, fields(pair = %pair, days = days))]
    pub async fn resolve(
        &self,
        pair: CurrencyPair,
        days: usize,
        live_rate: Option<f64>,
    ) -> Option<HistoricalSeries> {
        if days == 0 {
            return None;
        }
        let today = self.cache.clock().today();
        if pair.is_identity() {
            let points = (0..days).map_while(|back| {
                let date = today.checked_sub_days(Days::new(back as u64))?;
                Some(RatePoint::new(date, 1.0))
            });
            return Some(HistoricalSeries::new(pair, points, SeriesOrigin::Derived, days));
        }

        let series = self
            .cache
            .series(pair, days, move || async move {
                if let Some(direct) = self.direct(pair, days).await {
                    return Some(direct);
                }
                if pair.involves(self.pivot) {
                    return None;
                }
                self.derived(pair, days).await
            })
            .await;

        match series {
            Some(series) => {
                debug!(origin = %series.origin(), points = series.len(), "Resolved series");
                Some(series.anchored_to(today, live_rate, days))
            }
            None => {
                warn!(outcome = "unavailable", "No real series for pair");
                None
            }
        }
    }

    async fn direct(&self, pair: CurrencyPair, days: usize) -> Option<HistoricalSeries> {
        self.provider.fetch_series(pair, days).await.ok()
    }

    async fn derived(&self, pair: CurrencyPair, days: usize) -> Option<HistoricalSeries> {
        let base_leg = CurrencyPair::new(pair.base, self.pivot);
        let quote_leg = CurrencyPair::new(pair.quote, self.pivot);

        let base = self
            .cache
            .series(base_leg, days, move || self.direct(base_leg, days))
            .await?;
        let quote = self
            .cache
            .series(quote_leg, days, move || self.direct(quote_leg, days))
            .await?;

        let derived = cross_series(pair, &base, &quote, days);
        if derived.is_none() {
            warn!(%pair, "Pivot legs share no dates");
        }
        derived
    }
}
