//! Daily rate series and the provider abstraction that fetches them

use crate::core::currency::CurrencyPair;
use crate::core::error::RateError;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Longest window served; roughly what the history provider's full output covers.
pub const MAX_SERIES_DAYS: usize = 3650;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatePoint {
    pub date: NaiveDate,
    pub rate: f64,
}

impl RatePoint {
    pub fn new(date: NaiveDate, rate: f64) -> Self {
        Self { date, rate }
    }

    fn is_usable(&self) -> bool {
        self.rate.is_finite() && self.rate > 0.0
    }
}

/// Where a series came from. Only simulated series are fabricated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeriesOrigin {
    Direct,
    Derived,
    Stored,
    Simulated,
}

impl Display for SeriesOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SeriesOrigin::Direct => "direct",
            SeriesOrigin::Derived => "derived",
            SeriesOrigin::Stored => "stored",
            SeriesOrigin::Simulated => "simulated",
        })
    }
}

/// Rates for one pair, ascending by date with at most one point per date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalSeries {
    pair: CurrencyPair,
    points: Vec<RatePoint>,
    origin: SeriesOrigin,
}

impl HistoricalSeries {
    /// Normalizes raw points: drops unusable rates, keeps the first point seen
    /// for each date and retains only the `max_days` most recent dates.
    pub fn new(
        pair: CurrencyPair,
        points: impl IntoIterator<Item = RatePoint>,
        origin: SeriesOrigin,
        max_days: usize,
    ) -> Self {
        let mut points: Vec<RatePoint> = points.into_iter().filter(RatePoint::is_usable).collect();
        points.sort_by(|a, b| b.date.cmp(&a.date));
        points.dedup_by_key(|p| p.date);
        points.truncate(max_days);
        points.reverse();
        Self {
            pair,
            points,
            origin,
        }
    }

    pub fn pair(&self) -> CurrencyPair {
        self.pair
    }

    pub fn origin(&self) -> SeriesOrigin {
        self.origin
    }

    pub fn is_simulated(&self) -> bool {
        self.origin == SeriesOrigin::Simulated
    }

    pub fn points(&self) -> &[RatePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&RatePoint> {
        self.points.first()
    }

    pub fn latest(&self) -> Option<&RatePoint> {
        self.points.last()
    }

    pub fn rate_on(&self, date: NaiveDate) -> Option<f64> {
        self.points
            .binary_search_by(|p| p.date.cmp(&date))
            .ok()
            .map(|i| self.points[i].rate)
    }

    pub fn with_origin(mut self, origin: SeriesOrigin) -> Self {
        self.origin = origin;
        self
    }

    /// Keeps the `days` most recent points.
    pub fn truncated(mut self, days: usize) -> Self {
        if self.points.len() > days {
            self.points.drain(..self.points.len() - days);
        }
        self
    }

    /// Appends a point for `today` carrying the live rate when the series
    /// stops short of today, so a chart always ends at the present.
    pub fn anchored_to(
        mut self,
        today: NaiveDate,
        live_rate: Option<f64>,
        max_days: usize,
    ) -> Self {
        let Some(rate) = live_rate.filter(|r| r.is_finite() && *r > 0.0) else {
            return self;
        };
        match self.latest() {
            Some(last) if last.date >= today => self,
            _ => {
                self.points.push(RatePoint::new(today, rate));
                self.truncated(max_days)
            }
        }
    }
}

#[async_trait]
pub trait SeriesProvider: Send + Sync {
    /// Fetches up to `max_days` most recent daily rates for `pair`.
    async fn fetch_series(
        &self,
        pair: CurrencyPair,
        max_days: usize,
    ) -> Result<HistoricalSeries, RateError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::currency::Currency;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn pair() -> CurrencyPair {
        CurrencyPair::new(Currency::Usd, Currency::Eur)
    }

    #[test]
    fn test_new_sorts_dedups_and_truncates() {
        let series = HistoricalSeries::new(
            pair(),
            vec![
                RatePoint::new(day(3), 0.93),
                RatePoint::new(day(1), 0.91),
                RatePoint::new(day(4), 0.94),
                RatePoint::new(day(3), 0.99),
                RatePoint::new(day(2), f64::NAN),
                RatePoint::new(day(5), -1.0),
            ],
            SeriesOrigin::Direct,
            2,
        );

        let dates: Vec<_> = series.points().iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![day(3), day(4)]);
        assert_eq!(series.rate_on(day(3)), Some(0.93));
        assert_eq!(series.rate_on(day(1)), None);
    }

    #[test]
    fn test_anchor_appends_today_and_keeps_window() {
        let series = HistoricalSeries::new(
            pair(),
            (1..=3).map(|d| RatePoint::new(day(d), 0.9)),
            SeriesOrigin::Direct,
            3,
        );

        let anchored = series.anchored_to(day(10), Some(0.95), 3);
        assert_eq!(anchored.len(), 3);
        assert_eq!(anchored.first().unwrap().date, day(2));
        assert_eq!(*anchored.latest().unwrap(), RatePoint::new(day(10), 0.95));
    }

    #[test]
    fn test_anchor_is_noop_when_series_reaches_today_or_rate_unknown() {
        let series = HistoricalSeries::new(
            pair(),
            (1..=3).map(|d| RatePoint::new(day(d), 0.9)),
            SeriesOrigin::Direct,
            7,
        );

        let same = series.clone().anchored_to(day(3), Some(0.95), 7);
        assert_eq!(same, series);

        let unknown = series.clone().anchored_to(day(9), None, 7);
        assert_eq!(unknown, series);
    }
}
