//! Cross rates through a pivot currency.

use crate::core::currency::CurrencyPair;
use crate::core::series::{HistoricalSeries, RatePoint, SeriesOrigin};

fn usable(rate: f64) -> bool {
    rate.is_finite() && rate > 0.0
}

/// `rate(A,B)` from `rate(P,A)` and `rate(P,B)`.
///
/// Returns `None` when either leg is unknown, zero or not finite.
pub fn cross_rate(pivot_to_base: Option<f64>, pivot_to_quote: Option<f64>) -> Option<f64> {
    let base = pivot_to_base.filter(|r| usable(*r))?;
    let quote = pivot_to_quote.filter(|r| usable(*r))?;
    Some(quote / base)
}

/// Derives `pair` from two legs quoted against the pivot: `base_leg` holds
/// `rate(base, P)` and `quote_leg` holds `rate(quote, P)`.
///
/// Only dates present in both legs survive. The result keeps the `max_days`
/// most recent of them, and is `None` when nothing overlaps.
pub fn cross_series(
    pair: CurrencyPair,
    base_leg: &HistoricalSeries,
    quote_leg: &HistoricalSeries,
    max_days: usize,
) -> Option<HistoricalSeries> {
    let points: Vec<RatePoint> = base_leg
        .points()
        .iter()
        .filter_map(|a| {
            let b = quote_leg.rate_on(a.date).filter(|r| usable(*r))?;
            Some(RatePoint::new(a.date, a.rate / b))
        })
        .collect();

    let series = HistoricalSeries::new(pair, points, SeriesOrigin::Derived, max_days);
    (!series.is_empty()).then_some(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::currency::{Currency, PIVOT};
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn leg(base: Currency, points: &[(u32, f64)]) -> HistoricalSeries {
        HistoricalSeries::new(
            CurrencyPair::new(base, PIVOT),
            points.iter().map(|(d, r)| RatePoint::new(day(*d), *r)),
            SeriesOrigin::Direct,
            100,
        )
    }

    #[test]
    fn test_cross_rate() {
        let rate = cross_rate(Some(1.35), Some(0.92)).unwrap();
        assert!((rate - 0.92 / 1.35).abs() < 1e-12);
        assert_eq!(cross_rate(Some(0.0), Some(0.92)), None);
        assert_eq!(cross_rate(None, Some(0.92)), None);
        assert_eq!(cross_rate(Some(1.0), Some(f64::INFINITY)), None);
    }

    #[test]
    fn test_cross_series_uses_only_shared_dates() {
        let sgd = leg(Currency::Sgd, &[(1, 0.74), (2, 0.75), (3, 0.76), (5, 0.77)]);
        let eur = leg(Currency::Eur, &[(2, 1.10), (3, 1.08), (4, 1.09), (5, 1.07)]);
        let pair = CurrencyPair::new(Currency::Sgd, Currency::Eur);

        let derived = cross_series(pair, &sgd, &eur, 10).unwrap();
        let dates: Vec<_> = derived.points().iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![day(2), day(3), day(5)]);
        for point in derived.points() {
            assert!(sgd.rate_on(point.date).is_some());
            assert!(eur.rate_on(point.date).is_some());
        }
        assert!((derived.rate_on(day(3)).unwrap() - 0.76 / 1.08).abs() < 1e-12);
        assert_eq!(derived.origin(), SeriesOrigin::Derived);
        assert_eq!(derived.pair(), pair);
    }

    #[test]
    fn test_cross_series_truncates_to_most_recent() {
        let sgd = leg(Currency::Sgd, &[(1, 0.74), (2, 0.75), (3, 0.76)]);
        let eur = leg(Currency::Eur, &[(1, 1.10), (2, 1.08), (3, 1.09)]);
        let derived =
            cross_series(CurrencyPair::new(Currency::Sgd, Currency::Eur), &sgd, &eur, 2).unwrap();
        assert_eq!(derived.first().unwrap().date, day(2));
        assert_eq!(derived.latest().unwrap().date, day(3));
    }

    #[test]
    fn test_cross_series_without_overlap_is_none() {
        let sgd = leg(Currency::Sgd, &[(1, 0.74)]);
        let eur = leg(Currency::Eur, &[(2, 1.10)]);
        assert!(cross_series(CurrencyPair::new(Currency::Sgd, Currency::Eur), &sgd, &eur, 7).is_none());
    }
}
