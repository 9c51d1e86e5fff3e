//! Trend chart model for a resolved or simulated series.

use crate::core::{Currency, CurrencyPair, HistoricalSeries, RatePoint};

const BLOCKS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Least squares line over the point index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendLine {
    pub slope: f64,
    pub intercept: f64,
}

impl TrendLine {
    pub fn fit(rates: &[f64]) -> Option<Self> {
        if rates.len() < 2 {
            return None;
        }
        let n = rates.len() as f64;
        let mean_x = (n - 1.0) / 2.0;
        let mean_y = rates.iter().sum::<f64>() / n;
        let (mut num, mut den) = (0.0, 0.0);
        for (i, y) in rates.iter().enumerate() {
            let dx = i as f64 - mean_x;
            num += dx * (y - mean_y);
            den += dx * dx;
        }
        let slope = num / den;
        Some(Self {
            slope,
            intercept: mean_y - slope * mean_x,
        })
    }

    pub fn at(&self, index: usize) -> f64 {
        self.intercept + self.slope * index as f64
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrendChart {
    pub title: String,
    pub pair: CurrencyPair,
    pub points: Vec<RatePoint>,
    pub simulated: bool,
    /// `(last - first) / first` in percent; absent when the first rate is zero.
    pub change_percent: Option<f64>,
    pub trend: Option<TrendLine>,
    pub precision: usize,
}

impl TrendChart {
    pub fn new(series: &HistoricalSeries, days: usize) -> Self {
        let pair = series.pair();
        let simulated = series.is_simulated();
        let title = if simulated {
            format!("Simulated {pair} (real data unavailable)")
        } else {
            format!("{pair} over {days} days")
        };
        let rates: Vec<f64> = series.points().iter().map(|p| p.rate).collect();
        let change_percent = match (rates.first(), rates.last()) {
            (Some(&first), Some(&last)) if first != 0.0 => Some((last - first) / first * 100.0),
            _ => None,
        };

        Self {
            title,
            pair,
            points: series.points().to_vec(),
            simulated,
            change_percent,
            trend: TrendLine::fit(&rates),
            precision: if pair.involves(Currency::Rub) { 2 } else { 4 },
        }
    }

    pub fn format_rate(&self, rate: f64) -> String {
        format!("{rate:.*}", self.precision)
    }

    /// One block glyph per point, scaled between the lowest and highest rate.
    pub fn sparkline(&self) -> String {
        let (min, max) = self
            .points
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
                (lo.min(p.rate), hi.max(p.rate))
            });
        let span = max - min;
        self.points
            .iter()
            .map(|p| {
                if span <= f64::EPSILON {
                    BLOCKS[BLOCKS.len() / 2]
                } else {
                    let level = ((p.rate - min) / span * (BLOCKS.len() - 1) as f64).round();
                    BLOCKS[level as usize]
                }
            })
            .collect()
    }
}
