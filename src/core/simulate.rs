//! Synthetic trend used when no real history can be resolved.

use crate::core::currency::CurrencyPair;
use crate::core::series::{HistoricalSeries, RatePoint, SeriesOrigin};
use chrono::{Days, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;
use tracing::warn;

const STEP: f64 = 0.008;
const HIGH_VOLATILITY_STEP: f64 = 0.015;

pub struct SeriesSimulator {
    rng: Mutex<StdRng>,
}

impl SeriesSimulator {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Self {
            rng: Mutex::new(rng),
        }
    }

    /// Builds `days` daily points ending on `today` whose last rate is `live_rate`.
    ///
    /// The walk runs backward from the live rate, so only the history is
    /// invented; the final point always matches the quoted rate.
    pub fn simulate(
        &self,
        pair: CurrencyPair,
        live_rate: Option<f64>,
        days: usize,
        today: NaiveDate,
    ) -> HistoricalSeries {
        let anchor = match live_rate {
            Some(rate) if rate.is_finite() && rate > 0.0 => rate,
            other => {
                warn!(%pair, rate = ?other, "No usable live rate to anchor simulation, using 1.0");
                1.0
            }
        };
        let step = if pair.is_high_volatility() {
            HIGH_VOLATILITY_STEP
        } else {
            STEP
        };

        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        let mut rate = anchor;
        let points: Vec<RatePoint> = (0..days)
            .map_while(|back| {
                let date = today.checked_sub_days(Days::new(back as u64))?;
                if back > 0 {
                    rate *= 1.0 + rng.gen_range(-step..=step);
                }
                Some(RatePoint::new(date, rate))
            })
            .collect();

        HistoricalSeries::new(pair, points, SeriesOrigin::Simulated, days)
    }
}
