//! Request boundary: turns a conversion request into everything the board shows.

use crate::aggregator::{BankQuoteAggregator, bank_currency};
use crate::cache::CacheLayer;
use crate::chart::TrendChart;
use crate::core::rates::round_cents;
use crate::core::simulate::SeriesSimulator;
use crate::core::{
    BankQuote, Currency, CurrencyPair, MAX_SERIES_DAYS, RateError, RateTable, RateTableProvider,
};
use crate::resolver::SeriesResolver;
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, error, instrument, warn};

pub const DEFAULT_FROM: Currency = Currency::Sgd;
pub const DEFAULT_TO: Currency = Currency::Usd;
pub const DEFAULT_AMOUNT: f64 = 1000.0;

/// Shown when no rate table can be produced from any tier.
pub const RATES_UNAVAILABLE: &str = "exchange rates are unavailable, try again later";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExchangeRequest {
    pub from: Currency,
    pub to: Currency,
    pub amount: f64,
}

impl Default for ExchangeRequest {
    fn default() -> Self {
        Self {
            from: DEFAULT_FROM,
            to: DEFAULT_TO,
            amount: DEFAULT_AMOUNT,
        }
    }
}

fn currency_or(input: Option<&str>, default: Currency) -> Currency {
    let Some(code) = input else {
        return default;
    };
    code.parse().unwrap_or_else(|e: RateError| {
        warn!(outcome = e.outcome(), input = code, %default, "Unknown currency, using default");
        default
    })
}

fn amount_or_default(input: Option<&str>) -> f64 {
    let Some(text) = input else {
        return DEFAULT_AMOUNT;
    };
    match text.trim().parse::<f64>() {
        Ok(amount) if amount.is_finite() && amount >= 0.0 => amount,
        _ => {
            let err = RateError::Invalid(format!("amount {text:?}"));
            warn!(outcome = err.outcome(), input = text, "Bad amount, using {DEFAULT_AMOUNT}");
            DEFAULT_AMOUNT
        }
    }
}

impl ExchangeRequest {
    /// Parses raw inbound fields. Missing or malformed fields fall back to
    /// their defaults; `swap` exchanges the two currencies afterwards.
    pub fn parse(from: Option<&str>, to: Option<&str>, amount: Option<&str>, swap: bool) -> Self {
        let mut request = Self {
            from: currency_or(from, DEFAULT_FROM),
            to: currency_or(to, DEFAULT_TO),
            amount: amount_or_default(amount),
        };
        if swap {
            std::mem::swap(&mut request.from, &mut request.to);
        }
        request
    }

    pub fn pair(&self) -> CurrencyPair {
        CurrencyPair::new(self.from, self.to)
    }
}

#[derive(Debug, Clone)]
pub struct ExchangeView {
    pub request: ExchangeRequest,
    pub rate: f64,
    pub converted: f64,
    pub chart: TrendChart,
    pub updated_at: DateTime<Utc>,
    pub bank_currency: Currency,
    pub quotes: Vec<BankQuote>,
}

pub struct ExchangeService {
    cache: Arc<CacheLayer>,
    rates: Arc<dyn RateTableProvider>,
    resolver: SeriesResolver,
    aggregator: BankQuoteAggregator,
    simulator: SeriesSimulator,
    chart_days: usize,
}

impl ExchangeService {
    pub fn new(
        cache: Arc<CacheLayer>,
        rates: Arc<dyn RateTableProvider>,
        resolver: SeriesResolver,
        aggregator: BankQuoteAggregator,
        simulator: SeriesSimulator,
        chart_days: usize,
    ) -> Self {
        Self {
            cache,
            rates,
            resolver,
            aggregator,
            simulator,
            chart_days,
        }
    }

    pub fn chart_days(&self) -> usize {
        self.chart_days
    }

    /// The current rate table from the cheapest tier that has one.
    pub async fn rate_table(&self) -> Result<RateTable, RateError> {
        let rates = Arc::clone(&self.rates);
        self.cache
            .rate_table(move || async move { rates.fetch_rate_table().await })
            .await
    }

    /// Converts and gathers the chart and bank quotes for `request`.
    ///
    /// Fails only when no rate table exists in any tier; the error then reads
    /// [`RATES_UNAVAILABLE`] and wraps the underlying [`RateError`].
    #[instrument(name = "Exchange", skip_all, fields(from = %request.from, to = %request.to))]
    pub async fn handle(&self, request: ExchangeRequest) -> Result<ExchangeView> {
        let table = self.rate_table().await.map_err(|e| {
            error!(outcome = e.outcome(), "Cannot serve conversion");
            anyhow::Error::new(e).context(RATES_UNAVAILABLE)
        })?;

        let rate = table.rate(request.from, request.to);
        let converted = round_cents(request.amount * rate);
        debug!(rate, converted, "Converted amount");

        let bank_currency = bank_currency(request.from);
        let (chart, quotes) = tokio::join!(
            self.chart_with_rate(request.pair(), self.chart_days, Some(rate)),
            self.aggregator.quotes(bank_currency),
        );

        Ok(ExchangeView {
            request,
            rate,
            converted,
            chart,
            updated_at: self.cache.clock().now(),
            bank_currency,
            quotes,
        })
    }

    /// A chart for `pair` over `days`, simulated when no real history exists.
    pub async fn chart(&self, pair: CurrencyPair, days: usize) -> TrendChart {
        let live_rate = self
            .rate_table()
            .await
            .ok()
            .map(|table| table.rate(pair.base, pair.quote));
        self.chart_with_rate(pair, days, live_rate).await
    }

    async fn chart_with_rate(
        &self,
        pair: CurrencyPair,
        days: usize,
        live_rate: Option<f64>,
    ) -> TrendChart {
        if days > MAX_SERIES_DAYS {
            let err = RateError::Invalid(format!("{days} chart days"));
            warn!(outcome = err.outcome(), days, "Window too long, using {MAX_SERIES_DAYS}");
        }
        let days = days.min(MAX_SERIES_DAYS);
        let series = match self.resolver.resolve(pair, days, live_rate).await {
            Some(series) => series,
            None => {
                let today = self.cache.clock().today();
                self.simulator.simulate(pair, live_rate, days, today)
            }
        };
        TrendChart::new(&series, days)
    }

    pub async fn bank_quotes(&self, currency: Currency) -> Vec<BankQuote> {
        self.aggregator.quotes(currency).await
    }
}
