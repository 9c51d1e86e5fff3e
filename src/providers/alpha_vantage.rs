//! Daily FX history from Alpha Vantage's `FX_DAILY` endpoint.
//!
//! The free tier is throttled; a throttled call answers 200 with a `Note` or
//! `Information` message instead of data.

use super::util::{get_ok, url_with_params};
use crate::core::{
    CurrencyPair, HistoricalSeries, RateError, RatePoint, SeriesOrigin, SeriesProvider,
};
use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, instrument, warn};

/// Requests longer than this ask for the full history instead of the last 100 days.
pub const COMPACT_LIMIT: usize = 100;

pub struct AlphaVantageProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FxDailyResponse {
    #[serde(rename = "Time Series FX (Daily)")]
    time_series: Option<HashMap<String, FxDailyQuote>>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FxDailyQuote {
    #[serde(rename = "4. close")]
    close: String,
}

pub fn output_size(days: usize) -> &'static str {
    if days > COMPACT_LIMIT { "full" } else { "compact" }
}

impl AlphaVantageProvider {
    pub fn new(client: Client, base_url: &str, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.to_string(),
            api_key,
        }
    }

    async fn try_fetch(&self, pair: CurrencyPair, max_days: usize) -> Result<HistoricalSeries> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow!("No API key configured for the history provider"))?;
        let url = url_with_params(
            &self.base_url,
            [
                ("function", "FX_DAILY"),
                ("from_symbol", pair.base.code()),
                ("to_symbol", pair.quote.code()),
                ("apikey", key),
                ("outputsize", output_size(max_days)),
                ("datatype", "json"),
            ],
        )?;

        let response = get_ok(&self.client, url).await?;
        let text = response.text().await?;
        let data: FxDailyResponse = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse FX_DAILY response for {pair}"))?;

        if let Some(message) = data.note.or(data.information) {
            bail!("Rate limited: {message}");
        }
        if let Some(message) = data.error_message {
            bail!("Provider error: {message}");
        }
        let series = data
            .time_series
            .ok_or_else(|| anyhow!("No daily series in response for {pair}"))?;

        let points = series
            .into_iter()
            .map(|(date, quote)| -> Result<RatePoint> {
                let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
                    .with_context(|| format!("Bad date {date:?}"))?;
                let rate = quote
                    .close
                    .trim()
                    .parse::<f64>()
                    .with_context(|| format!("Bad close {:?} on {date}", quote.close))?;
                Ok(RatePoint::new(date, rate))
            })
            .collect::<Result<Vec<_>>>()?;

        let series = HistoricalSeries::new(pair, points, SeriesOrigin::Direct, max_days);
        if series.is_empty() {
            bail!("Daily series for {pair} is empty");
        }
        debug!(%pair, points = series.len(), "Parsed daily series");
        Ok(series)
    }
}

#[async_trait]
impl SeriesProvider for AlphaVantageProvider {
    #[instrument(name = "SeriesFetch", skip(self), fields(pair = %pair, max_days = max_days))]
    async fn fetch_series(
        &self,
        pair: CurrencyPair,
        max_days: usize,
    ) -> Result<HistoricalSeries, RateError> {
        self.try_fetch(pair, max_days).await.map_err(|e| {
            let err = RateError::unavailable(e);
            warn!(outcome = err.outcome(), error = %err, "Daily series unavailable");
            err
        })
    }
}
