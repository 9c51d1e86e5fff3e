//! Live rate table from an exchangerate-api style `/{key}/latest/{pivot}` endpoint.

use super::util::get_ok;
use crate::core::{Currency, RateError, RateTable, RateTableProvider};
use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, instrument, warn};

pub struct ExchangeRateApiProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    pivot: Currency,
}

impl ExchangeRateApiProvider {
    pub fn new(client: Client, base_url: &str, api_key: Option<String>, pivot: Currency) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            pivot,
        }
    }

    async fn try_fetch(&self) -> Result<RateTable> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow!("No API key configured for the live rate provider"))?;
        let url = Url::parse(&format!("{}/{}/latest/{}", self.base_url, key, self.pivot))
            .context("Invalid live rate URL")?;

        let response = get_ok(&self.client, url).await?;
        let text = response.text().await?;
        let data: LatestResponse = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse latest rates for {}", self.pivot))?;

        if data.result != "success" {
            bail!(
                "Provider returned {}: {}",
                data.result,
                data.error_type.as_deref().unwrap_or("unknown error")
            );
        }
        let raw = data
            .conversion_rates
            .ok_or_else(|| anyhow!("Response has no conversion_rates"))?;

        let pivot_rates: HashMap<Currency, f64> = raw
            .into_iter()
            .filter_map(|(code, rate)| code.parse::<Currency>().ok().map(|c| (c, rate)))
            .collect();
        debug!(count = pivot_rates.len(), "Parsed pivot rates");

        Ok(RateTable::from_pivot_rates(self.pivot, &pivot_rates)?)
    }
}

#[derive(Debug, Deserialize)]
struct LatestResponse {
    result: String,
    #[serde(rename = "error-type")]
    error_type: Option<String>,
    conversion_rates: Option<HashMap<String, f64>>,
}

#[async_trait]
impl RateTableProvider for ExchangeRateApiProvider {
    #[instrument(name = "LiveRateFetch", skip(self), fields(pivot = %self.pivot))]
    async fn fetch_rate_table(&self) -> Result<RateTable, RateError> {
        self.try_fetch().await.map_err(|e| {
            let err = RateError::unavailable(e);
            warn!(outcome = err.outcome(), error = %err, "Live rate table unavailable");
            err
        })
    }
}
