//! Tinkoff rates from the public `currency_rates` JSON API.

use super::util::get_ok;
use crate::core::{BankQuoteProvider, Currency, QuotePrices, RateError};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{instrument, warn};

pub const NAME: &str = "Tinkoff";

/// The category whose rates apply to card and deposit operations.
const CATEGORY: &str = "DepositPayments";
const SETTLEMENT_CURRENCY: &str = "RUB";

pub struct TinkoffProvider {
    client: Client,
    url: String,
}

#[derive(Debug, Deserialize)]
struct RatesResponse {
    payload: RatesPayload,
}

#[derive(Debug, Deserialize)]
struct RatesPayload {
    rates: Vec<RateEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RateEntry {
    category: String,
    from_currency: NamedCurrency,
    to_currency: NamedCurrency,
    buy: Option<f64>,
    sell: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct NamedCurrency {
    name: String,
}

impl TinkoffProvider {
    pub fn new(client: Client, url: &str) -> Self {
        Self {
            client,
            url: url.to_string(),
        }
    }

    async fn try_fetch(&self, currency: Currency) -> Result<QuotePrices> {
        let url = Url::parse(&self.url).with_context(|| format!("Invalid URL: {}", self.url))?;
        let text = get_ok(&self.client, url).await?.text().await?;
        let data: RatesResponse =
            serde_json::from_str(&text).context("Failed to parse currency_rates response")?;

        let entry = data
            .payload
            .rates
            .into_iter()
            .find(|r| {
                r.category == CATEGORY
                    && r.from_currency.name == currency.code()
                    && r.to_currency.name == SETTLEMENT_CURRENCY
            })
            .ok_or_else(|| anyhow!("No {CATEGORY} rate for {currency}"))?;

        match (entry.buy, entry.sell) {
            (Some(buy), Some(sell)) => Ok(QuotePrices::checked(buy, sell)?),
            _ => Err(anyhow!("Incomplete {CATEGORY} rate for {currency}")),
        }
    }
}

#[async_trait]
impl BankQuoteProvider for TinkoffProvider {
    fn name(&self) -> &str {
        NAME
    }

    #[instrument(name = "BankFetch", skip(self), fields(bank = NAME, currency = %currency))]
    async fn fetch_quote(&self, currency: Currency) -> Result<QuotePrices, RateError> {
        self.try_fetch(currency).await.map_err(|e| {
            let err = RateError::unavailable(e);
            warn!(outcome = err.outcome(), error = %err, "{NAME} quote unavailable");
            err
        })
    }
}
