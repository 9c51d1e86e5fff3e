//! Alfa-Bank rates from the `alfa-rates` JSON API.
//!
//! Entries carry either a flat `rate` object or a `rates` list keyed by rate
//! type; from the list only the card rate is used.

use super::util::{get_ok, url_with_params};
use crate::core::{BankQuoteProvider, Currency, QuotePrices, RateError};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{instrument, warn};

pub const NAME: &str = "Alfa-Bank";

const RATE_TYPES: &str = "rateCBRF,rateCard,rateCB,rateTBB,rateSB";
const CARD_RATE: &str = "rateCard";

pub struct AlfaBankProvider {
    client: Client,
    url: String,
}

#[derive(Debug, Deserialize)]
struct AlfaResponse {
    data: Vec<AlfaEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AlfaEntry {
    currency_code: String,
    rate: Option<FlatRate>,
    #[serde(default)]
    rates: Vec<TypedRate>,
}

#[derive(Debug, Deserialize)]
struct FlatRate {
    buy: f64,
    sell: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TypedRate {
    rate_type: String,
    buy: RateValue,
    sell: RateValue,
}

#[derive(Debug, Deserialize)]
struct RateValue {
    value: f64,
}

impl AlfaEntry {
    fn prices(&self) -> Option<(f64, f64)> {
        if let Some(rate) = &self.rate {
            return Some((rate.buy, rate.sell));
        }
        self.rates
            .iter()
            .find(|r| r.rate_type == CARD_RATE)
            .map(|r| (r.buy.value, r.sell.value))
    }
}

impl AlfaBankProvider {
    pub fn new(client: Client, url: &str) -> Self {
        Self {
            client,
            url: url.to_string(),
        }
    }

    async fn try_fetch(&self, currency: Currency) -> Result<QuotePrices> {
        let url = url_with_params(
            &self.url,
            [("currencyCode.in", currency.code()), ("rateType.in", RATE_TYPES)],
        )?;
        let text = get_ok(&self.client, url).await?.text().await?;
        let data: AlfaResponse =
            serde_json::from_str(&text).context("Failed to parse alfa-rates response")?;

        let (buy, sell) = data
            .data
            .iter()
            .filter(|entry| entry.currency_code == currency.code())
            .find_map(AlfaEntry::prices)
            .ok_or_else(|| anyhow!("No {currency} rate in response"))?;
        Ok(QuotePrices::checked(buy, sell)?)
    }
}

#[async_trait]
impl BankQuoteProvider for AlfaBankProvider {
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
