//! VTB exchange office rates, scraped from the currency exchange page.

use super::util::{get_ok, parse_localized_number, selector};
use crate::core::{BankQuoteProvider, Currency, QuotePrices, RateError};
use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use reqwest::{Client, Url};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument, warn};

pub const NAME: &str = "VTB";

pub struct VtbProvider {
    client: Client,
    url: String,
}

impl VtbProvider {
    pub fn new(client: Client, url: &str) -> Self {
        Self {
            client,
            url: url.to_string(),
        }
    }

    async fn try_fetch(&self, currency: Currency) -> Result<QuotePrices> {
        let url = Url::parse(&self.url).with_context(|| format!("Invalid URL: {}", self.url))?;
        let html = get_ok(&self.client, url).await?.text().await?;
        debug!(bytes = html.len(), "Fetched {NAME} exchange page");
        parse_rates_table(&html, currency)
    }
}

fn cell_value(row: ElementRef<'_>, cell: &Selector, value: &Selector) -> Result<f64> {
    let text: String = row
        .select(cell)
        .next()
        .and_then(|c| c.select(value).next())
        .ok_or_else(|| anyhow!("Rate cell without a value"))?
        .text()
        .collect();
    parse_localized_number(&text)
}

/// Reads buy and sell for `currency` from the first `table.rates-table`.
pub fn parse_rates_table(html: &str, currency: Currency) -> Result<QuotePrices> {
    let document = Html::parse_document(html);
    let table = document
        .select(&selector("table.rates-table")?)
        .next()
        .ok_or_else(|| anyhow!("No rates table on the {NAME} page"))?;

    let rows = selector("tr")?;
    let code = selector("span.rates-table__code")?;
    let buy = selector("td.rates-table__buy")?;
    let sell = selector("td.rates-table__sell")?;
    let value = selector("span.rates-table__value")?;

    for row in table.select(&rows) {
        let matches = row
            .select(&code)
            .next()
            .is_some_and(|c| c.text().collect::<String>().contains(currency.code()));
        if !matches {
            continue;
        }
        let prices = QuotePrices::checked(
            cell_value(row, &buy, &value)?,
            cell_value(row, &sell, &value)?,
        )?;
        return Ok(prices);
    }
    bail!("No {currency} row in the {NAME} rates table")
}

#[async_trait]
impl BankQuoteProvider for VtbProvider {
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
