//! Uralsib cash desk rates, scraped from the public quotes page.
//!
//! The page carries one or more `table.kitt-table` tables. A quote row has at
//! least five cells: the currency label first, buy in the third cell and sell
//! in the fourth, both printed with a decimal comma.

use super::util::{get_ok, parse_localized_number, selector};
use crate::core::{BankQuoteProvider, Currency, QuotePrices, RateError};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::{Client, Url};
use scraper::Html;
use tracing::{debug, instrument, warn};

pub const NAME: &str = "Uralsib";

const MIN_CELLS: usize = 5;

pub struct UralsibProvider {
    client: Client,
    url: String,
}

impl UralsibProvider {
    pub fn new(client: Client, url: &str) -> Self {
        Self {
            client,
            url: url.to_string(),
        }
    }

    async fn try_fetch(&self, currency: Currency) -> Result<QuotePrices> {
        let url = Url::parse(&self.url).with_context(|| format!("Invalid URL: {}", self.url))?;
        let html = get_ok(&self.client, url).await?.text().await?;
        debug!(bytes = html.len(), "Fetched {NAME} quotes page");
        parse_quotes_page(&html, currency)
    }
}

/// Finds the first row whose label mentions `currency`.
pub fn parse_quotes_page(html: &str, currency: Currency) -> Result<QuotePrices> {
    let document = Html::parse_document(html);
    let rows = selector("table.kitt-table tr")?;
    let cells = selector("td")?;

    for row in document.select(&rows) {
        let texts: Vec<String> = row
            .select(&cells)
            .map(|cell| cell.text().collect::<String>().trim().to_string())
            .collect();
        if texts.len() < MIN_CELLS || !texts[0].contains(currency.code()) {
            continue;
        }
        let buy = parse_localized_number(&texts[2])?;
        let sell = parse_localized_number(&texts[3])?;
        return Ok(QuotePrices::checked(buy, sell)?);
    }
    bail!("No {currency} row on the {NAME} quotes page")
}

#[async_trait]
impl BankQuoteProvider for UralsibProvider {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::util::build_client;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PAGE: &str = r#"
        <html><body>
          <table class="kitt-table">
            <tr><th>Валюта</th><th>Код</th><th>Покупка</th><th>Продажа</th><th>Изм.</th></tr>
            <tr><td>Доллар США USD</td><td>840</td><td>90,15</td><td>93,40</td><td>+0,1</td></tr>
            <tr><td>Евро EUR</td><td>978</td><td>97,05</td><td>101,20</td><td>-0,2</td></tr>
            <tr><td>Юань CNY</td><td>156</td><td>12,30</td></tr>
          </table>
        </body></html>
    "#;

    #[test]
    fn test_parse_quotes_page() {
        let usd = parse_quotes_page(PAGE, Currency::Usd).unwrap();
        assert_eq!(usd, QuotePrices { buy: 90.15, sell: 93.4 });

        let eur = parse_quotes_page(PAGE, Currency::Eur).unwrap();
        assert_eq!(eur, QuotePrices { buy: 97.05, sell: 101.2 });
    }

    #[test]
    fn test_short_rows_and_missing_currency_are_errors() {
        assert!(parse_quotes_page(PAGE, Currency::Cny).is_err());
        assert!(parse_quotes_page(PAGE, Currency::Gbp).is_err());
        assert!(parse_quotes_page("<html></html>", Currency::Usd).is_err());
    }

    #[test]
    fn test_garbled_price_is_error() {
        let page = PAGE.replace("90,15", "н/д");
        assert!(parse_quotes_page(&page, Currency::Usd).is_err());
    }

    #[tokio::test]
    async fn test_fetch_quote_from_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/quotes"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
            .mount(&server)
            .await;

        let provider = UralsibProvider::new(
            build_client(Duration::from_secs(10)).unwrap(),
            &format!("{}/quotes", server.uri()),
        );
        let prices = provider.fetch_quote(Currency::Usd).await.unwrap();
        assert_eq!(prices.sell, 93.4);
    }

    #[tokio::test]
    async fn test_http_error_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let provider = UralsibProvider::new(
            build_client(Duration::from_secs(10)).unwrap(),
            &server.uri(),
        );
        assert!(matches!(
            provider.fetch_quote(Currency::Usd).await,
            Err(RateError::Unavailable(_))
        ));
    }
}
