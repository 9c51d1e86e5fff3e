use anyhow::{Context, Result, anyhow};
use reqwest::{Client, Response, Url};
use scraper::Selector;
use std::time::Duration;
use tracing::debug;

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36 fxboard/0.1";

/// Builds the HTTP client shared by every adapter.
///
/// A call that runs past `timeout` fails like any other network error.
pub fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .context("Failed to build HTTP client")
}

pub fn url_with_params<'a>(
    base: &str,
    params: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> Result<Url> {
    Url::parse_with_params(base, params).with_context(|| format!("Invalid URL: {base}"))
}

/// Sends a GET and fails on any non-success status.
pub async fn get_ok(client: &Client, url: Url) -> Result<Response> {
    debug!("Requesting {}", url);
    let response = client
        .get(url.clone())
        .send()
        .await
        .with_context(|| format!("Request failed for {url}"))?;
    let status = response.status();
    if !status.is_success() {
        return Err(anyhow!("HTTP error: {} for {}", status, url));
    }
    Ok(response)
}

pub fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("Invalid selector {css:?}: {e}"))
}

/// Parses numbers as banks print them: `"92,50"`, `"1 234,5"`, `"93.10 ₽"`.
pub fn parse_localized_number(text: &str) -> Result<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-'))
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    cleaned
        .parse::<f64>()
        .with_context(|| format!("Not a number: {text:?}"))
}
