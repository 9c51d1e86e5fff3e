pub mod aggregator;
pub mod cache;
pub mod chart;
pub mod cli;
pub mod core;
pub mod exchange;
pub mod providers;
pub mod resolver;
pub mod store;

use crate::aggregator::BankQuoteAggregator;
use crate::cache::CacheLayer;
use crate::core::config::AppConfig;
use crate::core::simulate::SeriesSimulator;
use crate::core::{BankQuoteProvider, Clock, Currency, CurrencyPair, PIVOT, SystemClock};
use crate::exchange::{ExchangeRequest, ExchangeService};
use crate::providers::util::build_client;
use crate::providers::{
    AlfaBankProvider, AlphaVantageProvider, ExchangeRateApiProvider, TinkoffProvider,
    UralsibProvider, VtbProvider,
};
use crate::store::{DiskStore, MemoryStore, RateStore};
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub enum AppCommand {
    /// Raw inbound fields; anything unparsable falls back to a default.
    Convert {
        from: Option<String>,
        to: Option<String>,
        amount: Option<String>,
        swap: bool,
    },
    History {
        from: Currency,
        to: Currency,
        days: Option<usize>,
    },
    Banks {
        currency: Option<Currency>,
    },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("fxboard starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    }
    .with_env_overrides();
    debug!(
        chart_days = config.chart_days,
        timeout_secs = config.request_timeout_secs,
        data_path = ?config.data_path,
        "Loaded config"
    );

    let service = build_service(&config, Arc::new(SystemClock))?;

    match command {
        AppCommand::Convert {
            from,
            to,
            amount,
            swap,
        } => {
            let request =
                ExchangeRequest::parse(from.as_deref(), to.as_deref(), amount.as_deref(), swap);
            cli::convert::run(&service, request).await
        }
        AppCommand::History { from, to, days } => {
            let days = days.unwrap_or(service.chart_days());
            cli::history::run(&service, CurrencyPair::new(from, to), days).await
        }
        AppCommand::Banks { currency } => {
            let currencies = match currency {
                Some(c) => vec![c],
                None => vec![Currency::Usd, Currency::Eur],
            };
            cli::banks::run(&service, &currencies).await
        }
    }
}

/// Wires providers, store and cache tiers from `config`.
pub fn build_service(config: &AppConfig, clock: Arc<dyn Clock>) -> Result<ExchangeService> {
    let client = build_client(config.request_timeout())?;
    let cache = Arc::new(CacheLayer::new(open_store(config), clock, config.cache.ttls()));

    let providers = &config.providers;
    let rates = Arc::new(ExchangeRateApiProvider::new(
        client.clone(),
        &providers.exchange_rate.base_url,
        providers.exchange_rate.api_key.clone(),
        PIVOT,
    ));
    let series = Arc::new(AlphaVantageProvider::new(
        client.clone(),
        &providers.alpha_vantage.base_url,
        providers.alpha_vantage.api_key.clone(),
    ));

    let banks: Vec<Arc<dyn BankQuoteProvider>> = vec![
        Arc::new(UralsibProvider::new(client.clone(), &config.banks.uralsib)),
        Arc::new(VtbProvider::new(client.clone(), &config.banks.vtb)),
        Arc::new(TinkoffProvider::new(client.clone(), &config.banks.tinkoff)),
        Arc::new(AlfaBankProvider::new(client, &config.banks.alfabank)),
    ];

    Ok(ExchangeService::new(
        Arc::clone(&cache),
        rates,
        resolver::SeriesResolver::new(Arc::clone(&cache), series, PIVOT),
        BankQuoteAggregator::new(banks, Arc::clone(&cache), config.bank_delay()),
        SeriesSimulator::new(config.simulation_seed),
        config.chart_days,
    ))
}

fn open_store(config: &AppConfig) -> Arc<dyn RateStore> {
    match config
        .default_data_path()
        .and_then(|path| DiskStore::open(&path))
    {
        Ok(store) => Arc::new(store),
        Err(e) => {
            warn!(error = %e, "Durable store unavailable, keeping data in memory only");
            Arc::new(MemoryStore::new())
        }
    }
}
