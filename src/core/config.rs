use crate::core::cache::CacheTtls;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};
use tracing::debug;

pub const EXCHANGE_API_KEY_VAR: &str = "EXCHANGE_API_KEY";
pub const ALPHA_VANTAGE_KEY_VAR: &str = "ALPHA_VANTAGE_KEY";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ProviderConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

impl ProviderConfig {
    fn at(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            api_key: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ProvidersConfig {
    pub exchange_rate: ProviderConfig,
    pub alpha_vantage: ProviderConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            exchange_rate: ProviderConfig::at("https://v6.exchangerate-api.com/v6"),
            alpha_vantage: ProviderConfig::at("https://www.alphavantage.co/query"),
        }
    }
}

/// Quote page or API endpoint per bank.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct BanksConfig {
    pub uralsib: String,
    pub vtb: String,
    pub tinkoff: String,
    pub alfabank: String,
}

impl Default for BanksConfig {
    fn default() -> Self {
        BanksConfig {
            uralsib: "https://www.sberbank.ru/ru/quotes/currencies".to_string(),
            vtb: "https://www.vtb.ru/personal/platezhi-i-perevody/obmen-valjuty/".to_string(),
            tinkoff: "https://api.tinkoff.ru/v1/currency_rates".to_string(),
            alfabank: "https://alfabank.ru/api/v1/scrooge/currencies/alfa-rates".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    pub rate_table_secs: u64,
    pub series_secs: u64,
    pub bank_quotes_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            rate_table_secs: 30 * 60,
            series_secs: 60 * 60,
            bank_quotes_secs: 30 * 60,
        }
    }
}

impl CacheConfig {
    pub fn ttls(&self) -> CacheTtls {
        // chrono caps durations at i64::MAX milliseconds
        let secs = |s: u64| chrono::Duration::seconds(s.min(i64::MAX as u64 / 1000) as i64);
        CacheTtls {
            rate_table: secs(self.rate_table_secs),
            series: secs(self.series_secs),
            bank_quotes: secs(self.bank_quotes_secs),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub providers: ProvidersConfig,
    pub banks: BanksConfig,
    pub cache: CacheConfig,
    pub request_timeout_secs: u64,
    /// Pause between two bank requests.
    pub bank_delay_ms: u64,
    pub chart_days: usize,
    pub data_path: Option<String>,
    /// Fixes the simulated chart walk; unset means a fresh one per run.
    pub simulation_seed: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            providers: ProvidersConfig::default(),
            banks: BanksConfig::default(),
            cache: CacheConfig::default(),
            request_timeout_secs: 10,
            bank_delay_ms: 500,
            chart_days: 7,
            data_path: None,
            simulation_seed: None,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!("No config at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "fxboard", "fxboard")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("dev", "fxboard", "fxboard")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// API keys from the environment win over the file.
    pub fn with_env_overrides(self) -> Self {
        self.apply_env(|name| std::env::var(name).ok())
    }

    pub fn apply_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| lookup(name).filter(|v: &String| !v.trim().is_empty());
        if let Some(key) = non_empty(EXCHANGE_API_KEY_VAR) {
            self.providers.exchange_rate.api_key = Some(key);
        }
        if let Some(key) = non_empty(ALPHA_VANTAGE_KEY_VAR) {
            self.providers.alpha_vantage.api_key = Some(key);
        }
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn bank_delay(&self) -> Duration {
        Duration::from_millis(self.bank_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
providers:
  exchange_rate:
    base_url: "http://localhost:9000/v6"
    api_key: "file-key"
banks:
  tinkoff: "http://localhost:9001/rates"
cache:
  series_secs: 120
chart_days: 14
simulation_seed: 42
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.providers.exchange_rate.base_url, "http://localhost:9000/v6");
        assert_eq!(config.providers.exchange_rate.api_key.as_deref(), Some("file-key"));
        assert_eq!(
            config.providers.alpha_vantage,
            ProvidersConfig::default().alpha_vantage
        );
        assert_eq!(config.banks.tinkoff, "http://localhost:9001/rates");
        assert_eq!(config.banks.vtb, BanksConfig::default().vtb);
        assert_eq!(config.cache.series_secs, 120);
        assert_eq!(config.cache.rate_table_secs, 1800);
        assert_eq!(config.chart_days, 14);
        assert_eq!(config.request_timeout_secs, 10);
        assert_eq!(config.simulation_seed, Some(42));
        assert!(config.data_path.is_none());
    }

    #[test]
    fn test_empty_config_is_default() {
        let config: AppConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.bank_delay(), Duration::from_millis(500));
        assert_eq!(config.cache.ttls(), CacheTtls::default());
    }

    #[test]
    fn test_env_keys_override_file() {
        let mut config = AppConfig::default();
        config.providers.exchange_rate.api_key = Some("file-key".to_string());

        let config = config.apply_env(|name| match name {
            EXCHANGE_API_KEY_VAR => Some("env-key".to_string()),
            ALPHA_VANTAGE_KEY_VAR => Some("  ".to_string()),
            _ => None,
        });
        assert_eq!(config.providers.exchange_rate.api_key.as_deref(), Some("env-key"));
        assert!(config.providers.alpha_vantage.api_key.is_none());
    }

    #[test]
    fn test_data_path_override() {
        let config = AppConfig {
            data_path: Some("/tmp/fxboard-data".to_string()),
            ..AppConfig::default()
        };
        assert_eq!(
            config.default_data_path().unwrap(),
            PathBuf::from("/tmp/fxboard-data")
        );
    }
}
