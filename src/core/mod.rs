//! Core business logic abstractions

pub mod bank;
pub mod cache;
pub mod clock;
pub mod config;
pub mod currency;
pub mod derive;
pub mod error;
pub mod log;
pub mod rates;
pub mod series;
pub mod simulate;

// Re-export main types for cleaner imports
pub use bank::{BankQuote, BankQuoteProvider, QuotePrices};
pub use clock::{Clock, ManualClock, SystemClock};
pub use currency::{Currency, CurrencyPair, PIVOT};
pub use error::RateError;
pub use rates::{RateTable, RateTableProvider};
pub use series::{HistoricalSeries, MAX_SERIES_DAYS, RatePoint, SeriesOrigin, SeriesProvider};
