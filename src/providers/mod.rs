pub mod alfabank;
pub mod alpha_vantage;
pub mod exchange_rate_api;
pub mod tinkoff;
pub mod uralsib;
pub mod util;
pub mod vtb;

pub use alfabank::AlfaBankProvider;
pub use alpha_vantage::AlphaVantageProvider;
pub use exchange_rate_api::ExchangeRateApiProvider;
pub use tinkoff::TinkoffProvider;
pub use uralsib::UralsibProvider;
pub use vtb::VtbProvider;
