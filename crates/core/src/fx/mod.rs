//! FX (Foreign Exchange) module - rates used to settle foreign-currency invoices.

pub mod currency_converter;
mod fx_model;
mod fx_service;
mod fx_traits;

pub use currency_converter::CurrencyConverter;
pub use fx_model::{normalize_currency_code, ConvertedAmount, ExchangeRate, NewExchangeRate};
pub use fx_service::FxService;
pub use fx_traits::{FxRepositoryTrait, FxServiceTrait};
