//! Exchange rate provider port.
//!
//! The trait and its error live next to the HTTP client in `exchange-rates`;
//! they are re-exported here so adapters and services depend on one crate.

pub use exchange_rates::{RateFetchError, RateProvider};
