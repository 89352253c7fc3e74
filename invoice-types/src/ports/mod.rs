//! Port traits (interfaces for adapters).
//!
//! These are the contracts that adapters must implement.
//! The application layer depends on these traits, not concrete implementations.

mod exchange;
mod outbound;
mod store;

pub use exchange::{RateFetchError, RateProvider};
pub use outbound::{InvoiceDelivery, InvoiceRenderer, Notifier, RenderedInvoice};
pub use store::{RateCacheStore, SequenceStore};
