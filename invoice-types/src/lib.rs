//! # Invoice Types
//!
//! Domain types and port traits for the monthly invoice service.
//! This crate has no IO of its own - only data structures, business rules,
//! and trait definitions.
//!
//! ## Architecture
//!
//! - `domain/` - Rates, the invoice number sequence, invoice records, clocks
//! - `ports/` - Trait definitions that adapters must implement
//! - `dto/` - Data Transfer Objects for API boundaries
//! - `error/` - Domain and application error types

pub mod domain;
pub mod dto;
pub mod error;
pub mod ports;

// Re-export commonly used types
pub use domain::{
    CachedRate, Clock, InvoiceRecord, InvoiceSequenceState, ManualClock, RateOrigin,
    RateResolution, SystemClock,
};
pub use dto::*;
pub use error::{AppError, DeliveryError, DomainError, NotifyError, RenderError, StateIoError};
pub use exchange_rates::CurrencyCode;
pub use ports::{
    InvoiceDelivery, InvoiceRenderer, Notifier, RateCacheStore, RateFetchError, RateProvider,
    RenderedInvoice, SequenceStore,
};
