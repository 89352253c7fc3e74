//! # Invoice Hex
//!
//! Application service layer and adapters for the invoice automator.
//!
//! ## Architecture
//!
//! - `rates` / `sequence` - Rate resolution and invoice numbering policies
//! - `service` - Application service (orchestrates one monthly run)
//! - `inbound/` - HTTP adapter (Axum server)
//! - `outbound/` - PDF renderer, mail relay and Telegram adapters
//!
//! The service is generic over the cache store, rate provider and sequence
//! store, allowing different implementations to be injected.

pub mod inbound;
pub mod outbound;
pub mod rates;
pub mod sequence;
pub mod service;


pub use rates::RateResolver;
pub use sequence::InvoiceSequence;
pub use service::{InvoiceProcessor, Outbound};
