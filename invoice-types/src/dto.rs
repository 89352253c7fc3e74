//! Data Transfer Objects (DTOs) for requests and responses.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{CachedRate, InvoiceRecord, RateOrigin, RateResolution};

// ─────────────────────────────────────────────────────────────────────────────
// Processing
// ─────────────────────────────────────────────────────────────────────────────

/// Summary of a delivered invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessReport {
    pub invoice_number: u64,
    pub invoice_date: NaiveDate,
    pub amount_usd: f64,
    pub amount_eur: f64,
    pub rate: f64,
    pub rate_origin: RateOrigin,
    pub rate_date: NaiveDate,
    /// File name of the rendered document
    pub artifact: String,
}

impl ProcessReport {
    pub fn new(invoice: &InvoiceRecord, origin: RateOrigin, artifact: String) -> Self {
        Self {
            invoice_number: invoice.number(),
            invoice_date: invoice.date(),
            amount_usd: invoice.amount_base(),
            amount_eur: invoice.amount_converted(),
            rate: invoice.rate(),
            rate_origin: origin,
            rate_date: invoice.rate_date(),
            artifact,
        }
    }
}

/// Response of `POST /trigger`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerResponse {
    pub success: bool,
    pub message: String,
    pub invoice: ProcessReport,
}

/// Result of an advisory pre-cache attempt. Never an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PreCacheOutcome {
    Cached { rate: f64, date: NaiveDate },
    Failed { reason: String },
}

impl PreCacheOutcome {
    pub fn is_cached(&self) -> bool {
        matches!(self, PreCacheOutcome::Cached { .. })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Diagnostics
// ─────────────────────────────────────────────────────────────────────────────

/// Result of the connection test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionReport {
    pub delivery_ok: bool,
    pub exchange_rate: RateResolution,
    /// `None` when no notifier is configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notifier_ok: Option<bool>,
}

/// Current sequence and cache state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub last_invoice_number: u64,
    pub last_invoice_date: Option<DateTime<Utc>>,
    /// `None` once the sequence is exhausted
    pub next_invoice_number: Option<u64>,
    pub cached_rate: Option<CachedRate>,
}

/// Response of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub timestamp: DateTime<Utc>,
}
