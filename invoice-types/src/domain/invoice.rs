//! The invoice record handed to the renderer and delivery adapters.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::rate::{RateResolution, validate_rate};
use crate::error::DomainError;

/// One month's invoice. Built once per processing run and never mutated.
///
/// Amounts are in major units; `amount_converted` is `amount_base × rate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceRecord {
    number: u64,
    date: NaiveDate,
    amount_base: f64,
    amount_converted: f64,
    rate: f64,
    rate_date: NaiveDate,
}

impl InvoiceRecord {
    pub fn build(
        number: u64,
        date: NaiveDate,
        amount_base: f64,
        resolution: &RateResolution,
    ) -> Result<Self, DomainError> {
        if !amount_base.is_finite() || amount_base <= 0.0 {
            return Err(DomainError::InvalidAmount(amount_base));
        }
        validate_rate(resolution.rate)?;

        Ok(Self {
            number,
            date,
            amount_base,
            amount_converted: amount_base * resolution.rate,
            rate: resolution.rate,
            rate_date: resolution.rate_date,
        })
    }

    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn amount_base(&self) -> f64 {
        self.amount_base
    }

    pub fn amount_converted(&self) -> f64 {
        self.amount_converted
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn rate_date(&self) -> NaiveDate {
        self.rate_date
    }

    /// Billing period label, e.g. `January 2025`.
    pub fn month_label(&self) -> String {
        self.date.format("%B %Y").to_string()
    }

    /// File stem of the rendered artifact: `invoice_{number}_{YYYY-MM-DD}`.
    pub fn file_stem(&self) -> String {
        format!("invoice_{}_{}", self.number, self.date.format("%Y-%m-%d"))
    }
}
