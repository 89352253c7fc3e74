//! Invoice Application Service
//!
//! Orchestrates one monthly run through the ports: resolve the rate,
//! allocate a candidate number, build, render, deliver, and only then commit.
//! Contains NO infrastructure logic - pure business orchestration.

use std::sync::Arc;

use tokio::sync::Mutex;

use invoice_types::{
    AppError, Clock, ConnectionReport, InvoiceDelivery, InvoiceRecord, InvoiceRenderer, Notifier,
    PreCacheOutcome, ProcessReport, RateCacheStore, RateProvider, SequenceStore, StatusResponse,
};

use crate::rates::RateResolver;
use crate::sequence::InvoiceSequence;

/// Collaborators that consume a built invoice.
pub struct Outbound {
    pub renderer: Arc<dyn InvoiceRenderer>,
    pub delivery: Arc<dyn InvoiceDelivery>,
    pub notifier: Option<Arc<dyn Notifier>>,
}

/// Application service for the monthly invoice.
///
/// Generic over the stores and the rate provider - the adapters are injected
/// at compile time, so tests swap in in-memory versions without code changes.
pub struct InvoiceProcessor<C: RateCacheStore, P: RateProvider, S: SequenceStore> {
    rates: RateResolver<C, P>,
    sequence: InvoiceSequence<S>,
    outbound: Outbound,
    clock: Arc<dyn Clock>,
    amount_usd: f64,
    run_guard: Mutex<()>,
}

impl<C: RateCacheStore, P: RateProvider, S: SequenceStore> InvoiceProcessor<C, P, S> {
    pub fn new(
        rates: RateResolver<C, P>,
        sequence: InvoiceSequence<S>,
        outbound: Outbound,
        clock: Arc<dyn Clock>,
        amount_usd: f64,
    ) -> Self {
        Self {
            rates,
            sequence,
            outbound,
            clock,
            amount_usd,
            run_guard: Mutex::new(()),
        }
    }

    pub fn rates(&self) -> &RateResolver<C, P> {
        &self.rates
    }

    pub fn sequence(&self) -> &InvoiceSequence<S> {
        &self.sequence
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Processing
    // ─────────────────────────────────────────────────────────────────────────────

    /// Generates and delivers this month's invoice.
    ///
    /// The candidate number is committed only when delivery succeeds. A
    /// failed delivery leaves the sequence untouched, so the next run reissues
    /// the same number. Overlapping calls fail with [`AppError::RunInProgress`].
    #[tracing::instrument(skip(self), fields(run_id = %uuid::Uuid::new_v4()))]
    pub async fn process_invoice(&self) -> Result<ProcessReport, AppError> {
        let _guard = self
            .run_guard
            .try_lock()
            .map_err(|_| AppError::RunInProgress)?;

        tracing::info!("Starting invoice processing...");

        let resolution = self.rates.resolve_rate().await;
        tracing::info!(
            origin = %resolution.origin,
            "Exchange rate: 1 USD = {} EUR",
            resolution.rate
        );

        let number = self.sequence.allocate_candidate().await?;
        tracing::info!("Creating invoice #{}", number);

        let invoice = InvoiceRecord::build(number, self.clock.today(), self.amount_usd, &resolution)?;

        let artifact = self.outbound.renderer.render(&invoice).await?;
        tracing::info!(path = %artifact.path.display(), "Invoice document generated");

        let delivered = self.outbound.delivery.deliver(&invoice, &artifact).await;
        self.notify(&invoice, delivered.is_ok()).await;

        match delivered {
            Ok(()) => {
                self.sequence.confirm(number).await?;
                tracing::info!(invoice_number = number, "Invoice processed successfully!");
                Ok(ProcessReport::new(
                    &invoice,
                    resolution.origin,
                    artifact.file_name,
                ))
            }
            Err(e) => {
                tracing::error!(
                    invoice_number = number,
                    "Invoice generated but delivery failed: {}",
                    e
                );
                Err(AppError::Delivery(e))
            }
        }
    }

    /// Fetches tomorrow's rate ahead of the billing run.
    pub async fn pre_cache_exchange_rate(&self) -> PreCacheOutcome {
        tracing::info!("Pre-caching exchange rate for tomorrow...");
        self.rates.pre_cache_rate().await
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Diagnostics
    // ─────────────────────────────────────────────────────────────────────────────

    /// Probes delivery, resolves a rate, and sends a notifier test message.
    #[tracing::instrument(skip(self))]
    pub async fn test_connections(&self) -> ConnectionReport {
        tracing::info!("Testing connections...");

        let delivery_ok = self.outbound.delivery.verify().await;
        tracing::info!("Email connection: {}", if delivery_ok { "ok" } else { "failed" });

        let exchange_rate = self.rates.resolve_rate().await;
        tracing::info!(
            origin = %exchange_rate.origin,
            "Exchange rate: 1 USD = {} EUR",
            exchange_rate.rate
        );

        let notifier_ok = match &self.outbound.notifier {
            Some(notifier) => Some(match notifier.send_test().await {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!("Notifier test failed: {}", e);
                    false
                }
            }),
            None => None,
        };

        ConnectionReport {
            delivery_ok,
            exchange_rate,
            notifier_ok,
        }
    }

    /// Current sequence position and cached rate.
    pub async fn status(&self) -> StatusResponse {
        let state = self.sequence.state().await;
        StatusResponse {
            last_invoice_number: state.last_issued_number,
            last_invoice_date: state.last_issued_at,
            next_invoice_number: state.next_candidate(),
            cached_rate: self.rates.cache().load().await,
        }
    }

    /// Fire-and-forget; a failed notification never affects the run.
    async fn notify(&self, invoice: &InvoiceRecord, delivered: bool) {
        let Some(notifier) = &self.outbound.notifier else {
            tracing::debug!("Notifier not configured, skipping notification");
            return;
        };
        if let Err(e) = notifier.notify(invoice, delivered).await {
            tracing::warn!("Failed to send notification: {}", e);
        }
    }
}
