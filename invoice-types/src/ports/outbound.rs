//! Outbound collaborator ports: rendering, delivery and notification.

use std::path::PathBuf;

use crate::domain::InvoiceRecord;
use crate::error::{DeliveryError, NotifyError, RenderError};

/// A rendered invoice document on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedInvoice {
    pub path: PathBuf,
    pub file_name: String,
    pub content_type: &'static str,
}

/// Turns an invoice record into a document.
#[async_trait::async_trait]
pub trait InvoiceRenderer: Send + Sync + 'static {
    async fn render(&self, invoice: &InvoiceRecord) -> Result<RenderedInvoice, RenderError>;
}

/// Sends a rendered invoice to the recipient.
#[async_trait::async_trait]
pub trait InvoiceDelivery: Send + Sync + 'static {
    /// `Ok` means the recipient's transport accepted the invoice.
    async fn deliver(
        &self,
        invoice: &InvoiceRecord,
        artifact: &RenderedInvoice,
    ) -> Result<(), DeliveryError>;

    /// Connectivity probe for the connection test.
    async fn verify(&self) -> bool {
        true
    }
}

/// Best-effort chat notification about a run.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync + 'static {
    async fn notify(&self, invoice: &InvoiceRecord, delivered: bool) -> Result<(), NotifyError>;

    async fn send_test(&self) -> Result<(), NotifyError>;
}
