//! Invoice number allocation policy.
//!
//! Candidates are computed, not reserved. Only `confirm` moves the sequence,
//! and callers invoke it only after the invoice was delivered.

use invoice_types::{DomainError, InvoiceSequenceState, SequenceStore, StateIoError};

pub struct InvoiceSequence<S: SequenceStore> {
    store: S,
}

impl<S: SequenceStore> InvoiceSequence<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Next invoice number. Pure read; repeated calls return the same value.
    pub async fn allocate_candidate(&self) -> Result<u64, DomainError> {
        let state = self.store.load().await;
        state
            .next_candidate()
            .ok_or(DomainError::SequenceExhausted(state.last_issued_number))
    }

    pub async fn state(&self) -> InvoiceSequenceState {
        self.store.load().await
    }

    /// Commits `number` as issued.
    ///
    /// A persist failure is logged; the in-memory sequence still advances.
    pub async fn confirm(&self, number: u64) -> Result<InvoiceSequenceState, DomainError> {
        self.store.load().await.check_commit(number)?;

        match self.store.commit(number).await {
            Ok(state) => {
                tracing::info!(invoice_number = number, "Invoice number committed");
                Ok(state)
            }
            Err(StateIoError::Rejected(e)) => Err(e),
            Err(e) => {
                tracing::error!(invoice_number = number, "Error saving invoice state: {}", e);
                Ok(self.store.load().await)
            }
        }
    }
}
