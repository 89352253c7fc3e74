//! Persistence ports for the rate cache and the invoice sequence.
//!
//! Each store exclusively owns its on-disk record. Both keep the latest value
//! in memory, so a failed write never loses the value for the rest of the
//! process lifetime.

use crate::domain::{CachedRate, InvoiceSequenceState};
use crate::error::StateIoError;

/// Holds the single most recent live rate.
#[async_trait::async_trait]
pub trait RateCacheStore: Send + Sync + 'static {
    /// Returns the cached rate, or `None` when missing, unreadable or corrupt.
    async fn load(&self) -> Option<CachedRate>;

    /// Overwrites the cache with `rate` stamped with the current date and time.
    ///
    /// The in-memory value is updated even when persisting fails; the error
    /// only reports that the write did not reach disk.
    async fn save(&self, rate: f64) -> Result<CachedRate, StateIoError>;
}

/// Holds the last committed invoice number.
#[async_trait::async_trait]
pub trait SequenceStore: Send + Sync + 'static {
    /// Returns the current state, initializing it from the configured start
    /// number when nothing has been persisted yet.
    async fn load(&self) -> InvoiceSequenceState;

    /// Records `number` as the last issued invoice, stamped with the current time.
    ///
    /// The in-memory value advances even when persisting fails.
    async fn commit(&self, number: u64) -> Result<InvoiceSequenceState, StateIoError>;
}
