//! File-backed invoice number sequence.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use invoice_types::{Clock, InvoiceSequenceState, SequenceStore, StateIoError};

use crate::json_file::{read_json, write_json};

/// Sequence stored as `{ lastInvoiceNumber, lastInvoiceDate }` in a single JSON file.
pub struct FileSequenceStore {
    path: PathBuf,
    start_number: u64,
    clock: Arc<dyn Clock>,
    state: Mutex<Option<InvoiceSequenceState>>,
}

impl FileSequenceStore {
    pub fn new(path: impl Into<PathBuf>, start_number: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            path: path.into(),
            start_number,
            clock,
            state: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_or_initialize(&self) -> InvoiceSequenceState {
        match read_json::<InvoiceSequenceState>(&self.path).await {
            Ok(Some(state)) => state,
            Ok(None) => {
                let state = InvoiceSequenceState::initial(self.start_number);
                tracing::info!(
                    start_number = self.start_number,
                    "No invoice state found, initializing"
                );
                if let Err(e) = write_json(&self.path, &state).await {
                    tracing::error!("Error saving initial invoice state: {}", e);
                }
                state
            }
            // Keep the broken file on disk; the next commit overwrites it.
            Err(e) => {
                tracing::error!("Error loading invoice state: {}", e);
                InvoiceSequenceState::initial(self.start_number)
            }
        }
    }
}

#[async_trait]
impl SequenceStore for FileSequenceStore {
    async fn load(&self) -> InvoiceSequenceState {
        let mut slot = self.state.lock().await;
        if let Some(state) = *slot {
            return state;
        }

        let state = self.read_or_initialize().await;
        *slot = Some(state);
        state
    }

    async fn commit(&self, number: u64) -> Result<InvoiceSequenceState, StateIoError> {
        let mut slot = self.state.lock().await;
        let current = match *slot {
            Some(state) => state,
            None => self.read_or_initialize().await,
        };
        let state = current.committed(number, self.clock.now())?;

        *slot = Some(state);
        write_json(&self.path, &state).await?;

        Ok(state)
    }
}
