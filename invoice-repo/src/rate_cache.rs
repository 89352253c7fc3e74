//! File-backed exchange rate cache.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use invoice_types::{CachedRate, Clock, RateCacheStore, StateIoError};

use crate::json_file::{read_json, write_json};

/// Rate cache stored as `{ rate, timestamp, date }` in a single JSON file.
pub struct FileRateCache {
    path: PathBuf,
    clock: Arc<dyn Clock>,
    current: Mutex<Option<CachedRate>>,
}

impl FileRateCache {
    pub fn new(path: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            path: path.into(),
            clock,
            current: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_from_disk(&self) -> Option<CachedRate> {
        match read_json::<CachedRate>(&self.path).await {
            Ok(Some(cached)) => match cached.validate() {
                Ok(()) => Some(cached),
                Err(e) => {
                    tracing::warn!(path = %self.path.display(), "Ignoring exchange cache: {}", e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Error loading exchange cache: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl RateCacheStore for FileRateCache {
    async fn load(&self) -> Option<CachedRate> {
        let mut current = self.current.lock().await;
        if current.is_none() {
            *current = self.read_from_disk().await;
        }
        *current
    }

    async fn save(&self, rate: f64) -> Result<CachedRate, StateIoError> {
        let cached = CachedRate::new(rate, self.clock.now(), self.clock.today()).map_err(|e| {
            StateIoError::Corrupt {
                path: self.path.display().to_string(),
                reason: e.to_string(),
            }
        })?;

        let mut current = self.current.lock().await;
        *current = Some(cached);
        write_json(&self.path, &cached).await?;

        tracing::debug!(rate, date = %cached.fetched_date, "Saved exchange rate cache");
        Ok(cached)
    }
}
