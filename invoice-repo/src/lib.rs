//! # Invoice Repository
//!
//! File-backed adapters for the `RateCacheStore` and `SequenceStore` ports.
//! Each store owns one pretty-printed JSON document under the data directory
//! and overwrites it atomically (temp file + rename).

use std::path::Path;
use std::sync::Arc;

use invoice_types::Clock;

mod json_file;
pub mod rate_cache;
pub mod sequence;


pub use rate_cache::FileRateCache;
pub use sequence::FileSequenceStore;

/// File name of the rate cache record inside the data directory.
pub const RATE_CACHE_FILE: &str = "exchange-cache.json";

/// File name of the sequence record inside the data directory.
pub const STATE_FILE: &str = "state.json";

/// Both stores, rooted at the same data directory.
pub struct Stores {
    pub rate_cache: FileRateCache,
    pub sequence: FileSequenceStore,
}

/// Build the file stores for a data directory.
///
/// Nothing touches the disk here; files are read lazily on first `load`
/// and the directory is created on first write.
///
/// # Examples
///
/// ```ignore
/// let stores = build_stores("data", 1000, Arc::new(SystemClock));
/// let state = stores.sequence.load().await;
/// ```
pub fn build_stores(data_dir: impl AsRef<Path>, start_number: u64, clock: Arc<dyn Clock>) -> Stores {
    let data_dir = data_dir.as_ref();
    Stores {
        rate_cache: FileRateCache::new(data_dir.join(RATE_CACHE_FILE), clock.clone()),
        sequence: FileSequenceStore::new(data_dir.join(STATE_FILE), start_number, clock),
    }
}
