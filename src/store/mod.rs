pub mod disk;
pub mod memory;

use crate::core::config::AppConfig;
use crate::core::store::RecordStore;
use disk::FjallStore;
use memory::MemoryStore;
use std::sync::Arc;
use tracing::{debug, warn};

/// Opens the durable store under the configured data directory, falling back to an
/// in-memory store when the directory cannot be used.
pub fn open_record_store(config: &AppConfig) -> Arc<dyn RecordStore> {
    let opened = config
        .default_data_path()
        .map_err(|e| e.to_string())
        .and_then(|path| FjallStore::open(&path.join("cache")).map_err(|e| e.to_string()));

    match opened {
        Ok(store) => {
            debug!("Using persistent record store");
            Arc::new(store)
        }
        Err(e) => {
            warn!(error = %e, "Persistent store unavailable, rates will not survive restart");
            Arc::new(MemoryStore::new())
        }
    }
}
