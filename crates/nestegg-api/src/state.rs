//! Application state shared by every handler.

use nestegg_storage::StorageRegistry;
use std::sync::Arc;

pub struct AppState {
    /// Built once at startup; every request shares the same adapter.
    pub storage: Arc<StorageRegistry>,
}

impl AppState {
    pub fn new(storage: StorageRegistry) -> Self {
        Self {
            storage: Arc::new(storage),
        }
    }
}
