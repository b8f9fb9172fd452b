//! Shared application state.

use std::sync::{Arc, Mutex, MutexGuard};

use scanvault_store::ScanStore;

use crate::error::ApiError;

/// Handle to the scan store shared across request handlers.
///
/// SQLite access is serialized behind a mutex; every store operation is
/// short-lived, so handlers simply lock for the duration of the call.
#[derive(Clone)]
pub struct AppState {
    store: Arc<Mutex<ScanStore>>,
}

impl AppState {
    pub fn new(store: ScanStore) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
        }
    }

    pub fn store(&self) -> Result<MutexGuard<'_, ScanStore>, ApiError> {
        self.store
            .lock()
            .map_err(|_| ApiError::internal("scan store lock poisoned"))
    }
}
