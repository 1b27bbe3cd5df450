//! Service wiring: pick a record store and build the directory, ledger and
//! coordinator around one shared handle.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use fleetrent_infra::store::{InMemoryRecordStore, PostgresRecordStore, RecordStore, StoreError};
use fleetrent_infra::{AppConfig, Directory, InventoryLedger, RentalCoordinator};

/// Type-erased store shared by every service.
pub type SharedStore = Arc<dyn RecordStore>;

pub struct AppServices {
    pub directory: Directory<SharedStore>,
    pub coordinator: RentalCoordinator<SharedStore>,
}

impl AppServices {
    pub fn new(store: SharedStore, call_timeout: Duration) -> Self {
        Self {
            directory: Directory::new(Arc::clone(&store), call_timeout),
            coordinator: RentalCoordinator::new(InventoryLedger::new(store, call_timeout)),
        }
    }

    /// Services over a fresh in-memory store (dev/test).
    pub fn in_memory(call_timeout: Duration) -> Self {
        Self::new(Arc::new(InMemoryRecordStore::new()), call_timeout)
    }

    pub fn ledger(&self) -> &InventoryLedger<SharedStore> {
        self.coordinator.ledger()
    }
}

/// Build services from configuration: Postgres when `DATABASE_URL` is set,
/// otherwise in-memory.
pub async fn build_services(config: &AppConfig) -> Result<AppServices, StoreError> {
    let store: SharedStore = match &config.database_url {
        Some(url) => {
            let store =
                PostgresRecordStore::connect(url, config.db_max_connections, config.store_timeout).await?;
            store.ensure_schema().await?;
            info!(max_connections = config.db_max_connections, "using postgres record store");
            Arc::new(store)
        }
        None => {
            info!("DATABASE_URL not set; using in-memory record store");
            Arc::new(InMemoryRecordStore::new())
        }
    };
    Ok(AppServices::new(store, config.store_timeout))
}
