use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    config::AppConfig,
    services::{
        itinerary::Itinerary,
        storage::{FileStore, Persistence},
        time::{Clock, SystemClock},
    },
};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    /// Handlers hold the lock for a whole operation, so two submissions
    /// never interleave inside one another.
    pub itinerary: Arc<Mutex<Itinerary>>,
}

impl AppState {
    pub fn new(config: AppConfig, itinerary: Itinerary) -> Self {
        Self {
            config,
            itinerary: Arc::new(Mutex::new(itinerary)),
        }
    }

    /// Opens the file-backed itinerary described by `config`.
    pub fn from_config(config: AppConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: AppConfig, clock: Arc<dyn Clock>) -> Self {
        let store = FileStore::new(config.data_dir.clone());
        let persistence = Persistence::new(store, config.storage_key.clone());
        let itinerary = Itinerary::open(persistence, config.zones, clock);
        Self::new(config, itinerary)
    }
}
