use std::sync::Arc;

use torrentdb_core::{Config, SourceIdentity, TorrentStore};

/// Shared application state
pub struct AppState {
    config: Config,
    store: Arc<dyn TorrentStore>,
    /// Sources known to this process, resolved at startup.
    sources: Vec<SourceIdentity>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn TorrentStore>, sources: Vec<SourceIdentity>) -> Self {
        Self {
            config,
            store,
            sources,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &dyn TorrentStore {
        self.store.as_ref()
    }

    pub fn sources(&self) -> &[SourceIdentity] {
        &self.sources
    }
}
