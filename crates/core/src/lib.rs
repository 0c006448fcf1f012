pub mod config;
pub mod metrics;
pub mod source;
pub mod store;
pub mod testing;
pub mod torrent;
pub mod update;

pub use config::{load_config, load_config_from_str, validate_config, Config, ConfigError};
pub use source::{Source, SourceError, SourceIdentity, SourceOptions, SourceRegistry};
pub use store::{SqliteTorrentStore, StoreError, StoredTorrent, TorrentSearchQuery, TorrentStore};
pub use torrent::{FetchedItem, InfoHash, TorrentRecord};
pub use update::{update_all, UpdateConfig, UpdateEngine, UpdateError, UpdateOutcome, UpdateSummary};
