//! Torrent metadata mirrored from remote indexes.
//!
//! A [`TorrentRecord`] is the normalized shape every source produces. Its
//! info-hash is derived from the magnet link on the listing page.

mod format;
mod info_hash;
mod magnet;
mod record;

pub use format::{format_size, format_time};
pub use info_hash::{InfoHash, InfoHashError, INFO_HASH_LEN};
pub use magnet::{MagnetError, MagnetLink, UrnScheme};
pub use record::{FetchedItem, RecordError, TorrentRecord};
