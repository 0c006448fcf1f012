//! Remote torrent indexes.
//!
//! Every index implements the [`Source`] trait and is constructed by name
//! through a [`SourceRegistry`]. The update engine only ever sees the trait.

mod http;
mod registry;
pub mod rutor;
pub mod rutracker;
mod types;

pub use registry::{RegistryError, SourceFactory, SourceRegistry};
pub use rutor::RutorSource;
pub use rutracker::RutrackerSource;
pub use types::*;
