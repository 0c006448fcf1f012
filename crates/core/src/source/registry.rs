//! Name → factory lookup for sources.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use super::rutor::{self, RutorSource};
use super::rutracker::{self, RutrackerSource};
use super::{Source, SourceError, SourceOptions};

/// Builds a fresh source instance from connection options.
pub type SourceFactory =
    Arc<dyn Fn(&SourceOptions) -> Result<Arc<dyn Source>, SourceError> + Send + Sync>;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Unknown source: {0:?}")]
    UnknownSource(String),

    #[error("Failed to open source {name}: {source}")]
    Open { name: String, source: SourceError },
}

/// Registry of available sources.
///
/// Built once at startup and passed to whoever needs to open sources. It is
/// read-only after construction.
#[derive(Default, Clone)]
pub struct SourceRegistry {
    factories: HashMap<String, SourceFactory>,
}

impl fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceRegistry")
            .field("sources", &self.names())
            .finish()
    }
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every source shipped in this crate.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(rutracker::NAME, |options| {
            Ok(Arc::new(RutrackerSource::new(options)?) as Arc<dyn Source>)
        });
        registry.register(rutor::NAME, |options| {
            Ok(Arc::new(RutorSource::new(options)?) as Arc<dyn Source>)
        });
        registry
    }

    /// Register a source factory under `name`.
    ///
    /// # Panics
    ///
    /// Registering the same name twice is a programming error and panics.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&SourceOptions) -> Result<Arc<dyn Source>, SourceError> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.factories.contains_key(&name) {
            panic!("source registered twice: {}", name);
        }
        self.factories.insert(name, Arc::new(factory));
    }

    /// Construct a new instance of the named source.
    pub fn open(
        &self,
        name: &str,
        options: &SourceOptions,
    ) -> Result<Arc<dyn Source>, RegistryError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| RegistryError::UnknownSource(name.to_string()))?;

        factory(options).map_err(|source| RegistryError::Open {
            name: name.to_string(),
            source,
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Names of all registered sources, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}
