//! Incremental catch-up of sources into storage.
//!
//! [`UpdateEngine`] fetches every item a source published since the last run
//! and commits them atomically. [`update_all`] runs it for every registered
//! source.

mod driver;
mod engine;
mod types;
mod writer;

pub use driver::{update_all, DriverReport, SourceRun};
pub use engine::UpdateEngine;
pub use types::*;
pub use writer::{create_batch_writer, BatchHandle, BatchOutcome, BatchWriter, CommitDecision};
