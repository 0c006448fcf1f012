pub mod api;
pub mod commands;
pub mod metrics;
pub mod state;
