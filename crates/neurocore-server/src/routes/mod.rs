pub mod actions;
pub mod config;
pub mod events;
pub mod metrics;
pub mod preferences;
pub mod settings;
pub mod status;
