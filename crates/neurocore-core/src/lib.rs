pub mod action;
pub mod builtin;
pub mod catalog;
pub mod cleanup;
pub mod command;
pub mod config;
pub mod error;
pub mod executor;
pub mod io;
pub mod metrics;
pub mod mock;
pub mod params;
pub mod paths;
pub mod prefs;
pub mod tweaks;
pub mod types;

pub use error::{CoreError, Result};
