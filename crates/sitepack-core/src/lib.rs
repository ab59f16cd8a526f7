//! # sitepack-core
//!
//! Core library for sitepack providing:
//! - Configuration file parsing (sitepack.yaml)
//! - Configuration document storage (live store and profile snapshots)
//! - Type definitions for installable units, the active extension set
//!   and profiles

pub mod config;
pub mod error;
pub mod storage;
pub mod types;
pub mod utils;

pub use config::SitepackConfig;
pub use error::{Error, Result};
pub use storage::{ConfigStorage, FileStorage, MemoryStorage};
