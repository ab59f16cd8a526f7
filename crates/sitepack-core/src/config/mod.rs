//! Configuration management

mod loader;

pub use loader::*;
