//! Type definitions for installable units and profiles

mod extension_types;
mod profile_types;

pub use extension_types::*;
pub use profile_types::*;
