//! Common test utilities for sitepack-profile
//!
//! - Temporary site fixtures with installable units and a live store
//! - Hand-written collaborators for the orchestrator seams

#![allow(dead_code)]
#![allow(unused_imports)]

pub mod fixtures;
pub mod mocks;

pub use fixtures::*;
pub use mocks::*;
