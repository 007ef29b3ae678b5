//! Dockhand secrets core
//!
//! Core domain types, port traits, and error handling for the Dockhand
//! secrets-synchronization pipeline. This crate has minimal dependencies
//! and defines the shared vocabulary used across all other crates.

pub mod error;
pub mod ids;
pub mod manifest;
pub mod ports;
pub mod sync;
pub mod vault;

pub use error::{Error, Result};
pub use ids::EnvironmentId;
