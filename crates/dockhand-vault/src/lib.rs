//! Vault HTTP client for Dockhand.
//!
//! Authentication exchanges produce an immutable [`VaultSession`]; reads
//! take the session by reference. Every sync pass constructs its own
//! client and session, so credentials are never shared across stacks.

mod client;
mod kv;

pub use client::{ConnectionReport, VaultClient, VaultSession};
