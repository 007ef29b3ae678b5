//! Secret synchronization orchestration for Dockhand.
//!
//! Wires the manifest model, the Vault client, and the persistence ports
//! into the per-stack sync pipeline and the fleet-wide sweep.

pub mod discovery;
pub mod fleet;
pub mod orchestrator;
pub mod resolver;

pub use fleet::FleetSyncer;
pub use orchestrator::StackSyncer;
