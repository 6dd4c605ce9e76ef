//! Validation Orchestrator: queue, worker pool, fan-out,
//! aggregation, and the result store it writes snapshots into.

pub mod aggregate;
pub mod core;
pub mod store;

pub use self::core::{Health, HealthState, Orchestrator, OrchestratorSettings};
pub use store::ResultStore;
