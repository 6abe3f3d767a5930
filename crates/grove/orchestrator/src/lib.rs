//! GROVE lifecycle orchestrator
//!
//! The top-level coordinator of the control plane. On each externally
//! triggered tick it sweeps the store for resources whose schedule rules or
//! inactivity thresholds have been reached, and pushes the resulting
//! transitions through the state machine and provisioning gateway. It also
//! hosts the user-facing paths that share those seams: resource admission,
//! explicit actions, schedule editing, activity recording, the stop-preview
//! query, and the completion callback.

pub mod builder;
pub mod config;
pub mod error;
pub mod guards;
pub mod orchestrator;

pub use builder::OrchestratorBuilder;
pub use config::OrchestratorConfig;
pub use error::{OrchestratorError, Result};
pub use guards::{
    AllowAllBudgetGate, BudgetGate, BudgetGuard, DenyListBudgetGate, Guard, GuardedOperation,
};
pub use orchestrator::{LifecycleOrchestrator, SweepStats, TickReport};
