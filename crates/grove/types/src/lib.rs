//! GROVE core types
//!
//! Shared vocabulary of the workbench lifecycle layer: identifiers, resource
//! records, status/transition model, and schedule rules. Everything here is a
//! plain serde-friendly value; behavior that touches stores or gateways lives
//! in the crates that own those seams.

pub mod ids;
pub mod resource;
pub mod rule;
pub mod status;

pub use ids::{CorrelationToken, ProjectId, ResourceId, UserId};
pub use resource::{CloudProvider, ClusterEngine, ResourceInstance, ResourceKind};
pub use rule::{RuleValidationError, ScheduleRule};
pub use status::{LifecycleAction, ResourceStatus};
