//! GROVE resource store
//!
//! Persistence seam for resource records and their schedule rules. The
//! orchestrator never mutates a snapshot it holds; every write goes through
//! this trait, and status changes go through the conditional
//! `compare_and_set_status` so concurrent writers are serialized per
//! resource.

pub mod error;
pub mod memory;

pub use error::{Result, StoreError};
pub use memory::InMemoryResourceStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use grove_types::{
    CorrelationToken, ResourceId, ResourceInstance, ResourceKind, ResourceStatus, ScheduleRule,
    UserId,
};

/// Store for resource records and schedule rules
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Get a resource by ID
    async fn get(&self, id: &ResourceId) -> Result<ResourceInstance>;

    /// Admit a new resource record
    async fn insert(&self, resource: &ResourceInstance) -> Result<()>;

    /// List resources of a kind currently in the given status
    async fn list_by_status(
        &self,
        kind: ResourceKind,
        status: ResourceStatus,
    ) -> Result<Vec<ResourceInstance>>;

    /// List all resources owned by a user
    async fn list_by_owner(&self, owner: &UserId) -> Result<Vec<ResourceInstance>>;

    /// List dependent resources of a notebook
    async fn list_children(&self, parent: &ResourceId) -> Result<Vec<ResourceInstance>>;

    /// Conditionally update status: the write succeeds only if the stored
    /// status still equals `expected`. Returns whether the write happened.
    async fn compare_and_set_status(
        &self,
        id: &ResourceId,
        expected: ResourceStatus,
        next: ResourceStatus,
    ) -> Result<bool>;

    /// Unconditionally overwrite status. Reserved for failure rollback.
    async fn set_status(&self, id: &ResourceId, status: ResourceStatus) -> Result<()>;

    /// Get the schedule rule attached to a resource
    async fn get_rule(&self, id: &ResourceId) -> Result<Option<ScheduleRule>>;

    /// Attach or replace the schedule rule of a resource
    async fn set_rule(&self, id: &ResourceId, rule: &ScheduleRule) -> Result<()>;

    /// Detach the schedule rule of a resource
    async fn clear_rule(&self, id: &ResourceId) -> Result<()>;

    /// Record observed user activity
    async fn update_last_activity(&self, id: &ResourceId, at: DateTime<Utc>) -> Result<()>;

    /// Record or clear the in-flight dispatch correlation token
    async fn set_correlation(
        &self,
        id: &ResourceId,
        token: Option<&CorrelationToken>,
    ) -> Result<()>;

    /// Resolve a resource from a completion report's correlation token
    async fn find_by_correlation(
        &self,
        token: &CorrelationToken,
    ) -> Result<Option<ResourceInstance>>;
}
