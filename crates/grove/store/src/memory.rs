//! In-memory resource store for development and testing.
//!
//! Provides a simple in-memory implementation of the ResourceStore trait.
//! Not suitable for production use.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use grove_types::{
    CorrelationToken, ResourceId, ResourceInstance, ResourceKind, ResourceStatus, ScheduleRule,
    UserId,
};
use std::sync::Arc;

use crate::error::{Result, StoreError};
use crate::ResourceStore;

/// In-memory resource store implementation.
pub struct InMemoryResourceStore {
    /// All resource records indexed by ID.
    resources: Arc<DashMap<ResourceId, ResourceInstance>>,

    /// Resource IDs indexed by the correlation token of their in-flight
    /// dispatch.
    by_correlation: Arc<DashMap<CorrelationToken, ResourceId>>,
}

impl InMemoryResourceStore {
    /// Create a new in-memory store.
    pub fn new() -> Self {
        Self {
            resources: Arc::new(DashMap::new()),
            by_correlation: Arc::new(DashMap::new()),
        }
    }

    /// Get the total number of records stored.
    pub fn total_count(&self) -> usize {
        self.resources.len()
    }

    /// Clear all records.
    pub fn clear(&self) {
        self.resources.clear();
        self.by_correlation.clear();
    }
}

impl Default for InMemoryResourceStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResourceStore for InMemoryResourceStore {
    async fn get(&self, id: &ResourceId) -> Result<ResourceInstance> {
        self.resources
            .get(id)
            .map(|r| r.clone())
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    async fn insert(&self, resource: &ResourceInstance) -> Result<()> {
        if self.resources.contains_key(&resource.id) {
            return Err(StoreError::Duplicate(resource.id.clone()));
        }
        self.resources.insert(resource.id.clone(), resource.clone());
        Ok(())
    }

    async fn list_by_status(
        &self,
        kind: ResourceKind,
        status: ResourceStatus,
    ) -> Result<Vec<ResourceInstance>> {
        Ok(self
            .resources
            .iter()
            .filter(|r| r.kind == kind && r.status == status)
            .map(|r| r.clone())
            .collect())
    }

    async fn list_by_owner(&self, owner: &UserId) -> Result<Vec<ResourceInstance>> {
        Ok(self
            .resources
            .iter()
            .filter(|r| &r.owner == owner)
            .map(|r| r.clone())
            .collect())
    }

    async fn list_children(&self, parent: &ResourceId) -> Result<Vec<ResourceInstance>> {
        Ok(self
            .resources
            .iter()
            .filter(|r| r.is_child_of(parent))
            .map(|r| r.clone())
            .collect())
    }

    async fn compare_and_set_status(
        &self,
        id: &ResourceId,
        expected: ResourceStatus,
        next: ResourceStatus,
    ) -> Result<bool> {
        // get_mut holds the shard lock, making compare-then-write atomic
        // with respect to other writers of the same record.
        let mut entry = self
            .resources
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;

        if entry.status != expected {
            return Ok(false);
        }
        entry.status = next;
        Ok(true)
    }

    async fn set_status(&self, id: &ResourceId, status: ResourceStatus) -> Result<()> {
        let mut entry = self
            .resources
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        entry.status = status;
        Ok(())
    }

    async fn get_rule(&self, id: &ResourceId) -> Result<Option<ScheduleRule>> {
        let entry = self
            .resources
            .get(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        Ok(entry.schedule.clone())
    }

    async fn set_rule(&self, id: &ResourceId, rule: &ScheduleRule) -> Result<()> {
        let mut entry = self
            .resources
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        entry.schedule = Some(rule.clone());
        Ok(())
    }

    async fn clear_rule(&self, id: &ResourceId) -> Result<()> {
        let mut entry = self
            .resources
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        entry.schedule = None;
        Ok(())
    }

    async fn update_last_activity(&self, id: &ResourceId, at: DateTime<Utc>) -> Result<()> {
        let mut entry = self
            .resources
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        entry.last_activity = Some(at);
        Ok(())
    }

    async fn set_correlation(
        &self,
        id: &ResourceId,
        token: Option<&CorrelationToken>,
    ) -> Result<()> {
        let mut entry = self
            .resources
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;

        if let Some(previous) = entry.correlation.take() {
            self.by_correlation.remove(&previous);
        }
        if let Some(token) = token {
            entry.correlation = Some(token.clone());
            self.by_correlation.insert(token.clone(), id.clone());
        }
        Ok(())
    }

    async fn find_by_correlation(
        &self,
        token: &CorrelationToken,
    ) -> Result<Option<ResourceInstance>> {
        let Some(id) = self.by_correlation.get(token).map(|e| e.clone()) else {
            return Ok(None);
        };
        Ok(self.resources.get(&id).map(|r| r.clone()))
    }
}
