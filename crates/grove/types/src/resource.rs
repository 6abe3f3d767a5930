//! Resource records managed by the control plane
//!
//! A [`ResourceInstance`] is an immutable snapshot of a managed resource as
//! read from the store. Mutation happens only through the store's conditional
//! write API, never by editing a snapshot a caller still holds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{CorrelationToken, ProjectId, ResourceId, UserId};
use crate::rule::ScheduleRule;
use crate::status::ResourceStatus;

/// Kind of managed resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    /// A user's primary interactive compute environment.
    Notebook,
    /// An auxiliary compute resource attached to a notebook.
    Cluster,
    /// An edge/gateway node fronting a user's environment.
    Edge,
    /// A provider-managed cluster service (no host access).
    ClusterService,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::Notebook => write!(f, "notebook"),
            ResourceKind::Cluster => write!(f, "cluster"),
            ResourceKind::Edge => write!(f, "edge"),
            ResourceKind::ClusterService => write!(f, "cluster-service"),
        }
    }
}

/// Cloud provider hosting a resource.
///
/// Provisioning dispatch is routed through one adapter per provider, selected
/// once from this field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CloudProvider {
    Aws,
    Azure,
    Gcp,
}

impl std::fmt::Display for CloudProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CloudProvider::Aws => write!(f, "aws"),
            CloudProvider::Azure => write!(f, "azure"),
            CloudProvider::Gcp => write!(f, "gcp"),
        }
    }
}

/// Compute engine flavor of a cluster resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClusterEngine {
    /// Self-managed engine running on instances we own. Can be stopped and
    /// restarted in lockstep with its notebook.
    Standalone,
    /// Provider-managed engine service. Start/stop timing is not ours to
    /// synchronize.
    ManagedService,
}

impl ClusterEngine {
    /// Can this engine participate in synchronized start with its notebook?
    pub fn supports_sync_start(&self) -> bool {
        matches!(self, ClusterEngine::Standalone)
    }
}

/// Immutable snapshot of a managed resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceInstance {
    /// Unique resource identifier.
    pub id: ResourceId,

    /// Owning user.
    pub owner: UserId,

    /// Billing project.
    pub project: ProjectId,

    /// What kind of resource this is.
    pub kind: ResourceKind,

    /// Cloud provider hosting the resource.
    pub provider: CloudProvider,

    /// Engine flavor; only meaningful for cluster kinds.
    pub engine: Option<ClusterEngine>,

    /// Owning notebook for a cluster, absent otherwise.
    pub parent: Option<ResourceId>,

    /// Current lifecycle status.
    pub status: ResourceStatus,

    /// Last observed user activity, if any was ever recorded.
    pub last_activity: Option<DateTime<Utc>>,

    /// The automation rule attached to this resource, if any.
    pub schedule: Option<ScheduleRule>,

    /// Correlation token of the provisioning request currently in flight.
    pub correlation: Option<CorrelationToken>,

    /// When the resource record was admitted.
    pub created_at: DateTime<Utc>,
}

impl ResourceInstance {
    /// Create a new resource record in the initial `Creating` status.
    pub fn new(
        owner: UserId,
        project: ProjectId,
        kind: ResourceKind,
        provider: CloudProvider,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ResourceId::generate(),
            owner,
            project,
            kind,
            provider,
            engine: None,
            parent: None,
            status: ResourceStatus::Creating,
            last_activity: None,
            schedule: None,
            correlation: None,
            created_at,
        }
    }

    /// Attach a parent notebook and engine flavor, making this a dependent
    /// cluster record.
    pub fn as_cluster_of(mut self, parent: ResourceId, engine: ClusterEngine) -> Self {
        self.kind = ResourceKind::Cluster;
        self.parent = Some(parent);
        self.engine = Some(engine);
        self
    }

    /// Is this resource a dependent of the given notebook?
    pub fn is_child_of(&self, notebook: &ResourceId) -> bool {
        self.parent.as_ref() == Some(notebook)
    }
}
