//! Resource status model and the legal-transition table
//!
//! Every managed resource moves through a fixed set of statuses. Transitions
//! happen only along the table encoded in [`ResourceStatus::can_transition_to`];
//! anything else is rejected before any state is touched.

use serde::{Deserialize, Serialize};

/// Status of a managed resource.
///
/// `Creating`, `Starting`, `Stopping`, `Terminating` and `Reconfiguring` are
/// transient: a provisioning request is in flight and its outcome has not yet
/// been reported back. A resource in a transient status accepts no further
/// commands until the in-flight one resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceStatus {
    /// Initial status, set when the resource record is admitted.
    Creating,
    /// A start request is in flight.
    Starting,
    /// The resource is up and billable.
    Running,
    /// A stop request is in flight.
    Stopping,
    /// The resource is down but its state is retained.
    Stopped,
    /// A reconfigure request (e.g. reshaping a cluster) is in flight.
    Reconfiguring,
    /// A terminate request is in flight.
    Terminating,
    /// The resource is gone. Terminal.
    Terminated,
    /// The last provisioning request failed. Terminal for the scheduler;
    /// an explicit terminate is still accepted.
    Failed,
}

impl ResourceStatus {
    /// Statuses from which no scheduler-driven transition ever fires.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ResourceStatus::Terminated | ResourceStatus::Failed)
    }

    /// Statuses with a provisioning request currently in flight.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ResourceStatus::Creating
                | ResourceStatus::Starting
                | ResourceStatus::Stopping
                | ResourceStatus::Reconfiguring
                | ResourceStatus::Terminating
        )
    }

    /// Is `next` a legal successor of this status?
    ///
    /// `Failed -> Terminating` is legal so a user can still clean up a failed
    /// resource; the scheduler never selects `Failed` candidates.
    pub fn can_transition_to(&self, next: ResourceStatus) -> bool {
        use ResourceStatus::*;
        matches!(
            (*self, next),
            (Creating, Running)
                | (Creating, Failed)
                | (Running, Stopping)
                | (Running, Terminating)
                | (Running, Reconfiguring)
                | (Stopping, Stopped)
                | (Stopping, Failed)
                | (Stopped, Starting)
                | (Stopped, Terminating)
                | (Starting, Running)
                | (Starting, Failed)
                | (Terminating, Terminated)
                | (Terminating, Failed)
                | (Reconfiguring, Running)
                | (Reconfiguring, Failed)
                | (Failed, Terminating)
        )
    }
}

impl std::fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceStatus::Creating => write!(f, "creating"),
            ResourceStatus::Starting => write!(f, "starting"),
            ResourceStatus::Running => write!(f, "running"),
            ResourceStatus::Stopping => write!(f, "stopping"),
            ResourceStatus::Stopped => write!(f, "stopped"),
            ResourceStatus::Reconfiguring => write!(f, "reconfiguring"),
            ResourceStatus::Terminating => write!(f, "terminating"),
            ResourceStatus::Terminated => write!(f, "terminated"),
            ResourceStatus::Failed => write!(f, "failed"),
        }
    }
}

/// A lifecycle command that can be requested for a resource, by a user or by
/// the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleAction {
    Start,
    Stop,
    Terminate,
    Reconfigure,
}

impl LifecycleAction {
    /// The transient status a resource enters while this action is in flight.
    pub fn pending_status(&self) -> ResourceStatus {
        match self {
            LifecycleAction::Start => ResourceStatus::Starting,
            LifecycleAction::Stop => ResourceStatus::Stopping,
            LifecycleAction::Terminate => ResourceStatus::Terminating,
            LifecycleAction::Reconfigure => ResourceStatus::Reconfiguring,
        }
    }

    /// The status a resource settles into when this action completes
    /// successfully.
    pub fn settled_status(&self) -> ResourceStatus {
        match self {
            LifecycleAction::Start => ResourceStatus::Running,
            LifecycleAction::Stop => ResourceStatus::Stopped,
            LifecycleAction::Terminate => ResourceStatus::Terminated,
            LifecycleAction::Reconfigure => ResourceStatus::Running,
        }
    }

    /// Does this action bring a resource up into a billable state?
    ///
    /// Billable actions pass through the admission guard pipeline before any
    /// state is written.
    pub fn is_billable(&self) -> bool {
        matches!(self, LifecycleAction::Start | LifecycleAction::Reconfigure)
    }
}

impl std::fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleAction::Start => write!(f, "start"),
            LifecycleAction::Stop => write!(f, "stop"),
            LifecycleAction::Terminate => write!(f, "terminate"),
            LifecycleAction::Reconfigure => write!(f, "reconfigure"),
        }
    }
}
