//! Messages exchanged between workers, the scheduler and its observers

use std::fmt;

use crate::domain::theme_sync::change_event::TenantId;

/// How a worker's attempt ended. Informational only: the tenant is unregistered either way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Succeeded,
    Failed(String),
    Crashed(String),
}

impl fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            JobOutcome::Succeeded => write!(f, "succeeded"),
            JobOutcome::Failed(reason) => write!(f, "failed: {}", reason),
            JobOutcome::Crashed(reason) => write!(f, "crashed: {}", reason),
        }
    }
}

// Workers send exactly one of these, whatever happens to the job body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionSignal {
    pub tenant_id: TenantId,
    pub outcome: JobOutcome,
}

/// Decisions published by the scheduler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerNotice {
    Registered { tenant_id: TenantId },
    Coalesced { tenant_id: TenantId },
    Unregistered { tenant_id: TenantId, outcome: JobOutcome },
    Drained,
}

impl SchedulerNotice {
    pub fn tenant_id(&self) -> Option<&TenantId> {
        match self {
            SchedulerNotice::Registered { tenant_id }
            | SchedulerNotice::Coalesced { tenant_id }
            | SchedulerNotice::Unregistered { tenant_id, .. } => Some(tenant_id),
            SchedulerNotice::Drained => None,
        }
    }
}
