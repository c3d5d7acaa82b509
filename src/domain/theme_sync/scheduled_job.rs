//! Scheduled Job
//! Registry entry for a tenant whose synchronization is debouncing, queued on the gate or running

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use getset::Getters;
use uuid::Uuid;

use super::change_event::{ChangeEvent, TenantId};

#[derive(Debug, Clone, PartialEq, Eq, Getters)]
#[getset(get = "pub")]
pub struct ScheduledJob {
    id: Uuid,
    tenant_id: TenantId,
    resource_id: String,
    target_directory: PathBuf,
    actor_name: String,
    created_at: DateTime<Local>,
}

impl ScheduledJob {
    /// Builds the job for the first event of a burst. The tenant materializes into `output_root/<tenant>`.
    pub fn from_event(event: &ChangeEvent, output_root: &Path) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id: event.tenant_id().clone(),
            resource_id: event.resource_id().clone(),
            target_directory: output_root.join(event.tenant_id().as_str()),
            actor_name: event.actor_name().clone(),
            created_at: Local::now(),
        }
    }
}
