//! Job Registry
//! Tenants that currently have a scheduled or running job. Owned by the scheduler loop alone.

use std::collections::HashMap;

use crate::domain::theme_sync::{change_event::TenantId, scheduled_job::ScheduledJob};

#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: HashMap<TenantId, ScheduledJob>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, tenant_id: &TenantId) -> bool {
        self.jobs.contains_key(tenant_id)
    }

    /// Panics if the tenant already has a job: two entries for one tenant is a scheduler bug.
    pub fn insert(&mut self, job: ScheduledJob) {
        let tenant_id = job.tenant_id().clone();
        if let Some(existing) = self.jobs.insert(tenant_id.clone(), job) {
            panic!(
                "tenant {} registered twice (job {} was already scheduled)",
                tenant_id,
                existing.id()
            );
        }
    }

    pub fn remove(&mut self, tenant_id: &TenantId) -> Option<ScheduledJob> {
        self.jobs.remove(tenant_id)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
