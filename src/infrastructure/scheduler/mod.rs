//! Theme Sync Scheduler
//!
//! Turns a stream of per-tenant change events into synchronization jobs.
//!
//! Primary Components:
//! 1. Scheduler: single control loop, sole owner of the job registry
//! 2. JobRegistry: tenants with a job that is debouncing, queued or running
//! 3. ConcurrencyGate: caps simultaneously running job bodies
//! 4. Worker: one per scheduled job; debounce, wait for the gate, run, report back
//!
//! Bursts of events for a tenant collapse into the one job already scheduled for it.
//! The job body fetches fresh remote state when it finally runs, so nothing from the
//! dropped events needs to be kept.

pub mod commands;
pub mod gate;
pub mod handle;
pub mod registry;
pub mod scheduler;
pub mod worker;

use std::sync::Arc;

use log::info;

use crate::{
    config::SchedulerConfig,
    domain::theme_sync::{
        custom_errors::GateError, sync_job::SyncJob, value_objects::credentials::Credentials,
    },
    infrastructure::mq::event_source::EventSource,
};

use self::{handle::SchedulerHandle, scheduler::Scheduler};

/// Create and run the scheduler
pub fn init_scheduler<E>(
    config: &SchedulerConfig,
    events: E,
    body: Arc<dyn SyncJob>,
    credentials: Arc<Credentials>,
) -> Result<SchedulerHandle, GateError>
where
    E: EventSource + 'static,
{
    let (scheduler, notices) = Scheduler::new(config, events, body, credentials)?;

    info!("Start running scheduler...");
    let task = tokio::spawn(async move {
        scheduler.run().await;
    });

    Ok(SchedulerHandle::new(notices, task))
}
