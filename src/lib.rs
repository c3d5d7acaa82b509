// In src/lib.rs
pub mod config;
pub mod domain {
    pub mod theme_sync;
    // Re-export
    pub use theme_sync::change_event::{ChangeEvent, TenantId};
    pub use theme_sync::scheduled_job::ScheduledJob;
    pub use theme_sync::sync_job::SyncJob;
}
pub mod infrastructure {
    pub mod mq;
    pub mod scheduler;
    pub mod store;
    #[cfg(test)]
    pub(crate) mod test_server;
    pub mod theme_sync_job;
    pub mod web;
    // Re-export
    pub use scheduler::commands;
    pub use scheduler::handle::SchedulerHandle;
    pub use scheduler::init_scheduler;
}
