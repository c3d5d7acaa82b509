//! SyncJob Trait
//! The opaque job body the scheduler runs for one tenant: fetch, materialize and version its theme

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use super::{
    custom_errors::SyncError, scheduled_job::ScheduledJob,
    value_objects::credentials::Credentials,
};

#[cfg_attr(test, automock)]
#[async_trait]
pub trait SyncJob: Send + Sync {
    // may take arbitrary time and may fail; the caller contains both
    async fn run(&self, job: &ScheduledJob, credentials: &Credentials) -> Result<(), SyncError>;
}
