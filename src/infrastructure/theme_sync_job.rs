//! Theme synchronization job body: fetch -> materialize -> commit

use async_trait::async_trait;
use chrono::Local;
use log::{info, warn};
use reqwest::Client;

use crate::{
    config::StoreConfig,
    domain::theme_sync::{
        custom_errors::SyncError, scheduled_job::ScheduledJob, sync_job::SyncJob,
        value_objects::credentials::Credentials,
    },
};

use super::{
    store::{git_snapshot::GitSnapshot, theme_store::ThemeStore},
    web::theme_request::ThemeRequest,
};

#[derive(Debug, Clone)]
pub struct ThemeSyncJob {
    request: ThemeRequest,
    store: ThemeStore,
    snapshot: GitSnapshot,
}

impl ThemeSyncJob {
    /// One HTTP client is shared by the theme fetch and every asset download
    pub fn new(http_client: Client, config: &StoreConfig) -> Self {
        Self {
            request: ThemeRequest::new(http_client.clone()),
            store: ThemeStore::new(http_client, *config.asset_concurrency()),
            snapshot: GitSnapshot::new(config.commit_email().clone()),
        }
    }
}

#[async_trait]
impl SyncJob for ThemeSyncJob {
    async fn run(&self, job: &ScheduledJob, credentials: &Credentials) -> Result<(), SyncError> {
        let bundle = self.request.get(job.resource_id(), credentials).await?;

        let dir = job.target_directory();
        let summary = self.store.write(dir, &bundle).await?;
        if *summary.failures() > 0 {
            warn!(
                "{}: wrote {} templates and {} assets, {} files failed",
                job.tenant_id(),
                summary.templates_written(),
                summary.assets_written(),
                summary.failures()
            );
        } else {
            info!(
                "{}: wrote {} templates and {} assets",
                job.tenant_id(),
                summary.templates_written(),
                summary.assets_written()
            );
        }

        self.snapshot
            .commit(dir, job.actor_name(), Local::now())
            .await?;
        Ok(())
    }
}
