//! Theme Store
//! Materializes a fetched theme bundle into a tenant directory.
//!
//! Layout of a tenant directory:
//! - `<name>.<content_type>` for every template
//! - `assets/<file_name>` for every asset
//! - `.git/` which is the only entry kept between runs
//!
//! Everything else is removed first, so files that disappeared remotely
//! disappear locally as well and the next commit records the removal.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use futures::{future::BoxFuture, stream, StreamExt};
use getset::Getters;
use log::{debug, error};
use reqwest::Client;
use tokio::{fs, io::AsyncWriteExt};

use crate::{
    domain::theme_sync::{
        custom_errors::SyncError,
        value_objects::theme_bundle::{ThemeBundle, ThemeEntry},
    },
    infrastructure::web::theme_request::check_status,
};

pub const ASSETS_DIR: &str = "assets";
const GIT_DIR: &str = ".git";

#[derive(Debug, Clone, Default, PartialEq, Eq, Getters)]
#[getset(get = "pub")]
pub struct WriteSummary {
    templates_written: usize,
    assets_written: usize,
    failures: usize,
}

#[derive(Debug, Clone)]
pub struct ThemeStore {
    http_client: Client,
    asset_concurrency: usize,
}

impl ThemeStore {
    pub fn new(http_client: Client, asset_concurrency: usize) -> Self {
        Self {
            http_client,
            asset_concurrency: asset_concurrency.max(1),
        }
    }

    /// Per-file failures are logged and counted; only an unusable directory fails the write
    pub async fn write(&self, dir: &Path, bundle: &ThemeBundle) -> Result<WriteSummary, SyncError> {
        fs::create_dir_all(dir)
            .await
            .map_err(|e| SyncError::io(dir, e))?;
        clear_stale(dir).await?;

        let assets_dir = dir.join(ASSETS_DIR);
        fs::create_dir_all(&assets_dir)
            .await
            .map_err(|e| SyncError::io(&assets_dir, e))?;

        let mut summary = WriteSummary::default();

        for template in bundle.templates() {
            match write_template(dir, template).await {
                Ok(path) => {
                    debug!("wrote {}", path.display());
                    summary.templates_written += 1;
                }
                Err(e) => {
                    error!("error: Could not write template {}: {}", template.name(), e);
                    summary.failures += 1;
                }
            }
        }

        let assets_dir = assets_dir.as_path();
        let downloads: Vec<_> = latest_by_file_name(bundle.assets())
            .into_iter()
            .map(|asset| -> BoxFuture<'_, (&ThemeEntry, Result<(), SyncError>)> {
                Box::pin(async move { (asset, self.download_asset(assets_dir, asset).await) })
            })
            .collect();
        let results = stream::iter(downloads)
            .buffer_unordered(self.asset_concurrency)
            .collect::<Vec<_>>()
            .await;

        for (asset, result) in results {
            match result {
                Ok(()) => summary.assets_written += 1,
                Err(e) => {
                    error!("error: asset {} not available: {}", asset.file_name(), e);
                    summary.failures += 1;
                }
            }
        }

        Ok(summary)
    }

    async fn download_asset(&self, assets_dir: &Path, asset: &ThemeEntry) -> Result<(), SyncError> {
        let file_name = checked_file_name(asset.file_name())?;
        let href = asset.asset_href().ok_or_else(|| {
            SyncError::Decode(format!("asset {} has no download link", file_name))
        })?;

        let mut resp = self.http_client.get(href).send().await?;
        check_status(resp.status())?;

        let path = assets_dir.join(file_name);
        let mut file = fs::File::create(&path)
            .await
            .map_err(|e| SyncError::io(&path, e))?;

        let copied: Result<(), SyncError> = async {
            while let Some(chunk) = resp.chunk().await? {
                file.write_all(&chunk)
                    .await
                    .map_err(|e| SyncError::io(&path, e))?;
            }
            file.flush().await.map_err(|e| SyncError::io(&path, e))
        }
        .await;

        if copied.is_err() {
            // no half-downloaded files in the snapshot
            let _ = fs::remove_file(&path).await;
        }
        copied
    }
}

/// One download per target file. A later entry replaces an earlier one with the same name.
fn latest_by_file_name(assets: &[ThemeEntry]) -> Vec<&ThemeEntry> {
    let last_index: HashMap<&str, usize> = assets
        .iter()
        .enumerate()
        .map(|(i, asset)| (asset.file_name().as_str(), i))
        .collect();

    assets
        .iter()
        .enumerate()
        .filter(|(i, asset)| {
            let latest = last_index.get(asset.file_name().as_str()) == Some(i);
            if !latest {
                debug!("asset {} listed again later, skipping", asset.file_name());
            }
            latest
        })
        .map(|(_, asset)| asset)
        .collect()
}

async fn write_template(dir: &Path, template: &ThemeEntry) -> Result<PathBuf, SyncError> {
    let file_name = template.template_file_name();
    let path = dir.join(checked_file_name(&file_name)?);
    fs::write(&path, template.body())
        .await
        .map_err(|e| SyncError::io(&path, e))?;
    Ok(path)
}

async fn clear_stale(dir: &Path) -> Result<(), SyncError> {
    let mut entries = fs::read_dir(dir).await.map_err(|e| SyncError::io(dir, e))?;

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| SyncError::io(dir, e))?
    {
        if entry.file_name() == GIT_DIR {
            continue;
        }
        let path = entry.path();
        let file_type = entry
            .file_type()
            .await
            .map_err(|e| SyncError::io(&path, e))?;
        let removed = if file_type.is_dir() {
            fs::remove_dir_all(&path).await
        } else {
            fs::remove_file(&path).await
        };
        removed.map_err(|e| SyncError::io(&path, e))?;
    }
    Ok(())
}

/// Names coming from the API must stay inside the tenant directory
pub(crate) fn checked_file_name(name: &str) -> Result<&str, SyncError> {
    let unsafe_name = name.is_empty()
        || name == "."
        || name == ".."
        || name == GIT_DIR
        || name.contains(|c: char| c == '/' || c == '\\' || c == '\0');
    if unsafe_name {
        return Err(SyncError::InvalidFileName(name.to_string()));
    }
    Ok(name)
}
