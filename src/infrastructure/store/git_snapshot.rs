//! Git Snapshot
//! Versions a tenant directory by committing its whole tree to a local repository

use std::path::Path;

use chrono::{DateTime, Local};
use log::info;
use tokio::process::Command;

use crate::domain::theme_sync::custom_errors::SyncError;

const DEFAULT_AUTHOR: &str = "theme-sync";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    NothingToCommit,
}

#[derive(Debug, Clone)]
pub struct GitSnapshot {
    commit_email: String,
}

impl GitSnapshot {
    pub fn new(commit_email: impl Into<String>) -> Self {
        Self {
            commit_email: commit_email.into(),
        }
    }

    /// `git init` is a no-op on an existing repository, so this is safe to run on every sync
    pub async fn commit(
        &self,
        dir: &Path,
        actor_name: &str,
        at: DateTime<Local>,
    ) -> Result<CommitOutcome, SyncError> {
        let author = author_name(actor_name);

        self.git(dir, author, &["init", "--quiet", "."]).await?;
        self.git(dir, author, &["add", "--all", "."]).await?;

        let status = self.git(dir, author, &["status", "--porcelain"]).await?;
        if status.trim().is_empty() {
            info!("Nothing to commit in {}", dir.display());
            return Ok(CommitOutcome::NothingToCommit);
        }

        let message = commit_message(actor_name, at);
        self.git(
            dir,
            author,
            &["-c", "commit.gpgsign=false", "commit", "--quiet", "-m", &message],
        )
        .await?;
        info!("Changes committed to repository {}", dir.display());
        Ok(CommitOutcome::Committed)
    }

    async fn git(&self, dir: &Path, author: &str, args: &[&str]) -> Result<String, SyncError> {
        let output = Command::new("git")
            .args(args)
            .current_dir(dir)
            .env("GIT_AUTHOR_NAME", author)
            .env("GIT_AUTHOR_EMAIL", &self.commit_email)
            .env("GIT_COMMITTER_NAME", author)
            .env("GIT_COMMITTER_EMAIL", &self.commit_email)
            .output()
            .await
            .map_err(|e| SyncError::Commit(format!("could not run git {}: {}", args.join(" "), e)))?;

        if !output.status.success() {
            return Err(SyncError::Commit(format!(
                "git {} in {} failed: {}",
                args.join(" "),
                dir.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn author_name(actor_name: &str) -> &str {
    let trimmed = actor_name.trim();
    if trimmed.is_empty() {
        DEFAULT_AUTHOR
    } else {
        trimmed
    }
}

fn commit_message(actor_name: &str, at: DateTime<Local>) -> String {
    format!(
        "{}: {}",
        author_name(actor_name),
        at.format("%Y-%m-%d %H:%M:%S %z")
    )
}
