//! Worker
//! Carries one tenant's job through debounce -> gate -> job body -> release -> completion.
//! The job body runs in its own task so a panic inside it comes back as a `JoinError`
//! instead of tearing down the worker, and the completion signal is sent from a drop
//! guard so it fires on every exit path, including the worker future being dropped.

use std::{any::Any, mem, sync::Arc};

use log::{debug, error, info, warn};
use tokio::{
    sync::mpsc,
    time::{sleep, Duration},
};

use crate::domain::theme_sync::{
    change_event::TenantId, scheduled_job::ScheduledJob, sync_job::SyncJob,
    value_objects::credentials::Credentials,
};

use super::{
    commands::{CompletionSignal, JobOutcome},
    gate::ConcurrencyGate,
};

pub(crate) struct Worker {
    job: ScheduledJob,
    debounce: Duration,
    gate: ConcurrencyGate,
    body: Arc<dyn SyncJob>,
    credentials: Arc<Credentials>,
    completion: CompletionGuard,
}

impl Worker {
    pub(crate) fn new(
        job: ScheduledJob,
        debounce: Duration,
        gate: ConcurrencyGate,
        body: Arc<dyn SyncJob>,
        credentials: Arc<Credentials>,
        completion_tx: mpsc::UnboundedSender<CompletionSignal>,
    ) -> Self {
        let completion = CompletionGuard::new(job.tenant_id().clone(), completion_tx);
        Self {
            job,
            debounce,
            gate,
            body,
            credentials,
            completion,
        }
    }

    pub(crate) async fn run(self) {
        let Worker {
            job,
            debounce,
            gate,
            body,
            credentials,
            mut completion,
        } = self;
        let tenant_id = job.tenant_id().clone();

        if !debounce.is_zero() {
            debug!("{} debouncing for {:?}", tenant_id, debounce);
            sleep(debounce).await;
        }

        // Blocks here while the gate is saturated
        let permit = match gate.acquire().await {
            Ok(permit) => permit,
            Err(e) => {
                error!("{} could not enter the concurrency gate: {}", tenant_id, e);
                completion.set_outcome(JobOutcome::Failed(e.to_string()));
                return;
            }
        };
        info!(
            "{} sync started (job {}, {} of {} slots busy)",
            tenant_id,
            job.id(),
            gate.in_use(),
            gate.capacity()
        );

        let execution = tokio::spawn(async move { body.run(&job, &credentials).await });
        let outcome = match execution.await {
            Ok(Ok(())) => {
                info!("{} sync finished", tenant_id);
                JobOutcome::Succeeded
            }
            Ok(Err(e)) => {
                error!("{} sync failed: {}", tenant_id, e);
                JobOutcome::Failed(e.to_string())
            }
            Err(e) if e.is_panic() => {
                let message = panic_message(e.into_panic());
                error!("{} sync crashed: {}", tenant_id, message);
                JobOutcome::Crashed(message)
            }
            Err(e) => {
                error!("{} sync was aborted: {}", tenant_id, e);
                JobOutcome::Crashed(e.to_string())
            }
        };

        permit.release();
        completion.set_outcome(outcome);
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return message.to_string();
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }
    "job body panicked".to_string()
}

/// Sends the tenant's completion signal when dropped
struct CompletionGuard {
    tenant_id: TenantId,
    outcome: JobOutcome,
    tx: mpsc::UnboundedSender<CompletionSignal>,
}

impl CompletionGuard {
    fn new(tenant_id: TenantId, tx: mpsc::UnboundedSender<CompletionSignal>) -> Self {
        Self {
            tenant_id,
            outcome: JobOutcome::Crashed("worker stopped before reporting an outcome".to_string()),
            tx,
        }
    }

    fn set_outcome(&mut self, outcome: JobOutcome) {
        self.outcome = outcome;
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        let signal = CompletionSignal {
            tenant_id: self.tenant_id.clone(),
            outcome: mem::replace(&mut self.outcome, JobOutcome::Succeeded),
        };
        if self.tx.send(signal).is_err() {
            warn!(
                "{} finished after the scheduler stopped listening",
                self.tenant_id
            );
        }
    }
}
