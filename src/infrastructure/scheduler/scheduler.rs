//! Scheduler Implementation
//!
//! Single control loop deciding whether a change event starts a job.
//! It is the only owner of the job registry; workers talk back to it exclusively
//! through the completion channel.

use std::{path::PathBuf, sync::Arc};

use getset::Getters;
use log::{debug, error, info};
use tokio::{
    select,
    sync::{broadcast, mpsc},
    time::Duration,
};

use crate::{
    config::SchedulerConfig,
    domain::theme_sync::{
        change_event::ChangeEvent, custom_errors::GateError, scheduled_job::ScheduledJob,
        sync_job::SyncJob, value_objects::credentials::Credentials,
    },
    infrastructure::mq::event_source::EventSource,
};

use super::{
    commands::{CompletionSignal, SchedulerNotice},
    gate::ConcurrencyGate,
    registry::JobRegistry,
    worker::Worker,
};

#[derive(Getters)]
#[getset(get = "pub")]
pub struct Scheduler<E: EventSource> {
    #[getset(skip)]
    events: E,
    #[getset(skip)]
    body: Arc<dyn SyncJob>,
    credentials: Arc<Credentials>,
    gate: ConcurrencyGate,
    registry: JobRegistry,
    #[getset(skip)]
    completion_tx: mpsc::UnboundedSender<CompletionSignal>,
    #[getset(skip)]
    completion_rx: mpsc::UnboundedReceiver<CompletionSignal>,
    #[getset(skip)]
    notice_tx: broadcast::Sender<SchedulerNotice>,
    debounce: Duration,
    output_root: PathBuf,
}

impl<E: EventSource> Scheduler<E> {
    pub fn new(
        config: &SchedulerConfig,
        events: E,
        body: Arc<dyn SyncJob>,
        credentials: Arc<Credentials>,
    ) -> Result<(Self, broadcast::Receiver<SchedulerNotice>), GateError> {
        let gate = ConcurrencyGate::new(*config.max_concurrency())?;
        let (completion_tx, completion_rx) = mpsc::unbounded_channel::<CompletionSignal>();
        let (notice_tx, notice_rx) = broadcast::channel::<SchedulerNotice>(1024);

        let scheduler = Self {
            events,
            body,
            credentials,
            gate,
            registry: JobRegistry::new(),
            completion_tx,
            completion_rx,
            notice_tx,
            debounce: *config.debounce(),
            output_root: config.output_root().clone(),
        };

        Ok((scheduler, notice_rx))
    }

    /// Runs until the event intake closes and every in-flight job has reported back
    pub async fn run(mut self) {
        info!(
            "Scheduler running: debounce {:?}, concurrency {}",
            self.debounce,
            self.gate.capacity()
        );
        let mut intake_open = true;

        loop {
            select! {
                // Completions first so a tenant is re-armed before its next queued event is looked at
                biased;

                Some(signal) = self.completion_rx.recv() => {
                    self.handle_completion(signal);
                },
                event = self.events.next(), if intake_open => {
                    match event {
                        Some(event) => self.handle_event(event),
                        None => {
                            info!(
                                "Event intake closed, waiting for {} in-flight job(s)",
                                self.registry.len()
                            );
                            intake_open = false;
                        }
                    }
                },
                else => break,
            }

            if !intake_open && self.registry.is_empty() {
                break;
            }
        }

        self.notify(SchedulerNotice::Drained);
        info!("Scheduler is down.");
    }

    fn handle_event(&mut self, event: ChangeEvent) {
        let tenant_id = event.tenant_id().clone();
        info!(
            "event: {} {} {} {}",
            tenant_id,
            event.actor_name(),
            event.resource_id(),
            event.origin_host()
        );

        if self.registry.contains(&tenant_id) {
            debug!("{} already scheduled, coalescing event", tenant_id);
            self.notify(SchedulerNotice::Coalesced { tenant_id });
            return;
        }

        let job = ScheduledJob::from_event(&event, &self.output_root);
        let worker = Worker::new(
            job.clone(),
            self.debounce,
            self.gate.clone(),
            Arc::clone(&self.body),
            Arc::clone(&self.credentials),
            self.completion_tx.clone(),
        );
        self.registry.insert(job);
        info!("register: {}", tenant_id);
        tokio::spawn(worker.run());
        self.notify(SchedulerNotice::Registered { tenant_id });
    }

    fn handle_completion(&mut self, signal: CompletionSignal) {
        let CompletionSignal { tenant_id, outcome } = signal;
        match self.registry.remove(&tenant_id) {
            Some(job) => info!(
                "unregister: {} ({}, scheduled at {})",
                tenant_id,
                outcome,
                job.created_at()
            ),
            None => error!("unregister: {} was not registered", tenant_id),
        }
        self.notify(SchedulerNotice::Unregistered { tenant_id, outcome });
    }

    fn notify(&self, notice: SchedulerNotice) {
        // nobody listening is fine
        let _ = self.notice_tx.send(notice);
    }
}
