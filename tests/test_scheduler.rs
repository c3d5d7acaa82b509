use std::{
    collections::{HashMap, HashSet},
    path::PathBuf,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use fake::{faker::name::en::Name, Fake};
use tokio::time::{sleep, Duration};
use url::Url;

use theme_sync_tool::{
    config::SchedulerConfig,
    domain::{
        theme_sync::{custom_errors::SyncError, value_objects::credentials::Credentials},
        ChangeEvent, ScheduledJob, SyncJob, TenantId,
    },
};

/// Job body that records how it was called instead of touching the network
#[derive(Debug, Default)]
pub struct RecordingJob {
    delay: Duration,
    failing: HashSet<String>,
    panicking: HashSet<String>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: Mutex<HashMap<String, usize>>,
    tenant_in_flight: Mutex<HashMap<String, usize>>,
    tenant_overlap: AtomicUsize,
}

impl RecordingJob {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Default::default()
        }
    }

    pub fn failing_for(mut self, tenant: &str) -> Self {
        self.failing.insert(tenant.to_string());
        self
    }

    pub fn panicking_for(mut self, tenant: &str) -> Self {
        self.panicking.insert(tenant.to_string());
        self
    }

    pub fn calls_for(&self, tenant: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(tenant)
            .copied()
            .unwrap_or_default()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Times a job body started while another one for the same tenant was still running
    pub fn tenant_overlap(&self) -> usize {
        self.tenant_overlap.load(Ordering::SeqCst)
    }

    fn enter(&self, tenant: &str) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        *self
            .calls
            .lock()
            .unwrap()
            .entry(tenant.to_string())
            .or_default() += 1;

        let mut per_tenant = self.tenant_in_flight.lock().unwrap();
        let running = per_tenant.entry(tenant.to_string()).or_default();
        if *running > 0 {
            self.tenant_overlap.fetch_add(1, Ordering::SeqCst);
        }
        *running += 1;
    }

    fn leave(&self, tenant: &str) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if let Some(running) = self.tenant_in_flight.lock().unwrap().get_mut(tenant) {
            *running -= 1;
        }
    }
}

#[async_trait]
impl SyncJob for RecordingJob {
    async fn run(&self, job: &ScheduledJob, _credentials: &Credentials) -> Result<(), SyncError> {
        let tenant = job.tenant_id().as_str().to_string();
        self.enter(&tenant);
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
        self.leave(&tenant);

        if self.panicking.contains(&tenant) {
            panic!("theme for {} could not be rendered", tenant);
        }
        if self.failing.contains(&tenant) {
            return Err(SyncError::UnexpectedStatus(500));
        }
        Ok(())
    }
}

pub fn scheduler_config(debounce: Duration, max_concurrency: usize) -> SchedulerConfig {
    SchedulerConfig::new(debounce, max_concurrency, PathBuf::from("/tmp/theme-sync-tests"))
}

pub fn credentials() -> Arc<Credentials> {
    Arc::new(Credentials::new(
        Url::parse("http://127.0.0.1:1/v1").unwrap(),
        "test-token",
    ))
}

pub fn change_event(tenant: &str) -> ChangeEvent {
    let actor: String = Name().fake();
    let shop_id = (1..10_000u32).fake::<u32>().to_string();
    ChangeEvent::new(TenantId::new(tenant), actor, shop_id, "web-1")
}

#[cfg(test)]
mod integration_tests {
    use log::info;
    use rand::seq::SliceRandom;
    use tokio::{
        sync::mpsc,
        time::{advance, timeout},
    };

    use theme_sync_tool::infrastructure::{
        commands::{JobOutcome, SchedulerNotice},
        init_scheduler, SchedulerHandle,
    };

    use super::*;

    const WAIT: Duration = Duration::from_secs(10);

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    async fn expect_notice(handle: &mut SchedulerHandle) -> SchedulerNotice {
        timeout(WAIT, handle.next_notice())
            .await
            .expect("timed out waiting for a scheduler notice")
            .expect("scheduler notices closed")
    }

    async fn expect_unregistered(handle: &mut SchedulerHandle, tenant: &str) -> JobOutcome {
        let tenant_id = TenantId::new(tenant);
        let notice = timeout(
            WAIT,
            handle.wait_for(|n| {
                matches!(n, SchedulerNotice::Unregistered { .. }) && n.tenant_id() == Some(&tenant_id)
            }),
        )
        .await
        .expect("timed out waiting for the job to finish")
        .expect("scheduler notices closed");

        match notice {
            SchedulerNotice::Unregistered { outcome, .. } => outcome,
            other => panic!("unexpected notice {:?}", other),
        }
    }

    /// Reads notices until the scheduler reports it is drained
    async fn collect_until_drained(handle: &mut SchedulerHandle) -> Vec<SchedulerNotice> {
        let mut seen = Vec::new();
        loop {
            let notice = expect_notice(handle).await;
            if notice == SchedulerNotice::Drained {
                return seen;
            }
            seen.push(notice);
        }
    }

    #[tokio::test]
    async fn one_job_in_flight_per_tenant() {
        init_logger();
        let job = Arc::new(RecordingJob::with_delay(Duration::from_millis(80)));
        let (tx, rx) = mpsc::channel::<ChangeEvent>(64);
        let mut handle = init_scheduler(
            &scheduler_config(Duration::ZERO, 4),
            rx,
            job.clone(),
            credentials(),
        )
        .unwrap();

        tx.send(change_event("acme")).await.unwrap();
        assert_eq!(
            expect_notice(&mut handle).await,
            SchedulerNotice::Registered { tenant_id: TenantId::new("acme") }
        );

        // the job is now sleeping inside its body
        for _ in 0..5 {
            sleep(Duration::from_millis(5)).await;
            tx.send(change_event("acme")).await.unwrap();
            assert_eq!(
                expect_notice(&mut handle).await,
                SchedulerNotice::Coalesced { tenant_id: TenantId::new("acme") }
            );
        }

        assert_eq!(expect_unregistered(&mut handle, "acme").await, JobOutcome::Succeeded);
        assert_eq!(job.calls_for("acme"), 1);
        assert_eq!(job.tenant_overlap(), 0);

        drop(tx);
        assert!(collect_until_drained(&mut handle).await.is_empty());
        handle.join().await.unwrap();
    }

    #[tokio::test]
    async fn completed_tenant_is_scheduled_again() {
        init_logger();
        let job = Arc::new(RecordingJob::with_delay(Duration::from_millis(10)));
        let (tx, rx) = mpsc::channel::<ChangeEvent>(16);
        let mut handle = init_scheduler(
            &scheduler_config(Duration::from_millis(10), 2),
            rx,
            job.clone(),
            credentials(),
        )
        .unwrap();

        for round in 1..=3 {
            tx.send(change_event("acme")).await.unwrap();
            assert_eq!(
                expect_notice(&mut handle).await,
                SchedulerNotice::Registered { tenant_id: TenantId::new("acme") }
            );
            assert_eq!(expect_unregistered(&mut handle, "acme").await, JobOutcome::Succeeded);
            assert_eq!(job.calls_for("acme"), round);
        }
    }

    #[tokio::test]
    async fn failed_job_does_not_block_the_tenant() {
        init_logger();
        let job = Arc::new(RecordingJob::default().failing_for("acme"));
        let (tx, rx) = mpsc::channel::<ChangeEvent>(16);
        let mut handle = init_scheduler(
            &scheduler_config(Duration::ZERO, 1),
            rx,
            job.clone(),
            credentials(),
        )
        .unwrap();

        tx.send(change_event("acme")).await.unwrap();
        let outcome = expect_unregistered(&mut handle, "acme").await;
        assert!(matches!(outcome, JobOutcome::Failed(_)), "{:?}", outcome);

        tx.send(change_event("acme")).await.unwrap();
        assert_eq!(
            expect_notice(&mut handle).await,
            SchedulerNotice::Registered { tenant_id: TenantId::new("acme") }
        );
        expect_unregistered(&mut handle, "acme").await;
        assert_eq!(job.calls_for("acme"), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn gate_caps_running_jobs() {
        init_logger();
        let job = Arc::new(RecordingJob::with_delay(Duration::from_millis(150)));
        let (tx, rx) = mpsc::channel::<ChangeEvent>(16);
        let mut handle = init_scheduler(
            &scheduler_config(Duration::ZERO, 2),
            rx,
            job.clone(),
            credentials(),
        )
        .unwrap();

        for tenant in ["acme", "globex", "initech"] {
            tx.send(change_event(tenant)).await.unwrap();
        }
        drop(tx);

        let seen = collect_until_drained(&mut handle).await;
        let registered = seen
            .iter()
            .filter(|n| matches!(n, SchedulerNotice::Registered { .. }))
            .count();
        let succeeded = seen
            .iter()
            .filter(|n| {
                matches!(
                    n,
                    SchedulerNotice::Unregistered { outcome: JobOutcome::Succeeded, .. }
                )
            })
            .count();

        assert_eq!(registered, 3);
        assert_eq!(succeeded, 3);
        assert_eq!(job.max_in_flight(), 2);
        assert_eq!(job.total_calls(), 3);

        timeout(WAIT, handle.join()).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn crashed_job_is_contained() {
        init_logger();
        let job = Arc::new(
            RecordingJob::with_delay(Duration::from_millis(20)).panicking_for("broken"),
        );
        let (tx, rx) = mpsc::channel::<ChangeEvent>(16);
        let mut handle = init_scheduler(
            &scheduler_config(Duration::ZERO, 2),
            rx,
            job.clone(),
            credentials(),
        )
        .unwrap();

        tx.send(change_event("broken")).await.unwrap();
        tx.send(change_event("healthy")).await.unwrap();

        let crashed = expect_unregistered(&mut handle, "broken").await;
        match crashed {
            JobOutcome::Crashed(message) => assert!(message.contains("could not be rendered")),
            other => panic!("expected a crash, got {:?}", other),
        }

        // the scheduler is still alive and the tenant can be scheduled again
        tx.send(change_event("broken")).await.unwrap();
        let registered = timeout(
            WAIT,
            handle.wait_for(|n| matches!(n, SchedulerNotice::Registered { .. })),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(registered.tenant_id(), Some(&TenantId::new("broken")));

        drop(tx);
        let rest = collect_until_drained(&mut handle).await;
        info!("after crash: {:?}", rest);
        assert_eq!(job.calls_for("broken"), 2);
        assert_eq!(job.calls_for("healthy"), 1);
        timeout(WAIT, handle.join()).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn interleaved_tenants_are_scheduled_independently() {
        init_logger();
        let tenants = ["acme", "globex", "initech", "umbrella"];
        let mut events: Vec<&str> = tenants.iter().flat_map(|t| [*t; 3]).collect();
        events.shuffle(&mut rand::thread_rng());
        info!("event order: {:?}", events);

        let job = Arc::new(RecordingJob::with_delay(Duration::from_millis(10)));
        let (tx, rx) = mpsc::channel::<ChangeEvent>(64);
        let mut handle = init_scheduler(
            &scheduler_config(Duration::from_millis(300), 4),
            rx,
            job.clone(),
            credentials(),
        )
        .unwrap();

        for tenant in &events {
            tx.send(change_event(tenant)).await.unwrap();
        }
        drop(tx);

        let seen = collect_until_drained(&mut handle).await;
        let mut registered: HashMap<String, usize> = HashMap::new();
        let mut coalesced = 0;
        for notice in &seen {
            match notice {
                SchedulerNotice::Registered { tenant_id } => {
                    *registered.entry(tenant_id.to_string()).or_default() += 1
                }
                SchedulerNotice::Coalesced { .. } => coalesced += 1,
                _ => {}
            }
        }

        for tenant in tenants {
            assert_eq!(registered.get(tenant), Some(&1), "{}", tenant);
            assert_eq!(job.calls_for(tenant), 1, "{}", tenant);
        }
        assert_eq!(coalesced, events.len() - tenants.len());
        assert_eq!(job.tenant_overlap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn burst_within_debounce_window_runs_once() {
        init_logger();
        let job = Arc::new(RecordingJob::default());
        let (tx, rx) = mpsc::channel::<ChangeEvent>(16);
        let mut handle = init_scheduler(
            &scheduler_config(Duration::from_millis(50), 4),
            rx,
            job.clone(),
            credentials(),
        )
        .unwrap();

        for i in 0..5 {
            if i > 0 {
                advance(Duration::from_micros(200)).await;
            }
            tx.send(change_event("acme")).await.unwrap();
        }

        assert_eq!(
            expect_notice(&mut handle).await,
            SchedulerNotice::Registered { tenant_id: TenantId::new("acme") }
        );
        for _ in 0..4 {
            assert_eq!(
                expect_notice(&mut handle).await,
                SchedulerNotice::Coalesced { tenant_id: TenantId::new("acme") }
            );
        }
        // still inside the debounce window
        assert_eq!(job.total_calls(), 0);

        assert_eq!(expect_unregistered(&mut handle, "acme").await, JobOutcome::Succeeded);
        assert_eq!(job.calls_for("acme"), 1);

        drop(tx);
        assert!(collect_until_drained(&mut handle).await.is_empty());
    }
}
