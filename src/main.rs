use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use log::{info, warn};
use tokio::sync::mpsc;

use theme_sync_tool::{
    config::{AppConfig, Cli},
    domain::theme_sync::change_event::ChangeEvent,
    infrastructure::{
        init_scheduler, mq::websocket_feed::spawn_websocket_feed,
        theme_sync_job::ThemeSyncJob,
    },
};

const INTAKE_CHANNEL_SIZE: usize = 100;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let config = AppConfig::try_from(Cli::parse()).context("invalid configuration")?;

    let http_client = reqwest::Client::builder()
        .user_agent(concat!("theme-sync/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("could not build the HTTP client")?;
    let body = Arc::new(ThemeSyncJob::new(http_client, config.store()));

    let (events_tx, events_rx) = mpsc::channel::<ChangeEvent>(INTAKE_CHANNEL_SIZE);
    let feed = spawn_websocket_feed(config.feed().clone(), events_tx);
    let scheduler = init_scheduler(
        config.scheduler(),
        events_rx,
        body,
        Arc::new(config.credentials().clone()),
    )
    .context("could not start the scheduler")?;

    info!(
        "Change feed {} topic '{}'",
        config.feed().url(),
        config.feed().topic()
    );
    info!(
        "Git repos will be created in {}. Write concurrency of {}",
        config.scheduler().output_root().display(),
        config.scheduler().max_concurrency()
    );
    info!("Using Bootic API on {}", config.credentials().api_url());

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, shutting down.");
        }
        joined = scheduler.join() => {
            warn!("Scheduler stopped unexpectedly: {:?}", joined);
        }
    }
    feed.abort();
    Ok(())
}
