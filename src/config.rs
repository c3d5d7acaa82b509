//! Startup configuration
//! Command line flags (with the access token taken from the environment) are
//! validated once into `AppConfig`, which is then handed down explicitly.

use std::path::PathBuf;

use clap::Parser;
use derivative::Derivative;
use getset::{Getters, Setters};
use tokio::time::Duration;
use url::Url;

use crate::domain::theme_sync::{
    custom_errors::ConfigError, value_objects::credentials::Credentials,
};

/// Keeps a local Git snapshot of every shop theme, refreshed on theme change events
#[derive(Derivative, Parser, Clone)]
#[derivative(Debug)]
#[command(name = "theme-sync", version, about, long_about = None)]
pub struct Cli {
    /// Websocket address of the change feed
    #[arg(long, default_value = "ws://127.0.0.1:6000")]
    pub feed: String,

    /// Only events published under this topic prefix are handled
    #[arg(long, default_value = "theme:")]
    pub topic: String,

    /// Root directory to create Git repositories in
    #[arg(long, default_value = "./")]
    pub dir: PathBuf,

    /// Quiet period after the first event of a burst before a shop is synchronized
    #[arg(long, default_value = "10s", value_parser = humantime::parse_duration)]
    pub interval: Duration,

    /// Bootic API URL
    #[arg(long = "api-url", default_value = "https://api.bootic.net/v1")]
    pub api_url: String,

    /// How many shops may be synchronized at the same time
    #[arg(short = 'c', default_value_t = 10)]
    pub concurrency: usize,

    /// Parallel asset downloads within one shop
    #[arg(long = "asset-concurrency", default_value_t = 4)]
    pub asset_concurrency: usize,

    /// Pause before reconnecting to the change feed
    #[arg(long = "reconnect-delay", default_value = "5s", value_parser = humantime::parse_duration)]
    pub reconnect_delay: Duration,

    /// Email recorded on snapshot commits
    #[arg(long = "commit-email", default_value = "themes@localhost")]
    pub commit_email: String,

    #[arg(long = "access-token", env = "BOOTIC_ACCESS_TOKEN", hide = true, default_value = "")]
    #[derivative(Debug = "ignore")]
    pub access_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Getters, Setters)]
#[getset(get = "pub", set = "pub")]
pub struct SchedulerConfig {
    debounce: Duration,
    max_concurrency: usize,
    output_root: PathBuf,
}

impl SchedulerConfig {
    pub fn new(debounce: Duration, max_concurrency: usize, output_root: PathBuf) -> Self {
        Self {
            debounce,
            max_concurrency,
            output_root,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Getters)]
#[getset(get = "pub")]
pub struct FeedConfig {
    url: Url,
    topic: String,
    reconnect_delay: Duration,
}

impl FeedConfig {
    pub fn new(url: Url, topic: String, reconnect_delay: Duration) -> Self {
        Self {
            url,
            topic,
            reconnect_delay,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Getters)]
#[getset(get = "pub")]
pub struct StoreConfig {
    asset_concurrency: usize,
    commit_email: String,
}

impl StoreConfig {
    pub fn new(asset_concurrency: usize, commit_email: impl Into<String>) -> Self {
        Self {
            asset_concurrency,
            commit_email: commit_email.into(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new(4, "themes@localhost")
    }
}

#[derive(Debug, Clone, Getters)]
#[getset(get = "pub")]
pub struct AppConfig {
    scheduler: SchedulerConfig,
    feed: FeedConfig,
    store: StoreConfig,
    credentials: Credentials,
}

impl TryFrom<Cli> for AppConfig {
    type Error = ConfigError;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        if cli.access_token.trim().is_empty() {
            return Err(ConfigError::MissingAccessToken);
        }
        if cli.concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency {
                flag: "c",
                value: cli.concurrency,
            });
        }
        if cli.asset_concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency {
                flag: "asset-concurrency",
                value: cli.asset_concurrency,
            });
        }
        let feed_url = Url::parse(&cli.feed)
            .map_err(|source| ConfigError::InvalidUrl { flag: "feed", source })?;
        let api_url = Url::parse(&cli.api_url)
            .map_err(|source| ConfigError::InvalidUrl { flag: "api-url", source })?;
        if api_url.cannot_be_a_base() {
            return Err(ConfigError::InvalidUrl {
                flag: "api-url",
                source: url::ParseError::RelativeUrlWithCannotBeABaseBase,
            });
        }

        Ok(Self {
            scheduler: SchedulerConfig::new(cli.interval, cli.concurrency, cli.dir),
            feed: FeedConfig::new(feed_url, cli.topic, cli.reconnect_delay),
            store: StoreConfig::new(cli.asset_concurrency, cli.commit_email),
            credentials: Credentials::new(api_url, cli.access_token),
        })
    }
}
