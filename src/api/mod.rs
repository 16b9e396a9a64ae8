//! Content sources.
//!
//! Each source implements [`StorySource`]: it fetches raw records, drops
//! invalid and previously removed items, and normalizes the rest into
//! [`Story`] values. Tabs hold sources as trait objects.

pub mod feed;
pub mod hackernews;
pub mod retry;

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{AppConfig, NetworkConfig};
use crate::internal::clock::Clock;
use crate::internal::models::Story;

pub use feed::FeedSource;
pub use hackernews::HackerNewsSource;

/// Static description of a source, used to drive display and sort options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInfo {
    pub id: String,
    pub name: String,
    pub supports_comments: bool,
    pub supports_scores: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Skip any local cache and fetch live.
    pub force_refresh: bool,
}

#[async_trait]
pub trait StorySource: Send + Sync {
    fn info(&self) -> SourceInfo;

    /// Fetches the current stories, excluding every id in `removed`.
    ///
    /// Individual item failures are absorbed; an error means nothing usable
    /// could be produced (listing request failed, feed unparseable).
    async fn fetch_stories(
        &self,
        removed: &HashSet<String>,
        options: FetchOptions,
    ) -> Result<Vec<Story>>;
}

/// Shared HTTP client honoring the configured request timeout.
pub fn http_client(network: &NetworkConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_millis(network.request_timeout_ms))
        .user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ))
        .build()
        .context("failed to build HTTP client")
}

/// Directory for on-disk caches: `data_dir` if configured, else the OS cache dir.
pub fn cache_dir(config: &AppConfig) -> PathBuf {
    match &config.data_dir {
        Some(dir) => PathBuf::from(dir).join("cache"),
        None => dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("tui-story-deck"),
    }
}

/// Builds one source per enabled section of the configuration, in tab order.
pub fn build_sources(config: &AppConfig, clock: Arc<dyn Clock>) -> Result<Vec<Arc<dyn StorySource>>> {
    let client = http_client(&config.network)?;
    let mut sources: Vec<Arc<dyn StorySource>> = Vec::new();

    if config.hackernews.enabled {
        sources.push(Arc::new(HackerNewsSource::new(
            client.clone(),
            &config.hackernews,
            &config.network,
            clock.clone(),
        )));
    }

    if config.feed.enabled {
        let cache_path = cache_dir(config).join(format!("feed-{}.json", config.feed.id));
        sources.push(Arc::new(FeedSource::new(
            client,
            &config.feed,
            &config.network,
            cache_path,
            clock,
        )));
    }

    tracing::info!(count = sources.len(), "Configured story sources");
    Ok(sources)
}

/// Drops stories whose id is in `removed`.
pub(crate) fn exclude_removed(stories: Vec<Story>, removed: &HashSet<String>) -> Vec<Story> {
    stories
        .into_iter()
        .filter(|s| !removed.contains(&s.id))
        .collect()
}
