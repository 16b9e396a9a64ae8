use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::retry::{BatchPolicy, RetryPolicy, fetch_in_batches, retry};
use super::{FetchOptions, SourceInfo, StorySource, exclude_removed};
use crate::config::{HackerNewsConfig, NetworkConfig};
use crate::internal::cache::Cache;
use crate::internal::clock::Clock;
use crate::internal::models::Story;

pub const HN_API_BASE_URL: &str = "https://hacker-news.firebaseio.com/v0/";
const HN_ITEM_PAGE: &str = "https://news.ycombinator.com/item?id=";

/// Raw item as returned by the Firebase API.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HnItem {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub by: Option<String>,
    #[serde(default)]
    pub score: Option<u32>,
    #[serde(default)]
    pub time: Option<i64>,
    #[serde(default)]
    pub descendants: Option<u32>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub dead: bool,
}

pub fn discussion_url(id: u64) -> String {
    format!("{HN_ITEM_PAGE}{id}")
}

/// Maps a raw item to a [`Story`]. Missing fields fall back to empty/zero values.
pub fn normalize(item: HnItem) -> Story {
    let metadata = serde_json::json!({
        "type": item.kind,
        "descendants": item.descendants,
        "time": item.time,
        "by": item.by,
    });

    Story {
        id: item.id.to_string(),
        title: item.title.unwrap_or_default(),
        url: item.url.filter(|u| !u.is_empty()),
        source: "hackernews".to_string(),
        score: item.score.unwrap_or(0),
        author: item.by.unwrap_or_default(),
        comments_url: Some(discussion_url(item.id)),
        comments_count: item.descendants.unwrap_or(0),
        date: item.time.unwrap_or(0),
        metadata,
    }
}

/// Top stories from the Hacker News Firebase API.
#[derive(Clone)]
pub struct HackerNewsSource {
    client: reqwest::Client,
    base_url: String,
    max_stories: usize,
    min_comments: u32,
    sample_data: Option<PathBuf>,
    retry: RetryPolicy,
    batch: BatchPolicy,
    item_cache: Cache<u64, HnItem>,
}

impl HackerNewsSource {
    pub fn new(
        client: reqwest::Client,
        config: &HackerNewsConfig,
        network: &NetworkConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            client,
            base_url: config.base_url.clone(),
            max_stories: config.max_stories,
            min_comments: config.min_comments,
            sample_data: config.sample_data.as_ref().map(PathBuf::from),
            retry: RetryPolicy::from_config(network),
            batch: BatchPolicy::from_config(network),
            item_cache: Cache::new(Duration::from_millis(config.item_cache_ttl_ms), clock),
        }
    }

    /// Points the source at another API root, e.g. a mock server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        self.base_url = base_url;
        self
    }

    async fn get_json<T>(&self, url: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("failed to send GET request to {url}"))?
            .error_for_status()
            .with_context(|| format!("unexpected status from {url}"))?;

        resp.json::<T>()
            .await
            .with_context(|| format!("failed to parse JSON response from {url}"))
    }

    pub async fn fetch_top_ids(&self) -> Result<Vec<u64>> {
        let url = format!("{}topstories.json", self.base_url);
        self.get_json(&url).await.context("failed to fetch top stories")
    }

    /// One item; `Ok(None)` when the API answers `null`.
    pub async fn fetch_item(&self, id: u64) -> Result<Option<HnItem>> {
        let url = format!("{}item/{}.json", self.base_url, id);
        self.get_json(&url).await
    }

    async fn fetch_item_with_retry(&self, id: u64, use_cache: bool) -> Option<HnItem> {
        if use_cache {
            if let Some(item) = self.item_cache.get(&id) {
                return Some(item);
            }
        }

        let label = format!("item {id}");
        match retry(&self.retry, &label, || self.fetch_item(id)).await {
            Ok(Some(item)) => {
                self.item_cache.set(id, item.clone());
                Some(item)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(id, "dropping item after retries: {e:#}");
                None
            }
        }
    }

    pub fn is_valid(&self, item: &HnItem) -> bool {
        !item.deleted && !item.dead && item.descendants.unwrap_or(0) >= self.min_comments
    }

    fn finish(&self, items: Vec<HnItem>, removed: &HashSet<String>) -> Vec<Story> {
        let stories = items
            .into_iter()
            .filter(|item| self.is_valid(item))
            .map(normalize)
            .collect();
        exclude_removed(stories, removed)
    }

    fn load_sample(&self, path: &Path) -> Vec<HnItem> {
        let parsed = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read sample data {}", path.display()))
            .and_then(|raw| {
                serde_json::from_str::<Vec<HnItem>>(&raw)
                    .with_context(|| format!("failed to parse sample data {}", path.display()))
            });
        match parsed {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!("{e:#}");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl StorySource for HackerNewsSource {
    fn info(&self) -> SourceInfo {
        SourceInfo {
            id: "hackernews".to_string(),
            name: "Hacker News".to_string(),
            supports_comments: true,
            supports_scores: true,
        }
    }

    async fn fetch_stories(
        &self,
        removed: &HashSet<String>,
        options: FetchOptions,
    ) -> Result<Vec<Story>> {
        self.item_cache.cleanup_expired();

        if let Some(path) = &self.sample_data {
            tracing::info!(path = %path.display(), "Using Hacker News sample data");
            let items = self.load_sample(path);
            return Ok(self.finish(items, removed));
        }

        let start = Instant::now();
        let mut ids = self.fetch_top_ids().await?;
        ids.truncate(self.max_stories);

        // skip the network for ids the user already removed
        let pending: Vec<u64> = ids
            .into_iter()
            .filter(|id| !removed.contains(&id.to_string()))
            .collect();

        let use_cache = !options.force_refresh;
        let results = fetch_in_batches(&pending, &self.batch, |id| {
            self.fetch_item_with_retry(id, use_cache)
        })
        .await;

        let fetched = results.len();
        let items: Vec<HnItem> = results.into_iter().flatten().collect();
        let stories = self.finish(items, removed);

        tracing::info!(
            requested = fetched,
            kept = stories.len(),
            elapsed = ?start.elapsed(),
            "Fetched Hacker News stories"
        );
        Ok(stories)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::internal::clock::ManualClock;

    fn item(id: u64, descendants: u32) -> HnItem {
        HnItem {
            id,
            title: Some(format!("Story {id}")),
            url: Some(format!("https://example.com/{id}")),
            by: Some("pg".to_string()),
            score: Some(10),
            time: Some(1_700_000_000),
            descendants: Some(descendants),
            kind: Some("story".to_string()),
            ..Default::default()
        }
    }

    fn source() -> HackerNewsSource {
        let config = AppConfig::default();
        HackerNewsSource::new(
            reqwest::Client::new(),
            &config.hackernews,
            &config.network,
            Arc::new(ManualClock::new(0)),
        )
    }

    #[test]
    fn test_normalize_maps_fields() {
        let story = normalize(item(42, 77));
        assert_eq!(story.id, "42");
        assert_eq!(story.source, "hackernews");
        assert_eq!(story.comments_count, 77);
        assert_eq!(story.author, "pg");
        assert_eq!(
            story.comments_url.as_deref(),
            Some("https://news.ycombinator.com/item?id=42")
        );
        assert_eq!(story.metadata["descendants"], 77);
        assert_eq!(story.metadata["type"], "story");
    }

    #[test]
    fn test_normalize_defaults_missing_fields() {
        let story = normalize(HnItem {
            id: 7,
            ..Default::default()
        });
        assert_eq!(story.score, 0);
        assert_eq!(story.comments_count, 0);
        assert_eq!(story.url, None);
        assert_eq!(story.title, "");
    }

    #[test]
    fn test_validity_filter() {
        let hn = source();
        assert!(hn.is_valid(&item(1, 50)));
        assert!(!hn.is_valid(&item(2, 49)));

        let mut dead = item(3, 500);
        dead.dead = true;
        assert!(!hn.is_valid(&dead));

        let mut deleted = item(4, 500);
        deleted.deleted = true;
        assert!(!hn.is_valid(&deleted));
    }

    #[test]
    fn test_item_json_parses_with_missing_fields() {
        let raw = r#"{"id": 9, "type": "job", "time": 1600000000}"#;
        let parsed: HnItem = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.id, 9);
        assert_eq!(parsed.kind.as_deref(), Some("job"));
        assert_eq!(parsed.descendants, None);
        assert!(!parsed.dead);
    }

    #[tokio::test]
    async fn test_each_fetch_evicts_stale_items() {
        let clock = Arc::new(ManualClock::new(0));
        let mut config = AppConfig::default();
        config.hackernews.sample_data = Some("/nonexistent/hn-sample.json".to_string());
        let hn = HackerNewsSource::new(
            reqwest::Client::new(),
            &config.hackernews,
            &config.network,
            clock.clone(),
        );

        hn.item_cache.set(1, item(1, 80));
        hn.item_cache.set(2, item(2, 90));
        clock.advance(Duration::from_millis(config.hackernews.item_cache_ttl_ms + 1));
        hn.item_cache.set(3, item(3, 100));
        assert_eq!(hn.item_cache.len(), 3);

        hn.fetch_stories(&HashSet::new(), FetchOptions::default())
            .await
            .unwrap();
        assert_eq!(hn.item_cache.len(), 1);
        assert!(hn.item_cache.get(&3).is_some());
    }

    #[test]
    fn test_with_base_url_appends_slash() {
        let hn = source().with_base_url("http://127.0.0.1:1234");
        assert_eq!(hn.base_url, "http://127.0.0.1:1234/");
    }
}
