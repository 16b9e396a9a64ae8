use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use quick_xml::Reader;
use quick_xml::events::Event;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use super::retry::{RetryPolicy, retry};
use super::{FetchOptions, SourceInfo, StorySource, exclude_removed};
use crate::config::{FeedConfig, NetworkConfig};
use crate::internal::clock::Clock;
use crate::internal::feed_cache::FeedCache;
use crate::internal::models::Story;

#[derive(Debug, Default, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AtomEntry {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<AtomText>,
    #[serde(rename = "link", default)]
    pub links: Vec<AtomLink>,
    #[serde(default)]
    pub published: Option<String>,
    #[serde(default)]
    pub updated: Option<String>,
    /// Atom allows several authors per entry.
    #[serde(rename = "author", default)]
    pub authors: Vec<AtomPerson>,
    #[serde(default)]
    pub summary: Option<AtomText>,
    #[serde(default)]
    pub content: Option<AtomText>,
}

/// Text construct; the `type` attribute is ignored and the body kept as-is.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AtomText {
    #[serde(rename = "$text", default)]
    pub value: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AtomLink {
    #[serde(rename = "@href", default)]
    pub href: String,
    #[serde(rename = "@rel", default)]
    pub rel: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AtomPerson {
    #[serde(default)]
    pub name: Option<String>,
}

impl AtomEntry {
    /// The `alternate` link if present, else the first one with an href.
    pub fn link(&self) -> Option<&str> {
        let usable = |l: &&AtomLink| !l.href.trim().is_empty();
        self.links
            .iter()
            .filter(usable)
            .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
            .or_else(|| self.links.iter().find(usable))
            .map(|l| l.href.trim())
    }
}

/// Per-feed values used when an entry leaves a field out.
#[derive(Debug, Clone)]
pub struct EntryDefaults {
    pub source: String,
    pub id_prefix: String,
    pub author: String,
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn parse_timestamp(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|s| s.trim().parse::<jiff::Timestamp>().ok())
        .map(|ts| ts.as_second())
}

/// Maps an entry to a [`Story`]. `index` is the entry's position in the feed,
/// used for the id when the entry has neither an id nor a link.
pub fn normalize(entry: &AtomEntry, index: usize, defaults: &EntryDefaults) -> Story {
    let url = entry.link().map(str::to_string);
    let id = non_empty(entry.id.as_deref())
        .or_else(|| url.clone())
        .unwrap_or_else(|| format!("{}-{}", defaults.id_prefix, index));

    let date = parse_timestamp(entry.published.as_deref())
        .or_else(|| parse_timestamp(entry.updated.as_deref()))
        .unwrap_or(0);

    let summary = entry
        .summary
        .as_ref()
        .or(entry.content.as_ref())
        .map(|t| t.value.clone())
        .unwrap_or_default();

    Story {
        id,
        title: non_empty(entry.title.as_ref().map(|t| t.value.as_str()))
            .unwrap_or_else(|| "Untitled".to_string()),
        comments_url: url.clone(),
        url,
        source: defaults.source.clone(),
        score: 0,
        author: entry
            .authors
            .iter()
            .find_map(|a| non_empty(a.name.as_deref()))
            .unwrap_or_else(|| defaults.author.clone()),
        comments_count: 0,
        date,
        metadata: serde_json::json!({
            "summary": summary,
            "published": entry.published,
            "updated": entry.updated,
        }),
    }
}

/// The deserializer ignores the root's name, so an HTML error page or an RSS
/// document would otherwise read as an empty feed.
fn ensure_atom_root(xml: &str) -> Result<()> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event().context("malformed Atom feed")? {
            Event::Start(e) | Event::Empty(e) => {
                if e.local_name().as_ref() == b"feed" {
                    return Ok(());
                }
                bail!(
                    "not an Atom feed: root element is <{}>",
                    String::from_utf8_lossy(e.name().as_ref())
                );
            }
            Event::Eof => bail!("not an Atom feed: document is empty"),
            _ => {}
        }
    }
}

/// Parses an Atom document into stories. Fails if the document is unreadable
/// or its root is not `<feed>`.
pub fn parse_feed(xml: &str, defaults: &EntryDefaults) -> Result<Vec<Story>> {
    ensure_atom_root(xml)?;
    let feed: AtomFeed = quick_xml::de::from_str(xml).context("malformed Atom feed")?;
    Ok(feed
        .entries
        .iter()
        .enumerate()
        .map(|(i, entry)| normalize(entry, i, defaults))
        .collect())
}

/// A single Atom feed, cached on disk for `cache_ttl_ms`.
pub struct FeedSource {
    client: reqwest::Client,
    url: String,
    name: String,
    defaults: EntryDefaults,
    cache: FeedCache,
    retry: RetryPolicy,
    sample_data: Option<PathBuf>,
}

impl FeedSource {
    pub fn new(
        client: reqwest::Client,
        config: &FeedConfig,
        network: &NetworkConfig,
        cache_path: PathBuf,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            client,
            url: config.url.clone(),
            name: config.name.clone(),
            defaults: EntryDefaults {
                source: config.id.clone(),
                id_prefix: config.id_prefix.clone(),
                author: config.default_author.clone(),
            },
            cache: FeedCache::new(cache_path, Duration::from_millis(config.cache_ttl_ms), clock),
            retry: RetryPolicy::from_config(network),
            sample_data: config.sample_data.as_ref().map(PathBuf::from),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn cache(&self) -> &FeedCache {
        &self.cache
    }

    async fn fetch_xml(&self) -> Result<String> {
        self.client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("failed to send GET request to {}", self.url))?
            .error_for_status()
            .with_context(|| format!("unexpected status from {}", self.url))?
            .text()
            .await
            .with_context(|| format!("failed to read feed body from {}", self.url))
    }

    fn load_sample(path: &Path) -> Vec<Story> {
        let parsed = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read sample data {}", path.display()))
            .and_then(|raw| {
                serde_json::from_str::<Vec<Story>>(&raw)
                    .with_context(|| format!("failed to parse sample data {}", path.display()))
            });
        parsed.unwrap_or_else(|e| {
            tracing::warn!("{e:#}");
            Vec::new()
        })
    }
}

#[async_trait]
impl StorySource for FeedSource {
    fn info(&self) -> SourceInfo {
        SourceInfo {
            id: self.defaults.source.clone(),
            name: self.name.clone(),
            supports_comments: false,
            supports_scores: false,
        }
    }

    async fn fetch_stories(
        &self,
        removed: &HashSet<String>,
        options: FetchOptions,
    ) -> Result<Vec<Story>> {
        if let Some(path) = &self.sample_data {
            tracing::info!(path = %path.display(), "Using feed sample data");
            return Ok(exclude_removed(Self::load_sample(path), removed));
        }

        if !options.force_refresh {
            match self.cache.read_fresh() {
                Ok(Some(stories)) => {
                    tracing::debug!(feed = %self.defaults.source, "Serving feed from cache");
                    return Ok(exclude_removed(stories, removed));
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(feed = %self.defaults.source, "Ignoring feed cache: {e:#}"),
            }
        }

        let xml = retry(&self.retry, &self.url, || self.fetch_xml()).await?;
        let stories = parse_feed(&xml, &self.defaults)?;

        if let Err(e) = self.cache.write(&stories) {
            tracing::warn!(feed = %self.defaults.source, "Failed to write feed cache: {e:#}");
        }
        tracing::info!(feed = %self.defaults.source, count = stories.len(), "Fetched feed");

        Ok(exclude_removed(stories, removed))
    }
}
