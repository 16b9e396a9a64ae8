use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use super::clock::Clock;
use super::models::Story;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheEnvelope {
    fetched_at: i64,
    stories: Vec<Story>,
}

/// On-disk, time-boxed copy of a source's normalized stories.
///
/// Any read or write problem is reported as an error for the caller to log;
/// callers fall back to a live fetch.
pub struct FeedCache {
    path: PathBuf,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl FeedCache {
    pub fn new(path: impl Into<PathBuf>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            path: path.into(),
            ttl,
            clock,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the cached stories if the cache exists and is younger than the TTL.
    pub fn read_fresh(&self) -> Result<Option<Vec<Story>>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read cache {}", self.path.display()))?;
        let envelope: CacheEnvelope = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse cache {}", self.path.display()))?;

        let age = self.clock.unix_now().saturating_sub(envelope.fetched_at);
        match age >= 0 && Duration::from_secs(age as u64) < self.ttl {
            true => Ok(Some(envelope.stories)),
            false => {
                tracing::debug!(age, path = %self.path.display(), "cache stale");
                Ok(None)
            }
        }
    }

    pub fn write(&self, stories: &[Story]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        let envelope = CacheEnvelope {
            fetched_at: self.clock.unix_now(),
            stories: stories.to_vec(),
        };
        let content = serde_json::to_string_pretty(&envelope).context("Failed to serialize cache")?;
        fs::write(&self.path, content)
            .with_context(|| format!("Failed to write cache {}", self.path.display()))?;
        Ok(())
    }
}
