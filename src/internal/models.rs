use serde::{Deserialize, Serialize};

/// A normalized content item produced by a source's normalizer.
///
/// Stories are never mutated once produced; the session only reorders,
/// filters, and drops them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    /// Stable identifier, unique within its source. Used as the removal key.
    pub id: String,
    pub title: String,
    pub url: Option<String>,
    /// Tag of the source that produced this story (e.g. "hackernews").
    pub source: String,
    pub score: u32,
    pub author: String,
    pub comments_url: Option<String>,
    pub comments_count: u32,
    /// Publication time in Unix-epoch seconds.
    pub date: i64,
    /// Source-specific data. Not interpreted by the session.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchState {
    #[default]
    Idle,
    Loading,
    Loaded,
    Failed,
}
