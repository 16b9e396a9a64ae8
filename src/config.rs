use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use crate::api::hackernews::HN_API_BASE_URL;
use crate::internal::ui::app::Action;

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    pub session: SessionConfig,
    pub network: NetworkConfig,
    pub hackernews: HackerNewsConfig,
    pub feed: FeedConfig,
    pub logging: LogConfig,
    /// Overrides where removal files and the feed cache live.
    pub data_dir: Option<String>,
    /// JSON theme file with `light`/`dark` variants.
    pub theme_file: Option<String>,
    /// Which variant of `theme_file` to use ("dark" or "light").
    pub theme_mode: String,
    pub keybindings: KeyBindingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            network: NetworkConfig::default(),
            hackernews: HackerNewsConfig::default(),
            feed: FeedConfig::default(),
            logging: LogConfig::default(),
            data_dir: None,
            theme_file: None,
            theme_mode: "dark".to_string(),
            keybindings: KeyBindingConfig::default(),
        }
    }
}

/// How a selected story's actions are presented.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanelStyle {
    #[default]
    Drawer,
    Modal,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SessionConfig {
    /// Rows visible in the story list.
    pub page_size: usize,
    /// Window for the second key of the jump-to-top chord.
    pub chord_timeout_ms: u64,
    pub panel_style: PanelStyle,
    pub notification_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            page_size: 15,
            chord_timeout_ms: 500,
            panel_style: PanelStyle::Drawer,
            notification_ms: 3000,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct NetworkConfig {
    pub batch_size: usize,
    pub batch_delay_ms: u64,
    /// Attempts per item before it is dropped.
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    pub request_timeout_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            batch_size: 25,
            batch_delay_ms: 50,
            max_retries: 3,
            backoff_base_ms: 100,
            request_timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct HackerNewsConfig {
    pub enabled: bool,
    pub max_stories: usize,
    /// Stories with fewer comments are dropped.
    pub min_comments: u32,
    pub item_cache_ttl_ms: u64,
    pub base_url: String,
    /// JSON array of raw items read instead of the API.
    pub sample_data: Option<String>,
}

impl Default for HackerNewsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_stories: 100,
            min_comments: 50,
            item_cache_ttl_ms: 300_000,
            base_url: HN_API_BASE_URL.to_string(),
            sample_data: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct FeedConfig {
    pub enabled: bool,
    pub id: String,
    pub name: String,
    pub url: String,
    pub cache_ttl_ms: u64,
    pub default_author: String,
    /// Prefix for generated ids of entries with neither an id nor a link.
    pub id_prefix: String,
    /// JSON array of stories read instead of the feed.
    pub sample_data: Option<String>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            id: "simonwillison".to_string(),
            name: "Simon Willison".to_string(),
            url: "https://simonwillison.net/atom/everything/".to_string(),
            cache_ttl_ms: 3_600_000,
            default_author: "Simon Willison".to_string(),
            id_prefix: "sw".to_string(),
            sample_data: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    /// Per-module overrides, e.g. `"tui_story_deck::api": "debug"`.
    pub module_levels: HashMap<String, String>,
    pub log_directory: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            module_levels: HashMap::new(),
            log_directory: None,
        }
    }
}

impl LogConfig {
    /// Filter directive string for `EnvFilter`, e.g. `info,tui_story_deck::api=debug`.
    pub fn filter_directive(&self) -> String {
        let mut modules: Vec<_> = self.module_levels.iter().collect();
        modules.sort();
        std::iter::once(self.level.clone())
            .chain(modules.into_iter().map(|(m, l)| format!("{m}={l}")))
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn directory(&self) -> PathBuf {
        match &self.log_directory {
            Some(dir) => PathBuf::from(dir),
            None => PathBuf::from("logs"),
        }
    }
}

/// Key string to action overrides, one map per context.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct KeyBindingConfig {
    pub global: HashMap<String, Action>,
    pub navigation: HashMap<String, Action>,
    pub panel: HashMap<String, Action>,
    pub help: HashMap<String, Action>,
}

impl AppConfig {
    pub fn load() -> Self {
        // Look for config.ron in current directory or next to executable
        let mut candidates = vec![PathBuf::from("config.ron")];

        if let Ok(exe) = std::env::current_exe()
            && let Some(dir) = exe.parent()
        {
            candidates.push(dir.join("config.ron"));
        }

        for path in candidates {
            if path.exists()
                && let Ok(content) = fs::read_to_string(&path)
            {
                match Self::parse(&content) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        tracing::error!("Failed to parse config at {}: {}", path.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Self::default()
    }

    pub fn parse(content: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(content)
    }

    pub fn data_dir(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(PathBuf::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_constants() {
        let config = AppConfig::default();
        assert_eq!(config.session.page_size, 15);
        assert_eq!(config.session.chord_timeout_ms, 500);
        assert_eq!(config.session.panel_style, PanelStyle::Drawer);
        assert_eq!(config.network.batch_size, 25);
        assert_eq!(config.network.max_retries, 3);
        assert_eq!(config.network.backoff_base_ms, 100);
        assert_eq!(config.feed.cache_ttl_ms, 3_600_000);
        assert_eq!(config.hackernews.min_comments, 50);
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = AppConfig::parse(
            r#"(
    // smaller window
    session: (page_size: 10, panel_style: Modal),
    hackernews: (min_comments: 5),
    keybindings: (navigation: {"x": RemoveStory}),
)"#,
        )
        .unwrap();

        assert_eq!(config.session.page_size, 10);
        assert_eq!(config.session.panel_style, PanelStyle::Modal);
        assert_eq!(config.session.chord_timeout_ms, 500);
        assert_eq!(config.hackernews.min_comments, 5);
        assert_eq!(config.hackernews.max_stories, 100);
        assert!(config.feed.enabled);
        assert_eq!(
            config.keybindings.navigation.get("x"),
            Some(&Action::RemoveStory)
        );
    }

    #[test]
    fn test_filter_directive_includes_module_levels() {
        let mut logging = LogConfig::default();
        logging
            .module_levels
            .insert("tui_story_deck::api".to_string(), "debug".to_string());
        assert_eq!(logging.filter_directive(), "info,tui_story_deck::api=debug");
    }
}
