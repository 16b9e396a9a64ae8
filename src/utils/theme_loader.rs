use anyhow::{Context, Result};
use ratatui::style::Color;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct ThemeFile {
    pub name: String,
    pub themes: Vec<ThemeVariant>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ThemeVariant {
    pub name: String,
    pub mode: String, // "light" or "dark"
    pub colors: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TuiTheme {
    pub background: Color,
    pub foreground: Color,
    pub selection_bg: Color,
    pub selection_fg: Color,
    pub border: Color,
    pub accent: Color,
    pub score: Color,
    pub comments: Color,
    pub muted: Color,
    pub error: Color,
}

impl Default for TuiTheme {
    fn default() -> Self {
        Self {
            background: Color::Reset,
            foreground: Color::Reset,
            selection_bg: Color::Blue,
            selection_fg: Color::White,
            border: Color::Gray,
            accent: Color::Cyan,
            score: Color::Yellow,
            comments: Color::Green,
            muted: Color::DarkGray,
            error: Color::Red,
        }
    }
}

impl ThemeVariant {
    /// First of `keys` present in the palette, parsed; `fallback` otherwise.
    fn color(&self, keys: &[&str], fallback: Color) -> Color {
        keys.iter()
            .find_map(|k| self.colors.get(*k))
            .map(|hex| parse_color(hex))
            .unwrap_or(fallback)
    }
}

#[tracing::instrument(skip(path, mode), fields(path = ?path, mode = %mode))]
pub fn load_theme(path: &Path, mode: &str) -> Result<TuiTheme> {
    let start = std::time::Instant::now();
    let content = fs::read_to_string(path).context("Failed to read theme file")?;
    let theme_file: ThemeFile =
        serde_json::from_str(&content).context("Failed to parse theme JSON")?;

    let variant = theme_file
        .themes
        .iter()
        .find(|t| t.mode == mode)
        .or_else(|| theme_file.themes.first())
        .context("No matching theme variant found")?;

    let defaults = TuiTheme::default();
    let theme = TuiTheme {
        background: variant.color(&["background"], defaults.background),
        foreground: variant.color(&["foreground"], defaults.foreground),
        selection_bg: variant.color(
            &[
                "selection.background",
                "list.active.background",
                "primary.background",
            ],
            defaults.selection_bg,
        ),
        selection_fg: variant.color(
            &["accent.foreground", "foreground"],
            defaults.selection_fg,
        ),
        border: variant.color(&["border"], defaults.border),
        accent: variant.color(&["base.cyan", "base.blue"], defaults.accent),
        score: variant.color(&["base.yellow"], defaults.score),
        comments: variant.color(&["base.green"], defaults.comments),
        muted: variant.color(&["muted.foreground"], defaults.muted),
        error: variant.color(&["base.red"], defaults.error),
    };

    tracing::debug!(
        file = %theme_file.name,
        variant = %variant.name,
        elapsed = ?start.elapsed(),
        "Loaded theme"
    );

    Ok(theme)
}

/// Theme from the configured file, or the built-in one if absent or unreadable.
pub fn load_or_default(path: Option<&str>, mode: &str) -> TuiTheme {
    match path {
        Some(path) => load_theme(Path::new(path), mode).unwrap_or_else(|e| {
            tracing::error!("Failed to load theme '{}': {:#}", path, e);
            TuiTheme::default()
        }),
        None => TuiTheme::default(),
    }
}

fn parse_color(hex: &str) -> Color {
    if let Ok(c) = hex.parse::<Color>() {
        return c;
    }

    let hex = hex.trim_start_matches('#');
    match hex.len() {
        6 | 8 if hex.is_ascii() => {
            // For 8-char hex (with alpha), ignore the alpha and use the RGB components.
            let r = u8::from_str_radix(&hex[0..2], 16).unwrap_or(0);
            let g = u8::from_str_radix(&hex[2..4], 16).unwrap_or(0);
            let b = u8::from_str_radix(&hex[4..6], 16).unwrap_or(0);
            Color::Rgb(r, g, b)
        }
        _ => Color::Reset,
    }
}
