use html2text::from_read;

use once_cell::sync::Lazy;
use regex::Regex;

static IMG_REGEX: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r#"(?i)<img\s+[^>]*alt=["']([^"']*)["'][^>]*>"#).ok());

/// Readable text from an HTML fragment, wrapped at `width` columns.
/// `<img>` tags become `[Image: alt]` placeholders.
pub fn extract_text_from_html(html: &str, width: usize) -> String {
    let html_with_placeholders = match IMG_REGEX.as_ref() {
        Some(re) => re.replace_all(html, "[Image: $1]"),
        None => html.into(),
    };
    let mut bytes = html_with_placeholders.as_bytes();
    from_read(&mut bytes, width.max(10)).unwrap_or_default()
}

/// First `max_lines` non-empty lines of the text rendering of `html`.
pub fn summary_preview(html: &str, width: usize, max_lines: usize) -> Vec<String> {
    extract_text_from_html(html, width)
        .lines()
        .map(str::trim_end)
        .filter(|l| !l.trim().is_empty())
        .take(max_lines)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_text() {
        let html = "<p>Hello <strong>World</strong> &amp; friends</p>";
        let out = extract_text_from_html(html, 80);
        assert!(out.contains("Hello"));
        assert!(out.contains("World"));
        assert!(out.contains("& friends"));
    }

    #[test]
    fn replaces_images_with_placeholders() {
        let html = "<p>Check this out: <img src=\"foo.jpg\" alt=\"Cool Image\" /></p>";
        let out = extract_text_from_html(html, 80);
        assert!(out.contains("[Image: Cool Image]"));
    }

    #[test]
    fn preview_skips_blank_lines_and_caps_length() {
        let html = "<p>one</p><p>two</p><p>three</p><p>four</p>";
        let lines = summary_preview(html, 80, 3);
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("one"));
        assert!(lines.iter().all(|l| !l.trim().is_empty()));
    }
}
