use super::models::Story;

/// Current search text, pre-lowercased for per-keystroke matching.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    pub query: String,
    needle: String,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        let query = query.into();
        let needle = query.to_lowercase();
        Self { query, needle }
    }

    /// Whitespace-only queries count as empty.
    pub fn is_empty(&self) -> bool {
        self.needle.trim().is_empty()
    }

    pub fn push(&mut self, c: char) {
        self.query.push(c);
        self.needle = self.query.to_lowercase();
    }

    pub fn pop(&mut self) {
        self.query.pop();
        self.needle = self.query.to_lowercase();
    }

    pub fn clear(&mut self) {
        self.query.clear();
        self.needle.clear();
    }

    /// Case-insensitive substring match against title, author, or url.
    pub fn matches(&self, story: &Story) -> bool {
        if self.is_empty() {
            return true;
        }
        let hit = |text: &str| text.to_lowercase().contains(&self.needle);
        hit(&story.title) || hit(&story.author) || story.url.as_deref().is_some_and(hit)
    }
}

/// Returns the stories matching `query`, keeping their relative order.
pub fn filter_stories(stories: &[Story], query: &SearchQuery) -> Vec<Story> {
    match query.is_empty() {
        true => stories.to_vec(),
        false => stories.iter().filter(|s| query.matches(s)).cloned().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn story(title: &str, author: &str, url: Option<&str>) -> Story {
        Story {
            id: title.to_string(),
            title: title.to_string(),
            author: author.to_string(),
            url: url.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_matches_title_author_and_url_case_insensitively() {
        let s = story("Learning Rust", "ferris", Some("https://Example.com/post"));

        assert!(SearchQuery::new("rust").matches(&s));
        assert!(SearchQuery::new("FERRIS").matches(&s));
        assert!(SearchQuery::new("example.COM").matches(&s));
        assert!(!SearchQuery::new("python").matches(&s));
    }

    #[test]
    fn test_missing_url_never_matches_on_url() {
        let s = story("Ask HN", "someone", None);
        assert!(!SearchQuery::new("http").matches(&s));
    }

    #[test]
    fn test_whitespace_query_returns_full_list() {
        let stories = vec![story("a", "x", None), story("b", "y", None)];
        let result = filter_stories(&stories, &SearchQuery::new("   "));
        assert_eq!(result, stories);
    }

    #[test]
    fn test_surrounding_spaces_are_part_of_the_query() {
        let lang = story("rust lang", "x", None);
        let word = story("rustacean", "y", None);

        let q = SearchQuery::new("rust ");
        assert!(!q.is_empty());
        assert!(q.matches(&lang));
        assert!(!q.matches(&word));

        let mut typed = SearchQuery::default();
        for c in " lang".chars() {
            typed.push(c);
        }
        assert!(typed.matches(&lang));
        assert!(!typed.matches(&story("language", "z", None)));
    }

    #[test]
    fn test_filter_preserves_order() {
        let stories = vec![
            story("rust one", "x", None),
            story("go", "y", None),
            story("rust two", "z", None),
        ];
        let result = filter_stories(&stories, &SearchQuery::new("rust"));
        let titles: Vec<_> = result.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["rust one", "rust two"]);
    }

    #[test]
    fn test_push_and_pop_keep_needle_in_sync() {
        let mut q = SearchQuery::default();
        q.push('R');
        q.push('u');
        assert!(q.matches(&story("rust", "", None)));
        q.pop();
        q.pop();
        assert!(q.is_empty());
    }
}
