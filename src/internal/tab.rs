use std::collections::HashSet;
use std::sync::Arc;

use crate::api::{SourceInfo, StorySource};
use crate::internal::models::{FetchState, Story};
use crate::internal::removals::RemovalStore;
use crate::internal::search::{SearchQuery, filter_stories};
use crate::internal::ui::scroll::reposition;
use crate::internal::ui::sort::{SortBy, SortOrder, sort_stories};

/// What a removal did to the tab, for the controller to react to.
#[derive(Debug, Clone, PartialEq)]
pub struct Removal {
    pub story: Story,
    /// The removal emptied the active search result, so the filter was dropped.
    pub search_cleared: bool,
}

/// One independent browsing context bound to a single source.
pub struct Tab {
    pub id: String,
    pub title: String,
    pub source: Arc<dyn StorySource>,
    pub info: SourceInfo,
    /// Every fetched story, sorted, minus removals.
    pub stories: Vec<Story>,
    /// `stories` after the search filter and sort.
    pub filtered_stories: Vec<Story>,
    pub selected_index: usize,
    pub scroll_offset: usize,
    pub fetch_state: FetchState,
    pub error: Option<String>,
    pub search_mode: bool,
    pub search_query: SearchQuery,
    pub sort_by: SortBy,
    pub date_order: SortOrder,
    pub removed_ids: HashSet<String>,
}

impl Tab {
    pub fn new(source: Arc<dyn StorySource>) -> Self {
        let info = source.info();
        // Sources without comments can only sort by date.
        let sort_by = match info.supports_comments {
            true => SortBy::Comments,
            false => SortBy::Date,
        };
        Self {
            id: info.id.clone(),
            title: info.name.clone(),
            source,
            info,
            stories: Vec::new(),
            filtered_stories: Vec::new(),
            selected_index: 0,
            scroll_offset: 0,
            fetch_state: FetchState::Idle,
            error: None,
            search_mode: false,
            search_query: SearchQuery::default(),
            sort_by,
            date_order: SortOrder::Descending,
            removed_ids: HashSet::new(),
        }
    }

    pub fn loading(&self) -> bool {
        self.fetch_state == FetchState::Loading
    }

    pub fn sort_by_comments(&self) -> bool {
        self.sort_by == SortBy::Comments
    }

    pub fn sort_date_ascending(&self) -> bool {
        self.date_order == SortOrder::Ascending
    }

    pub fn selected_story(&self) -> Option<&Story> {
        self.filtered_stories.get(self.selected_index)
    }

    /// The rows currently inside the visible window.
    pub fn visible_stories(&self, page_size: usize) -> &[Story] {
        let start = self.scroll_offset.min(self.filtered_stories.len());
        let end = (start + page_size).min(self.filtered_stories.len());
        &self.filtered_stories[start..end]
    }

    /// Marks the tab as loading with the removal set read for this cycle.
    ///
    /// Returns false when a fetch is already in flight; overlapping refreshes
    /// of the same tab are refused.
    pub fn begin_fetch(&mut self, removed_ids: HashSet<String>) -> bool {
        if self.loading() {
            return false;
        }
        self.fetch_state = FetchState::Loading;
        self.error = None;
        self.removed_ids = removed_ids;
        true
    }

    pub fn finish_fetch(&mut self, result: Result<Vec<Story>, String>, page_size: usize) {
        match result {
            Ok(stories) => {
                // Removals made while the fetch was in flight still apply.
                let kept: Vec<Story> = stories
                    .into_iter()
                    .filter(|s| !self.removed_ids.contains(&s.id))
                    .collect();
                self.stories = sort_stories(&kept, self.sort_by, self.date_order);
                self.fetch_state = FetchState::Loaded;
                self.error = None;
                self.refresh_view();
                self.select(self.selected_index as isize, page_size);
            }
            Err(message) => {
                self.fetch_state = FetchState::Failed;
                self.error = Some(message);
            }
        }
    }

    /// Recomputes `filtered_stories`: filter by the query, then sort.
    pub fn refresh_view(&mut self) {
        let filtered = filter_stories(&self.stories, &self.search_query);
        self.filtered_stories = sort_stories(&filtered, self.sort_by, self.date_order);
    }

    pub fn select(&mut self, requested: isize, page_size: usize) {
        let v = reposition(
            self.scroll_offset,
            requested,
            self.filtered_stories.len(),
            page_size,
        );
        self.scroll_offset = v.offset;
        self.selected_index = v.selected;
    }

    pub fn move_selection(&mut self, delta: isize, page_size: usize) {
        self.select(self.selected_index as isize + delta, page_size);
    }

    pub fn jump_to_top(&mut self, page_size: usize) {
        self.select(0, page_size);
    }

    pub fn jump_to_bottom(&mut self, page_size: usize) {
        self.select(self.filtered_stories.len() as isize - 1, page_size);
    }

    fn reset_selection(&mut self) {
        self.selected_index = 0;
        self.scroll_offset = 0;
    }

    /// Switches between comment and date sort. Sources without comment
    /// support flip the date direction instead.
    pub fn toggle_sort(&mut self) {
        match self.info.supports_comments {
            true => {
                self.sort_by = match self.sort_by {
                    SortBy::Comments => SortBy::Date,
                    SortBy::Date => SortBy::Comments,
                };
            }
            false => self.date_order = self.date_order.toggle(),
        }
        self.resort();
    }

    /// Flips the date direction and switches to date sort.
    pub fn toggle_date_order(&mut self) {
        self.date_order = self.date_order.toggle();
        self.sort_by = SortBy::Date;
        self.resort();
    }

    fn resort(&mut self) {
        self.stories = sort_stories(&self.stories, self.sort_by, self.date_order);
        self.refresh_view();
        self.reset_selection();
    }

    pub fn begin_search(&mut self) {
        self.search_mode = true;
    }

    pub fn push_search_char(&mut self, c: char) {
        self.search_query.push(c);
        self.refresh_view();
        self.reset_selection();
    }

    pub fn pop_search_char(&mut self) {
        self.search_query.pop();
        self.refresh_view();
        self.reset_selection();
    }

    /// Leaves search entry, keeping the filter.
    pub fn confirm_search(&mut self) {
        self.search_mode = false;
        self.reset_selection();
    }

    /// Leaves search entry and drops the filter.
    pub fn cancel_search(&mut self) {
        self.search_mode = false;
        self.search_query.clear();
        self.refresh_view();
        self.reset_selection();
    }

    /// Dismisses a story permanently: records and persists its id, then
    /// drops it from both lists.
    pub fn remove_story(
        &mut self,
        story_id: &str,
        store: &dyn RemovalStore,
        page_size: usize,
    ) -> Option<Removal> {
        let story = self.stories.iter().find(|s| s.id == story_id).cloned()?;

        self.removed_ids.insert(story.id.clone());
        store.save(&self.id, &self.removed_ids);

        self.stories.retain(|s| s.id != story.id);
        self.refresh_view();

        let search_cleared = self.filtered_stories.is_empty() && !self.search_query.is_empty();
        match search_cleared {
            true => self.cancel_search(),
            false => self.select(self.selected_index as isize, page_size),
        }

        tracing::info!(tab = %self.id, story = %story.id, search_cleared, "Removed story");
        Some(Removal {
            story,
            search_cleared,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::FetchOptions;
    use crate::internal::removals::MemoryRemovalStore;
    use async_trait::async_trait;

    struct StaticSource {
        comments: bool,
    }

    #[async_trait]
    impl StorySource for StaticSource {
        fn info(&self) -> SourceInfo {
            SourceInfo {
                id: "static".to_string(),
                name: "Static".to_string(),
                supports_comments: self.comments,
                supports_scores: false,
            }
        }

        async fn fetch_stories(
            &self,
            _removed: &HashSet<String>,
            _options: FetchOptions,
        ) -> anyhow::Result<Vec<Story>> {
            Ok(Vec::new())
        }
    }

    fn story(id: usize, title: &str) -> Story {
        Story {
            id: id.to_string(),
            title: title.to_string(),
            comments_count: id as u32,
            date: 1_000 + id as i64,
            ..Default::default()
        }
    }

    fn loaded_tab(stories: Vec<Story>) -> Tab {
        let mut tab = Tab::new(Arc::new(StaticSource { comments: true }));
        assert!(tab.begin_fetch(HashSet::new()));
        tab.finish_fetch(Ok(stories), 15);
        tab
    }

    #[test]
    fn test_fetch_sorts_by_comments_and_drops_removed() {
        let mut tab = Tab::new(Arc::new(StaticSource { comments: true }));
        tab.begin_fetch(["2".to_string()].into_iter().collect());
        tab.finish_fetch(Ok(vec![story(1, "a"), story(2, "b"), story(3, "c")]), 15);

        let ids: Vec<_> = tab.stories.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "1"]);
        assert_eq!(tab.filtered_stories, tab.stories);
        assert!(!tab.loading());
    }

    #[test]
    fn test_overlapping_fetch_is_refused() {
        let mut tab = Tab::new(Arc::new(StaticSource { comments: true }));
        assert!(tab.begin_fetch(HashSet::new()));
        assert!(!tab.begin_fetch(HashSet::new()));
    }

    #[test]
    fn test_failed_fetch_sets_error_and_clears_loading() {
        let mut tab = Tab::new(Arc::new(StaticSource { comments: true }));
        tab.begin_fetch(HashSet::new());
        tab.finish_fetch(Err("network unreachable".to_string()), 15);

        assert_eq!(tab.fetch_state, FetchState::Failed);
        assert_eq!(tab.error.as_deref(), Some("network unreachable"));
        assert!(!tab.loading());
    }

    #[test]
    fn test_source_without_comments_sorts_by_date_only() {
        let mut tab = Tab::new(Arc::new(StaticSource { comments: false }));
        assert!(!tab.sort_by_comments());

        tab.toggle_sort();
        assert!(!tab.sort_by_comments());
        assert!(tab.sort_date_ascending());
    }

    #[test]
    fn test_toggle_sort_refilters_then_sorts() {
        let mut tab = loaded_tab(vec![story(1, "rust a"), story(2, "go"), story(3, "rust b")]);
        tab.begin_search();
        for c in "rust".chars() {
            tab.push_search_char(c);
        }
        tab.confirm_search();

        tab.toggle_sort();
        let ids: Vec<_> = tab.filtered_stories.iter().map(|s| s.id.as_str()).collect();
        // date descending, filter still applied
        assert_eq!(ids, vec!["3", "1"]);
        assert_eq!(tab.selected_index, 0);
    }

    #[test]
    fn test_cancel_search_restores_full_sorted_list() {
        let stories: Vec<Story> = (1..=5).map(|i| story(i, &format!("t{i}"))).collect();
        let mut tab = loaded_tab(stories);
        let before = tab.filtered_stories.clone();

        tab.begin_search();
        tab.push_search_char('t');
        tab.push_search_char('3');
        assert_eq!(tab.filtered_stories.len(), 1);

        tab.cancel_search();
        assert_eq!(tab.filtered_stories, before);
        assert!(!tab.search_mode);
        assert_eq!((tab.selected_index, tab.scroll_offset), (0, 0));
    }

    #[test]
    fn test_remove_last_item_clamps_selection() {
        let stories: Vec<Story> = (1..=3).map(|i| story(i, "x")).collect();
        let mut tab = loaded_tab(stories);
        let store = MemoryRemovalStore::new();
        tab.jump_to_bottom(15);
        let last = tab.selected_story().unwrap().id.clone();

        tab.remove_story(&last, &store, 15).unwrap();

        assert_eq!(tab.filtered_stories.len(), 2);
        assert_eq!(tab.selected_index, 1);
        assert!(store.load("static").contains(&last));
    }

    #[test]
    fn test_removing_only_search_hit_clears_search() {
        let stories: Vec<Story> = vec![story(1, "alpha"), story(2, "beta"), story(3, "gamma")];
        let mut tab = loaded_tab(stories);
        let store = MemoryRemovalStore::new();
        tab.begin_search();
        for c in "beta".chars() {
            tab.push_search_char(c);
        }

        let removal = tab.remove_story("2", &store, 15).unwrap();

        assert!(removal.search_cleared);
        assert!(!tab.search_mode);
        assert!(tab.search_query.is_empty());
        assert_eq!(tab.filtered_stories.len(), 2);
    }

    #[test]
    fn test_remove_unknown_id_is_a_no_op() {
        let mut tab = loaded_tab(vec![story(1, "a")]);
        let store = MemoryRemovalStore::new();
        assert!(tab.remove_story("missing", &store, 15).is_none());
        assert!(store.load("static").is_empty());
    }
}
