use crate::internal::models::Story;
use strum_macros::Display;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Display)]
pub enum SortBy {
    Comments,
    Date,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Display)]
pub enum SortOrder {
    #[strum(to_string = "asc")]
    Ascending,
    #[strum(to_string = "desc")]
    Descending,
}

impl SortOrder {
    pub fn toggle(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }
}

/// Returns a new, ordered copy of `stories`.
///
/// Comment sort is always descending by `comments_count`; `date_order` only
/// applies to date sort. The sort is stable, so equal keys keep their input
/// order and the result is deterministic.
pub fn sort_stories(stories: &[Story], sort_by: SortBy, date_order: SortOrder) -> Vec<Story> {
    let mut sorted = stories.to_vec();
    match (sort_by, date_order) {
        (SortBy::Comments, _) => sorted.sort_by(|a, b| b.comments_count.cmp(&a.comments_count)),
        (SortBy::Date, SortOrder::Descending) => sorted.sort_by(|a, b| b.date.cmp(&a.date)),
        (SortBy::Date, SortOrder::Ascending) => sorted.sort_by(|a, b| a.date.cmp(&b.date)),
    }
    sorted
}
