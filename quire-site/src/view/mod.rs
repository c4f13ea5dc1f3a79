//! Filter, sort and paginate the cached collection
//!
//! [`project`] is pure: the same records, filter and cursor always give the
//! same page. [`ViewState`] is the mutable cursor the application keeps.

pub mod filter;
pub mod pagination;

use chrono::{DateTime, Utc};
use quire_common::Poem;
use std::collections::{BTreeMap, BTreeSet};

pub use filter::Filter;
pub use pagination::{calculate_pagination, Pagination, DEFAULT_PAGE_SIZE};

/// One projected page
#[derive(Debug, Clone, PartialEq)]
pub struct PageView<'a> {
    /// Visible records, newest first
    pub poems: Vec<&'a Poem>,
    /// Number of records matching the filter
    pub total: usize,
    /// Whether "load more" would reveal more records
    pub has_more: bool,
}

impl PageView<'_> {
    pub fn ids(&self) -> Vec<&str> {
        self.poems.iter().map(|p| p.id.as_str()).collect()
    }
}

/// Newest first; ties keep collection order, undated records sink
pub fn sort_newest_first(poems: &mut [&Poem]) {
    poems.sort_by(|a, b| b.updated_at().cmp(&a.updated_at()));
}

/// Project `all` through `filter` and the page cursor
pub fn project<'a>(all: &'a [Poem], filter: &Filter, page: usize, page_size: usize) -> PageView<'a> {
    let mut matching: Vec<&Poem> = all.iter().filter(|p| filter.matches(p)).collect();
    sort_newest_first(&mut matching);

    let p = calculate_pagination(matching.len(), page, page_size);
    matching.truncate(p.shown);

    PageView {
        poems: matching,
        total: p.total,
        has_more: p.has_more,
    }
}

/// Every distinct tag with the number of records carrying it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSummary {
    /// Total number of records (the "All" entry)
    pub total: usize,
    /// Records per tag, sorted by tag name. A record listing the same tag
    /// more than once counts once for it.
    pub counts: BTreeMap<String, usize>,
}

pub fn tag_summary(all: &[Poem]) -> TagSummary {
    let mut counts = BTreeMap::new();
    for poem in all {
        // A record repeating a tag still counts once for it
        let distinct: BTreeSet<&str> = poem.tags.iter().map(String::as_str).collect();
        for tag in distinct {
            *counts.entry(tag.to_string()).or_insert(0) += 1;
        }
    }
    TagSummary {
        total: all.len(),
        counts,
    }
}

/// Most recent update time across the collection
pub fn latest_update(all: &[Poem]) -> Option<DateTime<Utc>> {
    all.iter().filter_map(Poem::updated_at).max()
}

/// Current filter and page cursor
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    filter: Filter,
    page: usize,
    page_size: usize,
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl ViewState {
    pub fn new(page_size: usize) -> Self {
        Self {
            filter: Filter::All,
            page: 1,
            page_size: page_size.max(1),
        }
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Replace the active filter and go back to the first page
    pub fn select(&mut self, filter: Filter) {
        self.filter = filter;
        self.page = 1;
    }

    /// Reveal one more page under the same filter
    pub fn load_more(&mut self) {
        self.page += 1;
    }

    /// Jump the cursor (used by the command line `--page`)
    pub fn set_page(&mut self, page: usize) {
        self.page = page.max(1);
    }

    pub fn project<'a>(&self, all: &'a [Poem]) -> PageView<'a> {
        project(all, &self.filter, self.page, self.page_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn poem(id: &str, title: &str, content: &str, tags: &[&str], updated: &str) -> Poem {
        Poem::new(id, title, content, tags.iter().map(|t| t.to_string()).collect())
            .with_last_updated(updated)
    }

    fn scenario() -> Vec<Poem> {
        vec![
            poem("1", "A", "x y z", &["love"], "2024-01-01T00:00:00.000Z"),
            poem("2", "B", "p q", &[], "2024-02-01T00:00:00.000Z"),
        ]
    }

    #[test]
    fn test_filter_scenario() {
        let all = scenario();

        let view = project(&all, &Filter::Search("x".to_string()), 1, 9);
        assert_eq!(view.ids(), vec!["1"]);

        let view = project(&all, &Filter::Tag("other".to_string()), 1, 9);
        assert!(view.poems.is_empty());

        let favorites: HashSet<String> = ["1".to_string()].into_iter().collect();
        let view = project(&all, &Filter::Favorites(favorites), 1, 9);
        assert_eq!(view.ids(), vec!["1"]);

        let view = project(&all, &Filter::Favorites(HashSet::new()), 1, 9);
        assert!(view.poems.is_empty());
    }

    #[test]
    fn test_all_sorts_newest_first() {
        let all = scenario();
        let view = project(&all, &Filter::All, 1, 9);
        assert_eq!(view.ids(), vec!["2", "1"]);
        assert_eq!(view.total, 2);
        assert!(!view.has_more);
    }

    #[test]
    fn test_sort_is_stable_and_undated_last() {
        let all = vec![
            poem("a", "A", "", &[], "not a date"),
            poem("b", "B", "", &[], "2024-01-01T00:00:00.000Z"),
            poem("c", "C", "", &[], "2024-01-01T00:00:00.000Z"),
            poem("d", "D", "", &[], "2024-05-01T00:00:00Z"),
        ];
        let view = project(&all, &Filter::All, 1, 9);
        assert_eq!(view.ids(), vec!["d", "b", "c", "a"]);
    }

    #[test]
    fn test_projection_is_idempotent() {
        let all = scenario();
        let filter = Filter::Search("q".to_string());
        assert_eq!(project(&all, &filter, 1, 9), project(&all, &filter, 1, 9));
    }

    #[test]
    fn test_selecting_same_tag_twice_is_same_as_once() {
        let all = scenario();
        let mut once = ViewState::new(9);
        once.select(Filter::Tag("love".to_string()));

        let mut twice = ViewState::new(9);
        twice.select(Filter::Tag("love".to_string()));
        twice.select(Filter::Tag("love".to_string()));

        assert_eq!(twice, once);
        assert_eq!(twice.project(&all), once.project(&all));
        assert_eq!(twice.project(&all).ids(), vec!["1"]);
    }

    #[test]
    fn test_truncates_to_page_times_size() {
        let all: Vec<Poem> = (0..20)
            .map(|i| poem(&i.to_string(), "t", "c", &[], &format!("2024-01-{:02}T00:00:00.000Z", i + 1)))
            .collect();

        let view = project(&all, &Filter::All, 1, 9);
        assert_eq!(view.poems.len(), 9);
        assert_eq!(view.total, 20);
        assert!(view.has_more);
        assert_eq!(view.poems[0].id, "19");

        let view = project(&all, &Filter::All, 3, 9);
        assert_eq!(view.poems.len(), 20);
        assert!(!view.has_more);
    }

    #[test]
    fn test_select_resets_page_and_load_more_keeps_filter() {
        let mut state = ViewState::new(9);
        state.load_more();
        state.load_more();
        assert_eq!(state.page(), 3);

        state.select(Filter::Tag("love".to_string()));
        assert_eq!(state.page(), 1);

        state.load_more();
        assert_eq!(state.page(), 2);
        assert_eq!(state.filter(), &Filter::Tag("love".to_string()));
    }

    #[test]
    fn test_tag_summary_sorted_with_total() {
        let all = vec![
            poem("1", "A", "", &["rain", "love", "rain"], "2024-01-01T00:00:00.000Z"),
            poem("2", "B", "", &["love"], "2024-01-02T00:00:00.000Z"),
            poem("3", "C", "", &[], "2024-01-03T00:00:00.000Z"),
        ];
        let summary = tag_summary(&all);
        assert_eq!(summary.total, 3);
        let counts: Vec<(&str, usize)> = summary.counts.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        assert_eq!(counts, vec![("love", 2), ("rain", 1)]);
    }

    #[test]
    fn test_latest_update() {
        let all = scenario();
        let latest = latest_update(&all).unwrap();
        assert_eq!(quire_common::time::format_timestamp(latest), "2024-02-01T00:00:00.000Z");
        assert!(latest_update(&[]).is_none());
    }
}
