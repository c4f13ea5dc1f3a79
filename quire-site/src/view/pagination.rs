//! Cumulative "load more" pagination
//!
//! Unlike page-by-page browsing, a page cursor here means "show the first
//! `page * page_size` matches".

/// Default number of cards revealed per page
pub const DEFAULT_PAGE_SIZE: usize = 9;

/// Pagination metadata calculated from the number of matches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Current page cursor (1-indexed)
    pub page: usize,
    /// How many matches are revealed
    pub shown: usize,
    /// Total number of matches
    pub total: usize,
    /// Whether "load more" would reveal anything
    pub has_more: bool,
}

/// Calculate what a page cursor reveals out of `total_results` matches
///
/// A cursor below 1 counts as 1. A zero page size counts as 1 so the view
/// always makes progress.
///
/// # Examples
/// ```
/// use quire_site::view::pagination::calculate_pagination;
///
/// // 20 matches, 9 per page: page 2 reveals 18 with 2 still hidden
/// let p = calculate_pagination(20, 2, 9);
/// assert_eq!(p.shown, 18);
/// assert!(p.has_more);
///
/// // Past the end everything is shown
/// let p = calculate_pagination(20, 5, 9);
/// assert_eq!(p.shown, 20);
/// assert!(!p.has_more);
/// ```
pub fn calculate_pagination(total_results: usize, requested_page: usize, page_size: usize) -> Pagination {
    let page = requested_page.max(1);
    let shown = page.saturating_mul(page_size.max(1)).min(total_results);

    Pagination {
        page,
        shown,
        total: total_results,
        has_more: shown < total_results,
    }
}
