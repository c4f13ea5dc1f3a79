//! The single active filter

use quire_common::Poem;
use std::collections::HashSet;
use std::fmt;

/// Filter descriptor; exactly one is active at a time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Filter {
    /// Every record
    #[default]
    All,
    /// Records carrying this exact tag (case-sensitive)
    Tag(String),
    /// Case-insensitive substring of title or content; empty matches all
    Search(String),
    /// Records whose id is in the set
    Favorites(HashSet<String>),
}

impl Filter {
    pub fn matches(&self, poem: &Poem) -> bool {
        match self {
            Filter::All => true,
            Filter::Tag(name) => poem.has_tag(name),
            Filter::Search(term) => {
                if term.is_empty() {
                    return true;
                }
                let term = term.to_lowercase();
                poem.title.to_lowercase().contains(&term)
                    || poem.content.to_lowercase().contains(&term)
            }
            Filter::Favorites(ids) => ids.contains(&poem.id),
        }
    }

    pub fn is_favorites(&self) -> bool {
        matches!(self, Filter::Favorites(_))
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::All => f.write_str("all"),
            Filter::Tag(name) => write!(f, "tag \"{}\"", name),
            Filter::Search(term) => write!(f, "search \"{}\"", term),
            Filter::Favorites(ids) => write!(f, "favorites ({})", ids.len()),
        }
    }
}
