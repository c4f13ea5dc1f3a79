//! Favorite poems
//!
//! The favorite-id set is remembered in long-lived preferences under
//! [`FAVORITES_KEY`] as a JSON array of ids.

use quire_common::prefs::Preferences;
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::error::SiteResult;

/// Preference key holding the favorite ids
pub const FAVORITES_KEY: &str = "favoritePoems";

/// The set of poem ids the reader marked as favorite
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Favorites {
    ids: HashSet<String>,
}

impl Favorites {
    /// Load from preferences; an unreadable value counts as no favorites
    pub fn load(prefs: &dyn Preferences) -> Self {
        let ids = match prefs.get(FAVORITES_KEY) {
            Some(raw) => match serde_json::from_str::<Vec<String>>(&raw) {
                Ok(ids) => ids.into_iter().collect(),
                Err(e) => {
                    warn!(error = %e, "Ignoring unreadable favorites preference");
                    HashSet::new()
                }
            },
            None => HashSet::new(),
        };
        debug!(count = ids.len(), "Favorites loaded");
        Self { ids }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Snapshot of the id set, for the favorites filter
    pub fn ids(&self) -> &HashSet<String> {
        &self.ids
    }

    /// Flip membership of `id` and persist; returns whether it is now a favorite
    pub fn toggle(&mut self, id: &str, prefs: &mut dyn Preferences) -> SiteResult<bool> {
        let mut next = self.ids.clone();
        let now_favorite = if next.remove(id) {
            false
        } else {
            next.insert(id.to_string());
            true
        };

        // Persist first so a failed write leaves memory and storage in agreement
        let mut sorted: Vec<&String> = next.iter().collect();
        sorted.sort();
        let encoded = serde_json::to_string(&sorted).map_err(quire_common::Error::from)?;
        prefs.set(FAVORITES_KEY, &encoded)?;

        self.ids = next;
        Ok(now_favorite)
    }
}
