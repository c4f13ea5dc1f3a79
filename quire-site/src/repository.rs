//! Poem repository
//!
//! The single in-process cache of the poem collection, plus the two
//! mutations. Every mutation is a full read-modify-write through the
//! [`ContentStore`]:
//!
//! 1. re-read the collection (the cache is never the base of a write)
//! 2. splice the change in
//! 3. fetch the freshest revision token
//! 4. write the whole document
//!
//! A successful write invalidates the cache wholesale. A failed one leaves
//! it exactly as it was.

use quire_common::time::{timestamp_now, IdGenerator};
use quire_common::{Collection, Poem};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{SiteError, SiteResult};
use crate::session::BearerToken;
use crate::store::{ContentStore, WriteReceipt};

/// Cached access to the poem collection
pub struct PoemRepository {
    store: Arc<dyn ContentStore>,
    cache: Collection,
    ids: IdGenerator,
}

impl PoemRepository {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self {
            store,
            cache: Vec::new(),
            ids: IdGenerator::new(),
        }
    }

    /// The cached collection, in storage order
    ///
    /// Re-reads through the store when the cache is empty or
    /// `force_refresh` is set.
    pub async fn load(&mut self, force_refresh: bool) -> SiteResult<&[Poem]> {
        if force_refresh || self.cache.is_empty() {
            let fresh = self.store.read_collection().await?;
            debug!(records = fresh.len(), force_refresh, "Poem cache refreshed");
            self.observe_ids(&fresh);
            self.cache = fresh;
        }
        Ok(&self.cache)
    }

    /// Whatever is cached right now, without touching the store
    pub fn cached(&self) -> &[Poem] {
        &self.cache
    }

    /// Cached poem by id
    pub fn find(&self, id: &str) -> Option<&Poem> {
        self.cache.iter().find(|p| p.id == id)
    }

    /// Create or replace a poem
    ///
    /// A poem with an empty id is new: it is given a fresh id and prepended.
    /// A poem whose id exists is replaced in place, keeping its position and
    /// any stored fields this model does not interpret. Either way
    /// `lastUpdated` is stamped to now. Returns the poem as written.
    pub async fn upsert(&mut self, mut poem: Poem, auth: Option<&BearerToken>) -> SiteResult<Poem> {
        let auth = auth.ok_or(SiteError::AuthRequired)?;

        let mut collection = self.store.read_collection().await?;
        self.observe_ids(&collection);

        if poem.id.is_empty() {
            poem.id = self.ids.next_id()?;
        }
        poem.last_updated = timestamp_now();

        let message = match collection.iter_mut().find(|p| p.id == poem.id) {
            Some(existing) => {
                for (key, value) in &existing.extra {
                    poem.extra.entry(key.clone()).or_insert_with(|| value.clone());
                }
                *existing = poem.clone();
                format!("Update poem: {}", poem.title)
            }
            None => {
                collection.insert(0, poem.clone());
                format!("Add new poem: {}", poem.title)
            }
        };

        self.commit(auth, &collection, &message).await?;
        Ok(poem)
    }

    /// Delete a poem by id; returns the removed poem
    ///
    /// Fails with `NotFound`, without writing anything, when the id is not
    /// in the local cache or has already disappeared from the store.
    pub async fn remove(&mut self, id: &str, auth: Option<&BearerToken>) -> SiteResult<Poem> {
        let auth = auth.ok_or(SiteError::AuthRequired)?;

        if self.load(false).await?.iter().all(|p| p.id != id) {
            return Err(SiteError::NotFound(format!("poem {}", id)));
        }

        let mut collection = self.store.read_collection().await?;
        let position = collection.iter().position(|p| p.id == id).ok_or_else(|| {
            warn!(id, "Poem vanished from the store before delete");
            SiteError::NotFound(format!("poem {}", id))
        })?;
        let removed = collection.remove(position);

        let message = format!("Delete poem: {}", removed.title);
        self.commit(auth, &collection, &message).await?;
        Ok(removed)
    }

    /// Token fetch + write, then wholesale cache invalidation
    async fn commit(
        &mut self,
        auth: &BearerToken,
        collection: &[Poem],
        message: &str,
    ) -> SiteResult<WriteReceipt> {
        let token = self.store.revision_token(auth).await?;
        let receipt = self
            .store
            .write_collection(auth, collection, token.as_ref(), message)
            .await?;

        self.cache.clear();
        info!(
            store = %self.store.describe(),
            records = collection.len(),
            commit_message = message,
            "Collection rewritten"
        );
        Ok(receipt)
    }

    fn observe_ids(&mut self, collection: &[Poem]) {
        if let Some(max) = collection.iter().filter_map(Poem::numeric_id).max() {
            self.ids.observe(max);
        }
    }
}
