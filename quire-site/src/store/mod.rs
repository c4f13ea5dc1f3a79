//! Content store client
//!
//! The poem collection lives in one JSON document owned by an external
//! store. [`ContentStore`] is the read-token-write contract the repository
//! relies on:
//!
//! 1. `read_collection`: public, cache-bypassing read. A missing document
//!    is an empty collection, not an error.
//! 2. `revision_token`: authenticated metadata read yielding the token
//!    that names the current document version (`None` if it does not exist).
//! 3. `write_collection`: authenticated full rewrite. With a token it is
//!    an update that fails if the token is stale; without one it is a create.
//!
//! Steps 2 and 3 are not atomic. Another writer committing in between makes
//! step 3 fail with [`SiteError::WriteRejected`](crate::SiteError), leaving
//! that writer's version in place (last writer wins, no merge).
//!
//! A backend with real transactions can implement the same trait and simply
//! ignore the token.

pub mod codec;
pub mod github;
pub mod memory;

use async_trait::async_trait;
use quire_common::{Collection, Poem};
use std::fmt;

use crate::error::SiteResult;
use crate::session::BearerToken;

pub use github::GitHubStore;
pub use memory::MemoryStore;

/// Opaque document version identifier ("sha" in the hosted API)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RevisionToken(String);

impl RevisionToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RevisionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a successful write reports back
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteReceipt {
    /// Token of the document version just written, when the store reports it
    pub revision: Option<RevisionToken>,
    /// Store-side identifier of the change (a commit id for the hosted API)
    pub change_id: Option<String>,
}

/// Read-token-write access to the persisted poem collection
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Read the whole collection through the public path
    async fn read_collection(&self) -> SiteResult<Collection>;

    /// Fetch the current revision token through the authenticated path
    async fn revision_token(&self, auth: &BearerToken) -> SiteResult<Option<RevisionToken>>;

    /// Replace the whole document
    ///
    /// `token` must be the freshest token obtained from
    /// [`revision_token`](ContentStore::revision_token), or `None` to create
    /// the document.
    async fn write_collection(
        &self,
        auth: &BearerToken,
        data: &[Poem],
        token: Option<&RevisionToken>,
        message: &str,
    ) -> SiteResult<WriteReceipt>;

    /// Short human-readable location, for logs
    fn describe(&self) -> String;
}
