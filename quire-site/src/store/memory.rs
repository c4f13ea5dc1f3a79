//! In-process content store
//!
//! Holds the document as the exact JSON text a write produced and names each
//! version by the SHA-256 of that text, so it enforces the same optimistic
//! concurrency rules as the hosted store:
//!
//! - update with the current token: accepted
//! - update with any other token: rejected (409)
//! - update without a token while a document exists: rejected (422)
//! - create with a token while no document exists: rejected (422)
//!
//! It also records how many reads and writes it served, and can inject a
//! competing write between a token fetch and the write that follows it.

use async_trait::async_trait;
use quire_common::{Collection, Poem};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::debug;

use super::{codec, ContentStore, RevisionToken, WriteReceipt};
use crate::error::{SiteError, SiteResult};
use crate::session::BearerToken;

#[derive(Debug, Clone)]
struct StoredDocument {
    text: String,
    revision: RevisionToken,
}

impl StoredDocument {
    fn from_collection(data: &[Poem]) -> SiteResult<Self> {
        // Go through the transport encoding so this store sees exactly what
        // a remote one would
        let encoded = codec::encode_transport(data)?;
        let text = codec::decode_transport_text(&encoded)?;
        let revision = RevisionToken::new(content_hash(&text));
        Ok(Self { text, revision })
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    document: Option<StoredDocument>,
    reads: usize,
    token_fetches: usize,
    writes: usize,
    read_failure: Option<String>,
    competing_write: Option<Collection>,
}

/// Content store held entirely in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

fn content_hash(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

impl MemoryStore {
    /// Store with no document yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Store whose document already holds `data`
    pub fn with_collection(data: &[Poem]) -> SiteResult<Self> {
        let state = MemoryState {
            document: Some(StoredDocument::from_collection(data)?),
            ..MemoryState::default()
        };
        Ok(Self {
            state: Mutex::new(state),
        })
    }

    /// Current document contents, `None` if it was never written
    pub async fn snapshot(&self) -> Option<Collection> {
        let state = self.state.lock().await;
        state
            .document
            .as_ref()
            .and_then(|doc| codec::decode_document(doc.text.as_bytes()).ok())
    }

    /// Raw JSON text of the current document
    pub async fn document_text(&self) -> Option<String> {
        self.state.lock().await.document.as_ref().map(|d| d.text.clone())
    }

    /// Token naming the current document version
    pub async fn current_revision(&self) -> Option<RevisionToken> {
        self.state
            .lock()
            .await
            .document
            .as_ref()
            .map(|d| d.revision.clone())
    }

    /// Number of public reads served
    pub async fn read_count(&self) -> usize {
        self.state.lock().await.reads
    }

    /// Number of revision token lookups served
    pub async fn token_fetch_count(&self) -> usize {
        self.state.lock().await.token_fetches
    }

    /// Number of accepted writes
    pub async fn write_count(&self) -> usize {
        self.state.lock().await.writes
    }

    /// Make public reads fail with `StoreUnavailable` until cleared with `None`
    pub async fn set_read_failure(&self, failure: Option<String>) {
        self.state.lock().await.read_failure = failure;
    }

    /// Commit `data` as another writer right after the next token fetch
    ///
    /// The token handed out by that fetch is therefore already stale when
    /// the caller uses it.
    pub async fn commit_after_next_token_fetch(&self, data: Collection) {
        self.state.lock().await.competing_write = Some(data);
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn read_collection(&self) -> SiteResult<Collection> {
        let mut state = self.state.lock().await;
        state.reads += 1;

        if let Some(failure) = &state.read_failure {
            return Err(SiteError::StoreUnavailable(failure.clone()));
        }

        match &state.document {
            Some(doc) => codec::decode_document(doc.text.as_bytes()),
            None => Ok(Vec::new()),
        }
    }

    async fn revision_token(&self, _auth: &BearerToken) -> SiteResult<Option<RevisionToken>> {
        let mut state = self.state.lock().await;
        state.token_fetches += 1;

        let token = state.document.as_ref().map(|d| d.revision.clone());

        if let Some(competing) = state.competing_write.take() {
            debug!(records = competing.len(), "Applying competing write");
            state.document = Some(StoredDocument::from_collection(&competing)?);
            state.writes += 1;
        }

        Ok(token)
    }

    async fn write_collection(
        &self,
        _auth: &BearerToken,
        data: &[Poem],
        token: Option<&RevisionToken>,
        message: &str,
    ) -> SiteResult<WriteReceipt> {
        let mut state = self.state.lock().await;

        match (&state.document, token) {
            (Some(doc), Some(expected)) if doc.revision != *expected => {
                return Err(SiteError::WriteRejected {
                    status: 409,
                    message: format!("document does not match {}", expected),
                });
            }
            (Some(_), None) => {
                return Err(SiteError::WriteRejected {
                    status: 422,
                    message: "Invalid request.\n\n\"sha\" wasn't supplied.".to_string(),
                });
            }
            (None, Some(expected)) => {
                return Err(SiteError::WriteRejected {
                    status: 422,
                    message: format!("no document exists at revision {}", expected),
                });
            }
            _ => {}
        }

        let document = StoredDocument::from_collection(data)?;
        let revision = document.revision.clone();
        state.document = Some(document);
        state.writes += 1;

        debug!(commit_message = %message, %revision, "Memory store committed");
        Ok(WriteReceipt {
            revision: Some(revision),
            change_id: Some(format!("memory-{}", state.writes)),
        })
    }

    fn describe(&self) -> String {
        "in-memory store".to_string()
    }
}
