//! Hosted repository content store
//!
//! Reads go to the public raw-content mirror; token lookups and writes go to
//! the authenticated contents API.
//!
//! # API Reference
//! - Read: `GET {raw_host}/{owner}/{repo}/{branch}/{path}?t={millis}`
//! - Metadata: `GET {api_host}/repos/{owner}/{repo}/contents/{path}?ref={branch}`
//! - Write: `PUT {api_host}/repos/{owner}/{repo}/contents/{path}`
//!   with body `{ message, content, branch, sha? }`
//!
//! Error bodies from the API are JSON objects with a human-readable
//! `message`, which is surfaced to the caller verbatim.

use async_trait::async_trait;
use quire_common::config::SiteConfig;
use quire_common::time::now;
use quire_common::{Collection, Poem};
use reqwest::{header, Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{codec, ContentStore, RevisionToken, WriteReceipt};
use crate::error::{SiteError, SiteResult};
use crate::session::BearerToken;

/// User-Agent header (required by the hosted API)
const USER_AGENT: &str = concat!("quire/", env!("CARGO_PKG_VERSION"));

/// Media type for the versioned REST API
const API_MEDIA_TYPE: &str = "application/vnd.github.v3+json";

/// Content store backed by a hosted git repository
///
/// Every request carries the configured timeout; expiry surfaces as
/// `StoreUnavailable`.
pub struct GitHubStore {
    /// HTTP client for all requests
    http_client: Client,
    /// Raw mirror URL of the document, without the cache-busting parameter
    raw_url: String,
    /// Contents API URL of the document
    contents_url: String,
    /// Branch to read metadata from and commit to
    branch: String,
}

impl GitHubStore {
    /// Create a store for the repository coordinates in `config`
    pub fn new(config: &SiteConfig) -> SiteResult<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static(USER_AGENT),
        );

        let http_client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| {
                SiteError::Common(quire_common::Error::Config(format!(
                    "Failed to create HTTP client: {}",
                    e
                )))
            })?;

        Ok(Self {
            http_client,
            raw_url: format!(
                "{}/{}/{}/{}/{}",
                config.raw_host, config.owner, config.repo, config.branch, config.path
            ),
            contents_url: format!(
                "{}/repos/{}/{}/contents/{}",
                config.api_host, config.owner, config.repo, config.path
            ),
            branch: config.branch.clone(),
        })
    }

    /// Raw mirror URL of the document (without cache-busting parameter)
    pub fn raw_url(&self) -> &str {
        &self.raw_url
    }

    /// Contents API URL of the document
    pub fn contents_url(&self) -> &str {
        &self.contents_url
    }
}

/// Response of `GET .../contents/{path}` (only what we use)
#[derive(Debug, Deserialize)]
struct ContentsMetadata {
    sha: String,
}

/// Body of `PUT .../contents/{path}`
#[derive(Debug, Serialize)]
struct PutContentsRequest<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

/// Response of `PUT .../contents/{path}` (only what we use)
#[derive(Debug, Default, Deserialize)]
struct PutContentsResponse {
    #[serde(default)]
    content: Option<ShaRef>,
    #[serde(default)]
    commit: Option<ShaRef>,
}

#[derive(Debug, Deserialize)]
struct ShaRef {
    sha: String,
}

/// Error body returned with any non-2xx API response
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}

/// Map a transport-level failure (connect, timeout, body read)
fn transport_error(operation: &str, e: reqwest::Error) -> SiteError {
    if e.is_timeout() {
        SiteError::StoreUnavailable(format!("{} timed out", operation))
    } else {
        SiteError::StoreUnavailable(format!("{} failed: {}", operation, e))
    }
}

/// Pull the provider's `message` out of an error response, if it has one
async fn provider_message(response: Response) -> Option<String> {
    let body = response.text().await.ok()?;
    serde_json::from_str::<ApiErrorBody>(&body)
        .ok()
        .and_then(|b| b.message)
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
}

#[async_trait]
impl ContentStore for GitHubStore {
    async fn read_collection(&self) -> SiteResult<Collection> {
        let cache_buster = now().timestamp_millis().to_string();
        debug!(url = %self.raw_url, t = %cache_buster, "Reading poem collection");

        let response = self
            .http_client
            .get(&self.raw_url)
            .query(&[("t", cache_buster.as_str())])
            .send()
            .await
            .map_err(|e| transport_error("Reading poem collection", e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            info!(url = %self.raw_url, "Poem document not found; it will be created on first save");
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(SiteError::StoreUnavailable(format!(
                "read path returned {}",
                status
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| transport_error("Reading poem collection", e))?;
        let collection = codec::decode_document(&bytes)?;

        debug!(records = collection.len(), "Poem collection read");
        Ok(collection)
    }

    async fn revision_token(&self, auth: &BearerToken) -> SiteResult<Option<RevisionToken>> {
        debug!(url = %self.contents_url, branch = %self.branch, "Fetching document revision");

        let response = self
            .http_client
            .get(&self.contents_url)
            .query(&[("ref", self.branch.as_str())])
            .bearer_auth(auth.expose())
            .header(header::ACCEPT, API_MEDIA_TYPE)
            .send()
            .await
            .map_err(|e| transport_error("Fetching document revision", e))?;

        let status = response.status();
        match status {
            StatusCode::NOT_FOUND => {
                debug!("No existing document; next write creates it");
                Ok(None)
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                let message = provider_message(response)
                    .await
                    .unwrap_or_else(|| "access token was not accepted".to_string());
                warn!(status = status.as_u16(), provider_message = %message, "Access token rejected");
                Err(SiteError::WriteRejected {
                    status: status.as_u16(),
                    message,
                })
            }
            s if s.is_success() => {
                let metadata: ContentsMetadata = response.json().await.map_err(|e| {
                    SiteError::StoreUnavailable(format!("unexpected metadata response: {}", e))
                })?;
                debug!(sha = %metadata.sha, "Document revision fetched");
                Ok(Some(RevisionToken::new(metadata.sha)))
            }
            s => Err(SiteError::StoreUnavailable(format!(
                "metadata request returned {}",
                s
            ))),
        }
    }

    async fn write_collection(
        &self,
        auth: &BearerToken,
        data: &[Poem],
        token: Option<&RevisionToken>,
        message: &str,
    ) -> SiteResult<WriteReceipt> {
        let body = PutContentsRequest {
            message,
            content: codec::encode_transport(data)?,
            branch: &self.branch,
            sha: token.map(RevisionToken::as_str),
        };

        debug!(
            url = %self.contents_url,
            records = data.len(),
            create = token.is_none(),
            "Writing poem collection"
        );

        let response = self
            .http_client
            .put(&self.contents_url)
            .bearer_auth(auth.expose())
            .header(header::ACCEPT, API_MEDIA_TYPE)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error("Writing poem collection", e))?;

        let status = response.status();
        if !status.is_success() {
            return match provider_message(response).await {
                Some(message) => {
                    warn!(status = status.as_u16(), provider_message = %message, "Write rejected");
                    Err(SiteError::WriteRejected {
                        status: status.as_u16(),
                        message,
                    })
                }
                None => Err(SiteError::StoreUnavailable(format!(
                    "write returned {} without a message",
                    status
                ))),
            };
        }

        // The write has landed; an odd response body must not turn it into a failure
        let parsed: PutContentsResponse = match response.json().await {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "Write succeeded but response body was unreadable");
                PutContentsResponse::default()
            }
        };

        let receipt = WriteReceipt {
            revision: parsed.content.map(|c| RevisionToken::new(c.sha)),
            change_id: parsed.commit.map(|c| c.sha),
        };
        info!(
            commit_message = %message,
            commit = receipt.change_id.as_deref().unwrap_or("unknown"),
            "Poem collection committed"
        );
        Ok(receipt)
    }

    fn describe(&self) -> String {
        format!("{} ({})", self.contents_url, self.branch)
    }
}
