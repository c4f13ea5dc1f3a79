//! GitHubStore against a mock hosted API

use quire_common::config::SiteConfig;
use quire_common::Poem;
use quire_site::session::BearerToken;
use quire_site::store::codec::decode_transport;
use quire_site::store::{ContentStore, GitHubStore, RevisionToken};
use quire_site::{PoemRepository, SiteError};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, header_regex, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RAW_PATH: &str = "/poet/verses/main/poems.json";
const CONTENTS_PATH: &str = "/repos/poet/verses/contents/poems.json";

fn config_for(server: &MockServer, timeout: Duration) -> SiteConfig {
    SiteConfig {
        owner: "poet".to_string(),
        repo: "verses".to_string(),
        branch: "main".to_string(),
        path: "poems.json".to_string(),
        raw_host: server.uri(),
        api_host: server.uri(),
        timeout,
        page_size: 9,
        data_dir: PathBuf::from("/tmp/quire-test"),
        log_level: "info".to_string(),
    }
}

fn store_for(server: &MockServer) -> GitHubStore {
    GitHubStore::new(&config_for(server, Duration::from_secs(5))).unwrap()
}

fn auth() -> BearerToken {
    BearerToken::new("ghp_test").unwrap()
}

fn collection_json() -> Value {
    json!([
        {
            "id": "1",
            "title": "A",
            "content": "x y z",
            "tags": ["love"],
            "lastUpdated": "2024-01-01T00:00:00.000Z"
        },
        {
            "id": 2,
            "title": "B",
            "content": "p q",
            "date": "2023-06-01T00:00:00.000Z"
        }
    ])
}

#[tokio::test]
async fn test_read_sends_cache_buster_and_decodes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(RAW_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(collection_json()))
        .mount(&server)
        .await;

    let poems = store_for(&server).read_collection().await.unwrap();
    assert_eq!(poems.len(), 2);
    assert_eq!(poems[1].id, "2");
    assert!(poems[1].tags.is_empty());

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let t = requests[0]
        .url
        .query_pairs()
        .find(|(k, _)| k == "t")
        .map(|(_, v)| v.into_owned())
        .expect("t parameter present");
    assert!(t.parse::<i64>().unwrap() > 0);
    assert!(requests[0].headers.get("user-agent").is_some());
}

#[tokio::test]
async fn test_read_missing_document_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(RAW_PATH))
        .respond_with(ResponseTemplate::new(404).set_body_string("404: Not Found"))
        .mount(&server)
        .await;

    assert!(store_for(&server).read_collection().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_read_server_error_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(RAW_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    assert!(matches!(
        store_for(&server).read_collection().await,
        Err(SiteError::StoreUnavailable(_))
    ));
}

#[tokio::test]
async fn test_read_malformed_body_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(RAW_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"not\": \"an array\"}"))
        .mount(&server)
        .await;

    assert!(matches!(
        store_for(&server).read_collection().await,
        Err(SiteError::StoreUnavailable(_))
    ));
}

#[tokio::test]
async fn test_read_timeout_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(RAW_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let store = GitHubStore::new(&config_for(&server, Duration::from_millis(200))).unwrap();
    match store.read_collection().await {
        Err(SiteError::StoreUnavailable(reason)) => assert!(reason.contains("timed out")),
        other => panic!("expected timeout, got {other:?}"),
    }
}

#[tokio::test]
async fn test_revision_token_sends_ref_and_bearer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CONTENTS_PATH))
        .and(query_param("ref", "main"))
        .and(header("authorization", "Bearer ghp_test"))
        .and(header("accept", "application/vnd.github.v3+json"))
        .and(header_regex("user-agent", "^quire/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "poems.json",
            "sha": "abc123",
            "size": 42
        })))
        .mount(&server)
        .await;

    let token = store_for(&server).revision_token(&auth()).await.unwrap();
    assert_eq!(token, Some(RevisionToken::new("abc123")));
}

#[tokio::test]
async fn test_revision_token_missing_document_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CONTENTS_PATH))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})))
        .mount(&server)
        .await;

    assert_eq!(store_for(&server).revision_token(&auth()).await.unwrap(), None);
}

#[tokio::test]
async fn test_revision_token_bad_credentials_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CONTENTS_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Bad credentials"})))
        .mount(&server)
        .await;

    match store_for(&server).revision_token(&auth()).await {
        Err(SiteError::WriteRejected { status, message }) => {
            assert_eq!(status, 401);
            assert_eq!(message, "Bad credentials");
        }
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn test_write_update_includes_sha_and_encoded_content() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(CONTENTS_PATH))
        .and(header("authorization", "Bearer ghp_test"))
        .and(body_partial_json(json!({
            "message": "Update poem: A",
            "branch": "main",
            "sha": "abc123"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": {"sha": "def456"},
            "commit": {"sha": "c0ffee"}
        })))
        .mount(&server)
        .await;

    let data = vec![Poem::new("1", "A", "line one\nline \"two\" दिल", vec![])
        .with_last_updated("2024-01-01T00:00:00.000Z")];
    let receipt = store_for(&server)
        .write_collection(&auth(), &data, Some(&RevisionToken::new("abc123")), "Update poem: A")
        .await
        .unwrap();

    assert_eq!(receipt.revision, Some(RevisionToken::new("def456")));
    assert_eq!(receipt.change_id.as_deref(), Some("c0ffee"));

    let requests = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    let content = body["content"].as_str().unwrap();
    assert_eq!(decode_transport(content).unwrap(), data);
}

#[tokio::test]
async fn test_write_create_omits_sha() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(CONTENTS_PATH))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "content": {"sha": "new1"},
            "commit": {"sha": "c1"}
        })))
        .mount(&server)
        .await;

    store_for(&server)
        .write_collection(&auth(), &[], None, "Add new poem: A")
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert!(body.get("sha").is_none());
    assert_eq!(body["branch"], "main");
}

#[tokio::test]
async fn test_write_conflict_message_is_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(CONTENTS_PATH))
        .respond_with(
            ResponseTemplate::new(409)
                .set_body_json(json!({"message": "poems.json does not match abc123"})),
        )
        .mount(&server)
        .await;

    let result = store_for(&server)
        .write_collection(&auth(), &[], Some(&RevisionToken::new("abc123")), "Update poem: A")
        .await;
    match result {
        Err(err @ SiteError::WriteRejected { .. }) => {
            assert_eq!(err.to_string(), "Write rejected (409): poems.json does not match abc123");
        }
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn test_write_error_without_message_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(CONTENTS_PATH))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad gateway</html>"))
        .mount(&server)
        .await;

    assert!(matches!(
        store_for(&server)
            .write_collection(&auth(), &[], None, "Add new poem: A")
            .await,
        Err(SiteError::StoreUnavailable(_))
    ));
}

#[tokio::test]
async fn test_repository_upsert_runs_read_token_write() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(RAW_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(collection_json()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(CONTENTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"sha": "abc123"})))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(CONTENTS_PATH))
        .and(body_partial_json(json!({"message": "Add new poem: Fresh", "sha": "abc123"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": {"sha": "def456"},
            "commit": {"sha": "c0ffee"}
        })))
        .mount(&server)
        .await;

    let mut repo = PoemRepository::new(Arc::new(store_for(&server)));
    let saved = repo
        .upsert(Poem::new("", "Fresh", "new lines", vec![]), Some(&auth()))
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let put = requests
        .iter()
        .find(|r| r.method.as_str() == "PUT")
        .expect("a PUT was sent");
    let body: Value = serde_json::from_slice(&put.body).unwrap();
    let written = decode_transport(body["content"].as_str().unwrap()).unwrap();

    assert_eq!(written.len(), 3);
    assert_eq!(written[0], saved);
    // The legacy record keeps its uninterpreted field
    assert_eq!(written[2].extra["date"], json!("2023-06-01T00:00:00.000Z"));
}
