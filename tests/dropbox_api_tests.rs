//! Dropbox client contract tests against a local mock server
//!
//! Exercises the overwrite upload and the two-step idempotent link
//! resolution, including the expected "already exists → list" branch.

use isolator::services::dropbox::{DropboxClient, PublishError};
use serde_json::json;
use std::io::Write;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "dbx-test-token";
const REMOTE: &str = "/Isolator/My Song_2026-08-30T00-00-00-000Z_vocals.wav";

fn client_for(server: &MockServer) -> DropboxClient {
    DropboxClient::new(TOKEN.to_string())
        .unwrap()
        .with_base_urls(server.uri(), server.uri())
}

fn local_artifact() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"RIFF....WAVEfmt ").unwrap();
    file
}

#[tokio::test]
async fn upload_sends_overwrite_mode() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/2/files/upload"))
        .and(header("authorization", format!("Bearer {}", TOKEN).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "My Song_2026-08-30T00-00-00-000Z_vocals.wav",
            "path_display": REMOTE
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let file = local_artifact();
    client.upload(file.path(), REMOTE).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let arg = requests[0]
        .headers
        .get("dropbox-api-arg")
        .expect("Dropbox-API-Arg header")
        .to_str()
        .unwrap();
    let arg: serde_json::Value = serde_json::from_str(arg).unwrap();
    assert_eq!(arg["path"], REMOTE);
    assert_eq!(arg["mode"], "overwrite");
    assert_eq!(arg["autorename"], false);
}

#[tokio::test]
async fn fresh_link_creation_returns_direct_download_form() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/2/sharing/create_shared_link_with_settings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "url": "https://www.dropbox.com/s/abc123/vocals.wav?dl=0"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let link = client.direct_link(REMOTE).await.unwrap();
    assert_eq!(link, "https://www.dropbox.com/s/abc123/vocals.wav?dl=1");
}

#[tokio::test]
async fn existing_link_falls_back_to_listing() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/2/sharing/create_shared_link_with_settings"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "error_summary": "shared_link_already_exists/..",
            "error": { ".tag": "shared_link_already_exists" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/2/sharing/list_shared_links"))
        .and(body_json(json!({ "path": REMOTE, "direct_only": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "links": [
                { "url": "https://www.dropbox.com/s/abc123/vocals.wav?dl=0" }
            ],
            "has_more": false
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let link = client.direct_link(REMOTE).await.unwrap();
    assert_eq!(link, "https://www.dropbox.com/s/abc123/vocals.wav?dl=1");
}

#[tokio::test]
async fn other_link_errors_are_fatal() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/2/sharing/create_shared_link_with_settings"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "error_summary": "path/not_found/..",
            "error": { ".tag": "path" }
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.direct_link(REMOTE).await.unwrap_err();
    assert!(matches!(err, PublishError::LinkFailed(_)));
}

#[tokio::test]
async fn existing_link_with_empty_listing_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/2/sharing/create_shared_link_with_settings"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "error": { ".tag": "shared_link_already_exists" }
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/2/sharing/list_shared_links"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "links": [] })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.direct_link(REMOTE).await.unwrap_err();
    assert!(matches!(err, PublishError::NoExistingLink(_)));
}

#[tokio::test]
async fn upload_with_empty_token_fails_without_network_call() {
    let client = DropboxClient::new(String::new()).unwrap();
    let file = local_artifact();
    let err = client.upload(file.path(), REMOTE).await.unwrap_err();
    assert!(matches!(err, PublishError::MissingToken));
}
