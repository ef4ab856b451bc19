//! npm registry client against a mocked registry

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{header, header_exists, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use npmdesc_lsp::registries::npm::NpmRegistry;
use npmdesc_lsp::registries::{Registry, RegistryError};

fn registry(server: &MockServer) -> NpmRegistry {
    NpmRegistry::with_base_url(Arc::new(reqwest::Client::new()), &server.uri())
}

#[tokio::test]
async fn test_fetch_package_decodes_document() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/axios"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "axios",
            "description": "Promise based HTTP client",
            "dist-tags": { "latest": "1.6.0" },
            "time": { "1.6.0": "2023-10-26T14:00:00.000Z" },
            "author": "Matt Zabriskie <mzabriskie@example.com>",
            "versions": {}
        })))
        .mount(&server)
        .await;

    let pkg = registry(&server).fetch_package("axios", None).await.unwrap();
    assert_eq!(pkg.latest_version(), Some("1.6.0"));
    assert_eq!(pkg.author_name(), Some("Matt Zabriskie"));
    assert!(pkg.homepage.is_none());
    assert!(pkg.latest_release_date().is_some());
}

#[tokio::test]
async fn test_not_found_is_status_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ghost"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = registry(&server).fetch_package("ghost", None).await.unwrap_err();
    assert!(matches!(err, RegistryError::Status { status: 404, .. }));
}

#[tokio::test]
async fn test_malformed_body_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let err = registry(&server).fetch_package("broken", None).await.unwrap_err();
    assert!(matches!(err, RegistryError::Decode { .. }));
}

#[tokio::test]
async fn test_bearer_header_only_with_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/with-token"))
        .and(header("authorization", "Bearer npm_abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": "with-token" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/without-token"))
        .respond_with(|req: &Request| {
            if req.headers.contains_key("authorization") {
                ResponseTemplate::new(400)
            } else {
                ResponseTemplate::new(200).set_body_json(json!({ "name": "without-token" }))
            }
        })
        .expect(1)
        .mount(&server)
        .await;

    let npm = registry(&server);
    assert!(npm.fetch_package("with-token", Some("npm_abc")).await.is_ok());
    assert!(npm.fetch_package("without-token", None).await.is_ok());
    // an empty token is the same as none
    assert!(npm.fetch_package("with-token", Some("")).await.is_err());
}

#[tokio::test]
async fn test_auth_header_matcher_sees_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    assert!(
        registry(&server)
            .fetch_package("anything", Some("tok"))
            .await
            .is_ok()
    );
}
