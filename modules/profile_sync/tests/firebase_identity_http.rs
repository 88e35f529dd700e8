use httpmock::prelude::*;
use serde_json::json;
use std::time::Duration;
use url::Url;

use profile_sync::config::FirebaseIdentityConfig;
use profile_sync::domain::ports::{IdentityError, IdentityProvider};
use profile_sync::infra::firebase::FirebaseIdentityProvider;

fn provider(server: &MockServer) -> FirebaseIdentityProvider {
    FirebaseIdentityProvider::new(&FirebaseIdentityConfig {
        api_key: "test-key".into(),
        api_host: Some(Url::parse(&server.base_url()).unwrap()),
        timeout: Duration::from_secs(5),
    })
    .unwrap()
}

#[tokio::test]
async fn sign_up_posts_credentials_and_keeps_display_name() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/accounts:signUp")
                .query_param("key", "test-key")
                .json_body(json!({
                    "email": "ann@example.com",
                    "password": "secret1",
                    "displayName": "Ann",
                    "returnSecureToken": true,
                }));
            then.status(200).json_body(json!({
                "localId": "uid-1",
                "email": "ann@example.com",
                "idToken": "token",
            }));
        })
        .await;

    let identity = provider(&server)
        .sign_up("ann@example.com", "secret1", Some("Ann"))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(identity.identifier, "uid-1");
    assert_eq!(identity.display_name.as_deref(), Some("Ann"));
}

#[tokio::test]
async fn sign_in_returns_local_id() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/accounts:signInWithPassword");
            then.status(200).json_body(json!({
                "localId": "uid-1",
                "email": "ann@example.com",
                "displayName": "",
            }));
        })
        .await;

    let identity = provider(&server)
        .sign_in("ann@example.com", "secret1")
        .await
        .unwrap();

    assert_eq!(identity.identifier, "uid-1");
    assert_eq!(identity.email.as_deref(), Some("ann@example.com"));
    assert!(identity.display_name.is_none());
}

#[tokio::test]
async fn provider_error_codes_are_mapped() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/accounts:signUp");
            then.status(400)
                .json_body(json!({ "error": { "code": 400, "message": "EMAIL_EXISTS" } }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/accounts:signInWithPassword");
            then.status(400).json_body(
                json!({ "error": { "code": 400, "message": "INVALID_LOGIN_CREDENTIALS" } }),
            );
        })
        .await;

    let idp = provider(&server);

    let err = idp.sign_up("ann@example.com", "secret1", None).await.unwrap_err();
    assert_eq!(err, IdentityError::EmailExists);
    let err = idp.sign_in("ann@example.com", "nope").await.unwrap_err();
    assert_eq!(err, IdentityError::InvalidCredentials);
}

#[tokio::test]
async fn outage_is_unavailable() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/accounts:signInWithPassword");
            then.status(503).body("upstream down");
        })
        .await;

    let err = provider(&server)
        .sign_in("ann@example.com", "secret1")
        .await
        .unwrap_err();

    assert!(matches!(err, IdentityError::Unavailable(m) if m.starts_with("503")));
}
