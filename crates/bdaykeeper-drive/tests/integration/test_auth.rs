//! Integration tests for the refresh-token grant

use bdaykeeper_core::ports::{ICredentialSource, Tokens};
use bdaykeeper_drive::auth::{KeyringCredentialSource, OAuth2Config, RefreshTokenFlow};
use chrono::{Duration, Utc};
use wiremock::{
    matchers::{body_string_contains, method, path},
    Mock, MockServer, ResponseTemplate,
};

async fn mount_token_endpoint(server: &MockServer, access_token: &str) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=stored-refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": access_token,
            "token_type": "Bearer",
            "expires_in": 3599,
        })))
        .mount(server)
        .await;
}

fn flow(server: &MockServer) -> RefreshTokenFlow {
    let config = OAuth2Config::new("client-123").with_token_url(format!("{}/token", server.uri()));
    RefreshTokenFlow::new(&config).expect("valid flow")
}

#[tokio::test]
async fn test_refresh_keeps_old_refresh_token() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, "new-access").await;

    let tokens = flow(&server)
        .refresh("stored-refresh")
        .await
        .expect("refresh failed");

    assert_eq!(tokens.access_token, "new-access");
    assert_eq!(tokens.refresh_token.as_deref(), Some("stored-refresh"));
    assert!(tokens.expires_at > Utc::now() + Duration::minutes(55));
}

#[tokio::test]
async fn test_expiring_token_is_refreshed_once() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, "refreshed").await;

    let source = KeyringCredentialSource::in_memory(
        Tokens {
            access_token: "about-to-expire".into(),
            refresh_token: Some("stored-refresh".into()),
            expires_at: Utc::now() + Duration::minutes(2),
        },
        flow(&server),
    );

    assert_eq!(source.tokens().await.unwrap().access_token, "refreshed");
    // The refreshed token is cached and valid for an hour
    assert_eq!(source.tokens().await.unwrap().access_token, "refreshed");
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_rejected_refresh_is_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "invalid_grant",
            "error_description": "Token has been expired or revoked."
        })))
        .mount(&server)
        .await;

    assert!(flow(&server).refresh("revoked").await.is_err());
}
