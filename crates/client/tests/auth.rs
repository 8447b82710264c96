//! Authentication headers and token handling against a mock backend.

mod common;

use chrono::Utc;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use certward_client::{ClientError, ClientIdentityStatus, CLIENT_IDENTIFIER};
use certward_config::ClientCertificateConfig;

use common::*;

async fn mount_version(server: &MockServer, auth_header: (&str, &str)) {
    Mock::given(method("GET"))
        .and(path("/vedsdk/systemstatus/version"))
        .and(header(auth_header.0, auth_header.1))
        .and(header("content-type", "application/json"))
        .and(header("cache-control", "no-cache"))
        .and(header("user-agent", CLIENT_IDENTIFIER))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!("22.4")))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_bearer_token_sent_with_fixed_headers() {
    let server = MockServer::start().await;
    let bearer = format!("Bearer {ACCESS_TOKEN}");
    mount_version(&server, ("authorization", &bearer)).await;

    let connector = connector(&server).await;
    connector.backend_version().await.unwrap();
}

#[tokio::test]
async fn test_api_key_sent_without_token() {
    let server = MockServer::start().await;
    mount_version(&server, ("x-venafi-api-key", "legacy-key")).await;

    let connector = connector_with(&server, |config| {
        config.credentials.access_token = None;
        config.credentials.api_key = Some("legacy-key".to_string());
    })
    .await;
    connector.backend_version().await.unwrap();
}

#[tokio::test]
async fn test_bearer_wins_over_api_key() {
    let server = MockServer::start().await;
    let bearer = format!("Bearer {ACCESS_TOKEN}");
    mount_version(&server, ("authorization", &bearer)).await;

    let connector = connector_with(&server, |config| {
        config.credentials.api_key = Some("legacy-key".to_string());
    })
    .await;
    connector.backend_version().await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("x-venafi-api-key").is_none());
}

#[tokio::test]
async fn test_password_grant_then_refresh() {
    let server = MockServer::start().await;
    let now = Utc::now().timestamp();

    // Expires inside the refresh margin, so the next freshness check refreshes.
    Mock::given(method("POST"))
        .and(path("/vedauth/authorize/oauth"))
        .and(body_partial_json(json!({
            "client_id": "certward-sdk",
            "username": "svc-certs",
            "password": "hunter2"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "first",
            "refresh_token": "refresh-1",
            "expires": now + 10,
            "refresh_until": now + 3600,
            "identity": "local:{svc-certs}",
            "scope": "certificate:manage,revoke",
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/vedauth/authorize/token"))
        .and(body_partial_json(json!({"refresh_token": "refresh-1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "second",
            "refresh_token": "refresh-2",
            "expires": now + 3600,
            "refresh_until": now + 7200
        })))
        .expect(1)
        .mount(&server)
        .await;

    let connector = connector_with(&server, |config| {
        config.credentials.access_token = None;
        config.credentials.user = Some("svc-certs".to_string());
        config.credentials.password = Some("hunter2".to_string());
    })
    .await;

    connector.authenticate().await.unwrap();
    let first = connector.tokens().current().unwrap();
    assert_eq!(first.access_token, "first");
    assert_eq!(first.identity, "local:{svc-certs}");

    connector
        .tokens()
        .ensure_fresh(connector.transport())
        .await
        .unwrap();
    let second = connector.tokens().current().unwrap();
    assert_eq!(second.access_token, "second");
    assert_eq!(second.refresh_token.as_deref(), Some("refresh-2"));

    // Fresh now; no further refresh.
    connector
        .tokens()
        .ensure_fresh(connector.transport())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_static_token_is_never_refreshed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/vedauth/authorize/token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let connector = connector(&server).await;
    connector.authenticate().await.unwrap();
    connector
        .tokens()
        .ensure_fresh(connector.transport())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_failed_password_grant() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/vedauth/authorize/oauth"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Username/password combination not valid"
        })))
        .mount(&server)
        .await;

    let connector = connector_with(&server, |config| {
        config.credentials.access_token = None;
        config.credentials.user = Some("svc-certs".to_string());
        config.credentials.password = Some("wrong".to_string());
    })
    .await;

    let err = connector.authenticate().await.unwrap_err();
    assert_eq!(err.status(), Some(400));
    assert!(matches!(err, ClientError::UnexpectedStatus { .. }));
    assert!(connector.tokens().current().is_none());
}

#[tokio::test]
async fn test_revoke_token_forgets_it() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/vedauth/revoke/token"))
        .and(header("authorization", format!("Bearer {ACCESS_TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let connector = connector(&server).await;
    connector.tokens().revoke(connector.transport()).await.unwrap();
    assert!(connector.tokens().current().is_none());
}

#[tokio::test]
async fn test_concurrent_reauthorization_runs_one_grant() {
    let server = MockServer::start().await;
    let now = Utc::now().timestamp();

    // No refresh token, so a stale token can only be replaced by the password grant.
    Mock::given(method("POST"))
        .and(path("/vedauth/authorize/oauth"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "first",
            "expires": now + 10
        })))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/vedauth/authorize/oauth"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "second",
            "expires": now + 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    let connector = connector_with(&server, |config| {
        config.credentials.access_token = None;
        config.credentials.user = Some("svc-certs".to_string());
        config.credentials.password = Some("hunter2".to_string());
    })
    .await;
    connector.authenticate().await.unwrap();

    let tokens = connector.tokens();
    let (a, b) = tokio::join!(
        tokens.ensure_fresh(connector.transport()),
        tokens.ensure_fresh(connector.transport())
    );
    a.unwrap();
    b.unwrap();
    assert_eq!(tokens.current().unwrap().access_token, "second");
}

/// Unencrypted PEM client bundle: self-signed certificate plus its key.
fn client_bundle_file() -> tempfile::NamedTempFile {
    let key = rcgen::KeyPair::generate().unwrap();
    let params = rcgen::CertificateParams::new(vec!["svc-certs.example.com".to_string()]).unwrap();
    let cert = params.self_signed(&key).unwrap();

    let file = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(file.path(), format!("{}{}", cert.pem(), key.serialize_pem())).unwrap();
    file
}

#[tokio::test]
async fn test_certificate_grant_with_client_certificate() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/vedauth/authorize/certificate"))
        .and(body_partial_json(json!({"client_id": "certward-sdk"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "from-certificate",
            "expires": Utc::now().timestamp() + 3600,
            "identity": "local:{svc-certs}"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/vedauth/authorize/oauth"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let bundle = client_bundle_file();
    let connector = connector_with(&server, |config| {
        config.credentials.access_token = None;
        config.credentials.client_certificate = Some(ClientCertificateConfig {
            path: bundle.path().to_path_buf(),
            password: String::new(),
        });
    })
    .await;
    assert_eq!(
        connector.tls().client_identity(),
        &ClientIdentityStatus::Attached { certificates: 1 }
    );

    connector.authenticate().await.unwrap();
    let token = connector.tokens().current().unwrap();
    assert_eq!(token.access_token, "from-certificate");
    assert_eq!(token.identity, "local:{svc-certs}");
}

#[tokio::test]
async fn test_certificate_grant_needs_client_certificate() {
    let server = MockServer::start().await;
    let connector = connector_with(&server, |config| {
        config.credentials.access_token = None;
    })
    .await;

    let err = connector
        .tokens()
        .authorize_certificate(connector.transport())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Authentication(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_api_key_exchange_then_used() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/vedsdk/authorize/"))
        .and(body_partial_json(json!({"Username": "svc-certs", "Password": "hunter2"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "APIKey": "issued-key",
            "ValidUntil": "/Date(1700000000000)/"
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_version(&server, ("x-venafi-api-key", "issued-key")).await;

    let connector = connector_with(&server, |config| {
        config.credentials.access_token = None;
        config.credentials.user = Some("svc-certs".to_string());
        config.credentials.password = Some("hunter2".to_string());
    })
    .await;

    let api_key = connector
        .tokens()
        .authorize_api_key(connector.transport())
        .await
        .unwrap();
    assert_eq!(api_key.key, "issued-key");
    assert_eq!(api_key.valid_until.unwrap().timestamp(), 1_700_000_000);

    connector.backend_version().await.unwrap();
}

#[tokio::test]
async fn test_api_key_exchange_without_key_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/vedsdk/authorize/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"APIKey": ""})))
        .mount(&server)
        .await;

    let connector = connector_with(&server, |config| {
        config.credentials.access_token = None;
        config.credentials.user = Some("svc-certs".to_string());
        config.credentials.password = Some("hunter2".to_string());
    })
    .await;

    let err = connector
        .tokens()
        .authorize_api_key(connector.transport())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ClientError::Decode {
            operation: "authorize_api_key",
            ..
        }
    ));
}

#[tokio::test]
async fn test_verify_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/vedauth/authorize/verify"))
        .and(header("authorization", format!("Bearer {ACCESS_TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "application": "certward-sdk",
            "expires_ISO8601": "2026-11-01T12:00:00Z",
            "identity": "local:{svc-certs}",
            "scope": "certificate:manage",
            "valid_for": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    let connector = connector(&server).await;
    let verification = connector
        .tokens()
        .verify(connector.transport())
        .await
        .unwrap();
    assert_eq!(verification.client_id, "certward-sdk");
    assert_eq!(verification.identity, "local:{svc-certs}");
    assert_eq!(verification.valid_for, 3600);
    assert_eq!(
        verification.expires_at().unwrap().to_rfc3339(),
        "2026-11-01T12:00:00+00:00"
    );
}

#[tokio::test]
async fn test_verify_without_token() {
    let server = MockServer::start().await;
    let connector = connector_with(&server, |config| {
        config.credentials.access_token = None;
    })
    .await;

    let err = connector
        .tokens()
        .verify(connector.transport())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Authentication(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}
