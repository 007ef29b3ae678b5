//! Wire-level tests for the Vault client against a mock server.

use dockhand_core::Error;
use dockhand_core::vault::{EffectiveVaultConfig, VaultCredentials};
use dockhand_vault::VaultClient;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(address: &str) -> EffectiveVaultConfig {
    EffectiveVaultConfig {
        address: address.to_string(),
        namespace: None,
        default_path: "secret/app".to_string(),
        skip_tls_verify: false,
        request_timeout_secs: 5,
        credentials: VaultCredentials::Token {
            token: "root".to_string(),
        },
    }
}

fn config_with_namespace(address: &str, namespace: &str) -> EffectiveVaultConfig {
    EffectiveVaultConfig {
        namespace: Some(namespace.to_string()),
        ..config(address)
    }
}

async fn mount_lookup_self(server: &MockServer, token: &str) {
    Mock::given(method("GET"))
        .and(path("/v1/auth/token/lookup-self"))
        .and(header("X-Vault-Token", token))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"id": token}})))
        .mount(server)
        .await;
}

#[tokio::test]
async fn token_auth_validates_with_self_lookup() {
    let server = MockServer::start().await;
    mount_lookup_self(&server, "root").await;

    let client = VaultClient::new(&config(&server.uri())).unwrap();
    client.authenticate_token("root").await.unwrap();
}

#[tokio::test]
async fn token_auth_surfaces_upstream_detail() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/auth/token/lookup-self"))
        .respond_with(
            ResponseTemplate::new(403).set_body_json(json!({"errors": ["permission denied"]})),
        )
        .mount(&server)
        .await;

    let client = VaultClient::new(&config(&server.uri())).unwrap();
    let err = client.authenticate_token("bad").await.unwrap_err();
    assert!(matches!(err, Error::Auth(_)));
    let message = err.to_string();
    assert!(message.contains("403"));
    assert!(message.contains("permission denied"));
}

#[tokio::test]
async fn approle_login_issues_session_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/auth/approle/login"))
        .and(body_json(json!({"role_id": "r-1", "secret_id": "s-1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "auth": {"client_token": "s.issued", "lease_duration": 3600}
        })))
        .mount(&server)
        .await;
    // The issued token must be the one used for subsequent reads.
    Mock::given(method("GET"))
        .and(path("/v1/secret/data/app"))
        .and(header("X-Vault-Token", "s.issued"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"data": {"pw": "x"}, "metadata": {"version": 1}}
        })))
        .mount(&server)
        .await;

    let client = VaultClient::new(&config(&server.uri())).unwrap();
    let session = client.authenticate_approle("r-1", "s-1").await.unwrap();
    let data = session.read_secret("secret/app").await.unwrap();
    assert_eq!(data.get("pw").map(String::as_str), Some("x"));
}

#[tokio::test]
async fn approle_login_without_token_is_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/auth/approle/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"auth": null})))
        .mount(&server)
        .await;

    let client = VaultClient::new(&config(&server.uri())).unwrap();
    let err = client.authenticate_approle("r-1", "s-1").await.unwrap_err();
    assert!(err.to_string().contains("no client token"));
}

#[tokio::test]
async fn kubernetes_login_exchanges_jwt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/auth/kubernetes/login"))
        .and(body_json(json!({"role": "dockhand", "jwt": "sa-jwt"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "auth": {"client_token": "s.kube"}
        })))
        .mount(&server)
        .await;

    let client = VaultClient::new(&config(&server.uri())).unwrap();
    client.kubernetes_login("dockhand", "sa-jwt").await.unwrap();
}

#[tokio::test]
async fn kubernetes_login_without_token_is_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/auth/kubernetes/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let client = VaultClient::new(&config(&server.uri())).unwrap();
    let err = client.kubernetes_login("dockhand", "jwt").await.unwrap_err();
    assert!(matches!(err, Error::Auth(_)));
}

#[tokio::test]
async fn read_normalizes_raw_paths() {
    let server = MockServer::start().await;
    mount_lookup_self(&server, "root").await;
    Mock::given(method("GET"))
        .and(path("/v1/secret/data/myapp"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"data": {"key": "value"}, "metadata": {"version": 2}}
        })))
        .mount(&server)
        .await;

    let client = VaultClient::new(&config(&server.uri())).unwrap();
    let session = client.authenticate_token("root").await.unwrap();
    // The raw path lacks the data segment; the client injects it.
    let data = session.read_secret("secret/myapp").await.unwrap();
    assert_eq!(data.get("key").map(String::as_str), Some("value"));
}

#[tokio::test]
async fn read_accepts_v1_payload() {
    let server = MockServer::start().await;
    mount_lookup_self(&server, "root").await;
    Mock::given(method("GET"))
        .and(path("/v1/legacy/data/creds"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data": {"api_key": "zzz"}})),
        )
        .mount(&server)
        .await;

    let client = VaultClient::new(&config(&server.uri())).unwrap();
    let session = client.authenticate_token("root").await.unwrap();
    let data = session.read_secret("legacy/creds").await.unwrap();
    assert_eq!(data.get("api_key").map(String::as_str), Some("zzz"));
}

#[tokio::test]
async fn get_secrets_omits_missing_keys() {
    let server = MockServer::start().await;
    mount_lookup_self(&server, "root").await;
    Mock::given(method("GET"))
        .and(path("/v1/secret/data/app"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"data": {"a": "va"}, "metadata": {}}
        })))
        .mount(&server)
        .await;

    let client = VaultClient::new(&config(&server.uri())).unwrap();
    let session = client.authenticate_token("root").await.unwrap();
    let found = session
        .get_secrets("secret/app", &["a".to_string(), "b".to_string()])
        .await
        .unwrap();
    assert_eq!(found, vec![("a".to_string(), "va".to_string())]);
}

#[tokio::test]
async fn namespace_header_attached_to_every_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/auth/token/lookup-self"))
        .and(header("X-Vault-Namespace", "team-a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {}})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/secret/data/app"))
        .and(header("X-Vault-Namespace", "team-a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"data": {"k": "v"}, "metadata": {}}
        })))
        .mount(&server)
        .await;

    let client = VaultClient::new(&config_with_namespace(&server.uri(), "team-a")).unwrap();
    let session = client.authenticate_token("root").await.unwrap();
    let data = session.read_secret("secret/app").await.unwrap();
    assert_eq!(data.get("k").map(String::as_str), Some("v"));
}

#[tokio::test]
async fn read_failure_concatenates_status_and_body() {
    let server = MockServer::start().await;
    mount_lookup_self(&server, "root").await;
    Mock::given(method("GET"))
        .and(path("/v1/secret/data/gone"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no handler for route"))
        .mount(&server)
        .await;

    let client = VaultClient::new(&config(&server.uri())).unwrap();
    let session = client.authenticate_token("root").await.unwrap();
    let err = session.read_secret("secret/gone").await.unwrap_err();
    assert!(matches!(err, Error::Transport(_)));
    let message = err.to_string();
    assert!(message.contains("404"));
    assert!(message.contains("no handler for route"));
}

#[tokio::test]
async fn test_connection_reports_version() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/sys/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "initialized": true, "sealed": false, "version": "1.15.2"
        })))
        .mount(&server)
        .await;

    let client = VaultClient::new(&config(&server.uri())).unwrap();
    let report = client.test_connection().await;
    assert!(report.success);
    assert_eq!(report.version.as_deref(), Some("1.15.2"));
    assert!(report.error.is_none());
}

#[tokio::test]
async fn test_connection_never_fails() {
    // Nothing listens here; the probe must still return a report.
    let client = VaultClient::new(&config("http://127.0.0.1:1")).unwrap();
    let report = client.test_connection().await;
    assert!(!report.success);
    assert!(report.error.is_some());
}
