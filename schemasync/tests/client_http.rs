//! Integration tests for the REST client against a local stand-in CMS.
//!
//! These tests verify:
//! - Password login and token verification
//! - Bearer authentication on every schema request
//! - Endpoint shapes for list, create, update and delete
//! - Non-success responses surface their status and raw body

use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use serde_json::{Value, json};

use schemasync::{Credentials, DirectusClient, Record, SchemaApi, SchemaCollection, SyncError};

// ============ Stand-in CMS ============

const ACCESS_TOKEN: &str = "token-123";
const STATIC_TOKEN: &str = "static-token";

#[derive(Debug, Clone)]
struct Received {
    line: String,
    auth: Option<String>,
    body: String,
}

type Log = Arc<Mutex<Vec<Received>>>;

async fn cms(
    State(log): State<Log>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, String) {
    let target = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_default();
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    log.lock().unwrap().push(Received {
        line: format!("{method} {target}"),
        auth: auth.clone(),
        body: body.clone(),
    });

    let path = uri.path();
    if method == Method::POST && path == "/auth/login" {
        let login: Value = serde_json::from_str(&body).unwrap_or_default();
        return if login["password"] == json!("secret") {
            let data = json!({"data": {"access_token": ACCESS_TOKEN, "expires": 900000, "refresh_token": "r"}});
            (StatusCode::OK, data.to_string())
        } else {
            let errors = json!({"errors": [{"message": "Invalid user credentials."}]});
            (StatusCode::UNAUTHORIZED, errors.to_string())
        };
    }

    let authorized = [ACCESS_TOKEN, STATIC_TOKEN]
        .iter()
        .any(|token| auth.as_deref() == Some(format!("Bearer {token}").as_str()));
    if !authorized {
        let errors = json!({"errors": [{"message": "Invalid token"}]});
        return (StatusCode::UNAUTHORIZED, errors.to_string());
    }

    let response = match (method.as_str(), path) {
        ("GET", "/users/me") => json!({"data": {"id": "u1"}}),
        ("GET", "/fields") => json!({"data": [
            {"collection": "posts", "field": "title", "type": "string", "meta": {"system": false}}
        ]}),
        ("GET", "/relations") => json!({"data": null}),
        ("PATCH", "/roles/3") => {
            let errors = json!({"errors": [{"message": "You don't have permission to access this."}]});
            return (StatusCode::FORBIDDEN, errors.to_string());
        }
        ("GET", _) => json!({"data": []}),
        _ => json!({"data": {}}),
    };
    (StatusCode::OK, response.to_string())
}

async fn spawn_cms() -> (String, Log) {
    let log = Log::default();
    let app = Router::new().fallback(cms).with_state(log.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), log)
}

fn admin() -> Credentials {
    Credentials::Password {
        email: "admin@example.com".to_string(),
        password: "secret".to_string(),
    }
}

fn record(value: Value) -> Record {
    value.as_object().cloned().unwrap()
}

fn lines(log: &Log) -> Vec<String> {
    log.lock().unwrap().iter().map(|r| r.line.clone()).collect()
}

// ============ Authentication ============

#[tokio::test]
async fn password_login_authenticates_later_requests() {
    let (url, log) = spawn_cms().await;
    let client = DirectusClient::connect(&format!("{url}/"), admin()).await.unwrap();
    assert_eq!(client.base_url(), url);

    let fields = client.list(SchemaCollection::Fields).await.unwrap();
    assert_eq!(fields.len(), 1);
    assert_eq!(fields[0]["field"], json!("title"));

    let received = log.lock().unwrap().clone();
    assert_eq!(received[0].line, "POST /auth/login");
    assert!(received[0].body.contains("admin@example.com"));
    assert_eq!(received[1].line, "GET /fields?limit=-1");
    assert_eq!(received[1].auth.as_deref(), Some("Bearer token-123"));
}

#[tokio::test]
async fn rejected_login_is_an_authentication_error() {
    let (url, _log) = spawn_cms().await;
    let credentials = Credentials::Password {
        email: "admin@example.com".to_string(),
        password: "wrong".to_string(),
    };

    let err = DirectusClient::connect(&url, credentials).await.err().unwrap();
    assert!(matches!(err, SyncError::Authentication { .. }));
    assert!(err.to_string().contains("Invalid user credentials"));
}

#[tokio::test]
async fn static_token_is_verified_once() {
    let (url, log) = spawn_cms().await;

    let client = DirectusClient::connect(&url, Credentials::Token(STATIC_TOKEN.to_string()))
        .await
        .unwrap();
    client.list(SchemaCollection::Roles).await.unwrap();
    assert_eq!(lines(&log), vec!["GET /users/me", "GET /roles?limit=-1"]);

    let err = DirectusClient::connect(&url, Credentials::Token("revoked".to_string()))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, SyncError::Authentication { .. }));
}

// ============ Mutations ============

#[tokio::test]
async fn mutations_use_schema_endpoints() {
    let (url, log) = spawn_cms().await;
    let client = DirectusClient::connect(&url, admin()).await.unwrap();

    let field = record(json!({"collection": "posts", "field": "title", "type": "string"}));
    client.create(SchemaCollection::Fields, &field).await.unwrap();
    client
        .create(SchemaCollection::Collections, &record(json!({"collection": "events", "fields": []})))
        .await
        .unwrap();
    client
        .update(SchemaCollection::Fields, "posts/title", &field)
        .await
        .unwrap();
    client.delete(SchemaCollection::Relations, "9").await.unwrap();

    assert_eq!(
        lines(&log)[1..].to_vec(),
        vec![
            "POST /fields/posts",
            "POST /collections",
            "PATCH /fields/posts/title",
            "DELETE /relations/9",
        ]
    );
    let created: Value = serde_json::from_str(&log.lock().unwrap()[1].body).unwrap();
    assert_eq!(created, json!({"collection": "posts", "field": "title", "type": "string"}));
}

#[tokio::test]
async fn rejection_carries_status_and_raw_body() {
    let (url, _log) = spawn_cms().await;
    let client = DirectusClient::connect(&url, admin()).await.unwrap();

    let err = client
        .update(SchemaCollection::Roles, "3", &record(json!({"name": "Reviewer"})))
        .await
        .unwrap_err();

    match err {
        SyncError::Api { status, body } => {
            assert_eq!(status, 403);
            assert!(body.contains("You don't have permission"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn list_without_data_array_is_unexpected() {
    let (url, _log) = spawn_cms().await;
    let client = DirectusClient::connect(&url, admin()).await.unwrap();

    let err = client.list(SchemaCollection::Relations).await.unwrap_err();
    assert!(matches!(err, SyncError::UnexpectedResponse { .. }));
    assert!(err.is_remote());
}
