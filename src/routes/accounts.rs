use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::Method;
use axum::routing::get;
use axum::{Json, Router};
use tracing::{error, info};

use crate::errors::AppError;
use crate::models::{Account, CreateAccountRequest};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/account",
            get(list_accounts)
                .post(create_account)
                .delete(delete_without_id)
                .fallback(method_not_allowed),
        )
        .route(
            "/account/:id",
            get(get_account)
                .delete(delete_account)
                .fallback(method_not_allowed),
        )
}

fn parse_id(raw: &str) -> Result<i32, AppError> {
    raw.parse::<i32>()
        .map_err(|_| AppError::Validation(format!("invalid id given {}", raw)))
}

pub async fn list_accounts(
    State(state): State<AppState>,
) -> Result<Json<Vec<Account>>, AppError> {
    info!("GET /account - Fetching all accounts");
    let accounts = state.store.get_accounts().await.map_err(|e| {
        error!("Failed to fetch accounts: {}", e);
        AppError::from(e)
    })?;
    Ok(Json(accounts))
}

pub async fn create_account(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Account>, AppError> {
    info!("POST /account - Creating account");
    // Decoded regardless of Content-Type
    let req: CreateAccountRequest = serde_json::from_slice(&body)
        .map_err(|e| AppError::Decode(format!("invalid account request: {}", e)))?;

    let account = state
        .store
        .create_account(Account::from(req))
        .await
        .map_err(|e| {
            error!("Failed to create account: {}", e);
            AppError::from(e)
        })?;
    info!("Created account {}", account.id);
    Ok(Json(account))
}

pub async fn get_account(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<Account>, AppError> {
    info!("GET /account/{} - Fetching account", raw_id);
    let id = parse_id(&raw_id)?;
    let account = state.store.get_account_by_id(id).await.map_err(|e| {
        error!("Failed to fetch account {}: {}", id, e);
        AppError::from(e)
    })?;
    Ok(Json(account))
}

pub async fn delete_account(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<String>, AppError> {
    info!("DELETE /account/{} - Deleting account", raw_id);
    let id = parse_id(&raw_id)?;
    state.store.delete_account(id).await.map_err(|e| {
        error!("Failed to delete account {}: {}", id, e);
        AppError::from(e)
    })?;
    Ok(Json(format!("account {} deleted", id)))
}

async fn delete_without_id() -> AppError {
    AppError::Validation("missing account id".to_string())
}

async fn method_not_allowed(method: Method) -> AppError {
    AppError::MethodNotAllowed(method)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use chrono::{DateTime, SubsecRound, Utc};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::app::create_app;
    use crate::auth::{issue_test_token, TokenVerifier};
    use crate::storage::{MemoryStore, Storage, StorageError};

    /// Counts every storage call so tests can assert a request never got
    /// past input validation.
    #[derive(Default)]
    struct CountingStore {
        calls: AtomicUsize,
        inner: MemoryStore,
    }

    impl CountingStore {
        fn hit(&self) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl Storage for CountingStore {
        async fn create_account(&self, account: Account) -> Result<Account, StorageError> {
            self.hit();
            self.inner.create_account(account).await
        }
        async fn delete_account(&self, id: i32) -> Result<(), StorageError> {
            self.hit();
            self.inner.delete_account(id).await
        }
        async fn update_account(&self, account: &Account) -> Result<(), StorageError> {
            self.hit();
            self.inner.update_account(account).await
        }
        async fn get_account_by_id(&self, id: i32) -> Result<Account, StorageError> {
            self.hit();
            self.inner.get_account_by_id(id).await
        }
        async fn get_accounts(&self) -> Result<Vec<Account>, StorageError> {
            self.hit();
            self.inner.get_accounts().await
        }
        async fn ping(&self) -> Result<(), StorageError> {
            self.inner.ping().await
        }
    }

    fn app() -> Router {
        create_app(AppState::new(Arc::new(MemoryStore::new())), None)
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn create(app: &Router, first: &str, last: &str) -> Value {
        let (status, body) = send(
            app,
            Method::POST,
            "/account",
            Some(json!({ "first_name": first, "last_name": last })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body
    }

    #[tokio::test]
    async fn test_create_account_assigns_server_fields() {
        let app = app();
        let started = Utc::now().trunc_subsecs(6);

        let body = create(&app, "Ada", "Lovelace").await;

        assert!(body["id"].as_i64().unwrap() > 0);
        assert_eq!(body["first_name"], "Ada");
        assert_eq!(body["last_name"], "Lovelace");
        assert_eq!(body["balance"], 0);
        let number = body["number"].as_i64().unwrap();
        assert!((0..100_000).contains(&number));
        let created_at: DateTime<Utc> = body["created_at"].as_str().unwrap().parse().unwrap();
        assert!(created_at >= started);
    }

    #[tokio::test]
    async fn test_list_returns_every_created_account() {
        let app = app();
        let (_, empty) = send(&app, Method::GET, "/account", None).await;
        assert_eq!(empty, json!([]));

        for i in 0..5 {
            create(&app, &format!("first{}", i), "last").await;
        }

        let (status, body) = send(&app, Method::GET, "/account", None).await;
        assert_eq!(status, StatusCode::OK);
        let accounts = body.as_array().unwrap();
        assert_eq!(accounts.len(), 5);

        let mut ids: Vec<i64> = accounts.iter().map(|a| a["id"].as_i64().unwrap()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 5);
    }

    #[tokio::test]
    async fn test_list_is_stable_without_writes() {
        let app = app();
        create(&app, "Ada", "Lovelace").await;
        create(&app, "Alan", "Turing").await;

        let (_, first) = send(&app, Method::GET, "/account", None).await;
        let (_, second) = send(&app, Method::GET, "/account", None).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_get_by_id_returns_created_account() {
        let app = app();
        let created = create(&app, "Grace", "Hopper").await;
        let id = created["id"].as_i64().unwrap();

        let (status, fetched) = send(&app, Method::GET, &format!("/account/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_get_missing_account_is_not_found() {
        let app = app();
        let created = create(&app, "Ada", "Lovelace").await;
        let missing = created["id"].as_i64().unwrap() + 100;

        let (status, body) = send(&app, Method::GET, &format!("/account/{}", missing), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(
            body["error"],
            format!("account with id {} was not found", missing)
        );
    }

    #[tokio::test]
    async fn test_non_numeric_id_never_reaches_storage() {
        let store = Arc::new(CountingStore::default());
        let app = create_app(AppState::new(store.clone()), None);

        let (status, body) = send(&app, Method::GET, "/account/abc", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid id given abc");

        let (status, _) = send(&app, Method::DELETE, "/account/abc", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_delete_then_get_is_not_found() {
        let app = app();
        let created = create(&app, "Ada", "Lovelace").await;
        let uri = format!("/account/{}", created["id"]);

        let (status, body) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.as_str().unwrap().contains("deleted"));

        let (status, _) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_delete_without_id_is_rejected() {
        let app = app();
        create(&app, "Ada", "Lovelace").await;

        let (status, body) = send(&app, Method::DELETE, "/account", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "missing account id");

        let (_, all) = send(&app, Method::GET, "/account", None).await;
        assert_eq!(all.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_body_is_a_decode_error() {
        let app = app();

        let (status, body) =
            send(&app, Method::POST, "/account", Some(json!({ "first_name": 12 }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let (status, body) = send(&app, Method::POST, "/account", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("missing field `first_name`"));

        let request = Request::builder()
            .method(Method::POST)
            .uri("/account")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let request = Request::builder()
            .method(Method::POST)
            .uri("/account")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_ignores_content_type() {
        let app = app();
        let payload = r#"{"first_name":"Ada","last_name":"Lovelace"}"#;

        for content_type in [None, Some("text/plain"), Some("application/x-www-form-urlencoded")] {
            let mut builder = Request::builder().method(Method::POST).uri("/account");
            if let Some(content_type) = content_type {
                builder = builder.header(header::CONTENT_TYPE, content_type);
            }
            let response = app
                .clone()
                .oneshot(builder.body(Body::from(payload)).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK, "content type {:?}", content_type);

            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let created: Value = serde_json::from_slice(&bytes).unwrap();
            assert_eq!(created["first_name"], "Ada");
            assert!(created["id"].as_i64().unwrap() > 0);
        }

        let (_, all) = send(&app, Method::GET, "/account", None).await;
        assert_eq!(all.as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_unsupported_method_is_rejected() {
        let app = app();

        let (status, body) = send(&app, Method::PUT, "/account", None).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body["error"], "method not allowed PUT");

        let (status, body) = send(&app, Method::PATCH, "/account/1", None).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body["error"], "method not allowed PATCH");
    }

    #[tokio::test]
    async fn test_token_required_when_auth_enabled() {
        let verifier = TokenVerifier::new("secret");
        let app = create_app(AppState::new(Arc::new(MemoryStore::new())), Some(verifier));

        let (status, body) = send(&app, Method::GET, "/account", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "missing bearer token");

        let token = issue_test_token("secret", "ada", 3600);
        let request = Request::builder()
            .uri("/account")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let (status, _) = send(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
    }
}
