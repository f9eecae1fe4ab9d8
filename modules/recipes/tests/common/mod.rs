#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use serde_json::Value;
use tower::ServiceExt;

use recipes::domain::recipes::{RecipesService, RecipesServiceConfig};
use recipes::domain::users::{UsersConfig, UsersService};
use recipes::infra::storage::migrations::Migrator;
use recipes::infra::storage::sea_orm_repo::{SeaOrmRecipesRepository, SeaOrmUsersRepository};

/// Fresh migrated in-memory database. One pooled connection, so every
/// query sees the same database.
pub async fn create_test_db() -> DatabaseConnection {
    let mut opts = ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1).min_connections(1).sqlx_logging(false);

    let db = Database::connect(opts)
        .await
        .expect("Failed to connect to test database");
    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
    db
}

pub async fn create_test_services() -> (Arc<UsersService>, Arc<RecipesService>) {
    let db = create_test_db().await;
    let users = UsersService::new(
        Arc::new(SeaOrmUsersRepository::new(db.clone())),
        UsersConfig::default(),
    );
    let catalog = RecipesService::new(
        Arc::new(SeaOrmRecipesRepository::new(db)),
        RecipesServiceConfig::default(),
    );
    (Arc::new(users), Arc::new(catalog))
}

/// Mock OpenAPI registry for testing
pub struct MockOpenApiRegistry;

impl modkit::api::OpenApiRegistry for MockOpenApiRegistry {
    fn register_operation(&self, _spec: &modkit::api::OperationSpec) {}

    fn ensure_schema_raw(
        &self,
        name: &str,
        _schemas: Vec<(
            String,
            utoipa::openapi::RefOr<utoipa::openapi::schema::Schema>,
        )>,
    ) -> String {
        name.to_string()
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

pub async fn create_test_router() -> Router {
    let (users, catalog) = create_test_services().await;
    recipes::api::rest::routes::register_routes(Router::new(), &MockOpenApiRegistry, users, catalog)
        .expect("Failed to register routes")
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

/// Send one request; `token` goes into `Authorization: Token <key>`.
pub async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> TestResponse {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        req = req.header(header::AUTHORIZATION, format!("Token {token}"));
    }
    let req = match body {
        Some(json) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string())),
        None => req.body(Body::empty()),
    }
    .unwrap();

    let response = router.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    TestResponse {
        status,
        headers,
        body,
    }
}

/// Register through the API and return a fresh token.
pub async fn signup(router: &Router, email: &str, password: &str) -> String {
    let resp = send(
        router,
        Method::POST,
        "/user/create",
        None,
        Some(serde_json::json!({ "email": email, "password": password, "name": "Test" })),
    )
    .await;
    assert_eq!(resp.status, StatusCode::CREATED, "signup failed: {}", resp.body);

    login(router, email, password).await
}

pub async fn login(router: &Router, email: &str, password: &str) -> String {
    let resp = send(
        router,
        Method::POST,
        "/user/token",
        None,
        Some(serde_json::json!({ "email": email, "password": password })),
    )
    .await;
    assert_eq!(resp.status, StatusCode::OK, "login failed: {}", resp.body);
    resp.body["token"].as_str().unwrap().to_string()
}
