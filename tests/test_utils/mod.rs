//! Test utilities for exercising the API in-process.
//!
//! Every test gets its own in-memory SQLite database with all migrations
//! applied, and talks to the router through `tower::ServiceExt::oneshot`.

#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};
use serde_json::{Value, json};
use taller::{
    config::AppConfig,
    models::user::Role,
    notifications::{NoopNotifier, Notifier},
    repositories::{TenantRepository, UserRepository, tenant::TenantInput, user::NewUser},
    server::{AppState, create_app},
    tenant::TenantId,
};
use tower::ServiceExt;
use uuid::Uuid;

pub const OPERATOR_TOKEN: &str = "test-operator-token";
pub const SESSION_SECRET: &str = "test-session-secret-0123456789abcdef";
pub const PASSWORD: &str = "correct horse battery";

/// Sets up an in-memory SQLite database with all migrations applied.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await?;
    Migrator::up(&db, None).await?;
    db.execute(Statement::from_string(
        db.get_database_backend(),
        "PRAGMA foreign_keys = ON".to_string(),
    ))
    .await?;
    Ok(db)
}

pub fn test_config() -> AppConfig {
    AppConfig {
        profile: "test".to_string(),
        operator_tokens: vec![OPERATOR_TOKEN.to_string()],
        session_secret: SESSION_SECRET.to_string(),
        ..Default::default()
    }
}

/// Router plus direct handles on its state for fixtures and assertions.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    pub async fn new() -> Result<Self> {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(config: AppConfig) -> Result<Self> {
        Self::with_notifier(config, Arc::new(NoopNotifier)).await
    }

    pub async fn with_notifier(config: AppConfig, notifier: Arc<dyn Notifier>) -> Result<Self> {
        let db = setup_test_db().await?;
        let state = AppState::new(config, db, notifier);
        Ok(Self {
            router: create_app(state.clone()),
            state,
        })
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.state.db
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    pub async fn get(&self, path: &str, token: &str) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .uri(path)
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn post(&self, path: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(json_request("POST", path, Some(token), body)).await
    }

    pub async fn put(&self, path: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(json_request("PUT", path, Some(token), body)).await
    }

    pub async fn delete(&self, path: &str, token: &str) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .method("DELETE")
                .uri(path)
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    /// Shop with one admin user; returns the tenant id and a session token.
    pub async fn shop(&self, name: &str, email: &str) -> Result<(Uuid, String)> {
        let tenant = TenantRepository::new(self.db())
            .create(TenantInput {
                name: name.to_string(),
                domain: None,
                email: email.to_string(),
                phone: None,
            })
            .await?;
        let user = UserRepository::new(self.db())
            .create(
                TenantId::from(tenant.id),
                NewUser {
                    email: email.to_string(),
                    name: "Admin".to_string(),
                    password: PASSWORD.to_string(),
                    role: Role::Admin,
                },
            )
            .await?;
        let token = self.token_for(user.id, tenant.id, email)?;
        Ok((tenant.id, token))
    }

    pub fn token_for(&self, user_id: Uuid, tenant_id: Uuid, email: &str) -> Result<String> {
        let (token, _) = self.state.resolver.keys().issue(
            user_id,
            TenantId::from(tenant_id),
            email,
            Role::Admin,
        )?;
        Ok(token)
    }

    pub async fn create_customer(&self, token: &str, cedula: &str) -> Value {
        let (status, body) = self
            .post(
                "/api/v1/customers",
                token,
                json!({
                    "name": format!("Cliente {cedula}"),
                    "email": format!("{cedula}@example.com"),
                    "cedula": cedula,
                    "phone": "+57 300 123 4567",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body
    }

    pub async fn create_motorcycle(&self, token: &str, customer_id: &str, plate: &str) -> Value {
        let (status, body) = self
            .post(
                "/api/v1/motorcycles",
                token,
                json!({
                    "customer_id": customer_id,
                    "plate": plate,
                    "brand": "Yamaha",
                    "model": "FZ 2.0",
                    "year": 2022,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body
    }

    pub async fn create_technician(&self, token: &str, name: &str) -> Value {
        let (status, body) = self
            .post("/api/v1/technicians", token, json!({ "name": name }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body
    }

    pub async fn create_item(&self, token: &str, sku: &str, quantity: i32, unit_price: i64) -> Value {
        let (status, body) = self
            .post(
                "/api/v1/inventory",
                token,
                json!({
                    "sku": sku,
                    "name": format!("Repuesto {sku}"),
                    "category": "repuesto",
                    "quantity": quantity,
                    "unit_price": unit_price,
                    "min_stock": 1,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body
    }

    pub async fn create_work_order(&self, token: &str, motorcycle_id: &str, technician_id: &str) -> Value {
        let (status, body) = self
            .post(
                "/api/v1/work-orders",
                token,
                json!({
                    "motorcycle_id": motorcycle_id,
                    "technician_id": technician_id,
                    "description": "Cambio de pastillas de freno",
                    "labor_cost": 30_000,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body
    }
}

pub fn json_request(method: &str, path: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn id(value: &Value) -> String {
    value["id"].as_str().unwrap().to_string()
}
