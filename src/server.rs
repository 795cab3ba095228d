//! # Server Configuration
//!
//! Router assembly, shared state and the OpenAPI document for the shop API.

use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post, put},
};
use sea_orm::DatabaseConnection;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::{identity_middleware, operator_middleware};
use crate::config::AppConfig;
use crate::handlers::{
    self, appointments, auth, customers, inventory, motorcycles, sales, technicians, tenants,
    work_orders,
};
use crate::notifications::{NoopNotifier, Notifier, WhatsAppNotifier};
use crate::session::SessionKeys;
use crate::telemetry::trace_middleware;
use crate::tenant::TenantResolver;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DatabaseConnection,
    pub resolver: TenantResolver,
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    pub fn new(config: AppConfig, db: DatabaseConnection, notifier: Arc<dyn Notifier>) -> Self {
        let keys = SessionKeys::new(&config.session_secret, config.session_ttl_seconds);
        Self {
            config: Arc::new(config),
            db,
            resolver: TenantResolver::new(keys),
            notifier,
        }
    }
}

/// WhatsApp when configured, otherwise notifications are dropped.
pub fn build_notifier(config: &AppConfig) -> anyhow::Result<Arc<dyn Notifier>> {
    if config.whatsapp.is_enabled() {
        tracing::info!("WhatsApp notifications enabled");
        Ok(Arc::new(WhatsAppNotifier::new(&config.whatsapp)?))
    } else {
        tracing::info!("WhatsApp notifications disabled");
        Ok(Arc::new(NoopNotifier))
    }
}

fn tenant_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/auth/me", get(auth::me))
        .route(
            "/customers",
            get(customers::list_customers).post(customers::create_customer),
        )
        .route(
            "/customers/{id}",
            get(customers::get_customer)
                .put(customers::update_customer)
                .delete(customers::delete_customer),
        )
        .route(
            "/motorcycles",
            get(motorcycles::list_motorcycles).post(motorcycles::create_motorcycle),
        )
        .route(
            "/motorcycles/{id}",
            get(motorcycles::get_motorcycle)
                .put(motorcycles::update_motorcycle)
                .delete(motorcycles::delete_motorcycle),
        )
        .route(
            "/technicians",
            get(technicians::list_technicians).post(technicians::create_technician),
        )
        .route(
            "/technicians/{id}",
            get(technicians::get_technician)
                .put(technicians::update_technician)
                .delete(technicians::delete_technician),
        )
        .route(
            "/inventory",
            get(inventory::list_inventory).post(inventory::create_inventory_item),
        )
        .route("/inventory/low-stock", get(inventory::low_stock))
        .route("/inventory/sku/{sku}", put(inventory::upsert_inventory_item))
        .route(
            "/inventory/{id}",
            get(inventory::get_inventory_item)
                .put(inventory::update_inventory_item)
                .delete(inventory::delete_inventory_item),
        )
        .route(
            "/appointments",
            get(appointments::list_appointments).post(appointments::create_appointment),
        )
        .route(
            "/appointments/{id}",
            get(appointments::get_appointment)
                .put(appointments::update_appointment)
                .delete(appointments::delete_appointment),
        )
        .route(
            "/work-orders",
            get(work_orders::list_work_orders).post(work_orders::create_work_order),
        )
        .route(
            "/work-orders/{id}",
            get(work_orders::get_work_order)
                .put(work_orders::update_work_order)
                .delete(work_orders::delete_work_order),
        )
        .route(
            "/work-orders/{id}/status",
            put(work_orders::set_work_order_status),
        )
        .route("/sales", get(sales::list_sales).post(sales::create_sale))
        .route(
            "/sales/{id}",
            get(sales::get_sale).delete(sales::delete_sale),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            identity_middleware,
        ))
}

fn operator_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/tenants",
            get(tenants::list_tenants).post(tenants::create_tenant),
        )
        .route(
            "/tenants/{id}",
            get(tenants::get_tenant)
                .put(tenants::update_tenant)
                .delete(tenants::delete_tenant),
        )
        .route("/tenants/{id}/users", post(tenants::create_tenant_user))
        .layer(middleware::from_fn_with_state(
            state.config.clone(),
            operator_middleware,
        ))
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    let api = Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .merge(tenant_routes(&state))
        .merge(operator_routes(&state));

    Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .nest("/api/v1", api)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(middleware::from_fn(trace_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Starts the server with the given configuration
pub async fn run_server(config: AppConfig, db: DatabaseConnection) -> anyhow::Result<()> {
    let addr = config
        .bind_addr()
        .map_err(|e| anyhow::anyhow!("Invalid server address: {e}"))?;
    let notifier = build_notifier(&config)?;
    let profile = config.profile.clone();
    let app = create_app(AppState::new(config, db, notifier));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, %profile, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
        components.add_security_scheme(
            "session_cookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new("taller_session"))),
        );
        components.add_security_scheme(
            "operator_token",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
        );
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::root,
        handlers::healthz,
        auth::login,
        auth::logout,
        auth::me,
        tenants::list_tenants,
        tenants::create_tenant,
        tenants::get_tenant,
        tenants::update_tenant,
        tenants::delete_tenant,
        tenants::create_tenant_user,
        customers::list_customers,
        customers::get_customer,
        customers::create_customer,
        customers::update_customer,
        customers::delete_customer,
        motorcycles::list_motorcycles,
        motorcycles::get_motorcycle,
        motorcycles::create_motorcycle,
        motorcycles::update_motorcycle,
        motorcycles::delete_motorcycle,
        technicians::list_technicians,
        technicians::get_technician,
        technicians::create_technician,
        technicians::update_technician,
        technicians::delete_technician,
        inventory::list_inventory,
        inventory::low_stock,
        inventory::get_inventory_item,
        inventory::create_inventory_item,
        inventory::update_inventory_item,
        inventory::upsert_inventory_item,
        inventory::delete_inventory_item,
        appointments::list_appointments,
        appointments::get_appointment,
        appointments::create_appointment,
        appointments::update_appointment,
        appointments::delete_appointment,
        work_orders::list_work_orders,
        work_orders::get_work_order,
        work_orders::create_work_order,
        work_orders::update_work_order,
        work_orders::set_work_order_status,
        work_orders::delete_work_order,
        sales::list_sales,
        sales::get_sale,
        sales::create_sale,
        sales::delete_sale,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::error::ApiError,
            handlers::types::HealthResponse,
            auth::LoginRequest,
            auth::LoginResponse,
            auth::SessionUser,
            auth::MeResponse,
            tenants::TenantRequest,
            tenants::TenantResponse,
            tenants::CreateUserRequest,
            tenants::UserResponse,
            customers::CustomerRequest,
            customers::CustomerResponse,
            motorcycles::MotorcycleRequest,
            motorcycles::MotorcycleResponse,
            technicians::TechnicianRequest,
            technicians::TechnicianResponse,
            inventory::InventoryRequest,
            inventory::InventoryUpsertRequest,
            inventory::InventoryItemResponse,
            appointments::AppointmentRequest,
            appointments::AppointmentResponse,
            work_orders::WorkOrderRequest,
            work_orders::StatusRequest,
            work_orders::WorkOrderResponse,
            work_orders::StatusChangeResponse,
            sales::SaleRequest,
            sales::SaleLineRequest,
            sales::SaleSummary,
            sales::SaleItemResponse,
            sales::SaleResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "root", description = "Service information and health"),
        (name = "auth", description = "Staff login and session"),
        (name = "tenants", description = "Operator management of shops"),
        (name = "customers", description = "Shop customers"),
        (name = "motorcycles", description = "Customer motorcycles"),
        (name = "technicians", description = "Shop technicians"),
        (name = "inventory", description = "Parts and supplies"),
        (name = "appointments", description = "Scheduled visits"),
        (name = "work-orders", description = "Repair jobs"),
        (name = "sales", description = "Service and counter sales"),
    ),
    info(
        title = "Taller API",
        description = "Multi-tenant API for motorcycle repair shops",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, http::StatusCode};
    use tower::ServiceExt;

    fn test_state() -> AppState {
        AppState::new(
            AppConfig {
                profile: "test".to_string(),
                session_secret: "0123456789abcdef0123456789abcdef".to_string(),
                ..Default::default()
            },
            DatabaseConnection::default(),
            Arc::new(NoopNotifier),
        )
    }

    #[test]
    fn openapi_lists_tenant_scoped_paths() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/v1/customers",
            "/api/v1/inventory/low-stock",
            "/api/v1/work-orders/{id}/status",
            "/api/v1/sales/{id}",
            "/api/v1/tenants/{id}/users",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
        let schemes = doc.components.expect("components").security_schemes;
        assert!(schemes.contains_key("bearer_auth"));
        assert!(schemes.contains_key("operator_token"));
    }

    #[tokio::test]
    async fn tenant_routes_require_a_session() {
        let app = create_app(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/customers")
                    .header("content-type", "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn operator_routes_require_a_token() {
        let app = create_app(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/tenants")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key("x-trace-id"));
    }
}
