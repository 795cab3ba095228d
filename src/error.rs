//! # Error Handling
//!
//! Two layers live here. [`ServiceError`] is the domain taxonomy returned by
//! repositories and validation; [`ApiError`] is the problem+json body every
//! handler responds with. `From<ServiceError> for ApiError` is the single
//! place where domain failures are mapped to HTTP status codes.

use std::collections::BTreeMap;

use axum::{
    extract::rejection::JsonRejection,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use sea_orm::sqlx::error::DatabaseError;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::work_order::WorkOrderStatus;
use crate::telemetry;

/// Per-field validation messages keyed by field name
pub type FieldErrors = BTreeMap<String, String>;

/// Unified API error response structure
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApiError {
    /// HTTP status code for the response
    #[serde(skip_serializing, skip_deserializing)]
    pub status: StatusCode,
    /// Error code for programmatic handling
    pub code: Box<str>,
    /// Human-readable error message
    pub message: Box<str>,
    /// Additional error details (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Box<serde_json::Value>>,
    /// Correlation trace ID for debugging (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<Box<str>>,
}

impl ApiError {
    /// Create a new API error with the given status code and message
    pub fn new<S: Into<String>>(status: StatusCode, code: S, message: S) -> Self {
        Self {
            status,
            code: code.into().into_boxed_str(),
            message: message.into().into_boxed_str(),
            details: None,
            trace_id: Self::current_trace_id(),
        }
    }

    /// Add details to the error
    pub fn with_details<V: Into<serde_json::Value>>(mut self, details: V) -> Self {
        self.details = Some(Box::new(details.into()));
        self
    }

    /// Extract the request trace ID (falls back to a generated correlation ID)
    fn current_trace_id() -> Option<Box<str>> {
        telemetry::current_trace_id()
            .map(|trace_id| trace_id.into_boxed_str())
            .or_else(|| {
                Some(format!("corr-{}", &Uuid::new_v4().to_string()[..8]).into_boxed_str())
            })
    }
}

/// Borrow the driver-level error behind a SeaORM error, when there is one.
fn database_error(error: &DbErr) -> Option<&dyn DatabaseError> {
    use sea_orm::RuntimeErr;

    match error {
        DbErr::Query(RuntimeErr::SqlxError(sqlx_err))
        | DbErr::Exec(RuntimeErr::SqlxError(sqlx_err)) => sqlx_err.as_database_error(),
        _ => None,
    }
}

fn matches_code(db_error: &dyn DatabaseError, known: &[&str]) -> bool {
    db_error
        .code()
        .map(|code| known.contains(&code.as_ref()))
        .unwrap_or(false)
}

pub(crate) fn is_unique_violation(error: &DbErr) -> bool {
    const PG_UNIQUE: &[&str] = &["23505"];
    const MYSQL_DUPLICATE_CODES: &[&str] = &["1022", "1062", "1169", "1586"];
    const SQLITE_DUPLICATE_CODES: &[&str] = &["1555", "2067"];

    let Some(db_error) = database_error(error) else {
        return false;
    };

    db_error.is_unique_violation()
        || matches_code(db_error, PG_UNIQUE)
        || matches_code(db_error, MYSQL_DUPLICATE_CODES)
        || matches_code(db_error, SQLITE_DUPLICATE_CODES)
}

pub(crate) fn is_foreign_key_violation(error: &DbErr) -> bool {
    const PG_FOREIGN_KEY: &[&str] = &["23503"];
    const MYSQL_FOREIGN_KEY_CODES: &[&str] = &["1451", "1452"];
    // 1811 is what SQLite reports for ON DELETE RESTRICT
    const SQLITE_FOREIGN_KEY_CODES: &[&str] = &["787", "1811"];

    let Some(db_error) = database_error(error) else {
        return false;
    };

    db_error.is_foreign_key_violation()
        || matches_code(db_error, PG_FOREIGN_KEY)
        || matches_code(db_error, MYSQL_FOREIGN_KEY_CODES)
        || matches_code(db_error, SQLITE_FOREIGN_KEY_CODES)
        || db_error.message().contains("FOREIGN KEY constraint failed")
}

/// A per-tenant unique index and the request field it guards.
#[derive(Debug, Clone, Copy)]
pub struct UniqueField {
    pub index: &'static str,
    pub table: &'static str,
    pub column: &'static str,
}

impl UniqueField {
    pub const fn new(index: &'static str, table: &'static str, column: &'static str) -> Self {
        Self {
            index,
            table,
            column,
        }
    }

    /// Postgres reports the index name as the constraint; SQLite only
    /// lists `table.column` pairs in the message.
    fn matches(&self, db_error: &dyn DatabaseError) -> bool {
        if db_error.constraint() == Some(self.index) {
            return true;
        }
        let message = db_error.message();
        message.contains(self.index) || message.contains(&format!("{}.{}", self.table, self.column))
    }
}

/// Domain error taxonomy shared by repositories and handlers.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("database error: {0}")]
    Database(#[from] DbErr),

    #[error("{0}")]
    NotFound(String),

    #[error("validation failed")]
    Validation(FieldErrors),

    #[error("{field} already exists")]
    Conflict { field: String },

    #[error("record is still referenced by other records")]
    InUse,

    #[error("tenant still owns records")]
    TenantHasDependents(BTreeMap<&'static str, u64>),

    #[error("insufficient stock for {sku}: requested {requested}, available {available}")]
    InsufficientStock {
        item_id: Uuid,
        sku: String,
        requested: i32,
        available: i32,
    },

    #[error("cannot move work order from {from} to {to}")]
    InvalidTransition {
        from: WorkOrderStatus,
        to: WorkOrderStatus,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("{entity} {id} not found"))
    }

    /// Validation failure for a single field
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), message.into());
        Self::Validation(errors)
    }

    /// Classify a failed write: unique index hits become [`ServiceError::Conflict`]
    /// naming the field, foreign key hits become [`ServiceError::InUse`].
    pub fn from_write(error: DbErr, unique: &[UniqueField]) -> Self {
        if is_unique_violation(&error) {
            let field = database_error(&error)
                .and_then(|db_error| unique.iter().find(|candidate| candidate.matches(db_error)))
                .map(|candidate| candidate.column)
                .unwrap_or("record");
            tracing::debug!(?error, field, "Unique constraint violation detected");
            return Self::Conflict {
                field: field.to_string(),
            };
        }
        if is_foreign_key_violation(&error) {
            tracing::debug!(?error, "Foreign key violation detected");
            return Self::InUse;
        }
        Self::Database(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(
            "content-type",
            HeaderValue::from_static("application/problem+json"),
        );

        (self.status, headers, axum::Json(self)).into_response()
    }
}

// Error mappers for common sources

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        tracing::error!("Internal error: {:?}", error);

        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_SERVER_ERROR",
            "An internal error occurred",
        )
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let message = match rejection {
            JsonRejection::JsonDataError(err) => format!("Invalid JSON: {}", err),
            JsonRejection::JsonSyntaxError(err) => format!("JSON syntax error: {}", err),
            JsonRejection::MissingJsonContentType(_) => {
                "Missing 'Content-Type: application/json' header".to_string()
            }
            _ => "Invalid request body".to_string(),
        };

        Self::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", &message)
    }
}

impl From<DbErr> for ApiError {
    fn from(error: DbErr) -> Self {
        if is_unique_violation(&error) {
            tracing::debug!(?error, "Unique constraint violation detected");
            return Self::new(StatusCode::CONFLICT, "CONFLICT", "Resource already exists");
        }
        if is_foreign_key_violation(&error) {
            tracing::debug!(?error, "Foreign key violation detected");
            return Self::new(
                StatusCode::CONFLICT,
                "RECORD_IN_USE",
                "Record is still referenced by other records",
            );
        }

        match error {
            DbErr::RecordNotFound(record) => Self::new(
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                &format!("Record not found: {}", record),
            ),
            DbErr::Conn(connection_err) => {
                tracing::error!("Database connection error: {:?}", connection_err);
                Self::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "Database service unavailable",
                )
            }
            _ => {
                tracing::error!("Database error: {:?}", error);
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_SERVER_ERROR",
                    "Database error occurred",
                )
            }
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(error: ServiceError) -> Self {
        match error {
            ServiceError::Database(db_err) => db_err.into(),
            ServiceError::NotFound(message) => {
                Self::new(StatusCode::NOT_FOUND, "NOT_FOUND".to_string(), message)
            }
            ServiceError::Validation(fields) => validation_error("Validation failed", json!(fields)),
            ServiceError::Conflict { field } => Self::new(
                StatusCode::CONFLICT,
                "CONFLICT".to_string(),
                format!("{field} already exists"),
            )
            .with_details(json!({ "field": field })),
            ServiceError::InUse => Self::new(
                StatusCode::CONFLICT,
                "RECORD_IN_USE",
                "Record is still referenced by other records",
            ),
            ServiceError::TenantHasDependents(counts) => Self::new(
                StatusCode::CONFLICT,
                "TENANT_HAS_DEPENDENTS",
                "Tenant still owns records and cannot be deleted",
            )
            .with_details(json!(counts)),
            ServiceError::InsufficientStock {
                item_id,
                sku,
                requested,
                available,
            } => Self::new(
                StatusCode::CONFLICT,
                "INSUFFICIENT_STOCK".to_string(),
                format!("Insufficient stock for {sku}"),
            )
            .with_details(json!({
                "item_id": item_id,
                "sku": sku,
                "requested": requested,
                "available": available,
            })),
            ServiceError::InvalidTransition { from, to } => Self::new(
                StatusCode::CONFLICT,
                "INVALID_STATUS_TRANSITION".to_string(),
                format!("Cannot move work order from {from} to {to}"),
            )
            .with_details(json!({ "from": from, "to": to })),
            ServiceError::Internal(message) => {
                tracing::error!("Internal error: {}", message);
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_SERVER_ERROR",
                    "An internal error occurred",
                )
            }
        }
    }
}

/// Create an unauthorized error (401)
pub fn unauthorized(message: Option<&str>) -> ApiError {
    let msg = message.unwrap_or("Authentication required");
    ApiError::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg)
}

/// Create a validation error with field details
pub fn validation_error(message: &str, field_errors: serde_json::Value) -> ApiError {
    ApiError::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", message).with_details(field_errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use serde_json::json;

    #[test]
    fn test_api_error_basic() {
        let error = ApiError::new(
            StatusCode::BAD_REQUEST,
            "VALIDATION_FAILED",
            "Test error message",
        );

        assert_eq!(error.code, Box::from("VALIDATION_FAILED"));
        assert_eq!(error.message, Box::from("Test error message"));
        assert_eq!(error.details, None);
    }

    #[test]
    fn not_found_names_the_entity() {
        let id = Uuid::nil();
        let api_error: ApiError = ServiceError::not_found("Customer", id).into();
        assert_eq!(api_error.status, StatusCode::NOT_FOUND);
        assert_eq!(api_error.code, Box::from("NOT_FOUND"));
        assert!(api_error.message.contains("Customer"));
    }

    #[test]
    fn test_from_anyhow() {
        let api_error: ApiError = anyhow::anyhow!("Something went wrong").into();

        assert_eq!(api_error.code, Box::from("INTERNAL_SERVER_ERROR"));
        assert_eq!(api_error.message, Box::from("An internal error occurred"));
    }

    #[test]
    fn test_content_type_header() {
        let response =
            ApiError::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", "Test error").into_response();

        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/problem+json"
        );
    }

    #[test]
    fn test_trace_id_generation() {
        let error = ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_SERVER_ERROR",
            "Test error",
        );

        let trace_id = error.trace_id.unwrap();
        assert!(trace_id.starts_with("corr-"));
        assert_eq!(trace_id.len(), 13);
    }

    #[test]
    fn test_database_error_mapping() {
        let api_error: ApiError = DbErr::RecordNotFound("test_record".to_string()).into();

        assert_eq!(api_error.status, StatusCode::NOT_FOUND);
        assert_eq!(api_error.code, Box::from("NOT_FOUND"));
        assert!(api_error.message.contains("test_record"));
    }

    #[test]
    fn test_auth_error_helpers() {
        let auth_error = unauthorized(None);
        assert_eq!(auth_error.status, StatusCode::UNAUTHORIZED);
        assert_eq!(auth_error.message, Box::from("Authentication required"));
    }

    #[test]
    fn validation_failure_carries_field_map() {
        let mut fields = FieldErrors::new();
        fields.insert("email".into(), "Invalid email format".into());
        fields.insert("name".into(), "Name is required".into());

        let api_error: ApiError = ServiceError::Validation(fields).into();

        assert_eq!(api_error.status, StatusCode::BAD_REQUEST);
        assert_eq!(api_error.code, Box::from("VALIDATION_FAILED"));
        assert_eq!(
            api_error.details,
            Some(Box::new(json!({
                "email": "Invalid email format",
                "name": "Name is required"
            })))
        );
    }

    #[test]
    fn conflict_names_the_field() {
        let api_error: ApiError = ServiceError::Conflict {
            field: "cedula".into(),
        }
        .into();

        assert_eq!(api_error.status, StatusCode::CONFLICT);
        assert_eq!(api_error.code, Box::from("CONFLICT"));
        assert_eq!(api_error.details, Some(Box::new(json!({"field": "cedula"}))));
    }

    #[test]
    fn domain_conflicts_map_to_409_codes() {
        let stock: ApiError = ServiceError::InsufficientStock {
            item_id: Uuid::nil(),
            sku: "FIL-01".into(),
            requested: 6,
            available: 5,
        }
        .into();
        assert_eq!(stock.status, StatusCode::CONFLICT);
        assert_eq!(stock.code, Box::from("INSUFFICIENT_STOCK"));
        assert_eq!(stock.details.as_ref().unwrap()["available"], 5);

        let transition: ApiError = ServiceError::InvalidTransition {
            from: WorkOrderStatus::Entregado,
            to: WorkOrderStatus::Diagnosticando,
        }
        .into();
        assert_eq!(transition.code, Box::from("INVALID_STATUS_TRANSITION"));
        assert_eq!(transition.details.as_ref().unwrap()["from"], "Entregado");

        let mut counts = BTreeMap::new();
        counts.insert("customers", 2u64);
        let dependents: ApiError = ServiceError::TenantHasDependents(counts).into();
        assert_eq!(dependents.code, Box::from("TENANT_HAS_DEPENDENTS"));
        assert_eq!(dependents.details.as_ref().unwrap()["customers"], 2);
    }

    #[test]
    fn from_write_passes_through_other_errors() {
        let error = ServiceError::from_write(DbErr::Custom("boom".into()), &[]);
        assert!(matches!(error, ServiceError::Database(DbErr::Custom(_))));
    }
}
