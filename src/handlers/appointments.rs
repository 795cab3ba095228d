//! # Appointments API Handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::types::rfc3339;
use crate::auth::{ReadContext, SessionContext};
use crate::error::{ApiError, ServiceError};
use crate::models::appointment::{self, AppointmentStatus};
use crate::repositories::{
    AppointmentRepository, Page,
    appointment::{AppointmentFilter, AppointmentInput},
};
use crate::server::AppState;
use crate::validation::{ValidatedJson, validate_appointment_status, validate_not_blank};

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct AppointmentRequest {
    pub customer_id: Uuid,
    /// Must belong to the customer when given
    pub motorcycle_id: Option<Uuid>,
    /// RFC 3339 timestamp
    #[schema(value_type = String, example = "2026-03-02T15:00:00Z")]
    pub scheduled_at: DateTime<Utc>,
    #[validate(custom(function = "validate_not_blank"), length(max = 500))]
    #[schema(example = "Cambio de aceite")]
    pub reason: String,
    /// programada (default), completada or cancelada
    #[validate(custom(function = "validate_appointment_status"))]
    pub status: Option<String>,
}

fn parse_status(value: &str) -> Result<AppointmentStatus, ServiceError> {
    value
        .parse()
        .map_err(|err: String| ServiceError::field("status", err))
}

impl TryFrom<AppointmentRequest> for AppointmentInput {
    type Error = ServiceError;

    fn try_from(request: AppointmentRequest) -> Result<Self, Self::Error> {
        let status = match request.status.as_deref() {
            Some(value) => parse_status(value)?,
            None => AppointmentStatus::Programada,
        };
        Ok(Self {
            customer_id: request.customer_id,
            motorcycle_id: request.motorcycle_id,
            scheduled_at: request.scheduled_at,
            reason: request.reason,
            status,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AppointmentResponse {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub customer_id: Uuid,
    pub motorcycle_id: Option<Uuid>,
    pub scheduled_at: String,
    pub reason: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<appointment::Model> for AppointmentResponse {
    fn from(model: appointment::Model) -> Self {
        Self {
            id: model.id,
            tenant_id: model.tenant_id,
            customer_id: model.customer_id,
            motorcycle_id: model.motorcycle_id,
            scheduled_at: rfc3339(&model.scheduled_at),
            reason: model.reason,
            status: model.status,
            created_at: rfc3339(&model.created_at),
            updated_at: rfc3339(&model.updated_at),
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListAppointmentsQuery {
    /// Inclusive lower bound on `scheduled_at`
    #[param(value_type = Option<String>)]
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `scheduled_at`
    #[param(value_type = Option<String>)]
    pub to: Option<DateTime<Utc>>,
    pub status: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// List appointments
#[utoipa::path(
    get,
    path = "/api/v1/appointments",
    security(("bearer_auth" = []), ("session_cookie" = [])),
    params(ListAppointmentsQuery),
    responses(
        (status = 200, description = "Appointments in schedule order", body = [AppointmentResponse]),
        (status = 400, description = "Unknown status", body = ApiError),
        (status = 401, description = "Authentication required", body = ApiError)
    ),
    tag = "appointments"
)]
pub async fn list_appointments(
    State(state): State<AppState>,
    ctx: ReadContext,
    Query(query): Query<ListAppointmentsQuery>,
) -> Result<Json<Vec<AppointmentResponse>>, ApiError> {
    let filter = AppointmentFilter {
        from: query.from,
        to: query.to,
        status: query.status.as_deref().map(parse_status).transpose()?,
    };
    let appointments = AppointmentRepository::new(&state.db)
        .list(ctx.tenant, filter, Page::new(query.limit, query.offset))
        .await?;
    Ok(Json(appointments.into_iter().map(Into::into).collect()))
}

/// Get one appointment
#[utoipa::path(
    get,
    path = "/api/v1/appointments/{id}",
    security(("bearer_auth" = []), ("session_cookie" = [])),
    params(("id" = Uuid, Path, description = "Appointment identifier")),
    responses(
        (status = 200, description = "Appointment", body = AppointmentResponse),
        (status = 404, description = "Appointment not found", body = ApiError)
    ),
    tag = "appointments"
)]
pub async fn get_appointment(
    State(state): State<AppState>,
    ctx: ReadContext,
    Path(id): Path<Uuid>,
) -> Result<Json<AppointmentResponse>, ApiError> {
    let appointment = AppointmentRepository::new(&state.db).get(ctx.tenant, id).await?;
    Ok(Json(appointment.into()))
}

/// Schedule an appointment
#[utoipa::path(
    post,
    path = "/api/v1/appointments",
    security(("bearer_auth" = []), ("session_cookie" = [])),
    request_body = AppointmentRequest,
    responses(
        (status = 201, description = "Appointment scheduled", body = AppointmentResponse),
        (status = 400, description = "Validation failed or unknown reference", body = ApiError),
        (status = 401, description = "Authentication required", body = ApiError)
    ),
    tag = "appointments"
)]
pub async fn create_appointment(
    State(state): State<AppState>,
    session: SessionContext,
    ValidatedJson(request): ValidatedJson<AppointmentRequest>,
) -> Result<(StatusCode, Json<AppointmentResponse>), ApiError> {
    let appointment = AppointmentRepository::new(&state.db)
        .create(session.tenant, request.try_into()?)
        .await?;
    Ok((StatusCode::CREATED, Json(appointment.into())))
}

/// Update an appointment
#[utoipa::path(
    put,
    path = "/api/v1/appointments/{id}",
    security(("bearer_auth" = []), ("session_cookie" = [])),
    params(("id" = Uuid, Path, description = "Appointment identifier")),
    request_body = AppointmentRequest,
    responses(
        (status = 200, description = "Updated appointment", body = AppointmentResponse),
        (status = 400, description = "Validation failed or unknown reference", body = ApiError),
        (status = 404, description = "Appointment not found", body = ApiError)
    ),
    tag = "appointments"
)]
pub async fn update_appointment(
    State(state): State<AppState>,
    session: SessionContext,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<AppointmentRequest>,
) -> Result<Json<AppointmentResponse>, ApiError> {
    let appointment = AppointmentRepository::new(&state.db)
        .update(session.tenant, id, request.try_into()?)
        .await?;
    Ok(Json(appointment.into()))
}

/// Delete an appointment
#[utoipa::path(
    delete,
    path = "/api/v1/appointments/{id}",
    security(("bearer_auth" = []), ("session_cookie" = [])),
    params(("id" = Uuid, Path, description = "Appointment identifier")),
    responses(
        (status = 204, description = "Appointment deleted"),
        (status = 404, description = "Appointment not found", body = ApiError)
    ),
    tag = "appointments"
)]
pub async fn delete_appointment(
    State(state): State<AppState>,
    session: SessionContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    AppointmentRepository::new(&state.db)
        .delete(session.tenant, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(status: Option<&str>) -> AppointmentRequest {
        AppointmentRequest {
            customer_id: Uuid::new_v4(),
            motorcycle_id: None,
            scheduled_at: Utc::now(),
            reason: "Revisión de frenos".into(),
            status: status.map(str::to_string),
        }
    }

    #[test]
    fn status_defaults_to_programada() {
        let input = AppointmentInput::try_from(request(None)).unwrap();
        assert_eq!(input.status, AppointmentStatus::Programada);
    }

    #[test]
    fn unknown_status_is_a_field_error() {
        let err = AppointmentInput::try_from(request(Some("pendiente"))).unwrap_err();
        match err {
            ServiceError::Validation(fields) => assert!(fields.contains_key("status")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
