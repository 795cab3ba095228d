//! # Session Handlers
//!
//! Login issues the session credential both as an `HttpOnly` cookie and in
//! the body (for API clients sending `Authorization: Bearer`).

use axum::{
    extract::State,
    http::{StatusCode, header},
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::SessionContext;
use crate::error::{ApiError, unauthorized};
use crate::models::user::Role;
use crate::repositories::UserRepository;
use crate::server::AppState;
use crate::session::{clear_session_cookie, session_cookie};
use crate::tenant::TenantId;
use crate::validation::ValidatedJson;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    /// Shop the user belongs to
    pub tenant_id: Uuid,
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "recepcion@taller.co")]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    /// Session token, also set as the session cookie
    pub token: String,
    /// Expiry of the token (RFC 3339)
    pub expires_at: String,
    pub user: SessionUser,
}

/// The authenticated user as carried by the session
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionUser {
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub email: String,
    pub role: Role,
}

fn expiry(exp: i64) -> String {
    DateTime::<Utc>::from_timestamp(exp, 0)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_default()
}

/// Log in to a shop
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse, headers(
            ("Set-Cookie", description = "Session cookie")
        )),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 401, description = "Invalid credentials", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<(StatusCode, [(header::HeaderName, String); 1], Json<LoginResponse>), ApiError> {
    let tenant = TenantId::from(request.tenant_id);
    let user = UserRepository::new(&state.db)
        .authenticate(tenant, &request.email, &request.password)
        .await?
        .ok_or_else(|| {
            tracing::info!(tenant_id = %tenant, "Rejected login attempt");
            unauthorized(Some("Invalid email or password"))
        })?;

    let role = user.role.parse::<Role>().unwrap_or_else(|err| {
        tracing::warn!(user_id = %user.id, error = %err, "Stored role is unknown; using staff");
        Role::Staff
    });

    let keys = state.resolver.keys();
    let (token, claims) = keys
        .issue(user.id, tenant, &user.email, role)
        .map_err(|e| anyhow::anyhow!("failed to issue session: {e}"))?;

    let cookie = session_cookie(
        &state.config.session_cookie_name,
        &token,
        keys.ttl_seconds(),
        !state.config.is_development(),
    );
    tracing::info!(tenant_id = %tenant, user_id = %user.id, "User logged in");

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(LoginResponse {
            token,
            expires_at: expiry(claims.exp),
            user: SessionUser {
                user_id: claims.sub,
                tenant_id: claims.tenant_id,
                email: claims.email,
                role: claims.role,
            },
        }),
    ))
}

/// Clear the session cookie
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    responses(
        (status = 204, description = "Session cookie cleared")
    ),
    tag = "auth"
)]
pub async fn logout(
    State(state): State<AppState>,
) -> (StatusCode, [(header::HeaderName, String); 1]) {
    (
        StatusCode::NO_CONTENT,
        [(
            header::SET_COOKIE,
            clear_session_cookie(&state.config.session_cookie_name),
        )],
    )
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MeResponse {
    pub user: SessionUser,
    pub expires_at: String,
}

/// Current session
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    security(("bearer_auth" = []), ("session_cookie" = [])),
    responses(
        (status = 200, description = "Current session", body = MeResponse),
        (status = 401, description = "Authentication required", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn me(session: SessionContext) -> Json<MeResponse> {
    let claims = session.claims;
    Json(MeResponse {
        expires_at: expiry(claims.exp),
        user: SessionUser {
            user_id: claims.sub,
            tenant_id: claims.tenant_id,
            email: claims.email,
            role: claims.role,
        },
    })
}
