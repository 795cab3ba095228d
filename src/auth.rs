//! # Authentication and Authorization
//!
//! Two independent schemes guard the API:
//!
//! - Shop staff authenticate with a session credential (cookie or bearer
//!   JWT). [`identity_middleware`] resolves the tenant for every request and
//!   the [`SessionContext`] / [`ReadContext`] extractors decide whether the
//!   handler may run for it.
//! - Platform operators authenticate with static bearer tokens
//!   ([`operator_middleware`]) to manage tenants themselves.

use std::future::Future;
use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;

use crate::config::AppConfig;
use crate::error::{ApiError, unauthorized};
use crate::server::AppState;
use crate::session::{SessionClaims, read_cookie};
use crate::tenant::{TENANT_HEADER, TenantId, TenantResolution};

/// Marker type for authenticated operator requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorAuth;

/// Tenant resolution attached to the request by [`identity_middleware`]
#[derive(Debug, Clone)]
pub struct Identity(pub TenantResolution);

/// What a handler is about to do with tenant data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    Read,
    Mutate,
}

impl FromRef<AppState> for Arc<AppConfig> {
    fn from_ref(app_state: &AppState) -> Self {
        Arc::clone(&app_state.config)
    }
}

/// Resolve the request tenant from the session credential and the
/// `X-Tenant-Id` selection. Never rejects; authorization happens in the
/// extractors.
pub async fn identity_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let headers = request.headers();
    let token = read_cookie(headers, &state.config.session_cookie_name)
        .or_else(|| bearer_token(headers).map(str::to_string));
    let selection = headers
        .get(TENANT_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let resolution = state.resolver.resolve(token.as_deref(), selection.as_deref());
    request.extensions_mut().insert(Identity(resolution));
    next.run(request).await
}

/// Decide which tenant, if any, a request may act for.
///
/// A verified session always authorizes. An unverified selection only
/// authorizes reads, and only when the fallback is enabled.
pub fn authorize(
    resolution: &TenantResolution,
    mode: AccessMode,
    fallback_enabled: bool,
) -> Result<TenantId, ApiError> {
    match resolution {
        TenantResolution::Verified(claims) => Ok(claims.tenant()),
        TenantResolution::Fallback(tenant) if mode == AccessMode::Read && fallback_enabled => {
            tracing::warn!(tenant_id = %tenant, "Serving read for unverified tenant selection");
            Ok(*tenant)
        }
        TenantResolution::Fallback(tenant) => {
            tracing::debug!(tenant_id = %tenant, ?mode, "Unverified tenant selection refused");
            Err(unauthorized(Some("Authentication required")))
        }
        TenantResolution::Missing => Err(unauthorized(Some("Authentication required"))),
    }
}

/// Run `handler` for the authorized tenant, or reject before it runs.
pub async fn with_tenant<T, F, Fut>(
    resolution: &TenantResolution,
    mode: AccessMode,
    fallback_enabled: bool,
    handler: F,
) -> Result<T, ApiError>
where
    F: FnOnce(TenantId) -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let tenant = authorize(resolution, mode, fallback_enabled)?;
    handler(tenant).await
}

fn identity(parts: &Parts) -> Result<&TenantResolution, ApiError> {
    parts
        .extensions
        .get::<Identity>()
        .map(|identity| &identity.0)
        .ok_or_else(|| unauthorized(Some("Authentication required")))
}

/// Verified session. Required by every mutation.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub claims: SessionClaims,
    pub tenant: TenantId,
}

impl<S> FromRequestParts<S> for SessionContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let resolution = identity(parts)?;
        let claims = resolution.claims().cloned();
        with_tenant(resolution, AccessMode::Mutate, false, |tenant| async move {
            let claims = claims.ok_or_else(|| unauthorized(Some("Authentication required")))?;
            Ok(Self { claims, tenant })
        })
        .await
    }
}

/// Tenant for a read. Falls back to the client selection when allowed.
#[derive(Debug, Clone, Copy)]
pub struct ReadContext {
    pub tenant: TenantId,
    pub verified: bool,
}

impl<S> FromRequestParts<S> for ReadContext
where
    Arc<AppConfig>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = Arc::<AppConfig>::from_ref(state);
        let resolution = identity(parts)?;
        let verified = resolution.claims().is_some();
        with_tenant(
            resolution,
            AccessMode::Read,
            config.tenant_fallback_enabled(),
            |tenant| async move { Ok(Self { tenant, verified }) },
        )
        .await
    }
}

/// Operator authentication for the tenant management endpoints
pub async fn operator_middleware(
    State(config): State<Arc<AppConfig>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(request.headers())?;
    validate_token(&config, token)?;
    tracing::info!("Authenticated operator request");

    request.extensions_mut().insert(OperatorAuth);
    Ok(next.run(request).await)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    headers
        .get(AUTHORIZATION)
        .ok_or_else(|| unauthorized(Some("Missing Authorization header")))
        .and_then(|value| {
            value
                .to_str()
                .map_err(|_| unauthorized(Some("Invalid Authorization header")))
        })
        .and_then(|header| {
            header
                .strip_prefix("Bearer ")
                .ok_or_else(|| unauthorized(Some("Authorization header must use Bearer scheme")))
        })
}

fn validate_token(config: &AppConfig, token: &str) -> Result<(), ApiError> {
    let is_valid = config
        .operator_tokens
        .iter()
        .any(|configured| ConstantTimeEq::ct_eq(token.as_bytes(), configured.as_bytes()).into());

    if is_valid {
        Ok(())
    } else {
        Err(unauthorized(Some("Invalid bearer token")))
    }
}

impl<S> FromRequestParts<S> for OperatorAuth
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<OperatorAuth>()
            .copied()
            .ok_or_else(|| unauthorized(Some("Operator authentication required")))
    }
}
