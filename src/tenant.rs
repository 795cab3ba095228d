//! Tenant resolution.
//!
//! Every request resolves to at most one tenant. A verified session wins
//! over anything the client sends; the `X-Tenant-Id` selection is only a
//! fallback and is never trusted for writes (see [`crate::auth`]).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::session::{SessionClaims, SessionKeys};

/// Header carrying the client-persisted tenant selection
pub const TENANT_HEADER: &str = "x-tenant-id";

/// Identifier of the tenant a request operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(Uuid);

impl TenantId {
    pub fn into_uuid(self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for TenantId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl From<TenantId> for Uuid {
    fn from(value: TenantId) -> Self {
        value.0
    }
}

impl From<TenantId> for sea_orm::Value {
    fn from(value: TenantId) -> Self {
        value.0.into()
    }
}

impl FromStr for TenantId {
    type Err = uuid::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(value.trim()).map(Self)
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Outcome of resolving the tenant for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TenantResolution {
    /// A valid session credential was presented.
    Verified(SessionClaims),
    /// No valid credential; the client supplied a tenant selection.
    Fallback(TenantId),
    Missing,
}

impl TenantResolution {
    pub fn tenant(&self) -> Option<TenantId> {
        match self {
            TenantResolution::Verified(claims) => Some(claims.tenant()),
            TenantResolution::Fallback(tenant) => Some(*tenant),
            TenantResolution::Missing => None,
        }
    }

    pub fn claims(&self) -> Option<&SessionClaims> {
        match self {
            TenantResolution::Verified(claims) => Some(claims),
            _ => None,
        }
    }
}

/// Resolves the request tenant from the session credential and the
/// client-side selection. Resolution itself never fails.
#[derive(Debug, Clone)]
pub struct TenantResolver {
    keys: SessionKeys,
}

impl TenantResolver {
    pub fn new(keys: SessionKeys) -> Self {
        Self { keys }
    }

    pub fn keys(&self) -> &SessionKeys {
        &self.keys
    }

    pub fn resolve(&self, token: Option<&str>, selection: Option<&str>) -> TenantResolution {
        if let Some(token) = token {
            match self.keys.decode(token) {
                Ok(claims) => {
                    if let Some(selected) = selection.and_then(|s| s.parse::<TenantId>().ok())
                        && selected != claims.tenant()
                    {
                        tracing::debug!(
                            session_tenant = %claims.tenant(),
                            selected_tenant = %selected,
                            "Ignoring client tenant selection in favour of session"
                        );
                    }
                    return TenantResolution::Verified(claims);
                }
                Err(err) => {
                    tracing::debug!(error = %err, "Session credential rejected");
                }
            }
        }

        match selection.map(str::parse::<TenantId>) {
            Some(Ok(tenant)) => TenantResolution::Fallback(tenant),
            Some(Err(err)) => {
                tracing::debug!(error = %err, "Malformed tenant selection header");
                TenantResolution::Missing
            }
            None => TenantResolution::Missing,
        }
    }
}
