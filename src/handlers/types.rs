//! # Common API Types
//!
//! Shared pieces of the request and response bodies.

use chrono::Utc;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::repositories::Page;

/// Offset pagination parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// Maximum number of records to return (default: 100, max: 500)
    pub limit: Option<u64>,
    /// Number of records to skip
    pub offset: Option<u64>,
}

impl ListQuery {
    pub fn page(&self) -> Page {
        Page::new(self.limit, self.offset)
    }
}

/// Database health report
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
    #[schema(example = "ok")]
    pub database: String,
}

/// RFC 3339 rendering in UTC
pub fn rfc3339(value: &DateTimeWithTimeZone) -> String {
    value.with_timezone(&Utc).to_rfc3339()
}

pub fn rfc3339_opt(value: &Option<DateTimeWithTimeZone>) -> Option<String> {
    value.as_ref().map(rfc3339)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};

    #[test]
    fn timestamps_render_in_utc() {
        let offset = FixedOffset::west_opt(5 * 3600).unwrap();
        let value = offset.with_ymd_and_hms(2026, 1, 5, 8, 30, 0).unwrap();
        assert_eq!(rfc3339(&value), "2026-01-05T13:30:00+00:00");
        assert_eq!(rfc3339_opt(&None), None);
    }

    #[test]
    fn list_query_defaults_to_first_page() {
        assert_eq!(ListQuery::default().page(), Page::default());
    }
}
