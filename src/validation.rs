//! # Payload Validation
//!
//! Request bodies derive [`validator::Validate`]. [`ValidatedJson`] parses
//! and validates in one extractor so handlers only ever see payloads that
//! passed; failures become `VALIDATION_FAILED` with one message per field.

use std::borrow::Cow;
use std::sync::LazyLock;

use axum::{
    Json,
    extract::{FromRequest, Request},
};
use regex::Regex;
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::error::{ApiError, FieldErrors, ServiceError};
use crate::models::{
    appointment::AppointmentStatus, inventory_item::InventoryCategory,
    work_order::WorkOrderStatus,
};
use crate::repositories::motorcycle::normalize_plate;

static PLATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9-]{4,10}$").expect("pattern is valid"));

static PHONE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9][0-9 \-]{5,18}[0-9]$").expect("pattern is valid"));

impl From<ValidationErrors> for ServiceError {
    fn from(errors: ValidationErrors) -> Self {
        ServiceError::Validation(field_errors(&errors))
    }
}

/// First message reported for each invalid field.
pub fn field_errors(errors: &ValidationErrors) -> FieldErrors {
    errors
        .field_errors()
        .into_iter()
        .filter_map(|(field, failures)| {
            failures
                .first()
                .map(|failure| (field.to_string(), describe(failure)))
        })
        .collect()
}

fn describe(failure: &ValidationError) -> String {
    if let Some(message) = &failure.message {
        return message.to_string();
    }
    match failure.code.as_ref() {
        "required" => "Field is required".to_string(),
        "email" => "Invalid email format".to_string(),
        "length" => "Invalid length".to_string(),
        "range" => "Value is out of range".to_string(),
        code => format!("Invalid value ({code})"),
    }
}

pub fn validate_payload<T: Validate>(payload: &T) -> Result<(), ServiceError> {
    payload.validate().map_err(ServiceError::from)
}

fn invalid(code: &'static str, message: impl Into<Cow<'static, str>>) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    error
}

pub fn validate_category(value: &str) -> Result<(), ValidationError> {
    value.parse::<InventoryCategory>().map(|_| ()).map_err(|_| {
        let allowed: Vec<&str> = InventoryCategory::ALL.iter().map(|c| c.as_str()).collect();
        invalid("category", format!("Category must be one of: {}", allowed.join(", ")))
    })
}

pub fn validate_work_order_status(value: &str) -> Result<(), ValidationError> {
    value
        .parse::<WorkOrderStatus>()
        .map(|_| ())
        .map_err(|_| invalid("status", "Status must be Diagnosticando, Reparado or Entregado"))
}

pub fn validate_appointment_status(value: &str) -> Result<(), ValidationError> {
    value
        .parse::<AppointmentStatus>()
        .map(|_| ())
        .map_err(|_| invalid("status", "Status must be programada, completada or cancelada"))
}

/// Checked on the normalized form, so `abc 123` is accepted as `ABC123`.
pub fn validate_plate(value: &str) -> Result<(), ValidationError> {
    if PLATE_PATTERN.is_match(&normalize_plate(value)) {
        Ok(())
    } else {
        Err(invalid(
            "plate",
            "Plate must be 4 to 10 letters, digits or dashes",
        ))
    }
}

pub fn validate_phone(value: &str) -> Result<(), ValidationError> {
    let value = value.trim();
    if value.is_empty() || PHONE_PATTERN.is_match(value) {
        Ok(())
    } else {
        Err(invalid("phone", "Invalid phone number"))
    }
}

pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(invalid("required", "Field is required"))
    } else {
        Ok(())
    }
}

/// JSON body extractor that rejects payloads failing [`Validate`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(payload) = Json::<T>::from_request(request, state).await?;
        validate_payload(&payload)?;
        Ok(Self(payload))
    }
}
