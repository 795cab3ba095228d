//! Integration tests for appointment scheduling.

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

#[path = "test_utils/mod.rs"]
mod test_utils;
use test_utils::{TestApp, id};

#[tokio::test]
async fn appointments_default_to_scheduled_and_filter_by_window() -> Result<()> {
    let app = TestApp::new().await?;
    let (_, token) = app.shop("Taller A", "a@a.com").await?;
    let customer_id = id(&app.create_customer(&token, "1001").await);
    let motorcycle_id = id(&app.create_motorcycle(&token, &customer_id, "ABC12D").await);

    let (status, first) = app
        .post(
            "/api/v1/appointments",
            &token,
            json!({
                "customer_id": customer_id,
                "motorcycle_id": motorcycle_id,
                "scheduled_at": "2026-03-02T15:00:00Z",
                "reason": "Cambio de aceite",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{first}");
    assert_eq!(first["status"], "programada");

    let (status, _) = app
        .post(
            "/api/v1/appointments",
            &token,
            json!({
                "customer_id": customer_id,
                "scheduled_at": "2026-04-10T09:00:00Z",
                "reason": "Revisión de frenos",
                "status": "cancelada",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, march) = app
        .get(
            "/api/v1/appointments?from=2026-03-01T00:00:00Z&to=2026-04-01T00:00:00Z",
            &token,
        )
        .await;
    assert_eq!(march.as_array().map(Vec::len), Some(1));
    assert_eq!(march[0]["id"], first["id"]);

    let (_, cancelled) = app.get("/api/v1/appointments?status=cancelada", &token).await;
    assert_eq!(cancelled.as_array().map(Vec::len), Some(1));
    assert_eq!(cancelled[0]["reason"], "Revisión de frenos");
    Ok(())
}

#[tokio::test]
async fn motorcycle_must_belong_to_the_appointment_customer() -> Result<()> {
    let app = TestApp::new().await?;
    let (_, token) = app.shop("Taller A", "a@a.com").await?;
    let owner = id(&app.create_customer(&token, "1001").await);
    let other = id(&app.create_customer(&token, "2002").await);
    let motorcycle_id = id(&app.create_motorcycle(&token, &owner, "ABC12D").await);

    let (status, body) = app
        .post(
            "/api/v1/appointments",
            &token,
            json!({
                "customer_id": other,
                "motorcycle_id": motorcycle_id,
                "scheduled_at": "2026-03-02T15:00:00Z",
                "reason": "Cambio de aceite",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"]["motorcycle_id"].is_string(), "{body}");

    let (status, body) = app
        .post(
            "/api/v1/appointments",
            &token,
            json!({
                "customer_id": owner,
                "scheduled_at": "2026-03-02T15:00:00Z",
                "reason": "   ",
                "status": "olvidada",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"]["reason"].is_string(), "{body}");
    assert!(body["details"]["status"].is_string(), "{body}");
    Ok(())
}
