//! Tests ensuring one shop can never read or change another shop's records.

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

#[path = "test_utils/mod.rs"]
mod test_utils;
use test_utils::{TestApp, id};

#[tokio::test]
async fn customer_created_by_one_shop_is_invisible_to_another() -> Result<()> {
    let app = TestApp::new().await?;
    let (tenant_a, token_a) = app.shop("Taller A", "a@a.com").await?;
    let (_tenant_b, token_b) = app.shop("Taller B", "b@b.com").await?;

    let customer = app.create_customer(&token_a, "1001").await;
    let customer_id = id(&customer);
    assert_eq!(customer["tenant_id"], tenant_a.to_string());

    let (status, body) = app.get(&format!("/api/v1/customers/{customer_id}"), &token_b).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    let (status, body) = app.get("/api/v1/customers", &token_b).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let (status, body) = app.get(&format!("/api/v1/customers/{customer_id}"), &token_a).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], customer_id);
    assert_eq!(body["cedula"], "1001");
    Ok(())
}

#[tokio::test]
async fn foreign_records_cannot_be_updated_or_deleted() -> Result<()> {
    let app = TestApp::new().await?;
    let (_, token_a) = app.shop("Taller A", "a@a.com").await?;
    let (_, token_b) = app.shop("Taller B", "b@b.com").await?;

    let customer_id = id(&app.create_customer(&token_a, "1001").await);
    let technician_id = id(&app.create_technician(&token_a, "Carlos").await);
    let item_id = id(&app.create_item(&token_a, "FIL-01", 5, 1_500).await);

    let (status, _) = app
        .put(
            &format!("/api/v1/customers/{customer_id}"),
            &token_b,
            json!({ "name": "Robado", "email": "x@x.com", "cedula": "1001" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    for path in [
        format!("/api/v1/customers/{customer_id}"),
        format!("/api/v1/technicians/{technician_id}"),
        format!("/api/v1/inventory/{item_id}"),
    ] {
        let (status, _) = app.delete(&path, &token_b).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{path}");
        let (status, _) = app.get(&path, &token_a).await;
        assert_eq!(status, StatusCode::OK, "{path}");
    }

    let (_, body) = app.get(&format!("/api/v1/customers/{customer_id}"), &token_a).await;
    assert_eq!(body["name"], "Cliente 1001");
    Ok(())
}

#[tokio::test]
async fn payload_tenant_id_is_ignored_on_writes() -> Result<()> {
    let app = TestApp::new().await?;
    let (tenant_a, token_a) = app.shop("Taller A", "a@a.com").await?;
    let (tenant_b, token_b) = app.shop("Taller B", "b@b.com").await?;

    let (status, body) = app
        .post(
            "/api/v1/technicians",
            &token_a,
            json!({ "name": "Luis", "tenant_id": tenant_b }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["tenant_id"], tenant_a.to_string());

    let (_, listed) = app.get("/api/v1/technicians", &token_b).await;
    assert_eq!(listed, json!([]));
    Ok(())
}

#[tokio::test]
async fn references_must_belong_to_the_same_shop() -> Result<()> {
    let app = TestApp::new().await?;
    let (_, token_a) = app.shop("Taller A", "a@a.com").await?;
    let (_, token_b) = app.shop("Taller B", "b@b.com").await?;

    let foreign_customer = id(&app.create_customer(&token_a, "1001").await);

    let (status, body) = app
        .post(
            "/api/v1/motorcycles",
            &token_b,
            json!({
                "customer_id": foreign_customer,
                "plate": "XYZ987",
                "brand": "Honda",
                "model": "CB190",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"]["customer_id"].is_string(), "{body}");
    Ok(())
}

#[tokio::test]
async fn uniqueness_is_scoped_per_shop() -> Result<()> {
    let app = TestApp::new().await?;
    let (_, token_a) = app.shop("Taller A", "a@a.com").await?;
    let (_, token_b) = app.shop("Taller B", "b@b.com").await?;

    app.create_customer(&token_a, "1001").await;
    app.create_customer(&token_b, "1001").await;

    let (status, body) = app
        .post(
            "/api/v1/customers",
            &token_a,
            json!({ "name": "Otra", "email": "otra@example.com", "cedula": "1001" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");
    assert_eq!(body["details"]["field"], "cedula");

    app.create_item(&token_a, "FIL-01", 1, 100).await;
    app.create_item(&token_b, "FIL-01", 1, 100).await;
    let (status, body) = app
        .post(
            "/api/v1/inventory",
            &token_a,
            json!({
                "sku": "fil-01",
                "name": "Duplicado",
                "category": "repuesto",
                "quantity": 1,
                "unit_price": 100,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["details"]["field"], "sku");
    Ok(())
}

#[tokio::test]
async fn sales_and_work_orders_are_scoped() -> Result<()> {
    let app = TestApp::new().await?;
    let (_, token_a) = app.shop("Taller A", "a@a.com").await?;
    let (_, token_b) = app.shop("Taller B", "b@b.com").await?;

    let customer_id = id(&app.create_customer(&token_a, "1001").await);
    let motorcycle_id = id(&app.create_motorcycle(&token_a, &customer_id, "ABC12D").await);
    let technician_id = id(&app.create_technician(&token_a, "Carlos").await);
    let order_id = id(&app.create_work_order(&token_a, &motorcycle_id, &technician_id).await);
    let item_id = id(&app.create_item(&token_a, "FIL-01", 5, 1_500).await);

    let (status, sale) = app
        .post(
            "/api/v1/sales",
            &token_a,
            json!({ "work_order_id": order_id, "items": [{ "inventory_item_id": item_id, "quantity": 1 }] }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{sale}");
    let sale_id = id(&sale);

    for path in [
        format!("/api/v1/work-orders/{order_id}"),
        format!("/api/v1/sales/{sale_id}"),
        format!("/api/v1/motorcycles/{motorcycle_id}"),
    ] {
        let (status, _) = app.get(&path, &token_b).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{path}");
    }

    let (status, _) = app
        .put(
            &format!("/api/v1/work-orders/{order_id}/status"),
            &token_b,
            json!({ "status": "Reparado" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Selling another shop's inventory is rejected without touching its stock.
    let (status, _) = app
        .post(
            "/api/v1/sales",
            &token_b,
            json!({ "items": [{ "inventory_item_id": item_id, "quantity": 1 }] }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (_, item) = app.get(&format!("/api/v1/inventory/{item_id}"), &token_a).await;
    assert_eq!(item["quantity"], 4);
    Ok(())
}

#[tokio::test]
async fn customer_email_and_plate_are_unique_per_shop() -> Result<()> {
    let app = TestApp::new().await?;
    let (_, token_a) = app.shop("Taller A", "a@a.com").await?;
    let (_, token_b) = app.shop("Taller B", "b@b.com").await?;

    let owner_a = id(&app.create_customer(&token_a, "1001").await);
    let owner_b = id(&app.create_customer(&token_b, "5005").await);

    let (status, body) = app
        .post(
            "/api/v1/customers",
            &token_a,
            json!({ "name": "Otra", "email": "1001@example.com", "cedula": "2002" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["details"]["field"], "email");

    let (status, _) = app
        .post(
            "/api/v1/customers",
            &token_b,
            json!({ "name": "Otra", "email": "1001@example.com", "cedula": "2002" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    app.create_motorcycle(&token_a, &owner_a, "ABC12D").await;
    let (status, body) = app
        .post(
            "/api/v1/motorcycles",
            &token_a,
            json!({ "customer_id": owner_a, "plate": "abc12d", "brand": "Honda", "model": "CB190" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["details"]["field"], "plate");

    let (status, _) = app
        .post(
            "/api/v1/motorcycles",
            &token_b,
            json!({ "customer_id": owner_b, "plate": "ABC12D", "brand": "Honda", "model": "CB190" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    Ok(())
}

#[tokio::test]
async fn every_record_is_hidden_from_other_shops_by_id() -> Result<()> {
    let app = TestApp::new().await?;
    let (_, token_a) = app.shop("Taller A", "a@a.com").await?;
    let (_, token_b) = app.shop("Taller B", "b@b.com").await?;

    let customer_id = id(&app.create_customer(&token_a, "1001").await);
    let technician_id = id(&app.create_technician(&token_a, "Carlos").await);
    let item_id = id(&app.create_item(&token_a, "FIL-01", 5, 1_500).await);
    let (status, appointment) = app
        .post(
            "/api/v1/appointments",
            &token_a,
            json!({
                "customer_id": customer_id,
                "scheduled_at": "2026-03-02T15:00:00Z",
                "reason": "Cambio de aceite",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{appointment}");
    let appointment_id = id(&appointment);

    for path in [
        format!("/api/v1/technicians/{technician_id}"),
        format!("/api/v1/inventory/{item_id}"),
        format!("/api/v1/appointments/{appointment_id}"),
    ] {
        let (status, body) = app.get(&path, &token_b).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{path}");
        assert_eq!(body["code"], "NOT_FOUND");
        let (status, _) = app.get(&path, &token_a).await;
        assert_eq!(status, StatusCode::OK, "{path}");
    }

    let (_, appointments) = app.get("/api/v1/appointments", &token_b).await;
    assert_eq!(appointments, json!([]));
    let (_, items) = app.get("/api/v1/inventory", &token_b).await;
    assert_eq!(items, json!([]));
    Ok(())
}
