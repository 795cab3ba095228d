//! Integration tests for sales and stock.

use anyhow::Result;
use axum::http::StatusCode;
use sea_orm::{EntityTrait, PaginatorTrait};
use serde_json::json;
use taller::models::{sale, sale_item};

#[path = "test_utils/mod.rs"]
mod test_utils;
use test_utils::{TestApp, id};

#[tokio::test]
async fn overselling_is_rejected_and_stock_is_unchanged() -> Result<()> {
    let app = TestApp::new().await?;
    let (_, token) = app.shop("Taller A", "a@a.com").await?;
    let item_id = id(&app.create_item(&token, "FIL-01", 5, 1_500).await);

    let (status, body) = app
        .post(
            "/api/v1/sales",
            &token,
            json!({ "items": [{ "inventory_item_id": item_id, "quantity": 6 }] }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INSUFFICIENT_STOCK");
    assert_eq!(body["details"]["requested"], 6);
    assert_eq!(body["details"]["available"], 5);

    let (_, item) = app.get(&format!("/api/v1/inventory/{item_id}"), &token).await;
    assert_eq!(item["quantity"], 5);
    assert_eq!(sale::Entity::find().count(app.db()).await?, 0);
    assert_eq!(sale_item::Entity::find().count(app.db()).await?, 0);

    let (status, sale) = app
        .post(
            "/api/v1/sales",
            &token,
            json!({ "items": [{ "inventory_item_id": item_id, "quantity": 3 }] }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{sale}");
    assert_eq!(sale["kind"], "counter");
    assert_eq!(sale["total"], 4_500);

    let (_, item) = app.get(&format!("/api/v1/inventory/{item_id}"), &token).await;
    assert_eq!(item["quantity"], 2);
    Ok(())
}

#[tokio::test]
async fn one_short_line_rolls_back_the_whole_sale() -> Result<()> {
    let app = TestApp::new().await?;
    let (_, token) = app.shop("Taller A", "a@a.com").await?;
    let plenty = id(&app.create_item(&token, "ACE-10W40", 10, 3_000).await);
    let scarce = id(&app.create_item(&token, "BUJIA-01", 1, 800).await);

    let (status, _) = app
        .post(
            "/api/v1/sales",
            &token,
            json!({ "items": [
                { "inventory_item_id": plenty, "quantity": 4 },
                { "inventory_item_id": scarce, "quantity": 2 },
            ] }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, item) = app.get(&format!("/api/v1/inventory/{plenty}"), &token).await;
    assert_eq!(item["quantity"], 10);
    assert_eq!(sale::Entity::find().count(app.db()).await?, 0);
    Ok(())
}

#[tokio::test]
async fn repeated_lines_are_merged_against_stock() -> Result<()> {
    let app = TestApp::new().await?;
    let (_, token) = app.shop("Taller A", "a@a.com").await?;
    let item_id = id(&app.create_item(&token, "FIL-01", 3, 1_000).await);

    let (status, _) = app
        .post(
            "/api/v1/sales",
            &token,
            json!({ "items": [
                { "inventory_item_id": item_id, "quantity": 2 },
                { "inventory_item_id": item_id, "quantity": 2 },
            ] }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, item) = app.get(&format!("/api/v1/inventory/{item_id}"), &token).await;
    assert_eq!(item["quantity"], 3);
    Ok(())
}

#[tokio::test]
async fn prices_are_frozen_on_the_sale() -> Result<()> {
    let app = TestApp::new().await?;
    let (_, token) = app.shop("Taller A", "a@a.com").await?;
    let item_id = id(&app.create_item(&token, "FIL-01", 5, 1_500).await);

    let (_, sale) = app
        .post(
            "/api/v1/sales",
            &token,
            json!({ "payment_method": "Tarjeta", "items": [{ "inventory_item_id": item_id, "quantity": 2 }] }),
        )
        .await;
    let sale_id = id(&sale);

    let (status, _) = app
        .put(
            "/api/v1/inventory/sku/FIL-01",
            &token,
            json!({ "name": "Filtro", "category": "repuesto", "quantity": 3, "unit_price": 9_900 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, fetched) = app.get(&format!("/api/v1/sales/{sale_id}"), &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["payment_method"], "tarjeta");
    assert_eq!(fetched["total"], 3_000);
    assert_eq!(fetched["items"][0]["unit_price"], 1_500);
    assert_eq!(fetched["items"][0]["subtotal"], 3_000);

    let (_, listed) = app.get("/api/v1/sales", &token).await;
    assert_eq!(listed.as_array().map(Vec::len), Some(1));
    assert!(listed[0].get("items").is_none());
    Ok(())
}

#[tokio::test]
async fn empty_or_non_positive_sales_are_invalid() -> Result<()> {
    let app = TestApp::new().await?;
    let (_, token) = app.shop("Taller A", "a@a.com").await?;
    let item_id = id(&app.create_item(&token, "FIL-01", 5, 1_500).await);

    let (status, body) = app.post("/api/v1/sales", &token, json!({ "items": [] })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"]["items"].is_string(), "{body}");

    let (status, _) = app
        .post(
            "/api/v1/sales",
            &token,
            json!({ "items": [{ "inventory_item_id": item_id, "quantity": 0 }] }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn deleting_a_sale_keeps_stock_and_frees_the_item() -> Result<()> {
    let app = TestApp::new().await?;
    let (_, token) = app.shop("Taller A", "a@a.com").await?;
    let item_id = id(&app.create_item(&token, "FIL-01", 5, 1_500).await);

    let (_, sale) = app
        .post(
            "/api/v1/sales",
            &token,
            json!({ "items": [{ "inventory_item_id": item_id, "quantity": 2 }] }),
        )
        .await;
    let sale_id = id(&sale);

    let (status, body) = app.delete(&format!("/api/v1/inventory/{item_id}"), &token).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "RECORD_IN_USE");

    let (status, _) = app.delete(&format!("/api/v1/sales/{sale_id}"), &token).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, item) = app.get(&format!("/api/v1/inventory/{item_id}"), &token).await;
    assert_eq!(item["quantity"], 3);

    let (status, _) = app.delete(&format!("/api/v1/inventory/{item_id}"), &token).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    Ok(())
}

#[tokio::test]
async fn upsert_by_sku_creates_then_replaces() -> Result<()> {
    let app = TestApp::new().await?;
    let (_, token) = app.shop("Taller A", "a@a.com").await?;
    let body = json!({ "name": "Llanta 90/90", "category": "llanta", "quantity": 2, "unit_price": 120_000, "min_stock": 2 });

    let (status, created) = app.put("/api/v1/inventory/sku/llanta-01", &token, body.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["sku"], "LLANTA-01");
    assert_eq!(created["low_stock"], true);

    let (status, replaced) = app.put("/api/v1/inventory/sku/LLANTA-01", &token, body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(replaced["id"], created["id"]);

    let (_, low) = app.get("/api/v1/inventory/low-stock", &token).await;
    assert_eq!(low[0]["sku"], "LLANTA-01");

    let (status, _) = app.get("/api/v1/inventory?category=comida", &token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (_, tyres) = app.get("/api/v1/inventory?category=llanta", &token).await;
    assert_eq!(tyres.as_array().map(Vec::len), Some(1));
    Ok(())
}
