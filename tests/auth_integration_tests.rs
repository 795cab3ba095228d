//! Integration tests for sessions, operator tokens and tenant resolution.

use anyhow::Result;
use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use uuid::Uuid;

#[path = "test_utils/mod.rs"]
mod test_utils;
use test_utils::{OPERATOR_TOKEN, PASSWORD, TestApp, id, json_request, test_config};

async fn operator_creates_shop(app: &TestApp, name: &str, email: &str) -> String {
    let (status, tenant) = app
        .post(
            "/api/v1/tenants",
            OPERATOR_TOKEN,
            json!({ "name": name, "email": email }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{tenant}");
    let tenant_id = id(&tenant);

    let (status, user) = app
        .post(
            &format!("/api/v1/tenants/{tenant_id}/users"),
            OPERATOR_TOKEN,
            json!({ "email": email, "name": "Recepción", "password": PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{user}");
    assert_eq!(user["role"], "staff");
    tenant_id
}

/// Logs in and returns the `name=value` pair from `Set-Cookie`.
async fn login_cookie(app: &TestApp, tenant_id: &str, email: &str) -> String {
    let response = tower::ServiceExt::oneshot(
        app.router.clone(),
        json_request(
            "POST",
            "/api/v1/auth/login",
            None,
            json!({ "tenant_id": tenant_id, "email": email, "password": PASSWORD }),
        ),
    )
    .await
    .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .unwrap()
        .to_string();
    assert!(set_cookie.contains("HttpOnly"));
    assert!(!set_cookie.contains("Secure"));
    set_cookie.split(';').next().unwrap().to_string()
}

fn with_cookie(method: &str, path: &str, cookie: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(path)
        .header(header::COOKIE, cookie)
        .header(header::CONTENT_TYPE, "application/json");
    match body {
        Some(body) => builder.body(Body::from(body.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn with_tenant_header(method: &str, path: &str, tenant_id: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(path)
        .header("x-tenant-id", tenant_id)
        .header(header::CONTENT_TYPE, "application/json");
    match body {
        Some(body) => builder.body(Body::from(body.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

#[tokio::test]
async fn shop_created_by_operator_keeps_its_customers_private() -> Result<()> {
    let app = TestApp::new().await?;
    let t1 = operator_creates_shop(&app, "Taller A", "a@a.com").await;
    let t2 = operator_creates_shop(&app, "Taller B", "b@b.com").await;
    let cookie_1 = login_cookie(&app, &t1, "a@a.com").await;
    let cookie_2 = login_cookie(&app, &t2, "b@b.com").await;

    let (status, c1) = app
        .send(with_cookie(
            "POST",
            "/api/v1/customers",
            &cookie_1,
            Some(json!({ "name": "C1", "email": "c1@example.com", "cedula": "111" })),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{c1}");
    let c1_id = id(&c1);

    let (status, _) = app
        .send(with_cookie("GET", &format!("/api/v1/customers/{c1_id}"), &cookie_2, None))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, fetched) = app
        .send(with_cookie("GET", &format!("/api/v1/customers/{c1_id}"), &cookie_1, None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["name"], "C1");
    assert_eq!(fetched["tenant_id"], t1);
    Ok(())
}

#[tokio::test]
async fn session_tenant_wins_over_header_selection() -> Result<()> {
    let app = TestApp::new().await?;
    let (tenant_a, token_a) = app.shop("Taller A", "a@a.com").await?;
    let (tenant_b, _) = app.shop("Taller B", "b@b.com").await?;

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/customers")
        .header(header::AUTHORIZATION, format!("Bearer {token_a}"))
        .header("x-tenant-id", tenant_b.to_string())
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "name": "C1", "email": "c1@example.com", "cedula": "111" }).to_string(),
        ))
        .unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["tenant_id"], tenant_a.to_string());
    Ok(())
}

#[tokio::test]
async fn wrong_password_and_unknown_tenant_are_rejected() -> Result<()> {
    let app = TestApp::new().await?;
    let (tenant_a, _) = app.shop("Taller A", "a@a.com").await?;

    for (tenant_id, password) in [
        (tenant_a, "wrong password"),
        (Uuid::new_v4(), PASSWORD),
    ] {
        let (status, body) = app
            .send(json_request(
                "POST",
                "/api/v1/auth/login",
                None,
                json!({ "tenant_id": tenant_id, "email": "a@a.com", "password": password }),
            ))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "UNAUTHORIZED");
    }
    Ok(())
}

#[tokio::test]
async fn me_reports_the_session_and_logout_clears_it() -> Result<()> {
    let app = TestApp::new().await?;
    let (tenant_a, token) = app.shop("Taller A", "a@a.com").await?;

    let (status, me) = app.get("/api/v1/auth/me", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["user"]["tenant_id"], tenant_a.to_string());
    assert_eq!(me["user"]["email"], "a@a.com");
    assert_eq!(me["user"]["role"], "admin");

    let response = tower::ServiceExt::oneshot(
        app.router.clone(),
        Request::builder()
            .method("POST")
            .uri("/api/v1/auth/logout")
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let cleared = response.headers().get(header::SET_COOKIE).unwrap().to_str()?;
    assert!(cleared.starts_with("taller_session=;"));
    assert!(cleared.contains("Max-Age=0"));
    Ok(())
}

#[tokio::test]
async fn missing_or_forged_sessions_get_401() -> Result<()> {
    let app = TestApp::new().await?;
    app.shop("Taller A", "a@a.com").await?;

    let (status, _) = app
        .send(Request::builder().uri("/api/v1/customers").body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let other = TestApp::with_config({
        let mut config = test_config();
        config.session_secret = "another-secret-another-secret-0000".to_string();
        config
    })
    .await?;
    let (_, foreign_token) = other.shop("Taller X", "x@x.com").await?;

    let (status, _) = app.get("/api/v1/customers", &foreign_token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app.get("/api/v1/customers", "not-a-jwt").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn header_selection_is_refused_without_fallback() -> Result<()> {
    let app = TestApp::new().await?;
    let (tenant_a, token_a) = app.shop("Taller A", "a@a.com").await?;
    app.create_customer(&token_a, "1001").await;

    let (status, _) = app
        .send(with_tenant_header("GET", "/api/v1/customers", &tenant_a.to_string(), None))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn fallback_serves_reads_but_never_writes() -> Result<()> {
    let mut config = test_config();
    config.allow_tenant_fallback = true;
    let app = TestApp::with_config(config).await?;
    let (tenant_a, token_a) = app.shop("Taller A", "a@a.com").await?;
    app.create_customer(&token_a, "1001").await;

    let (status, listed) = app
        .send(with_tenant_header("GET", "/api/v1/customers", &tenant_a.to_string(), None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().map(Vec::len), Some(1));

    let (status, _) = app
        .send(with_tenant_header(
            "POST",
            "/api/v1/customers",
            &tenant_a.to_string(),
            Some(json!({ "name": "C2", "email": "c2@example.com", "cedula": "222" })),
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .send(with_tenant_header("GET", "/api/v1/customers", "not-a-uuid", None))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn operator_endpoints_require_a_configured_token() -> Result<()> {
    let app = TestApp::new().await?;
    let (_, session_token) = app.shop("Taller A", "a@a.com").await?;

    let (status, _) = app.get("/api/v1/tenants", "wrong-token").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app.get("/api/v1/tenants", &session_token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, tenants) = app.get("/api/v1/tenants", OPERATOR_TOKEN).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tenants[0]["name"], "Taller A");
    Ok(())
}

#[tokio::test]
async fn tenant_with_records_cannot_be_deleted() -> Result<()> {
    let app = TestApp::new().await?;
    let (tenant_a, token_a) = app.shop("Taller A", "a@a.com").await?;
    app.create_customer(&token_a, "1001").await;

    let (status, body) = app
        .delete(&format!("/api/v1/tenants/{tenant_a}"), OPERATOR_TOKEN)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "TENANT_HAS_DEPENDENTS");
    assert_eq!(body["details"]["customers"], 1);
    assert_eq!(body["details"]["users"], 1);

    let (status, empty) = app
        .post(
            "/api/v1/tenants",
            OPERATOR_TOKEN,
            json!({ "name": "Vacío", "email": "v@v.com", "domain": "vacio.example.com" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let empty_id = id(&empty);

    let (status, body) = app
        .post(
            "/api/v1/tenants",
            OPERATOR_TOKEN,
            json!({ "name": "Copia", "email": "c@c.com", "domain": "vacio.example.com" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["details"]["field"], "domain");

    let (status, _) = app
        .delete(&format!("/api/v1/tenants/{empty_id}"), OPERATOR_TOKEN)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app
        .get(&format!("/api/v1/tenants/{empty_id}"), OPERATOR_TOKEN)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}
