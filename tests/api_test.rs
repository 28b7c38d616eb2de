//! Integration tests driving the full router over the in-memory backend.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use docserver::api_router::create_router;
use docserver::auth::session::SessionManager;
use docserver::shared::state::AppState;
use docserver::storage::memory::MemStorage;

fn app() -> Router {
    create_router(Arc::new(AppState {
        storage: Arc::new(MemStorage::new()),
        sessions: Arc::new(SessionManager::new(24)),
    }))
}

/// Sends one request and returns (status, session cookie if set, JSON body).
async fn send(
    app: &Router,
    method: &str,
    path: &str,
    cookie: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Option<String>, Value) {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|v| v.to_string());
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, set_cookie, json)
}

async fn register(app: &Router, username: &str, is_admin: bool) -> String {
    let (status, cookie, _) = send(
        app,
        "POST",
        "/api/register",
        None,
        Some(json!({
            "username": username,
            "password": "pass-1234",
            "fullName": format!("{username} person"),
            "isAdmin": is_admin,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    cookie.expect("register should set a session cookie")
}

#[tokio::test]
async fn first_registration_bootstraps_admin_later_ones_do_not() {
    let app = app();

    let (status, cookie, body) = send(
        &app,
        "POST",
        "/api/register",
        None,
        Some(json!({
            "username": "founder",
            "password": "pass-1234",
            "fullName": "First User",
            "isAdmin": true,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(cookie.is_some());
    assert_eq!(body["isAdmin"], json!(true));
    assert!(body.get("password").is_none(), "password must never leak");

    // A later anonymous registration cannot claim the admin flag.
    let (status, _, body) = send(
        &app,
        "POST",
        "/api/register",
        None,
        Some(json!({
            "username": "intruder",
            "password": "pass-1234",
            "fullName": "Second User",
            "isAdmin": true,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["isAdmin"], json!(false));
}

#[tokio::test]
async fn duplicate_username_is_rejected_case_insensitively() {
    let app = app();
    register(&app, "casey", true).await;

    let (status, _, body) = send(
        &app,
        "POST",
        "/api/register",
        None,
        Some(json!({
            "username": "CASEY",
            "password": "pass-1234",
            "fullName": "Other Casey",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], json!("Username already exists"));
}

#[tokio::test]
async fn login_failure_does_not_reveal_which_field_was_wrong() {
    let app = app();
    register(&app, "casey", true).await;

    let wrong_password = send(
        &app,
        "POST",
        "/api/login",
        None,
        Some(json!({ "username": "casey", "password": "nope" })),
    )
    .await;
    let unknown_user = send(
        &app,
        "POST",
        "/api/login",
        None,
        Some(json!({ "username": "nobody", "password": "nope" })),
    )
    .await;

    assert_eq!(wrong_password.0, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_user.0, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.2, unknown_user.2);
}

#[tokio::test]
async fn logout_invalidates_the_session() {
    let app = app();
    let cookie = register(&app, "casey", true).await;

    let (status, _, _) = send(&app, "GET", "/api/user", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = send(&app, "POST", "/api/logout", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = send(&app, "GET", "/api/user", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn writes_are_admin_gated_with_distinct_statuses() {
    let app = app();
    register(&app, "boss", true).await;
    let member_cookie = register(&app, "member", false).await;

    let payload = json!({ "name": "QA", "category": "support", "icon": "clipboard" });

    let (status, _, _) = send(&app, "POST", "/api/processes", None, Some(payload.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, _) = send(
        &app,
        "POST",
        "/api/processes",
        Some(&member_cookie),
        Some(payload),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn qa_scenario_end_to_end() {
    let app = app();
    let admin = register(&app, "boss", true).await;

    let (status, _, process) = send(
        &app,
        "POST",
        "/api/processes",
        Some(&admin),
        Some(json!({ "name": "QA", "category": "support", "icon": "clipboard" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _, subprocess) = send(
        &app,
        "POST",
        "/api/subprocesses",
        Some(&admin),
        Some(json!({ "name": "Audits", "processId": process["id"] })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _, document) = send(
        &app,
        "POST",
        "/api/documents",
        Some(&admin),
        Some(json!({
            "name": "Audit Manual",
            "type": "manual",
            "subprocessId": subprocess["id"],
            "content": "Audit in pairs.",
            "approvalDate": "2024-01-01",
            "approvers": "QA Lead",
            "keywords": ["audit"],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(document["version"], json!("1.0"));

    let path = format!(
        "/api/documents?subprocessId={}&type=manual",
        subprocess["id"]
    );
    let (status, _, listed) = send(&app, "GET", &path, None, None).await;
    assert_eq!(status, StatusCode::OK);
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["id"], document["id"]);

    let path = format!("/api/documents?subprocessId={}&type=sop", subprocess["id"]);
    let (_, _, listed) = send(&app, "GET", &path, None, None).await;
    assert_eq!(listed.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn document_type_and_parent_must_agree() {
    let app = app();
    let admin = register(&app, "boss", true).await;

    let (status, _, body) = send(
        &app,
        "POST",
        "/api/documents",
        Some(&admin),
        Some(json!({
            "name": "Policy",
            "type": "other",
            "subprocessId": 1,
            "content": "text",
            "approvalDate": "2024-01-01",
            "approvers": "Legal",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], json!("Validation error"));
    let fields: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"otherDocTypeId"));
    assert!(fields.contains(&"subprocessId"));
}

#[tokio::test]
async fn inactive_documents_are_hidden_from_listings_but_fetchable() {
    let app = app();
    let admin = register(&app, "boss", true).await;

    let (_, _, process) = send(
        &app,
        "POST",
        "/api/processes",
        Some(&admin),
        Some(json!({ "name": "Ops", "category": "operational", "icon": "gear" })),
    )
    .await;
    let (_, _, subprocess) = send(
        &app,
        "POST",
        "/api/subprocesses",
        Some(&admin),
        Some(json!({ "name": "Shipping", "processId": process["id"] })),
    )
    .await;
    let (_, _, document) = send(
        &app,
        "POST",
        "/api/documents",
        Some(&admin),
        Some(json!({
            "name": "Retired SOP",
            "type": "sop",
            "subprocessId": subprocess["id"],
            "content": "old",
            "approvalDate": "2023-06-01",
            "approvers": "Ops",
            "active": false,
        })),
    )
    .await;

    let path = format!("/api/documents?subprocessId={}", subprocess["id"]);
    let (_, _, listed) = send(&app, "GET", &path, None, None).await;
    assert_eq!(listed.as_array().unwrap().len(), 0);

    let path = format!("/api/documents/{}", document["id"]);
    let (status, _, fetched) = send(&app, "GET", &path, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["active"], json!(false));
}

#[tokio::test]
async fn deletes_are_refused_while_children_exist() {
    let app = app();
    let admin = register(&app, "boss", true).await;

    let (_, _, process) = send(
        &app,
        "POST",
        "/api/processes",
        Some(&admin),
        Some(json!({ "name": "QA", "category": "support", "icon": "clipboard" })),
    )
    .await;
    let (_, _, subprocess) = send(
        &app,
        "POST",
        "/api/subprocesses",
        Some(&admin),
        Some(json!({ "name": "Audits", "processId": process["id"] })),
    )
    .await;

    let process_path = format!("/api/processes/{}", process["id"]);
    let (status, _, _) = send(&app, "DELETE", &process_path, Some(&admin), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let subprocess_path = format!("/api/subprocesses/{}", subprocess["id"]);
    let (status, _, _) = send(&app, "DELETE", &subprocess_path, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = send(&app, "DELETE", &process_path, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = send(&app, "DELETE", &process_path, Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn comments_require_a_session_and_come_back_oldest_first() {
    let app = app();
    let admin = register(&app, "boss", true).await;

    let (_, _, process) = send(
        &app,
        "POST",
        "/api/processes",
        Some(&admin),
        Some(json!({ "name": "QA", "category": "support", "icon": "clipboard" })),
    )
    .await;
    let (_, _, subprocess) = send(
        &app,
        "POST",
        "/api/subprocesses",
        Some(&admin),
        Some(json!({ "name": "Audits", "processId": process["id"] })),
    )
    .await;
    let (_, _, document) = send(
        &app,
        "POST",
        "/api/documents",
        Some(&admin),
        Some(json!({
            "name": "Audit Manual",
            "type": "manual",
            "subprocessId": subprocess["id"],
            "content": "Audit in pairs.",
            "approvalDate": "2024-01-01",
            "approvers": "QA Lead",
        })),
    )
    .await;

    let (status, _, _) = send(
        &app,
        "POST",
        "/api/comments",
        None,
        Some(json!({ "documentId": document["id"], "text": "anonymous" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    for text in ["first", "second"] {
        let (status, _, comment) = send(
            &app,
            "POST",
            "/api/comments",
            Some(&admin),
            Some(json!({ "documentId": document["id"], "text": text })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(comment["text"], json!(text));
    }

    let path = format!("/api/documents/{}/comments", document["id"]);
    let (status, _, comments) = send(&app, "GET", &path, None, None).await;
    assert_eq!(status, StatusCode::OK);
    let comments = comments.as_array().unwrap();
    assert_eq!(comments.len(), 2);
    assert_eq!(comments[0]["text"], json!("first"));
    assert_eq!(comments[1]["text"], json!("second"));

    // Unknown documents have no thread yet, which is an empty list.
    let (status, _, comments) = send(&app, "GET", "/api/documents/9999/comments", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(comments.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn kpi_config_accepts_http_urls_and_null_only() {
    let app = app();
    let admin = register(&app, "boss", true).await;

    let (_, _, users) = send(&app, "GET", "/api/users", Some(&admin), None).await;
    let users = users.as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert!(users[0].get("password").is_none());
    let user_id = users[0]["id"].as_i64().unwrap();

    let path = format!("/api/users/{user_id}/kpi-config");
    let (status, _, updated) = send(
        &app,
        "PUT",
        &path,
        Some(&admin),
        Some(json!({ "kpiIframeUrl": "https://kpi.example.com/board/7" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        updated["kpiIframeUrl"],
        json!("https://kpi.example.com/board/7")
    );

    let (status, _, _) = send(
        &app,
        "PUT",
        &path,
        Some(&admin),
        Some(json!({ "kpiIframeUrl": "javascript:alert(1)" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, cleared) = send(
        &app,
        "PUT",
        &path,
        Some(&admin),
        Some(json!({ "kpiIframeUrl": null })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cleared["kpiIframeUrl"], Value::Null);
}

#[tokio::test]
async fn embedded_console_serves_admin_and_kpi_views() {
    let app = app();
    let request = Request::builder()
        .uri("/")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/html"));

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("showAdmin"), "admin console missing");
    assert!(html.contains("kpiIframeUrl"), "KPI embed missing");
    assert!(html.contains("kpi-config"), "KPI config form missing");
}

#[tokio::test]
async fn update_on_missing_ids_returns_not_found() {
    let app = app();
    let admin = register(&app, "boss", true).await;

    let (status, _, _) = send(
        &app,
        "PUT",
        "/api/processes/999",
        Some(&admin),
        Some(json!({ "name": "Ghost", "category": "strategic", "icon": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = send(&app, "GET", "/api/processes/999", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
