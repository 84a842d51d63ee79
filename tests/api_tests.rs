use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

use cursor_pool_server::api;
use cursor_pool_server::config::Config;
use cursor_pool_server::db::{CodePurpose, NewUser, now_millis, now_rfc3339};
use cursor_pool_server::entities::verification_codes;
use cursor_pool_server::state::SharedState;

const ADMIN_EMAIL: &str = "admin@example.com";
const ADMIN_PASSWORD: &str = "admin-test-password";

async fn spawn_app() -> (Router, Arc<SharedState>) {
    let mut config = Config::default();
    config.general.database_url = "sqlite::memory:".to_string();
    // In-memory sqlite is per-connection; keep the pool at one.
    config.general.max_db_connections = 1;
    config.general.min_db_connections = 1;
    config.auth.jwt_secret = "test-secret".to_string();
    config.bootstrap.admin_password = ADMIN_PASSWORD.to_string();

    let shared = Arc::new(SharedState::new(config).await.expect("failed to build state"));
    let state = api::create_app_state(shared.clone(), None);
    (api::router(state), shared)
}

async fn request(
    app: &Router,
    method: &str,
    path: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
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
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

/// Login for level-0 accounts, which need no verification code.
async fn login(app: &Router, username: &str, password: &str) -> String {
    let (status, body) = request(
        app,
        "POST",
        "/user/login",
        None,
        Some(json!({ "username": username, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    body["data"]["apiKey"].as_str().unwrap().to_string()
}

/// The bootstrap admin sits at level 999, so logging in takes a code.
async fn login_admin(app: &Router, shared: &SharedState) -> String {
    let (code, _) = shared
        .store
        .issue_code(ADMIN_EMAIL, CodePurpose::Login)
        .await
        .unwrap();

    let (status, body) = request(
        app,
        "POST",
        "/user/login",
        None,
        Some(json!({
            "username": ADMIN_EMAIL,
            "password": ADMIN_PASSWORD,
            "smsCode": code,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "admin login failed: {body}");
    body["data"]["apiKey"].as_str().unwrap().to_string()
}

async fn seed_user(shared: &SharedState, username: &str, level: i32) -> i32 {
    let user = shared
        .store
        .create_user(
            NewUser {
                username: username.to_string(),
                email: format!("{username}@test.dev"),
                password: "password123".to_string(),
                level,
                total_count: 100,
                expire_time: now_millis() + 86_400_000,
                is_admin: false,
            },
            &shared.config.security,
        )
        .await
        .unwrap();
    user.id
}

#[tokio::test]
async fn test_root_banner() {
    let (app, _shared) = spawn_app().await;

    let (status, body) = request(&app, "GET", "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().unwrap().contains("Cursor Pool"));

    let (status, health) = request(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["data"]["database"], "ok");
}

#[tokio::test]
async fn test_login_unknown_user_is_not_found() {
    let (app, _shared) = spawn_app().await;

    let (status, body) = request(
        &app,
        "POST",
        "/user/login",
        None,
        Some(json!({ "username": "nobody", "password": "whatever" })),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn test_login_wrong_password_is_unauthorized() {
    let (app, shared) = spawn_app().await;
    seed_user(&shared, "plain", 0).await;

    let (status, _) = request(
        &app,
        "POST",
        "/user/login",
        None,
        Some(json!({ "username": "plain", "password": "wrong" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_missing_fields_is_bad_request() {
    let (app, _shared) = spawn_app().await;

    let (status, _) = request(
        &app,
        "POST",
        "/user/login",
        None,
        Some(json!({ "username": ADMIN_EMAIL })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_accepts_email_as_identifier() {
    let (app, shared) = spawn_app().await;
    seed_user(&shared, "mailuser", 0).await;

    login(&app, "mailuser@test.dev", "password123").await;
}

#[tokio::test]
async fn test_bootstrap_admin_can_login_and_fetch_info() {
    let (app, shared) = spawn_app().await;

    let token = login_admin(&app, &shared).await;
    let (status, body) = request(&app, "GET", "/user/info", Some(&token), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["data"]["username"], ADMIN_EMAIL);
    assert_eq!(body["data"]["isAdmin"], true);
    assert_eq!(body["data"]["isExpired"], false);
    assert_eq!(body["data"]["level"], 999);
}

#[tokio::test]
async fn test_check_user_reports_existence() {
    let (app, _shared) = spawn_app().await;

    let (status, body) = request(
        &app,
        "POST",
        "/user/check",
        None,
        Some(json!({ "username": ADMIN_EMAIL })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["exists"], true);

    let (_, body) = request(
        &app,
        "POST",
        "/user/check",
        None,
        Some(json!({ "username": "ghost" })),
    )
    .await;
    assert_eq!(body["data"]["exists"], false);
    assert_eq!(body["data"]["needCode"], false);
}

#[tokio::test]
async fn test_leveled_login_requires_single_use_code() {
    let (app, shared) = spawn_app().await;
    seed_user(&shared, "gated", 1).await;

    // No code at all.
    let (status, _) = request(
        &app,
        "POST",
        "/user/login",
        None,
        Some(json!({ "username": "gated", "password": "password123" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Wrong code.
    let (status, _) = request(
        &app,
        "POST",
        "/user/login",
        None,
        Some(json!({ "username": "gated", "password": "password123", "smsCode": "000000" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (code, expire_in) = shared
        .store
        .issue_code("gated", CodePurpose::Login)
        .await
        .unwrap();
    assert_eq!(expire_in, 600);

    let (status, body) = request(
        &app,
        "POST",
        "/user/login",
        None,
        Some(json!({ "username": "gated", "password": "password123", "smsCode": code })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body["data"]["apiKey"].is_string());

    // The code was consumed; replaying it fails.
    let (status, _) = request(
        &app,
        "POST",
        "/user/login",
        None,
        Some(json!({ "username": "gated", "password": "password123", "smsCode": code })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_expired_code_fails_without_sweep() {
    let (_app, shared) = spawn_app().await;
    seed_user(&shared, "expiry", 1).await;

    // Plant a code that expired a second ago; no sweep has run.
    verification_codes::ActiveModel {
        username: Set("expiry".to_string()),
        code: Set("123456".to_string()),
        purpose: Set("login".to_string()),
        expires_at: Set(now_millis() - 1_000),
        created_at: Set(now_rfc3339()),
        ..Default::default()
    }
    .insert(&shared.store.conn)
    .await
    .unwrap();

    let valid = shared
        .store
        .verify_code("expiry", "123456", CodePurpose::Login)
        .await
        .unwrap();
    assert!(!valid);
}

#[tokio::test]
async fn test_login_code_does_not_satisfy_reset() {
    let (_app, shared) = spawn_app().await;
    seed_user(&shared, "purposes", 0).await;

    let (code, _) = shared
        .store
        .issue_code("purposes", CodePurpose::Login)
        .await
        .unwrap();

    let valid = shared
        .store
        .verify_code("purposes", &code, CodePurpose::ResetPassword)
        .await
        .unwrap();
    assert!(!valid);
}

#[tokio::test]
async fn test_device_register_is_upsert_by_machine_id() {
    let (app, shared) = spawn_app().await;
    let user_id = seed_user(&shared, "devowner", 0).await;
    let token = login(&app, "devowner", "password123").await;

    let (status, first) = request(
        &app,
        "POST",
        "/device/register",
        Some(&token),
        Some(json!({ "machineId": "m-1", "machineCode": "code-one" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["data"]["machineCode"], "code-one");
    assert_eq!(first["data"]["currentAccount"], "devowner@test.dev");

    let (status, second) = request(
        &app,
        "POST",
        "/device/register",
        Some(&token),
        Some(json!({ "machineId": "m-1", "machineCode": "code-two" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["data"]["machineCode"], "code-two");

    // Exactly one row; the second registration's values won.
    let devices = shared.store.list_devices(user_id).await.unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].machine_code, "code-two");

    let (_, listed) = request(&app, "GET", "/device/list", Some(&token), None).await;
    assert_eq!(listed["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_device_deactivate_and_info() {
    let (app, shared) = spawn_app().await;
    seed_user(&shared, "deact", 0).await;
    let token = login(&app, "deact", "password123").await;

    request(
        &app,
        "POST",
        "/device/register",
        Some(&token),
        Some(json!({ "machineId": "m-2", "machineCode": "c" })),
    )
    .await;

    let (status, body) = request(
        &app,
        "PUT",
        "/device/deactivate",
        Some(&token),
        Some(json!({ "machineId": "m-2" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["machineId"], "m-2");

    let (status, body) = request(
        &app,
        "GET",
        "/device/info?machineId=m-2",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isActive"], false);

    let (status, _) = request(
        &app,
        "GET",
        "/device/info?machineId=unknown",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_reset_machine_id_does_not_persist() {
    let (app, shared) = spawn_app().await;
    let user_id = seed_user(&shared, "resetter", 0).await;
    let token = login(&app, "resetter", "password123").await;

    request(
        &app,
        "POST",
        "/device/register",
        Some(&token),
        Some(json!({ "machineId": "m-old", "machineCode": "c" })),
    )
    .await;

    let (status, body) = request(
        &app,
        "POST",
        "/device/reset_machine_id",
        Some(&token),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let new_machine_id = body["data"]["machineId"].as_str().unwrap();
    assert_ne!(new_machine_id, "m-old");
    assert_eq!(body["data"]["machineCode"].as_str().unwrap().len(), 32);
    assert_eq!(body["data"]["cursorToken"].as_str().unwrap().len(), 64);

    // Nothing stored changed; only the original binding exists.
    let devices = shared.store.list_devices(user_id).await.unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].machine_id, "m-old");
}

#[tokio::test]
async fn test_api_key_in_request_body_authenticates() {
    let (app, shared) = spawn_app().await;
    seed_user(&shared, "bodykey", 0).await;
    let token = login(&app, "bodykey", "password123").await;

    // No Authorization header; the token rides in the JSON body.
    let (status, body) = request(
        &app,
        "POST",
        "/device/register",
        None,
        Some(json!({ "apiKey": token, "machineId": "m-3", "machineCode": "c" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["machineId"], "m-3");
}

#[tokio::test]
async fn test_usage_increments_accumulate() {
    let (app, shared) = spawn_app().await;
    seed_user(&shared, "burner", 0).await;
    let token = login(&app, "burner", "password123").await;

    let (status, _) = request(
        &app,
        "POST",
        "/cursor/update_usage",
        Some(&token),
        Some(json!({ "modelType": "gpt-4", "increment": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = request(
        &app,
        "POST",
        "/cursor/update_usage",
        Some(&token),
        Some(json!({ "modelType": "gpt-4", "increment": 2 })),
    )
    .await;
    assert_eq!(body["data"]["gpt-4"]["numRequests"], 5);

    let (_, info) = request(&app, "GET", "/user/info", Some(&token), None).await;
    assert_eq!(info["data"]["usedCount"], 5);

    let (status, usage) = request(
        &app,
        "GET",
        &format!("/cursor/usage?token={token}"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(usage["data"]["gpt-4"]["numRequests"], 5);
    assert_eq!(usage["data"]["gpt-4"]["numTokens"], 500);
    assert_eq!(usage["data"]["gpt-4"]["maxTokenUsage"], 20_000);
    assert_eq!(usage["data"]["gpt-3.5-turbo"]["numRequests"], 0);
    assert!(usage["data"]["startOfMonth"].is_string());
}

#[tokio::test]
async fn test_cursor_endpoints_require_token_query() {
    let (app, shared) = spawn_app().await;
    seed_user(&shared, "querytoken", 0).await;
    let token = login(&app, "querytoken", "password123").await;

    // Authenticated via header, but the endpoint insists on the query param.
    let (status, _) = request(&app, "GET", "/cursor/usage", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = request(
        &app,
        "GET",
        &format!("/cursor/user_info?token={token}"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email_verified"], true);
    assert_eq!(body["data"]["name"], "querytoken");
    assert!(body["data"]["picture"].is_null());
}

#[tokio::test]
async fn test_account_token_is_stable_per_user() {
    let (app, shared) = spawn_app().await;
    seed_user(&shared, "stable", 0).await;
    let token = login(&app, "stable", "password123").await;

    let (status, first) = request(&app, "GET", "/user/account", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, second) = request(&app, "GET", "/user/account", Some(&token), None).await;

    let a = first["data"]["token"].as_str().unwrap();
    assert_eq!(a.len(), 64);
    assert_eq!(a, second["data"]["token"].as_str().unwrap());
    assert_eq!(first["data"]["email"], "stable@test.dev");
}

#[tokio::test]
async fn test_change_password_rotates_credentials() {
    let (app, shared) = spawn_app().await;
    seed_user(&shared, "rotator", 0).await;
    let token = login(&app, "rotator", "password123").await;

    let (status, _) = request(
        &app,
        "POST",
        "/user/change_password",
        Some(&token),
        Some(json!({ "oldPassword": "wrong", "newPassword": "next-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = request(
        &app,
        "POST",
        "/user/change_password",
        Some(&token),
        Some(json!({ "oldPassword": "password123", "newPassword": "next-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["apiKey"].is_string());

    let (status, _) = request(
        &app,
        "POST",
        "/user/login",
        None,
        Some(json!({ "username": "rotator", "password": "password123" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    login(&app, "rotator", "next-password").await;
}

#[tokio::test]
async fn test_reset_password_with_emailed_code() {
    let (app, shared) = spawn_app().await;
    seed_user(&shared, "forgetful", 0).await;

    let (code, _) = shared
        .store
        .issue_code("forgetful", CodePurpose::ResetPassword)
        .await
        .unwrap();

    let (status, body) = request(
        &app,
        "POST",
        "/user/reset_password",
        None,
        Some(json!({
            "email": "forgetful@test.dev",
            "smsCode": code,
            "newPassword": "recovered-pass",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    login(&app, "forgetful", "recovered-pass").await;
}

#[tokio::test]
async fn test_auth_gate_rejects_missing_and_garbage_tokens() {
    let (app, _shared) = spawn_app().await;

    let (status, _) = request(&app, "GET", "/user/info", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = request(&app, "GET", "/user/info", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_gate_rejects_non_admin() {
    let (app, shared) = spawn_app().await;
    seed_user(&shared, "pleb", 0).await;
    let token = login(&app, "pleb", "password123").await;

    let (status, _) = request(&app, "GET", "/admin/users", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = request(&app, "GET", "/admin/users", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_user_crud_and_pagination() {
    let (app, shared) = spawn_app().await;
    let token = login_admin(&app, &shared).await;

    let (status, created) = request(
        &app,
        "POST",
        "/admin/users",
        Some(&token),
        Some(json!({
            "username": "alice",
            "email": "Alice@Test.dev",
            "password": "alicepass",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let alice_id = created["data"]["id"].as_i64().unwrap();
    // Emails are canonicalized to lowercase.
    assert_eq!(created["data"]["email"], "alice@test.dev");
    assert_eq!(created["data"]["totalCount"], 100);
    assert_eq!(created["data"]["isAdmin"], false);

    // Duplicate username rejected with 400.
    let (status, _) = request(
        &app,
        "POST",
        "/admin/users",
        Some(&token),
        Some(json!({
            "username": "alice",
            "email": "other@test.dev",
            "password": "x",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, listed) = request(
        &app,
        "GET",
        "/admin/users?page=1&limit=10&search=alice",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["data"]["pagination"]["total"], 1);
    assert_eq!(listed["data"]["pagination"]["pages"], 1);
    assert_eq!(listed["data"]["users"][0]["username"], "alice");

    let (status, updated) = request(
        &app,
        "PUT",
        &format!("/admin/users/{alice_id}"),
        Some(&token),
        Some(json!({ "level": 2, "totalCount": 500 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["data"]["level"], 2);
    assert_eq!(updated["data"]["totalCount"], 500);

    let (status, details) = request(
        &app,
        "GET",
        &format!("/admin/users/{alice_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(details["data"]["user"]["username"], "alice");
    assert!(details["data"]["devices"].as_array().unwrap().is_empty());

    let (status, _) = request(
        &app,
        "POST",
        &format!("/admin/users/{alice_id}/reset-password"),
        Some(&token),
        Some(json!({ "newPassword": "fresh-pass" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    // Alice was created at level 0, so password login suffices.
    login(&app, "alice", "fresh-pass").await;

    let (status, _) = request(&app, "GET", "/admin/users/999999", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_delete_cascades_devices() {
    let (app, shared) = spawn_app().await;
    let user_id = seed_user(&shared, "doomed", 0).await;
    let user_token = login(&app, "doomed", "password123").await;

    request(
        &app,
        "POST",
        "/device/register",
        Some(&user_token),
        Some(json!({ "machineId": "m-d", "machineCode": "c" })),
    )
    .await;
    assert_eq!(shared.store.list_devices(user_id).await.unwrap().len(), 1);

    let admin_token = login_admin(&app, &shared).await;
    let (status, body) = request(
        &app,
        "DELETE",
        &format!("/admin/users/{user_id}"),
        Some(&admin_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].is_null());

    assert!(shared.store.get_user(user_id).await.unwrap().is_none());
    assert!(shared.store.list_devices(user_id).await.unwrap().is_empty());

    // The deleted user's session now resolves to a missing account.
    let (status, _) = request(&app, "GET", "/user/info", Some(&user_token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_system_config_read_and_admin_write() {
    let (app, shared) = spawn_app().await;

    // Seeded defaults are publicly readable.
    let (status, version) = request(&app, "GET", "/system/version", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(version["data"]["version"], "1.0.0");

    let (status, info) = request(&app, "GET", "/system/public_info", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(info["data"]["type"], "info");

    let admin_token = login_admin(&app, &shared).await;

    let (status, _) = request(
        &app,
        "PUT",
        "/system/version",
        Some(&admin_token),
        Some(json!({ "version": "2.0.0" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, updated) = request(
        &app,
        "PUT",
        "/system/version",
        Some(&admin_token),
        Some(json!({
            "version": "2.0.0",
            "downloadUrl": "https://example.com/v2",
            "forceUpdate": true,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["data"]["forceUpdate"], true);

    let (_, version) = request(&app, "GET", "/system/version", None, None).await;
    assert_eq!(version["data"]["version"], "2.0.0");

    let (status, _) = request(
        &app,
        "PUT",
        "/system/public_info",
        Some(&admin_token),
        Some(json!({
            "type": "warning",
            "props": { "title": "Maintenance" },
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, info) = request(&app, "GET", "/system/public_info", None, None).await;
    assert_eq!(info["data"]["type"], "warning");
    assert_eq!(info["data"]["closeable"], false);
}

#[tokio::test]
async fn test_system_write_requires_admin() {
    let (app, shared) = spawn_app().await;
    seed_user(&shared, "nonadmin", 0).await;
    let token = login(&app, "nonadmin", "password123").await;

    let (status, _) = request(
        &app,
        "PUT",
        "/system/version",
        Some(&token),
        Some(json!({ "version": "9.9.9", "downloadUrl": "https://example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_send_code_requires_known_user() {
    let (app, _shared) = spawn_app().await;

    let (status, _) = request(
        &app,
        "POST",
        "/user/send_code",
        None,
        Some(json!({ "username": "ghost" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Without SMTP configured the code is logged, not mailed; the request
    // still succeeds and reports the TTL.
    let (status, body) = request(
        &app,
        "POST",
        "/user/send_code",
        None,
        Some(json!({ "username": ADMIN_EMAIL })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["expireIn"], 600);
}

#[tokio::test]
async fn test_metrics_endpoint_requires_auth() {
    let (app, _shared) = spawn_app().await;

    let (status, _) = request(&app, "GET", "/metrics", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
