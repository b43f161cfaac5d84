#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use dharani_backend::{build_router, nagarnigam, AppConfig, AppState, MemoryStore, Store};
use serde_json::{json, Value};
use tower::ServiceExt;

pub const SECRET: &str = "integration-secret";
pub const AUTHORITY_EMAIL: &str = "nagarnigam@dharani.com";
pub const AUTHORITY_PASSWORD: &str = "nagarnigam123";

pub fn test_config() -> AppConfig {
    AppConfig {
        jwt_secret: SECRET.to_string(),
        database_url: None,
        host: "127.0.0.1".to_string(),
        port: 0,
        db_pool_size: 1,
        bcrypt_cost: 4,
        body_limit_bytes: 10 * 1024 * 1024,
        authority_name: "Nagar Nigam".to_string(),
        authority_email: AUTHORITY_EMAIL.to_string(),
        authority_password: AUTHORITY_PASSWORD.to_string(),
    }
}

/// Router over `store` with the authority seeded.
pub async fn app_with(config: AppConfig, store: Arc<dyn Store>) -> Router {
    nagarnigam::seed_authority(store.as_ref(), &config)
        .await
        .expect("seed authority");
    build_router(AppState::new(config, store))
}

pub async fn app() -> Router {
    app_with(test_config(), Arc::new(MemoryStore::new())).await
}

pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request");

    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

pub async fn post(app: &Router, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
    send(app, Method::POST, uri, token, Some(body)).await
}

pub async fn get(app: &Router, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
    send(app, Method::GET, uri, token, None).await
}

/// Signs up and returns `(token, account id)`.
pub async fn signup(app: &Router, name: &str, email: &str, role: &str) -> (String, String) {
    let (status, body) = post(
        app,
        "/api/signup",
        None,
        json!({ "name": name, "email": email, "password": "secret123", "role": role }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "signup failed: {body}");
    (
        body["token"].as_str().unwrap().to_string(),
        body["user"]["id"].as_str().unwrap().to_string(),
    )
}

pub fn listing_body(quality: &str, price: Value) -> Value {
    json!({
        "category": "Scrap / Garbage",
        "itemName": "Old washing machine",
        "productQuality": quality,
        "price": price,
        "description": "Drum cracked",
        "usageOrDisposalInfo": "Metal can be recycled"
    })
}

pub async fn create_listing(app: &Router, token: &str, quality: &str) -> String {
    let (status, body) = post(app, "/api/listings", Some(token), listing_body(quality, json!(450))).await;
    assert_eq!(status, StatusCode::CREATED, "listing failed: {body}");
    body["listing"]["id"].as_str().unwrap().to_string()
}

pub async fn authority_token(app: &Router) -> String {
    let (status, body) = post(
        app,
        "/api/nagarnigam/login",
        None,
        json!({ "email": AUTHORITY_EMAIL, "password": AUTHORITY_PASSWORD }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "authority login failed: {body}");
    body["token"].as_str().unwrap().to_string()
}

pub async fn dump_request(app: &Router, token: &str, listing_id: &str) -> (StatusCode, Value) {
    post(
        app,
        "/api/dump-requests",
        Some(token),
        json!({
            "listingId": listing_id,
            "latitude": 28.61,
            "longitude": "77.20",
            "address": "Sector 5"
        }),
    )
    .await
}

/// Files a dump request for a fresh Critical listing and returns `(seller token, request id)`.
pub async fn pending_dump_request(app: &Router) -> (String, String) {
    let (seller, _) = signup(app, "Asha", "asha@example.com", "Seller").await;
    let critical = create_listing(app, &seller, "Critical").await;
    let (status, body) = dump_request(app, &seller, &critical).await;
    assert_eq!(status, StatusCode::CREATED, "dump request failed: {body}");
    (seller, body["dumpRequest"]["id"].as_str().unwrap().to_string())
}
