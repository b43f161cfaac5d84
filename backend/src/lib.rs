//! JSON API for the Dharani marketplace: sellers list used and scrap goods, buyers
//! contact them, and Critical items are routed to the municipal authority for disposal.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{DefaultBodyLimit, Request};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

pub mod account;
pub mod appointment;
pub mod auth;
pub mod config;
pub mod db;
pub mod dump_request;
pub mod error;
pub mod listing;
pub mod models;
pub mod nagarnigam;
pub mod schema;
pub mod store;
pub mod validate;

pub use config::AppConfig;
pub use db::PgStore;
pub use error::ApiError;
pub use store::{MemoryStore, Store, StoreError};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn Store>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn Store>) -> Self {
        Self {
            config: Arc::new(config),
            store,
        }
    }
}

async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let started = Instant::now();
    let response = next.run(request).await;
    log::info!(
        "{} {} -> {} in {} ms",
        method,
        path,
        response.status().as_u16(),
        started.elapsed().as_millis()
    );
    response
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub fn build_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/api/verify", get(account::verify))
        .route("/api/listings", post(listing::create_listing))
        .route("/api/listings/mine", get(listing::my_listings))
        .route(
            "/api/appointments",
            post(appointment::create_appointment).get(appointment::list_appointments),
        )
        .route(
            "/api/dump-requests",
            post(dump_request::create_dump_request).get(dump_request::list_dump_requests),
        )
        .route(
            "/api/nagarnigam/dump-requests",
            get(nagarnigam::list_dump_requests),
        )
        .route(
            "/api/nagarnigam/dump-requests/:request_id/approve",
            post(nagarnigam::decide_dump_request),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::authenticate,
        ));

    Router::new()
        .route("/", get(|| async { "Dharani marketplace API" }))
        .route("/health", get(health))
        .route("/api/signup", post(account::signup))
        .route("/api/login", post(account::login))
        .route("/api/listings", get(listing::list_listings))
        .route("/api/nagarnigam/login", post(nagarnigam::login))
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(state.config.body_limit_bytes))
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}
