//! Municipal authority (Nagar Nigam) side: login, its dump request queue, and decisions.

use axum::extract::{Path, State};
use axum::{Extension, Json};
use chrono::Utc;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::account::normalize_email;
use crate::auth::{self, Claims};
use crate::config::AppConfig;
use crate::dump_request::{populate, populate_all, DumpRequestResponse, DumpRequestsResponse};
use crate::error::{ApiError, ApiJson};
use crate::models::{Authority, DumpDecision, DumpStatus, GeoPoint, NamedLocation, NewAuthority};
use crate::store::{DecisionOutcome, DumpRequestFilter, Store};
use crate::validate::{latitude, longitude, parse_id, present};
use crate::AppState;

pub const DEFAULT_DUMP_ADDRESS: &str = "Approved dump location";

#[derive(Debug, Deserialize)]
pub struct AuthorityLoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthorityProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorityLoginResponse {
    pub message: String,
    pub token: String,
    pub nagar_nigam: AuthorityProfile,
}

#[derive(Debug, Deserialize)]
pub struct LocationPayload {
    pub latitude: Option<Value>,
    pub longitude: Option<Value>,
    pub address: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionRequest {
    pub status: Option<String>,
    pub dump_location: Option<LocationPayload>,
}

pub fn default_locations() -> Vec<NamedLocation> {
    [
        ("Main Dump Yard", 28.6139, 77.2090, "Delhi Main Dump Yard"),
        ("North Zone", 28.7041, 77.1025, "North Zone Dump Yard"),
        ("South Zone", 28.5245, 77.1855, "South Zone Dump Yard"),
    ]
    .into_iter()
    .map(|(name, latitude, longitude, address)| NamedLocation {
        name: name.to_string(),
        latitude,
        longitude,
        address: address.to_string(),
    })
    .collect()
}

/// Creates the configured authority account unless it already exists.
pub async fn seed_authority(store: &dyn Store, config: &AppConfig) -> Result<Authority, ApiError> {
    let email = normalize_email(&config.authority_email);
    if let Some(existing) = store.find_authority_by_email(&email).await? {
        info!("Nagar Nigam account already exists: {}", existing.email);
        return Ok(existing);
    }
    let password_hash =
        auth::hash_password(config.authority_password.clone(), config.bcrypt_cost).await?;
    let authority = store
        .create_authority(NewAuthority {
            name: config.authority_name.clone(),
            email,
            password_hash,
            locations: default_locations(),
        })
        .await?;
    info!("Nagar Nigam initialized with account {}", authority.email);
    Ok(authority)
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<AuthorityLoginRequest>,
) -> Result<Json<AuthorityLoginResponse>, ApiError> {
    let (Some(email), Some(password)) = (present(body.email), body.password.filter(|p| !p.is_empty()))
    else {
        return Err(ApiError::validation("Email and password are required"));
    };
    let rejected = || ApiError::Unauthenticated("Invalid credentials".to_string());

    let authority = state
        .store
        .find_authority_by_email(&normalize_email(&email))
        .await?
        .ok_or_else(rejected)?;
    if !auth::verify_password(password, authority.password_hash.clone()).await? {
        return Err(rejected());
    }

    info!("Nagar Nigam {} logged in", authority.id);
    let token = auth::issue_authority_token(&authority, &state.config.jwt_secret)?;
    Ok(Json(AuthorityLoginResponse {
        message: "Login successful".to_string(),
        token,
        nagar_nigam: AuthorityProfile {
            id: authority.id,
            name: authority.name,
            email: authority.email,
        },
    }))
}

/// Dump requests routed to the calling authority, newest first.
pub async fn list_dump_requests(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<DumpRequestsResponse>, ApiError> {
    let authority = claims.authority()?;
    let requests = state
        .store
        .list_dump_requests(DumpRequestFilter::Authority(authority))
        .await?;
    let dump_requests = populate_all(state.store.as_ref(), requests).await?;
    Ok(Json(DumpRequestsResponse { dump_requests }))
}

fn dump_location(payload: Option<LocationPayload>) -> Result<GeoPoint, ApiError> {
    let payload =
        payload.ok_or_else(|| ApiError::validation("Dump location is required for approval"))?;
    Ok(GeoPoint {
        latitude: latitude(payload.latitude.as_ref())?,
        longitude: longitude(payload.longitude.as_ref())?,
        address: present(payload.address).unwrap_or_else(|| DEFAULT_DUMP_ADDRESS.to_string()),
    })
}

/// Approves (with a dump location) or rejects a Pending dump request.
pub async fn decide_dump_request(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(request_id): Path<String>,
    ApiJson(body): ApiJson<DecisionRequest>,
) -> Result<Json<DumpRequestResponse>, ApiError> {
    let authority = claims.authority()?;
    let status = present(body.status)
        .and_then(|s| s.parse::<DumpStatus>().ok())
        .filter(|s| matches!(s, DumpStatus::Approved | DumpStatus::Rejected))
        .ok_or_else(|| ApiError::validation("Invalid status"))?;
    let dump_location = match status {
        DumpStatus::Approved => Some(dump_location(body.dump_location)?),
        _ => None,
    };
    let request_id = parse_id(&request_id, "dump request")?;

    let request = state
        .store
        .find_dump_request(request_id)
        .await?
        .filter(|r| r.authority == authority)
        .ok_or_else(|| ApiError::not_found("Dump request not found"))?;
    let already_decided = |current: DumpStatus| {
        ApiError::validation(format!(
            "Dump request has already been {}",
            current.as_str().to_lowercase()
        ))
    };
    if !request.status.can_transition_to(status) {
        return Err(already_decided(request.status));
    }

    let decision = DumpDecision {
        status,
        dump_location,
        decided_at: Utc::now(),
    };
    let decided = match state.store.record_dump_decision(request.id, decision).await? {
        DecisionOutcome::Recorded(decided) => decided,
        DecisionOutcome::AlreadyDecided(current) => {
            warn!("Dump request {} was decided concurrently", request.id);
            return Err(already_decided(current));
        }
        DecisionOutcome::Missing => return Err(ApiError::not_found("Dump request not found")),
    };
    info!("Nagar Nigam {} marked dump request {} {}", authority, decided.id, status);

    let verdict = status.as_str().to_lowercase();
    let dump_request = populate(state.store.as_ref(), decided).await?;
    Ok(Json(DumpRequestResponse {
        message: format!("Dump request {verdict} successfully"),
        dump_request,
    }))
}
