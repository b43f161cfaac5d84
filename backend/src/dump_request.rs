use std::collections::HashMap;

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::auth::Claims;
use crate::error::{ApiError, ApiJson};
use crate::models::{
    Account, AccountSummary, Authority, AuthoritySummary, DumpRequest, DumpRequestView, GeoPoint,
    Listing, NewDumpRequest, Quality, Role,
};
use crate::store::{distinct_ids, DumpRequestFilter, Store, StoreError};
use crate::validate::{latitude, longitude, parse_id, present};
use crate::AppState;

pub const DEFAULT_SELLER_ADDRESS: &str = "Location provided";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDumpRequestRequest {
    pub listing_id: Option<String>,
    pub latitude: Option<Value>,
    pub longitude: Option<Value>,
    pub address: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DumpRequestResponse {
    pub message: String,
    pub dump_request: DumpRequestView,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DumpRequestsResponse {
    pub dump_requests: Vec<DumpRequestView>,
}

/// Listings, sellers and authorities referenced by a batch of dump requests,
/// fetched with one lookup per table.
struct Related {
    listings: HashMap<Uuid, Listing>,
    sellers: HashMap<Uuid, Account>,
    authorities: HashMap<Uuid, Authority>,
}

impl Related {
    async fn load(store: &dyn Store, requests: &[DumpRequest]) -> Result<Self, StoreError> {
        let listings = store
            .find_listings(&distinct_ids(requests.iter().map(|r| r.listing)))
            .await?;
        let sellers = store
            .find_accounts(&distinct_ids(requests.iter().map(|r| r.seller)))
            .await?;
        let authorities = store
            .find_authorities(&distinct_ids(requests.iter().map(|r| r.authority)))
            .await?;
        Ok(Self {
            listings: listings.into_iter().map(|l| (l.id, l)).collect(),
            sellers: sellers.into_iter().map(|a| (a.id, a)).collect(),
            authorities: authorities.into_iter().map(|a| (a.id, a)).collect(),
        })
    }

    fn view(&self, request: DumpRequest) -> DumpRequestView {
        DumpRequestView {
            id: request.id,
            listing: self.listings.get(&request.listing).cloned(),
            seller: self.sellers.get(&request.seller).map(AccountSummary::from),
            nagar_nigam: self
                .authorities
                .get(&request.authority)
                .map(AuthoritySummary::from),
            seller_location: request.seller_location,
            dump_location: request.dump_location,
            status: request.status,
            message: request.message,
            approved_at: request.approved_at,
            completed_at: request.completed_at,
            created_at: request.created_at,
            updated_at: request.updated_at,
        }
    }
}

/// Resolves the listing, seller and authority of a dump request.
pub async fn populate(
    store: &dyn Store,
    request: DumpRequest,
) -> Result<DumpRequestView, StoreError> {
    let related = Related::load(store, std::slice::from_ref(&request)).await?;
    Ok(related.view(request))
}

pub async fn populate_all(
    store: &dyn Store,
    requests: Vec<DumpRequest>,
) -> Result<Vec<DumpRequestView>, StoreError> {
    let related = Related::load(store, &requests).await?;
    Ok(requests.into_iter().map(|r| related.view(r)).collect())
}

/// A seller asks the municipal authority to dispose of one of their Critical listings.
pub async fn create_dump_request(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(body): ApiJson<CreateDumpRequestRequest>,
) -> Result<(StatusCode, Json<DumpRequestResponse>), ApiError> {
    let seller = claims.require_role(Role::Seller, "Only sellers can create dump requests")?;
    let listing_id = present(body.listing_id)
        .ok_or_else(|| ApiError::validation("Listing ID is required"))?;
    let listing_id = parse_id(&listing_id, "listing")?;
    let seller_location = GeoPoint {
        latitude: latitude(body.latitude.as_ref())?,
        longitude: longitude(body.longitude.as_ref())?,
        address: present(body.address).unwrap_or_else(|| DEFAULT_SELLER_ADDRESS.to_string()),
    };

    let listing = state
        .store
        .find_listing(listing_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Listing not found"))?;
    if listing.seller != seller.id {
        return Err(ApiError::forbidden(
            "You can only request disposal of your own listings",
        ));
    }
    if listing.product_quality != Quality::Critical {
        return Err(ApiError::validation(
            "Dump requests can only be created for Critical quality items",
        ));
    }

    let Some(authority) = state.store.first_authority().await? else {
        warn!("Dump request for listing {} with no authority configured", listing.id);
        return Err(ApiError::Unavailable(
            "Nagar Nigam service not available".to_string(),
        ));
    };

    let request = state
        .store
        .create_dump_request(NewDumpRequest {
            listing: listing.id,
            seller: seller.id,
            authority: authority.id,
            seller_location,
            message: body.message.map(|m| m.trim().to_string()).unwrap_or_default(),
        })
        .await?;
    info!(
        "Seller {} requested disposal of listing {} ({})",
        request.seller, request.listing, request.id
    );

    let dump_request = populate(state.store.as_ref(), request).await?;
    Ok((
        StatusCode::CREATED,
        Json(DumpRequestResponse {
            message: "Dump request created successfully".to_string(),
            dump_request,
        }),
    ))
}

/// The calling seller's dump requests, newest first.
pub async fn list_dump_requests(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<DumpRequestsResponse>, ApiError> {
    let seller = claims.require_role(Role::Seller, "Only sellers can view dump requests")?;
    let requests = state
        .store
        .list_dump_requests(DumpRequestFilter::Seller(seller.id))
        .await?;
    let dump_requests = populate_all(state.store.as_ref(), requests).await?;
    Ok(Json(DumpRequestsResponse { dump_requests }))
}
