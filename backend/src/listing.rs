use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::Claims;
use crate::error::{ApiError, ApiJson};
use crate::models::{Category, Listing, NewListing, Quality, Role};
use crate::store::ListingFilter;
use crate::validate::{coerce_number, present};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateListingRequest {
    pub category: Option<String>,
    pub item_name: Option<String>,
    pub product_quality: Option<String>,
    pub price: Option<Value>,
    /// Older listing forms send the AI price estimate under this name.
    #[serde(rename = "estimatedPriceINR")]
    pub estimated_price_inr: Option<Value>,
    pub description: Option<String>,
    pub usage_or_disposal_info: Option<String>,
    pub swachh_bharat_tagline: Option<String>,
    pub image_data: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListingsQuery {
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListingResponse {
    pub message: String,
    pub listing: Listing,
}

#[derive(Debug, Serialize)]
pub struct ListingsResponse {
    pub listings: Vec<Listing>,
}

/// Listing fields after validation; the seller is filled in by the handler.
#[derive(Debug)]
struct ListingDraft {
    category: Category,
    item_name: String,
    product_quality: Quality,
    price: f64,
    description: String,
    usage_or_disposal_info: String,
    swachh_bharat_tagline: String,
    image_data: String,
}

impl CreateListingRequest {
    fn validate(self) -> Result<ListingDraft, ApiError> {
        let raw_price = self.price.or(self.estimated_price_inr);
        let (
            Some(category),
            Some(item_name),
            Some(quality),
            Some(raw_price),
            Some(description),
            Some(usage_or_disposal_info),
        ) = (
            present(self.category),
            present(self.item_name),
            present(self.product_quality),
            raw_price,
            present(self.description),
            present(self.usage_or_disposal_info),
        )
        else {
            return Err(ApiError::validation("All required fields must be provided"));
        };

        let category = category
            .parse::<Category>()
            .map_err(|_| ApiError::validation("Invalid category"))?;
        let product_quality = quality
            .parse::<Quality>()
            .map_err(|_| ApiError::validation("Invalid product quality"))?;
        let price = coerce_number(&raw_price)
            .filter(|p| *p >= 0.0)
            .ok_or_else(|| ApiError::validation("Price must be a non-negative number"))?;

        Ok(ListingDraft {
            category,
            item_name,
            product_quality,
            price,
            description,
            usage_or_disposal_info,
            swachh_bharat_tagline: self.swachh_bharat_tagline.unwrap_or_default(),
            image_data: self.image_data.unwrap_or_default(),
        })
    }
}

/// Publishes a listing owned by the calling seller.
pub async fn create_listing(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(body): ApiJson<CreateListingRequest>,
) -> Result<(StatusCode, Json<ListingResponse>), ApiError> {
    let identity = claims.require_role(Role::Seller, "Only sellers can create listings")?;
    let draft = body.validate()?;

    let seller = state
        .store
        .find_account(identity.id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let listing = state
        .store
        .create_listing(NewListing {
            seller: seller.id,
            seller_name: seller.name,
            category: draft.category,
            item_name: draft.item_name,
            product_quality: draft.product_quality,
            price: draft.price,
            description: draft.description,
            usage_or_disposal_info: draft.usage_or_disposal_info,
            swachh_bharat_tagline: draft.swachh_bharat_tagline,
            image_data: draft.image_data,
        })
        .await?;

    info!(
        "Seller {} listed {} ({}, {})",
        listing.seller, listing.id, listing.category, listing.product_quality
    );
    Ok((
        StatusCode::CREATED,
        Json(ListingResponse {
            message: "Listing created successfully".to_string(),
            listing,
        }),
    ))
}

/// Public catalog, newest first, optionally narrowed to one category.
/// A category nothing is filed under matches no listings.
pub async fn list_listings(
    State(state): State<AppState>,
    Query(query): Query<ListingsQuery>,
) -> Result<Json<ListingsResponse>, ApiError> {
    let category = match present(query.category).map(|c| c.parse::<Category>()) {
        None => None,
        Some(Ok(category)) => Some(category),
        Some(Err(unknown)) => {
            log::debug!("Catalog filter on {}", unknown);
            return Ok(Json(ListingsResponse {
                listings: Vec::new(),
            }));
        }
    };
    let listings = state
        .store
        .list_listings(ListingFilter {
            category,
            seller: None,
        })
        .await?;
    Ok(Json(ListingsResponse { listings }))
}

/// The calling seller's own listings.
pub async fn my_listings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ListingsResponse>, ApiError> {
    let identity = claims.require_role(Role::Seller, "Only sellers can view their listings")?;
    let listings = state
        .store
        .list_listings(ListingFilter {
            category: None,
            seller: Some(identity.id),
        })
        .await?;
    Ok(Json(ListingsResponse { listings }))
}
