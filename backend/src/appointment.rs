use std::collections::HashMap;

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use log::info;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::Claims;
use crate::error::{ApiError, ApiJson};
use crate::models::{
    Account, AccountSummary, Appointment, AppointmentView, Listing, NewAppointment, Role,
};
use crate::store::{distinct_ids, AppointmentParty, Store, StoreError};
use crate::validate::{parse_id, present};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAppointmentRequest {
    pub listing_id: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AppointmentResponse {
    pub message: String,
    pub appointment: AppointmentView,
}

#[derive(Debug, Serialize)]
pub struct AppointmentsResponse {
    pub appointments: Vec<AppointmentView>,
}

/// Listings and parties referenced by a batch of appointments, one store lookup per table.
struct Related {
    listings: HashMap<Uuid, Listing>,
    accounts: HashMap<Uuid, Account>,
}

impl Related {
    async fn load(store: &dyn Store, appointments: &[Appointment]) -> Result<Self, StoreError> {
        let listings = store
            .find_listings(&distinct_ids(appointments.iter().map(|a| a.listing)))
            .await?;
        let parties = distinct_ids(appointments.iter().flat_map(|a| [a.seller, a.buyer]));
        let accounts = store.find_accounts(&parties).await?;
        Ok(Self {
            listings: listings.into_iter().map(|l| (l.id, l)).collect(),
            accounts: accounts.into_iter().map(|a| (a.id, a)).collect(),
        })
    }

    fn view(&self, appointment: Appointment) -> AppointmentView {
        AppointmentView {
            id: appointment.id,
            listing: self.listings.get(&appointment.listing).cloned(),
            seller: self.accounts.get(&appointment.seller).map(AccountSummary::from),
            buyer: self.accounts.get(&appointment.buyer).map(AccountSummary::from),
            message: appointment.message,
            status: appointment.status,
            created_at: appointment.created_at,
            updated_at: appointment.updated_at,
        }
    }
}

/// Resolves the listing and both parties of an appointment.
pub async fn populate(
    store: &dyn Store,
    appointment: Appointment,
) -> Result<AppointmentView, StoreError> {
    let related = Related::load(store, std::slice::from_ref(&appointment)).await?;
    Ok(related.view(appointment))
}

pub async fn populate_all(
    store: &dyn Store,
    appointments: Vec<Appointment>,
) -> Result<Vec<AppointmentView>, StoreError> {
    let related = Related::load(store, &appointments).await?;
    Ok(appointments.into_iter().map(|a| related.view(a)).collect())
}

/// A buyer contacts the seller of a listing. The appointment starts out Pending.
pub async fn create_appointment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(body): ApiJson<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<AppointmentResponse>), ApiError> {
    let buyer = claims.require_role(Role::Buyer, "Only buyers can contact sellers")?;
    let listing_id = present(body.listing_id)
        .ok_or_else(|| ApiError::validation("Listing ID is required"))?;
    let listing_id = parse_id(&listing_id, "listing")?;

    let listing = state
        .store
        .find_listing(listing_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Listing not found"))?;
    if listing.seller == buyer.id {
        return Err(ApiError::validation("You cannot contact your own listing"));
    }

    let appointment = state
        .store
        .create_appointment(NewAppointment {
            listing: listing.id,
            seller: listing.seller,
            buyer: buyer.id,
            message: body.message.unwrap_or_default(),
        })
        .await?;
    info!(
        "Buyer {} contacted seller {} about listing {}",
        appointment.buyer, appointment.seller, appointment.listing
    );

    let appointment = populate(state.store.as_ref(), appointment).await?;
    Ok((
        StatusCode::CREATED,
        Json(AppointmentResponse {
            message: "Seller contacted successfully".to_string(),
            appointment,
        }),
    ))
}

/// Sellers see appointments on their listings, buyers the ones they made.
pub async fn list_appointments(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<AppointmentsResponse>, ApiError> {
    let identity = claims.account()?;
    let party = match identity.role {
        Role::Seller => AppointmentParty::Seller(identity.id),
        Role::Buyer => AppointmentParty::Buyer(identity.id),
    };

    let appointments = state.store.list_appointments(party).await?;
    let appointments = populate_all(state.store.as_ref(), appointments).await?;
    Ok(Json(AppointmentsResponse { appointments }))
}
