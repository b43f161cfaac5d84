mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use dharani_backend::models::{
    Account, Appointment, Authority, DumpDecision, DumpRequest, Listing, NewAccount,
    NewAppointment, NewAuthority, NewDumpRequest, NewListing,
};
use dharani_backend::store::{AppointmentParty, DecisionOutcome, DumpRequestFilter, ListingFilter};
use dharani_backend::{MemoryStore, Store, StoreError};
use serde_json::json;
use tokio::sync::Barrier;
use uuid::Uuid;

use common::*;

/// Memory store whose `find_dump_request` only returns once two callers are
/// waiting in it, so two decisions both read the request while it is Pending.
struct LockstepStore {
    inner: MemoryStore,
    reads: Barrier,
}

#[async_trait]
impl Store for LockstepStore {
    async fn create_account(&self, account: NewAccount) -> Result<Account, StoreError> {
        self.inner.create_account(account).await
    }

    async fn find_account(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        self.inner.find_account(id).await
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        self.inner.find_account_by_email(email).await
    }

    async fn find_accounts(&self, ids: &[Uuid]) -> Result<Vec<Account>, StoreError> {
        self.inner.find_accounts(ids).await
    }

    async fn create_listing(&self, listing: NewListing) -> Result<Listing, StoreError> {
        self.inner.create_listing(listing).await
    }

    async fn find_listing(&self, id: Uuid) -> Result<Option<Listing>, StoreError> {
        self.inner.find_listing(id).await
    }

    async fn find_listings(&self, ids: &[Uuid]) -> Result<Vec<Listing>, StoreError> {
        self.inner.find_listings(ids).await
    }

    async fn list_listings(&self, filter: ListingFilter) -> Result<Vec<Listing>, StoreError> {
        self.inner.list_listings(filter).await
    }

    async fn create_appointment(
        &self,
        appointment: NewAppointment,
    ) -> Result<Appointment, StoreError> {
        self.inner.create_appointment(appointment).await
    }

    async fn list_appointments(
        &self,
        party: AppointmentParty,
    ) -> Result<Vec<Appointment>, StoreError> {
        self.inner.list_appointments(party).await
    }

    async fn create_authority(&self, authority: NewAuthority) -> Result<Authority, StoreError> {
        self.inner.create_authority(authority).await
    }

    async fn find_authorities(&self, ids: &[Uuid]) -> Result<Vec<Authority>, StoreError> {
        self.inner.find_authorities(ids).await
    }

    async fn find_authority_by_email(&self, email: &str) -> Result<Option<Authority>, StoreError> {
        self.inner.find_authority_by_email(email).await
    }

    async fn first_authority(&self) -> Result<Option<Authority>, StoreError> {
        self.inner.first_authority().await
    }

    async fn create_dump_request(
        &self,
        request: NewDumpRequest,
    ) -> Result<DumpRequest, StoreError> {
        self.inner.create_dump_request(request).await
    }

    async fn find_dump_request(&self, id: Uuid) -> Result<Option<DumpRequest>, StoreError> {
        let found = self.inner.find_dump_request(id).await;
        self.reads.wait().await;
        found
    }

    async fn list_dump_requests(
        &self,
        filter: DumpRequestFilter,
    ) -> Result<Vec<DumpRequest>, StoreError> {
        self.inner.list_dump_requests(filter).await
    }

    async fn record_dump_decision(
        &self,
        id: Uuid,
        decision: DumpDecision,
    ) -> Result<DecisionOutcome, StoreError> {
        self.inner.record_dump_decision(id, decision).await
    }
}

#[tokio::test]
async fn racing_decisions_record_exactly_one() {
    let store = Arc::new(LockstepStore {
        inner: MemoryStore::new(),
        reads: Barrier::new(2),
    });
    let app = app_with(test_config(), store.clone()).await;
    let (seller, request_id) = pending_dump_request(&app).await;
    let authority = authority_token(&app).await;
    let uri = format!("/api/nagarnigam/dump-requests/{request_id}/approve");

    let approve = post(
        &app,
        &uri,
        Some(&authority),
        json!({
            "status": "Approved",
            "dumpLocation": { "latitude": 28.6139, "longitude": 77.2090, "address": "Main Dump Yard" }
        }),
    );
    let reject = post(&app, &uri, Some(&authority), json!({ "status": "Rejected" }));
    let ((approve_status, approve_body), (reject_status, reject_body)) = tokio::time::timeout(
        Duration::from_secs(10),
        async { tokio::join!(approve, reject) },
    )
    .await
    .expect("both decisions finish");

    let mut statuses = [approve_status, reject_status];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::OK, StatusCode::BAD_REQUEST]);

    let (winner, loser) = if approve_status == StatusCode::OK {
        ("Approved", &reject_body)
    } else {
        ("Rejected", &approve_body)
    };
    assert_eq!(
        loser["error"],
        format!("Dump request has already been {}", winner.to_lowercase())
    );

    let (_, body) = get(&app, "/api/dump-requests", Some(&seller)).await;
    assert_eq!(body["dumpRequests"][0]["status"], winner);
    let stored = store
        .inner
        .find_dump_request(request_id.parse().unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status.as_str(), winner);
    assert_eq!(stored.dump_location.is_some(), winner == "Approved");
}
