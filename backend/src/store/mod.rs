//! Persistence seam. Handlers only see [`Store`]; PostgreSQL lives in `crate::db`
//! and [`MemoryStore`] backs development runs without a database and the tests.

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{
    Account, Appointment, Authority, Category, DumpDecision, DumpRequest, DumpStatus, Listing,
    NewAccount, NewAppointment, NewAuthority, NewDumpRequest, NewListing,
};

mod memory;

pub use memory::MemoryStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique field (email, external uid) is already taken.
    #[error("duplicate record: {0}")]
    Duplicate(String),
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Sorted, de-duplicated ids for a batch lookup.
pub fn distinct_ids(ids: impl IntoIterator<Item = Uuid>) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = ids.into_iter().collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ListingFilter {
    pub category: Option<Category>,
    pub seller: Option<Uuid>,
}

/// Which side of an appointment the caller is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppointmentParty {
    Seller(Uuid),
    Buyer(Uuid),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpRequestFilter {
    Seller(Uuid),
    Authority(Uuid),
}

/// Result of a conditional decision write.
#[derive(Debug, Clone)]
pub enum DecisionOutcome {
    Recorded(DumpRequest),
    /// The stored status no longer allows the decision; nothing was written.
    AlreadyDecided(DumpStatus),
    Missing,
}

/// Every list operation returns newest records first. Batch lookups return the
/// records that exist, in no particular order.
#[async_trait]
pub trait Store: Send + Sync {
    async fn create_account(&self, account: NewAccount) -> Result<Account, StoreError>;
    async fn find_account(&self, id: Uuid) -> Result<Option<Account>, StoreError>;
    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;
    async fn find_accounts(&self, ids: &[Uuid]) -> Result<Vec<Account>, StoreError>;

    async fn create_listing(&self, listing: NewListing) -> Result<Listing, StoreError>;
    async fn find_listing(&self, id: Uuid) -> Result<Option<Listing>, StoreError>;
    async fn find_listings(&self, ids: &[Uuid]) -> Result<Vec<Listing>, StoreError>;
    async fn list_listings(&self, filter: ListingFilter) -> Result<Vec<Listing>, StoreError>;

    async fn create_appointment(
        &self,
        appointment: NewAppointment,
    ) -> Result<Appointment, StoreError>;
    async fn list_appointments(
        &self,
        party: AppointmentParty,
    ) -> Result<Vec<Appointment>, StoreError>;

    async fn create_authority(&self, authority: NewAuthority) -> Result<Authority, StoreError>;
    async fn find_authorities(&self, ids: &[Uuid]) -> Result<Vec<Authority>, StoreError>;
    async fn find_authority_by_email(&self, email: &str) -> Result<Option<Authority>, StoreError>;
    /// The authority new dump requests are routed to: the earliest one created.
    async fn first_authority(&self) -> Result<Option<Authority>, StoreError>;

    async fn create_dump_request(
        &self,
        request: NewDumpRequest,
    ) -> Result<DumpRequest, StoreError>;
    async fn find_dump_request(&self, id: Uuid) -> Result<Option<DumpRequest>, StoreError>;
    async fn list_dump_requests(
        &self,
        filter: DumpRequestFilter,
    ) -> Result<Vec<DumpRequest>, StoreError>;
    /// Writes status, dump location and decision time, but only if the stored status
    /// can still move to `decision.status`. The check and the write are atomic.
    async fn record_dump_decision(
        &self,
        id: Uuid,
        decision: DumpDecision,
    ) -> Result<DecisionOutcome, StoreError>;
}
