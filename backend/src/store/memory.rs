use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    AppointmentParty, DecisionOutcome, DumpRequestFilter, ListingFilter, Store, StoreError,
};
use crate::models::{
    Account, Appointment, AppointmentStatus, Authority, DumpDecision, DumpRequest, DumpStatus,
    Listing, NewAccount, NewAppointment, NewAuthority, NewDumpRequest, NewListing,
};

#[derive(Default)]
struct Tables {
    accounts: Vec<Account>,
    listings: Vec<Listing>,
    appointments: Vec<Appointment>,
    authorities: Vec<Authority>,
    dump_requests: Vec<DumpRequest>,
}

/// In-process store. Rows live in insertion order; nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Newest first. Equal timestamps keep the later insert in front.
fn newest_first<T: Clone>(
    rows: &[T],
    keep: impl Fn(&T) -> bool,
    created_at: impl Fn(&T) -> DateTime<Utc>,
) -> Vec<T> {
    let mut out: Vec<T> = rows.iter().rev().filter(|row| keep(row)).cloned().collect();
    out.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
    out
}

fn by_ids<T: Clone>(rows: &[T], ids: &[Uuid], id: impl Fn(&T) -> Uuid) -> Vec<T> {
    rows.iter().filter(|row| ids.contains(&id(row))).cloned().collect()
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_account(&self, account: NewAccount) -> Result<Account, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.accounts.iter().any(|a| a.email == account.email) {
            return Err(StoreError::Duplicate(format!("email {}", account.email)));
        }
        if let Some(uid) = &account.external_uid {
            if tables
                .accounts
                .iter()
                .any(|a| a.external_uid.as_ref() == Some(uid))
            {
                return Err(StoreError::Duplicate(format!("external uid {uid}")));
            }
        }
        let now = Utc::now();
        let created = Account {
            id: Uuid::new_v4(),
            name: account.name,
            email: account.email,
            password_hash: account.password_hash,
            role: account.role,
            external_uid: account.external_uid,
            created_at: now,
            updated_at: now,
        };
        tables.accounts.push(created.clone());
        Ok(created)
    }

    async fn find_account(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.accounts.iter().find(|a| a.id == id).cloned())
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.accounts.iter().find(|a| a.email == email).cloned())
    }

    async fn find_accounts(&self, ids: &[Uuid]) -> Result<Vec<Account>, StoreError> {
        Ok(by_ids(&self.tables.read().await.accounts, ids, |a| a.id))
    }

    async fn create_listing(&self, listing: NewListing) -> Result<Listing, StoreError> {
        let now = Utc::now();
        let created = Listing {
            id: Uuid::new_v4(),
            seller: listing.seller,
            seller_name: listing.seller_name,
            category: listing.category,
            item_name: listing.item_name,
            product_quality: listing.product_quality,
            price: listing.price,
            description: listing.description,
            usage_or_disposal_info: listing.usage_or_disposal_info,
            swachh_bharat_tagline: listing.swachh_bharat_tagline,
            image_data: listing.image_data,
            created_at: now,
            updated_at: now,
        };
        self.tables.write().await.listings.push(created.clone());
        Ok(created)
    }

    async fn find_listing(&self, id: Uuid) -> Result<Option<Listing>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.listings.iter().find(|l| l.id == id).cloned())
    }

    async fn find_listings(&self, ids: &[Uuid]) -> Result<Vec<Listing>, StoreError> {
        Ok(by_ids(&self.tables.read().await.listings, ids, |l| l.id))
    }

    async fn list_listings(&self, filter: ListingFilter) -> Result<Vec<Listing>, StoreError> {
        let tables = self.tables.read().await;
        Ok(newest_first(
            &tables.listings,
            |l| {
                filter.category.map_or(true, |c| l.category == c)
                    && filter.seller.map_or(true, |s| l.seller == s)
            },
            |l| l.created_at,
        ))
    }

    async fn create_appointment(
        &self,
        appointment: NewAppointment,
    ) -> Result<Appointment, StoreError> {
        let now = Utc::now();
        let created = Appointment {
            id: Uuid::new_v4(),
            listing: appointment.listing,
            seller: appointment.seller,
            buyer: appointment.buyer,
            message: appointment.message,
            status: AppointmentStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        self.tables.write().await.appointments.push(created.clone());
        Ok(created)
    }

    async fn list_appointments(
        &self,
        party: AppointmentParty,
    ) -> Result<Vec<Appointment>, StoreError> {
        let tables = self.tables.read().await;
        Ok(newest_first(
            &tables.appointments,
            |a| match party {
                AppointmentParty::Seller(id) => a.seller == id,
                AppointmentParty::Buyer(id) => a.buyer == id,
            },
            |a| a.created_at,
        ))
    }

    async fn create_authority(&self, authority: NewAuthority) -> Result<Authority, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.authorities.iter().any(|a| a.email == authority.email) {
            return Err(StoreError::Duplicate(format!("email {}", authority.email)));
        }
        let now = Utc::now();
        let created = Authority {
            id: Uuid::new_v4(),
            name: authority.name,
            email: authority.email,
            password_hash: authority.password_hash,
            locations: authority.locations,
            created_at: now,
            updated_at: now,
        };
        tables.authorities.push(created.clone());
        Ok(created)
    }

    async fn find_authorities(&self, ids: &[Uuid]) -> Result<Vec<Authority>, StoreError> {
        Ok(by_ids(&self.tables.read().await.authorities, ids, |a| a.id))
    }

    async fn find_authority_by_email(&self, email: &str) -> Result<Option<Authority>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.authorities.iter().find(|a| a.email == email).cloned())
    }

    async fn first_authority(&self) -> Result<Option<Authority>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.authorities.first().cloned())
    }

    async fn create_dump_request(
        &self,
        request: NewDumpRequest,
    ) -> Result<DumpRequest, StoreError> {
        let now = Utc::now();
        let created = DumpRequest {
            id: Uuid::new_v4(),
            listing: request.listing,
            seller: request.seller,
            authority: request.authority,
            seller_location: request.seller_location,
            dump_location: None,
            status: DumpStatus::Pending,
            message: request.message,
            approved_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        };
        self.tables.write().await.dump_requests.push(created.clone());
        Ok(created)
    }

    async fn find_dump_request(&self, id: Uuid) -> Result<Option<DumpRequest>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.dump_requests.iter().find(|r| r.id == id).cloned())
    }

    async fn list_dump_requests(
        &self,
        filter: DumpRequestFilter,
    ) -> Result<Vec<DumpRequest>, StoreError> {
        let tables = self.tables.read().await;
        Ok(newest_first(
            &tables.dump_requests,
            |r| match filter {
                DumpRequestFilter::Seller(id) => r.seller == id,
                DumpRequestFilter::Authority(id) => r.authority == id,
            },
            |r| r.created_at,
        ))
    }

    async fn record_dump_decision(
        &self,
        id: Uuid,
        decision: DumpDecision,
    ) -> Result<DecisionOutcome, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(request) = tables.dump_requests.iter_mut().find(|r| r.id == id) else {
            return Ok(DecisionOutcome::Missing);
        };
        if !request.status.can_transition_to(decision.status) {
            return Ok(DecisionOutcome::AlreadyDecided(request.status));
        }
        request.status = decision.status;
        request.dump_location = decision.dump_location;
        request.approved_at = Some(decision.decided_at);
        request.updated_at = decision.decided_at;
        Ok(DecisionOutcome::Recorded(request.clone()))
    }
}
