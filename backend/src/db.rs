use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PoolError};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use log::{error, info};
use uuid::Uuid;

use crate::models::{
    Account, Appointment, AppointmentStatus, Authority, DumpDecision, DumpRequest, DumpStatus,
    GeoPoint, Listing, NewAccount, NewAppointment, NewAuthority, NewDumpRequest, NewListing,
    UnknownVariant,
};
use crate::schema::{accounts, appointments, authorities, dump_requests, listings};
use crate::store::{
    AppointmentParty, DecisionOutcome, DumpRequestFilter, ListingFilter, Store, StoreError,
};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

type PgPool = Pool<ConnectionManager<PgConnection>>;

impl From<DieselError> for StoreError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                StoreError::Duplicate(info.message().to_string())
            }
            other => StoreError::Backend(other.to_string()),
        }
    }
}

impl From<PoolError> for StoreError {
    fn from(err: PoolError) -> Self {
        StoreError::Backend(format!("connection pool: {err}"))
    }
}

impl From<UnknownVariant> for StoreError {
    fn from(err: UnknownVariant) -> Self {
        StoreError::Backend(format!("corrupt row: {err}"))
    }
}

/// PostgreSQL store. Diesel is blocking, so every query runs on the blocking pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn connect(database_url: &str, pool_size: u32) -> Result<Self, StoreError> {
        let manager = ConnectionManager::<PgConnection>::new(database_url);
        let pool = Pool::builder().max_size(pool_size).build(manager).map_err(|e| {
            error!("Failed to establish database connection pool: {}", e);
            StoreError::from(e)
        })?;
        info!("Database connection pool established ({} connections)", pool_size);
        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        self.run(|conn| {
            let applied = conn
                .run_pending_migrations(MIGRATIONS)
                .map_err(|e| StoreError::Backend(format!("migrations: {e}")))?;
            for version in applied {
                info!("Applied migration {}", version);
            }
            Ok(())
        })
        .await
    }

    async fn run<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut PgConnection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            f(&mut *conn)
        })
        .await
        .map_err(|e| StoreError::Backend(format!("database task failed: {e}")))?
    }
}

#[derive(Queryable, Selectable, Insertable)]
#[diesel(table_name = accounts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct AccountRow {
    id: Uuid,
    name: String,
    email: String,
    password_hash: Option<String>,
    role: String,
    external_uid: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = StoreError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        Ok(Account {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            role: row.role.parse()?,
            external_uid: row.external_uid,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Queryable, Selectable, Insertable)]
#[diesel(table_name = listings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct ListingRow {
    id: Uuid,
    seller_id: Uuid,
    seller_name: String,
    category: String,
    item_name: String,
    product_quality: String,
    price: f64,
    description: String,
    usage_or_disposal_info: String,
    swachh_bharat_tagline: String,
    image_data: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ListingRow> for Listing {
    type Error = StoreError;

    fn try_from(row: ListingRow) -> Result<Self, Self::Error> {
        Ok(Listing {
            id: row.id,
            seller: row.seller_id,
            seller_name: row.seller_name,
            category: row.category.parse()?,
            item_name: row.item_name,
            product_quality: row.product_quality.parse()?,
            price: row.price,
            description: row.description,
            usage_or_disposal_info: row.usage_or_disposal_info,
            swachh_bharat_tagline: row.swachh_bharat_tagline,
            image_data: row.image_data,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Queryable, Selectable, Insertable)]
#[diesel(table_name = appointments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct AppointmentRow {
    id: Uuid,
    listing_id: Uuid,
    seller_id: Uuid,
    buyer_id: Uuid,
    message: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AppointmentRow> for Appointment {
    type Error = StoreError;

    fn try_from(row: AppointmentRow) -> Result<Self, Self::Error> {
        Ok(Appointment {
            id: row.id,
            listing: row.listing_id,
            seller: row.seller_id,
            buyer: row.buyer_id,
            message: row.message,
            status: row.status.parse()?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Queryable, Selectable, Insertable)]
#[diesel(table_name = authorities)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct AuthorityRow {
    id: Uuid,
    name: String,
    email: String,
    password_hash: String,
    locations: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AuthorityRow> for Authority {
    type Error = StoreError;

    fn try_from(row: AuthorityRow) -> Result<Self, Self::Error> {
        let locations = serde_json::from_value(row.locations)
            .map_err(|e| StoreError::Backend(format!("corrupt authority locations: {e}")))?;
        Ok(Authority {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            locations,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Queryable, Selectable, Insertable)]
#[diesel(table_name = dump_requests)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct DumpRequestRow {
    id: Uuid,
    listing_id: Uuid,
    seller_id: Uuid,
    authority_id: Uuid,
    seller_latitude: f64,
    seller_longitude: f64,
    seller_address: String,
    dump_latitude: Option<f64>,
    dump_longitude: Option<f64>,
    dump_address: Option<String>,
    status: String,
    message: String,
    approved_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<DumpRequestRow> for DumpRequest {
    type Error = StoreError;

    fn try_from(row: DumpRequestRow) -> Result<Self, Self::Error> {
        let dump_location = match (row.dump_latitude, row.dump_longitude) {
            (Some(latitude), Some(longitude)) => Some(GeoPoint {
                latitude,
                longitude,
                address: row.dump_address.unwrap_or_default(),
            }),
            _ => None,
        };
        Ok(DumpRequest {
            id: row.id,
            listing: row.listing_id,
            seller: row.seller_id,
            authority: row.authority_id,
            seller_location: GeoPoint {
                latitude: row.seller_latitude,
                longitude: row.seller_longitude,
                address: row.seller_address,
            },
            dump_location,
            status: row.status.parse()?,
            message: row.message,
            approved_at: row.approved_at,
            completed_at: row.completed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>, StoreError>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

#[async_trait]
impl Store for PgStore {
    async fn create_account(&self, account: NewAccount) -> Result<Account, StoreError> {
        let now = Utc::now();
        let row = AccountRow {
            id: Uuid::new_v4(),
            name: account.name,
            email: account.email,
            password_hash: account.password_hash,
            role: account.role.as_str().to_string(),
            external_uid: account.external_uid,
            created_at: now,
            updated_at: now,
        };
        self.run(move |conn| {
            diesel::insert_into(accounts::table)
                .values(&row)
                .returning(AccountRow::as_returning())
                .get_result::<AccountRow>(conn)?
                .try_into()
        })
        .await
    }

    async fn find_account(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        self.run(move |conn| {
            accounts::table
                .find(id)
                .select(AccountRow::as_select())
                .first::<AccountRow>(conn)
                .optional()?
                .map(Account::try_from)
                .transpose()
        })
        .await
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let email = email.to_owned();
        self.run(move |conn| {
            accounts::table
                .filter(accounts::email.eq(email))
                .select(AccountRow::as_select())
                .first::<AccountRow>(conn)
                .optional()?
                .map(Account::try_from)
                .transpose()
        })
        .await
    }

    async fn find_accounts(&self, ids: &[Uuid]) -> Result<Vec<Account>, StoreError> {
        let ids = ids.to_vec();
        self.run(move |conn| {
            let rows = accounts::table
                .filter(accounts::id.eq_any(ids))
                .select(AccountRow::as_select())
                .load::<AccountRow>(conn)?;
            convert_all(rows)
        })
        .await
    }

    async fn create_listing(&self, listing: NewListing) -> Result<Listing, StoreError> {
        let now = Utc::now();
        let row = ListingRow {
            id: Uuid::new_v4(),
            seller_id: listing.seller,
            seller_name: listing.seller_name,
            category: listing.category.as_str().to_string(),
            item_name: listing.item_name,
            product_quality: listing.product_quality.as_str().to_string(),
            price: listing.price,
            description: listing.description,
            usage_or_disposal_info: listing.usage_or_disposal_info,
            swachh_bharat_tagline: listing.swachh_bharat_tagline,
            image_data: listing.image_data,
            created_at: now,
            updated_at: now,
        };
        self.run(move |conn| {
            diesel::insert_into(listings::table)
                .values(&row)
                .returning(ListingRow::as_returning())
                .get_result::<ListingRow>(conn)?
                .try_into()
        })
        .await
    }

    async fn find_listing(&self, id: Uuid) -> Result<Option<Listing>, StoreError> {
        self.run(move |conn| {
            listings::table
                .find(id)
                .select(ListingRow::as_select())
                .first::<ListingRow>(conn)
                .optional()?
                .map(Listing::try_from)
                .transpose()
        })
        .await
    }

    async fn find_listings(&self, ids: &[Uuid]) -> Result<Vec<Listing>, StoreError> {
        let ids = ids.to_vec();
        self.run(move |conn| {
            let rows = listings::table
                .filter(listings::id.eq_any(ids))
                .select(ListingRow::as_select())
                .load::<ListingRow>(conn)?;
            convert_all(rows)
        })
        .await
    }

    async fn list_listings(&self, filter: ListingFilter) -> Result<Vec<Listing>, StoreError> {
        self.run(move |conn| {
            let mut query = listings::table.select(ListingRow::as_select()).into_boxed();
            if let Some(category) = filter.category {
                query = query.filter(listings::category.eq(category.as_str()));
            }
            if let Some(seller) = filter.seller {
                query = query.filter(listings::seller_id.eq(seller));
            }
            let rows = query
                .order(listings::created_at.desc())
                .load::<ListingRow>(conn)?;
            convert_all(rows)
        })
        .await
    }

    async fn create_appointment(
        &self,
        appointment: NewAppointment,
    ) -> Result<Appointment, StoreError> {
        let now = Utc::now();
        let row = AppointmentRow {
            id: Uuid::new_v4(),
            listing_id: appointment.listing,
            seller_id: appointment.seller,
            buyer_id: appointment.buyer,
            message: appointment.message,
            status: AppointmentStatus::Pending.as_str().to_string(),
            created_at: now,
            updated_at: now,
        };
        self.run(move |conn| {
            diesel::insert_into(appointments::table)
                .values(&row)
                .returning(AppointmentRow::as_returning())
                .get_result::<AppointmentRow>(conn)?
                .try_into()
        })
        .await
    }

    async fn list_appointments(
        &self,
        party: AppointmentParty,
    ) -> Result<Vec<Appointment>, StoreError> {
        self.run(move |conn| {
            let query = appointments::table
                .select(AppointmentRow::as_select())
                .order(appointments::created_at.desc())
                .into_boxed();
            let query = match party {
                AppointmentParty::Seller(id) => query.filter(appointments::seller_id.eq(id)),
                AppointmentParty::Buyer(id) => query.filter(appointments::buyer_id.eq(id)),
            };
            convert_all(query.load::<AppointmentRow>(conn)?)
        })
        .await
    }

    async fn create_authority(&self, authority: NewAuthority) -> Result<Authority, StoreError> {
        let now = Utc::now();
        let locations = serde_json::to_value(&authority.locations)
            .map_err(|e| StoreError::Backend(format!("encode authority locations: {e}")))?;
        let row = AuthorityRow {
            id: Uuid::new_v4(),
            name: authority.name,
            email: authority.email,
            password_hash: authority.password_hash,
            locations,
            created_at: now,
            updated_at: now,
        };
        self.run(move |conn| {
            diesel::insert_into(authorities::table)
                .values(&row)
                .returning(AuthorityRow::as_returning())
                .get_result::<AuthorityRow>(conn)?
                .try_into()
        })
        .await
    }

    async fn find_authorities(&self, ids: &[Uuid]) -> Result<Vec<Authority>, StoreError> {
        let ids = ids.to_vec();
        self.run(move |conn| {
            let rows = authorities::table
                .filter(authorities::id.eq_any(ids))
                .select(AuthorityRow::as_select())
                .load::<AuthorityRow>(conn)?;
            convert_all(rows)
        })
        .await
    }

    async fn find_authority_by_email(&self, email: &str) -> Result<Option<Authority>, StoreError> {
        let email = email.to_owned();
        self.run(move |conn| {
            authorities::table
                .filter(authorities::email.eq(email))
                .select(AuthorityRow::as_select())
                .first::<AuthorityRow>(conn)
                .optional()?
                .map(Authority::try_from)
                .transpose()
        })
        .await
    }

    async fn first_authority(&self) -> Result<Option<Authority>, StoreError> {
        self.run(|conn| {
            authorities::table
                .order(authorities::created_at.asc())
                .select(AuthorityRow::as_select())
                .first::<AuthorityRow>(conn)
                .optional()?
                .map(Authority::try_from)
                .transpose()
        })
        .await
    }

    async fn create_dump_request(
        &self,
        request: NewDumpRequest,
    ) -> Result<DumpRequest, StoreError> {
        let now = Utc::now();
        let row = DumpRequestRow {
            id: Uuid::new_v4(),
            listing_id: request.listing,
            seller_id: request.seller,
            authority_id: request.authority,
            seller_latitude: request.seller_location.latitude,
            seller_longitude: request.seller_location.longitude,
            seller_address: request.seller_location.address,
            dump_latitude: None,
            dump_longitude: None,
            dump_address: None,
            status: DumpStatus::Pending.as_str().to_string(),
            message: request.message,
            approved_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        };
        self.run(move |conn| {
            diesel::insert_into(dump_requests::table)
                .values(&row)
                .returning(DumpRequestRow::as_returning())
                .get_result::<DumpRequestRow>(conn)?
                .try_into()
        })
        .await
    }

    async fn find_dump_request(&self, id: Uuid) -> Result<Option<DumpRequest>, StoreError> {
        self.run(move |conn| {
            dump_requests::table
                .find(id)
                .select(DumpRequestRow::as_select())
                .first::<DumpRequestRow>(conn)
                .optional()?
                .map(DumpRequest::try_from)
                .transpose()
        })
        .await
    }

    async fn list_dump_requests(
        &self,
        filter: DumpRequestFilter,
    ) -> Result<Vec<DumpRequest>, StoreError> {
        self.run(move |conn| {
            let query = dump_requests::table
                .select(DumpRequestRow::as_select())
                .order(dump_requests::created_at.desc())
                .into_boxed();
            let query = match filter {
                DumpRequestFilter::Seller(id) => query.filter(dump_requests::seller_id.eq(id)),
                DumpRequestFilter::Authority(id) => {
                    query.filter(dump_requests::authority_id.eq(id))
                }
            };
            convert_all(query.load::<DumpRequestRow>(conn)?)
        })
        .await
    }

    async fn record_dump_decision(
        &self,
        id: Uuid,
        decision: DumpDecision,
    ) -> Result<DecisionOutcome, StoreError> {
        let (latitude, longitude, address) = match decision.dump_location {
            Some(point) => (Some(point.latitude), Some(point.longitude), Some(point.address)),
            None => (None, None, None),
        };
        let from: Vec<&'static str> = DumpStatus::ALL
            .iter()
            .filter(|status| status.can_transition_to(decision.status))
            .map(DumpStatus::as_str)
            .collect();
        self.run(move |conn| {
            let updated = diesel::update(
                dump_requests::table
                    .find(id)
                    .filter(dump_requests::status.eq_any(from)),
            )
            .set((
                dump_requests::status.eq(decision.status.as_str()),
                dump_requests::dump_latitude.eq(latitude),
                dump_requests::dump_longitude.eq(longitude),
                dump_requests::dump_address.eq(address),
                dump_requests::approved_at.eq(Some(decision.decided_at)),
                dump_requests::updated_at.eq(decision.decided_at),
            ))
            .returning(DumpRequestRow::as_returning())
            .get_result::<DumpRequestRow>(conn)
            .optional()?;
            if let Some(row) = updated {
                return Ok(DecisionOutcome::Recorded(row.try_into()?));
            }

            let current = dump_requests::table
                .find(id)
                .select(dump_requests::status)
                .first::<String>(conn)
                .optional()?;
            match current {
                Some(status) => Ok(DecisionOutcome::AlreadyDecided(status.parse()?)),
                None => Ok(DecisionOutcome::Missing),
            }
        })
        .await
    }
}
