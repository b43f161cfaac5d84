use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: {value:?}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Closed string enumerations stored and sent as their display names.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident ($kind:literal) {
            $($variant:ident => $wire:literal $(| $alias:literal)*),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire $(| $alias)* => Ok($name::$variant),)+
                    other => Err(UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

wire_enum! {
    /// Fixed at signup. Tokens carry it, so a stored change only applies after re-login.
    Role ("role") {
        Buyer => "Buyer",
        Seller => "Seller",
    }
}

wire_enum! {
    Category ("category") {
        Refurbished => "Refurbished Products" | "Refurbished",
        Scrap => "Scrap / Garbage" | "Scrap",
    }
}

wire_enum! {
    Quality ("product quality") {
        Good => "Good",
        Better => "Better",
        Bad => "Bad",
        Critical => "Critical",
    }
}

wire_enum! {
    /// Only `Pending` is ever written; later states have no endpoint yet.
    AppointmentStatus ("appointment status") {
        Pending => "Pending",
        InProgress => "In Progress",
        Completed => "Completed",
        Cancelled => "Cancelled",
    }
}

wire_enum! {
    DumpStatus ("dump request status") {
        Pending => "Pending",
        Approved => "Approved",
        Rejected => "Rejected",
        Completed => "Completed",
    }
}

impl DumpStatus {
    /// Pending is decided once (Approved or Rejected); only Approved may complete.
    pub fn can_transition_to(self, next: DumpStatus) -> bool {
        matches!(
            (self, next),
            (DumpStatus::Pending, DumpStatus::Approved)
                | (DumpStatus::Pending, DumpStatus::Rejected)
                | (DumpStatus::Approved, DumpStatus::Completed)
        )
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_uid: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub role: Role,
    pub external_uid: Option<String>,
}

/// What signup and login hand back next to the token.
#[derive(Debug, Clone, Serialize)]
pub struct AccountProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<&Account> for AccountProfile {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            name: account.name.clone(),
            email: account.email.clone(),
            role: account.role,
        }
    }
}

/// Name and email only, used when embedding a party in another record.
#[derive(Debug, Clone, Serialize)]
pub struct AccountSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl From<&Account> for AccountSummary {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            name: account.name.clone(),
            email: account.email.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: Uuid,
    pub seller: Uuid,
    pub seller_name: String,
    pub category: Category,
    pub item_name: String,
    pub product_quality: Quality,
    pub price: f64,
    pub description: String,
    pub usage_or_disposal_info: String,
    pub swachh_bharat_tagline: String,
    pub image_data: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewListing {
    pub seller: Uuid,
    pub seller_name: String,
    pub category: Category,
    pub item_name: String,
    pub product_quality: Quality,
    pub price: f64,
    pub description: String,
    pub usage_or_disposal_info: String,
    pub swachh_bharat_tagline: String,
    pub image_data: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Uuid,
    pub listing: Uuid,
    pub seller: Uuid,
    pub buyer: Uuid,
    pub message: String,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub listing: Uuid,
    pub seller: Uuid,
    pub buyer: Uuid,
    pub message: String,
}

/// Appointment with its references resolved. A reference whose record is gone stays `null`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentView {
    pub id: Uuid,
    pub listing: Option<Listing>,
    pub seller: Option<AccountSummary>,
    pub buyer: Option<AccountSummary>,
    pub message: String,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedLocation {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
}

/// The municipal authority (Nagar Nigam) that decides dump requests.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Authority {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub locations: Vec<NamedLocation>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAuthority {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub locations: Vec<NamedLocation>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthoritySummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub locations: Vec<NamedLocation>,
}

impl From<&Authority> for AuthoritySummary {
    fn from(authority: &Authority) -> Self {
        Self {
            id: authority.id,
            name: authority.name.clone(),
            email: authority.email.clone(),
            locations: authority.locations.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DumpRequest {
    pub id: Uuid,
    pub listing: Uuid,
    pub seller: Uuid,
    #[serde(rename = "nagarNigam")]
    pub authority: Uuid,
    pub seller_location: GeoPoint,
    pub dump_location: Option<GeoPoint>,
    pub status: DumpStatus,
    pub message: String,
    /// Time of the approve/reject decision.
    pub approved_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewDumpRequest {
    pub listing: Uuid,
    pub seller: Uuid,
    pub authority: Uuid,
    pub seller_location: GeoPoint,
    pub message: String,
}

/// The single write an authority makes on a dump request.
#[derive(Debug, Clone)]
pub struct DumpDecision {
    pub status: DumpStatus,
    pub dump_location: Option<GeoPoint>,
    pub decided_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DumpRequestView {
    pub id: Uuid,
    pub listing: Option<Listing>,
    pub seller: Option<AccountSummary>,
    pub nagar_nigam: Option<AuthoritySummary>,
    pub seller_location: GeoPoint,
    pub dump_location: Option<GeoPoint>,
    pub status: DumpStatus,
    pub message: String,
    pub approved_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
