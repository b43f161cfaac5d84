use axum::extract::{Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{Account, Authority, Role};
use crate::AppState;

/// Tokens are not refreshed; callers log in again after this.
pub const TOKEN_LIFETIME_DAYS: i64 = 7;

/// Who a token speaks for. Authority tokens are a separate kind and never carry a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Principal {
    Account { role: Role, name: String },
    #[serde(rename = "nagarnigam")]
    Authority,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
    #[serde(flatten)]
    pub principal: Principal,
}

/// An account caller as the token describes it. The role is not re-read from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountIdentity {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub name: String,
}

impl Claims {
    pub fn account(&self) -> Result<AccountIdentity, ApiError> {
        match &self.principal {
            Principal::Account { role, name } => Ok(AccountIdentity {
                id: self.sub,
                email: self.email.clone(),
                role: *role,
                name: name.clone(),
            }),
            Principal::Authority => Err(ApiError::forbidden("Access denied")),
        }
    }

    /// Account caller holding `role`, otherwise 403 with `denied`.
    pub fn require_role(&self, role: Role, denied: &str) -> Result<AccountIdentity, ApiError> {
        let identity = self.account()?;
        if identity.role != role {
            return Err(ApiError::forbidden(denied));
        }
        Ok(identity)
    }

    /// Id of the calling municipal authority.
    pub fn authority(&self) -> Result<Uuid, ApiError> {
        match self.principal {
            Principal::Authority => Ok(self.sub),
            Principal::Account { .. } => Err(ApiError::forbidden("Access denied")),
        }
    }
}

pub fn create_token(
    subject: Uuid,
    email: &str,
    principal: Principal,
    jwt_secret: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    let issued_at = Utc::now();
    let claims = Claims {
        sub: subject,
        email: email.to_string(),
        iat: issued_at.timestamp(),
        exp: (issued_at + Duration::days(TOKEN_LIFETIME_DAYS)).timestamp(),
        principal,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
}

pub fn validate_token(token: &str, jwt_secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

pub fn issue_account_token(account: &Account, jwt_secret: &str) -> Result<String, ApiError> {
    let principal = Principal::Account {
        role: account.role,
        name: account.name.clone(),
    };
    Ok(create_token(account.id, &account.email, principal, jwt_secret)?)
}

pub fn issue_authority_token(authority: &Authority, jwt_secret: &str) -> Result<String, ApiError> {
    Ok(create_token(
        authority.id,
        &authority.email,
        Principal::Authority,
        jwt_secret,
    )?)
}

pub fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| ApiError::Unauthenticated("No token provided".to_string()))?;
    value
        .to_str()
        .ok()
        .and_then(|raw| raw.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::Unauthenticated("Invalid Authorization header format".to_string()))
}

/// Rejects the request with 401 unless it carries a valid bearer token; on success
/// the decoded [`Claims`] are available to handlers as an extension.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers())?;
    let claims = validate_token(token, &state.config.jwt_secret).map_err(|e| {
        log::debug!("Rejected token: {}", e);
        ApiError::Unauthenticated("Invalid or expired token".to_string())
    })?;
    log::debug!("Authenticated {} for {}", claims.sub, request.uri().path());
    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

pub async fn hash_password(password: String, cost: u32) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| ApiError::Internal(format!("hashing task failed: {e}")))?
        .map_err(ApiError::from)
}

pub async fn verify_password(password: String, hash: String) -> Result<bool, ApiError> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| ApiError::Internal(format!("hashing task failed: {e}")))?
        .map_err(ApiError::from)
}
