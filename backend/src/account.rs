use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::auth::{self, Claims};
use crate::error::{ApiError, ApiJson};
use crate::models::{Account, AccountProfile, NewAccount, Role};
use crate::store::StoreError;
use crate::validate::present;
use crate::AppState;

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: String,
    pub token: String,
    pub user: AccountProfile,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub user: Account,
}

struct Signup {
    name: String,
    email: String,
    password: String,
    role: Role,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl SignupRequest {
    fn validate(self) -> Result<Signup, ApiError> {
        let (Some(name), Some(email), Some(password), Some(role)) = (
            present(self.name),
            present(self.email),
            self.password.filter(|p| !p.is_empty()),
            present(self.role),
        ) else {
            return Err(ApiError::validation("All fields are required"));
        };
        let role = role
            .parse::<Role>()
            .map_err(|_| ApiError::validation("Role must be either Buyer or Seller"))?;
        if !email.contains('@') {
            return Err(ApiError::validation("Invalid email address"));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ApiError::validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters long"
            )));
        }
        Ok(Signup {
            name,
            email: normalize_email(&email),
            password,
            role,
        })
    }
}

/// Registers a password account and logs it in.
pub async fn signup(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<SignupRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let signup = body.validate()?;
    let taken = || ApiError::validation("User with this email already exists");

    if state.store.find_account_by_email(&signup.email).await?.is_some() {
        return Err(taken());
    }

    let password_hash = auth::hash_password(signup.password, state.config.bcrypt_cost).await?;
    let account = state
        .store
        .create_account(NewAccount {
            name: signup.name,
            email: signup.email,
            password_hash: Some(password_hash),
            role: signup.role,
            external_uid: None,
        })
        .await
        .map_err(|e| match e {
            StoreError::Duplicate(_) => taken(),
            other => other.into(),
        })?;

    info!("Created {} account {}", account.role, account.id);
    let token = auth::issue_account_token(&account, &state.config.jwt_secret)?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User created successfully".to_string(),
            token,
            user: AccountProfile::from(&account),
        }),
    ))
}

/// Exchanges email and password for a token.
pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let (Some(email), Some(password)) = (present(body.email), body.password.filter(|p| !p.is_empty()))
    else {
        return Err(ApiError::validation("Email and password are required"));
    };
    let rejected = || ApiError::Unauthenticated("Invalid email or password".to_string());

    let account = state
        .store
        .find_account_by_email(&normalize_email(&email))
        .await?
        .ok_or_else(rejected)?;
    // Externally authenticated accounts have no password to check against.
    let Some(hash) = account.password_hash.clone() else {
        warn!("Password login attempted for external account {}", account.id);
        return Err(rejected());
    };
    if !auth::verify_password(password, hash).await? {
        return Err(rejected());
    }

    info!("Account {} logged in", account.id);
    let token = auth::issue_account_token(&account, &state.config.jwt_secret)?;
    Ok(Json(AuthResponse {
        message: "Login successful".to_string(),
        token,
        user: AccountProfile::from(&account),
    }))
}

/// Returns the stored account behind the caller's token.
pub async fn verify(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let identity = claims.account()?;
    let user = state
        .store
        .find_account(identity.id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(VerifyResponse { user }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str, email: &str, password: &str, role: &str) -> SignupRequest {
        SignupRequest {
            name: Some(name.into()),
            email: Some(email.into()),
            password: Some(password.into()),
            role: Some(role.into()),
        }
    }

    #[test]
    fn signup_normalizes_name_and_email() {
        let signup = request("  Ravi ", " Ravi@Example.COM ", "secret1", "Buyer")
            .validate()
            .unwrap();
        assert_eq!(signup.name, "Ravi");
        assert_eq!(signup.email, "ravi@example.com");
        assert_eq!(signup.role, Role::Buyer);
    }

    #[test]
    fn signup_rejects_bad_fields() {
        let cases = [
            request("", "a@example.com", "secret1", "Buyer"),
            request("A", "a@example.com", "secret1", "Admin"),
            request("A", "not-an-email", "secret1", "Seller"),
            request("A", "a@example.com", "short", "Seller"),
        ];
        for case in cases {
            assert!(matches!(case.validate(), Err(ApiError::Validation(_))));
        }
    }
}
