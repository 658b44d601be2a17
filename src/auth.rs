//! Authentication and input-format validation.
//!
//! Sessions carry the authenticated identity; this module owns password
//! hashing, the register/login operations, the login-attempt rate limit,
//! and the `CurrentUser`/`AdminUser` extractors built on [`crate::sessions`].

use axum::{extract::FromRequestParts, http::request::Parts};
use chrono::{Datelike, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    entities::{
        user::{self, UserRole},
        User, UserModel,
    },
    errors::ServiceError,
    rate_limiter::RateLimiter,
    sessions::Session,
    AppState,
};

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_]{3,30}$").expect("valid regex"));
static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9][0-9 \-()]{6,19}$").expect("valid regex"));

pub fn validate_username(username: &str) -> Result<(), ServiceError> {
    if USERNAME_RE.is_match(username) {
        Ok(())
    } else {
        Err(ServiceError::ValidationError(
            "Username must be 3-30 characters of letters, digits or underscores".into(),
        ))
    }
}

pub fn validate_phone(phone: &str) -> Result<(), ServiceError> {
    if PHONE_RE.is_match(phone) {
        Ok(())
    } else {
        Err(ServiceError::ValidationError(
            "Phone number format is invalid".into(),
        ))
    }
}

/// Minimum 8 characters with at least one letter and one digit.
pub fn validate_password_strength(password: &str) -> Result<(), ServiceError> {
    let long_enough = password.len() >= 8;
    let has_letter = password.chars().any(|c| c.is_ascii_alphabetic());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if long_enough && has_letter && has_digit {
        Ok(())
    } else {
        Err(ServiceError::ValidationError(
            "Password must be at least 8 characters and contain a letter and a digit".into(),
        ))
    }
}

/// Latest birthdate that still satisfies the minimum age. A Feb 29 anchor
/// shifts to Feb 28 when the target year is not a leap year.
fn min_age_cutoff(today: NaiveDate) -> NaiveDate {
    today
        .with_year(today.year() - 13)
        .or_else(|| {
            today
                .pred_opt()
                .and_then(|d| d.with_year(today.year() - 13))
        })
        .unwrap_or(today)
}

/// Account holders must be at least 13 years old.
pub fn validate_birthdate(birthdate: NaiveDate) -> Result<(), ServiceError> {
    let cutoff = min_age_cutoff(Utc::now().date_naive());
    if birthdate <= cutoff {
        Ok(())
    } else {
        Err(ServiceError::ValidationError(
            "You must be at least 13 years old to register".into(),
        ))
    }
}

pub fn hash_password(password: &str) -> Result<String, ServiceError> {
    use argon2::password_hash::{rand_core::OsRng, SaltString};
    use argon2::{Argon2, PasswordHasher};
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| ServiceError::InternalError(format!("password hashing failed: {e}")))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    use argon2::{Argon2, PasswordHash, PasswordVerifier};
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterInput {
    pub username: String,
    #[validate(email)]
    pub email: String,
    pub password: String,
    pub birthdate: Option<NaiveDate>,
}

#[derive(Clone)]
pub struct AuthService {
    db: Arc<DatabaseConnection>,
    login_limiter: Arc<RateLimiter>,
}

impl AuthService {
    pub fn new(db: Arc<DatabaseConnection>, attempts_per_window: u32, window: Duration) -> Self {
        Self {
            db,
            login_limiter: Arc::new(RateLimiter::new(attempts_per_window, window)),
        }
    }

    #[instrument(skip(self, input))]
    pub async fn register(&self, input: RegisterInput) -> Result<UserModel, ServiceError> {
        input.validate()?;
        validate_username(&input.username)?;
        validate_password_strength(&input.password)?;
        if let Some(birthdate) = input.birthdate {
            validate_birthdate(birthdate)?;
        }

        let taken = User::find()
            .filter(
                user::Column::Username
                    .eq(input.username.clone())
                    .or(user::Column::Email.eq(input.email.clone())),
            )
            .one(&*self.db)
            .await?;
        if taken.is_some() {
            return Err(ServiceError::Conflict(
                "Username or email is already registered".into(),
            ));
        }

        let now = Utc::now();
        let model = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            username: Set(input.username),
            email: Set(input.email),
            password_hash: Set(hash_password(&input.password)?),
            role: Set(UserRole::User),
            is_active: Set(true),
            birthdate: Set(input.birthdate),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let created = model.insert(&*self.db).await?;
        info!(user_id = %created.id, "user registered");
        Ok(created)
    }

    /// Authenticate a username/password pair. Attempts are rate limited per
    /// username + client IP; deactivated accounts cannot log in.
    #[instrument(skip(self, password))]
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        client_ip: &str,
    ) -> Result<UserModel, ServiceError> {
        let limiter_key = format!("{username}@{client_ip}");
        self.login_limiter
            .check(&limiter_key)
            .map_err(|_| ServiceError::RateLimitExceeded)?;

        let found = User::find()
            .filter(user::Column::Username.eq(username))
            .one(&*self.db)
            .await?;

        let Some(found) = found else {
            warn!(%username, "login failed: unknown user");
            return Err(ServiceError::AuthError("Invalid credentials".into()));
        };

        if !verify_password(password, &found.password_hash) {
            warn!(%username, "login failed: bad password");
            return Err(ServiceError::AuthError("Invalid credentials".into()));
        }

        if !found.is_active {
            return Err(ServiceError::Forbidden("Account is deactivated".into()));
        }

        self.login_limiter.reset(&limiter_key);
        info!(user_id = %found.id, "login succeeded");
        Ok(found)
    }
}

/// Extractor for an authenticated storefront user.
#[derive(Clone)]
pub struct CurrentUser {
    pub user_id: Uuid,
    pub role: UserRole,
    pub session: Session,
}

#[async_trait::async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state).await?;
        let (Some(user_id), Some(role)) = (session.data.user_id, session.data.role) else {
            return Err(ServiceError::Unauthorized("Login required".into()));
        };
        Ok(CurrentUser {
            user_id,
            role,
            session,
        })
    }
}

/// Extractor for an authenticated admin (or super-admin).
#[derive(Clone)]
pub struct AdminUser {
    pub admin_id: Uuid,
    pub role: UserRole,
    pub session: Session,
}

impl AdminUser {
    pub fn is_super_admin(&self) -> bool {
        self.role == UserRole::SuperAdmin
    }
}

#[async_trait::async_trait]
impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let current = CurrentUser::from_request_parts(parts, state).await?;
        if !current.role.is_admin() {
            return Err(ServiceError::Forbidden("Admin access required".into()));
        }
        Ok(AdminUser {
            admin_id: current.user_id,
            role: current.role,
            session: current.session,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_round_trip() {
        let hash = hash_password("hunter2abc").unwrap();
        assert!(verify_password("hunter2abc", &hash));
        assert!(!verify_password("hunter2abd", &hash));
        assert!(!verify_password("hunter2abc", "not-a-phc-string"));
    }

    #[test]
    fn username_rules() {
        assert!(validate_username("alice_01").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("has space").is_err());
    }

    #[test]
    fn phone_rules() {
        assert!(validate_phone("+63 912 345 6789").is_ok());
        assert!(validate_phone("09123456789").is_ok());
        assert!(validate_phone("12ab34").is_err());
        assert!(validate_phone("").is_err());
    }

    #[test]
    fn password_strength_rules() {
        assert!(validate_password_strength("abcd1234").is_ok());
        assert!(validate_password_strength("short1").is_err());
        assert!(validate_password_strength("allletters").is_err());
        assert!(validate_password_strength("12345678").is_err());
    }

    #[test]
    fn birthdate_minimum_age() {
        let today = Utc::now().date_naive();
        let adult = min_age_cutoff(today).with_year(today.year() - 20).unwrap();
        let child = min_age_cutoff(today).with_year(today.year() - 10).unwrap();
        assert!(validate_birthdate(adult).is_ok());
        assert!(validate_birthdate(child).is_err());
    }

    #[test]
    fn leap_day_cutoff_falls_back_to_feb_28() {
        let leap_day = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let cutoff = min_age_cutoff(leap_day);
        assert_eq!(cutoff, NaiveDate::from_ymd_opt(2011, 2, 28).unwrap());
        // A twelve-year-old is still rejected on a leap day.
        assert!(NaiveDate::from_ymd_opt(2012, 3, 1).unwrap() > cutoff);
    }
}
