//! Account business logic - registration, login sessions and profiles.
//!
//! Users are identified by email. Registering a user also creates their
//! profile row in the same database transaction, so every user always has
//! exactly one profile. Login issues an opaque bearer token stored in the
//! `sessions` table.

use crate::{
    core::{order::OrderStatus, password, pricing},
    entities::{Order, Session, User, UserProfile, order, session, user, user_profile},
    errors::{Error, Result},
};
use chrono::{Duration, Utc};
use sea_orm::{Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Longest accepted phone number
const MAX_PHONE_LEN: usize = 20;

/// Aggregated order statistics shown on the profile page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProfileSummary {
    /// Number of orders ever placed
    pub total_orders: u64,
    /// Sum of `total_amount` over completed orders
    pub total_spent: i64,
}

/// Changes to a profile; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    /// New phone number
    pub phone: Option<String>,
    /// New address
    pub address: Option<String>,
    /// New avatar path; `Some("")` clears it
    pub avatar: Option<String>,
}

/// Validates an email and normalizes it: surrounding whitespace is removed
/// and the domain part is lowercased.
///
/// # Errors
/// Returns [`Error::Validation`] if the address has no local part or domain.
pub fn normalize_email(email: &str) -> Result<String> {
    let trimmed = email.trim();
    match trimmed.rsplit_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {
            Ok(format!("{local}@{}", domain.to_lowercase()))
        }
        _ => Err(Error::Validation {
            message: format!("'{trimmed}' is not a valid email address"),
        }),
    }
}

/// Inserts a user with an already hashed password plus an empty profile.
pub(crate) async fn insert_user<C>(
    db: &C,
    email: String,
    password_hash: String,
    is_staff: bool,
) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    let now = Utc::now();
    let user = user::ActiveModel {
        username: Set(Some(email.clone())),
        email: Set(email),
        password_hash: Set(password_hash),
        is_active: Set(true),
        is_staff: Set(is_staff),
        date_joined: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    user_profile::ActiveModel {
        user_id: Set(user.id),
        phone: Set(String::new()),
        address: Set(String::new()),
        avatar: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    Ok(user)
}

async fn create_account(
    db: &DatabaseConnection,
    email: &str,
    password: &str,
    is_staff: bool,
) -> Result<user::Model> {
    let email = normalize_email(email)?;
    if get_user_by_email(db, &email).await?.is_some() {
        return Err(Error::EmailTaken { email });
    }

    let password_hash = password::hash_password(password)?;

    let txn = db.begin().await?;
    let user = insert_user(&txn, email, password_hash, is_staff).await?;
    txn.commit().await?;

    info!(user_id = user.id, is_staff, "Account created.");
    Ok(user)
}

/// Registers a new customer.
///
/// # Errors
/// Returns an error if:
/// - The email is malformed or already registered
/// - The password is empty or the confirmation does not match
/// - The database insert fails
#[instrument(skip(db, password1, password2))]
pub async fn register(
    db: &DatabaseConnection,
    email: &str,
    password1: &str,
    password2: &str,
) -> Result<user::Model> {
    if password1 != password2 {
        return Err(Error::Validation {
            message: "The two password fields didn't match".to_string(),
        });
    }
    create_account(db, email, password1, false).await
}

/// Creates a staff account, or returns the existing user with that email.
///
/// # Errors
/// Returns an error if the email is malformed, the password is empty, or the
/// database operation fails.
#[instrument(skip(db, password))]
pub async fn create_superuser(
    db: &DatabaseConnection,
    email: &str,
    password: &str,
) -> Result<user::Model> {
    let normalized = normalize_email(email)?;
    if let Some(existing) = get_user_by_email(db, &normalized).await? {
        return Ok(existing);
    }
    create_account(db, &normalized, password, true).await
}

/// Finds a user by (normalized) email.
pub async fn get_user_by_email(
    db: &DatabaseConnection,
    email: &str,
) -> Result<Option<user::Model>> {
    User::find()
        .filter(user::Column::Email.eq(email))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a user by id.
pub async fn get_user_by_id(db: &DatabaseConnection, user_id: i64) -> Result<Option<user::Model>> {
    User::find_by_id(user_id).one(db).await.map_err(Into::into)
}

/// Checks an email/password pair. Inactive users never authenticate.
///
/// # Errors
/// Returns an error only if the database query fails or the stored hash is corrupt.
#[instrument(skip(db, password))]
pub async fn authenticate(
    db: &DatabaseConnection,
    email: &str,
    password: &str,
) -> Result<Option<user::Model>> {
    let Ok(email) = normalize_email(email) else {
        return Ok(None);
    };
    let Some(user) = get_user_by_email(db, &email).await? else {
        return Ok(None);
    };
    if !user.is_active {
        warn!(user_id = user.id, "Login attempt for inactive account.");
        return Ok(None);
    }
    if password::verify_password(&user.password_hash, password)? {
        Ok(Some(user))
    } else {
        Ok(None)
    }
}

/// Authenticates and opens a session valid for `ttl`.
///
/// # Errors
/// Returns [`Error::InvalidCredentials`] on a wrong email or password.
#[instrument(skip(db, password))]
pub async fn login(
    db: &DatabaseConnection,
    email: &str,
    password: &str,
    ttl: Duration,
) -> Result<(user::Model, session::Model)> {
    let user = authenticate(db, email, password)
        .await?
        .ok_or(Error::InvalidCredentials)?;

    let now = Utc::now();
    let session = session::ActiveModel {
        token: Set(Uuid::new_v4().simple().to_string()),
        user_id: Set(user.id),
        created_at: Set(now),
        expires_at: Set(now + ttl),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(user_id = user.id, "User logged in.");
    Ok((user, session))
}

/// Ends a session. Returns whether a session was actually removed.
pub async fn logout(db: &DatabaseConnection, token: &str) -> Result<bool> {
    let result = Session::delete_many()
        .filter(session::Column::Token.eq(token))
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}

/// Resolves a bearer token to its user.
///
/// Expired sessions are deleted and treated as unknown; so are sessions of
/// users that have since been deactivated.
pub async fn user_for_token(db: &DatabaseConnection, token: &str) -> Result<Option<user::Model>> {
    let Some((session, user)) = Session::find()
        .filter(session::Column::Token.eq(token))
        .find_also_related(User)
        .one(db)
        .await?
    else {
        return Ok(None);
    };

    if session.expires_at <= Utc::now() {
        Session::delete_by_id(session.id).exec(db).await?;
        return Ok(None);
    }

    Ok(user.filter(|u| u.is_active))
}

/// Returns the user's profile, creating an empty one if it is missing.
pub async fn get_profile(db: &DatabaseConnection, user_id: i64) -> Result<user_profile::Model> {
    if let Some(profile) = UserProfile::find()
        .filter(user_profile::Column::UserId.eq(user_id))
        .one(db)
        .await?
    {
        return Ok(profile);
    }

    if get_user_by_id(db, user_id).await?.is_none() {
        return Err(Error::UserNotFound {
            key: user_id.to_string(),
        });
    }

    let now = Utc::now();
    user_profile::ActiveModel {
        user_id: Set(user_id),
        phone: Set(String::new()),
        address: Set(String::new()),
        avatar: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Applies a [`ProfileUpdate`].
///
/// # Errors
/// Returns [`Error::Validation`] if the phone number is longer than 20 characters.
#[instrument(skip(db, changes))]
pub async fn update_profile(
    db: &DatabaseConnection,
    user_id: i64,
    changes: ProfileUpdate,
) -> Result<user_profile::Model> {
    if let Some(phone) = &changes.phone {
        if phone.trim().chars().count() > MAX_PHONE_LEN {
            return Err(Error::Validation {
                message: format!("Phone number must be at most {MAX_PHONE_LEN} characters"),
            });
        }
    }

    let mut profile: user_profile::ActiveModel = get_profile(db, user_id).await?.into();
    if let Some(phone) = changes.phone {
        profile.phone = Set(phone.trim().to_string());
    }
    if let Some(address) = changes.address {
        profile.address = Set(address.trim().to_string());
    }
    if let Some(avatar) = changes.avatar {
        let avatar = avatar.trim().to_string();
        profile.avatar = Set((!avatar.is_empty()).then_some(avatar));
    }
    profile.updated_at = Set(Utc::now());

    profile.update(db).await.map_err(Into::into)
}

/// Counts the user's orders and sums what completed orders cost.
pub async fn profile_summary(db: &DatabaseConnection, user_id: i64) -> Result<ProfileSummary> {
    let orders = Order::find()
        .filter(order::Column::UserId.eq(user_id))
        .all(db)
        .await?;

    let total_spent = pricing::sum_totals(
        orders
            .iter()
            .filter(|o| o.status == OrderStatus::Completed.as_str())
            .map(|o| o.total_amount),
    )?;

    Ok(ProfileSummary {
        total_orders: orders.len() as u64,
        total_spent,
    })
}
