//! Local accounts: credential login and first-admin bootstrap.

use serde::Deserialize;
use store::{NewUser, Store, User};

use super::password::{hash_password, verify_password};
use crate::error::{ApiError, ApiResult};

/// The group the bootstrap admin is placed in.
pub const FIRST_GROUP_ID: i64 = 0;

/// Account fields submitted by a registration or user-creation form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AccountForm {
    pub email: String,
    pub name: String,
    pub password: String,
}

impl AccountForm {
    /// Trimmed, lower-cased email plus trimmed name, or the first missing field.
    pub fn validate(&self) -> ApiResult<(String, String)> {
        let email = self.email.trim().to_lowercase();
        let name = self.name.trim().to_string();
        if email.is_empty() {
            return Err(ApiError::BadRequest("Email is required".into()));
        }
        if name.is_empty() {
            return Err(ApiError::BadRequest("Name is required".into()));
        }
        if self.password.trim().is_empty() {
            return Err(ApiError::BadRequest("Password is required".into()));
        }
        Ok((email, name))
    }
}

/// Check an email/password pair. Unknown emails, accounts without a password and
/// wrong passwords all answer [`ApiError::InvalidCredentials`].
pub async fn login(store: &dyn Store, email: &str, password: &str) -> ApiResult<User> {
    let email = email.trim().to_lowercase();
    let user = store
        .user_by_email(&email)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;
    let Some(hash) = user.password_hash.as_deref() else {
        return Err(ApiError::InvalidCredentials);
    };
    if !verify_password(password, hash)? {
        return Err(ApiError::InvalidCredentials);
    }
    Ok(user)
}

/// Whether `PUT /admin/register` is still open.
pub async fn registration_open(store: &dyn Store) -> ApiResult<bool> {
    Ok(!store.admin_exists().await?)
}

/// Create the very first account: admin and instance admin of group 0.
pub async fn register_first_admin(store: &dyn Store, form: &AccountForm) -> ApiResult<User> {
    if !registration_open(store).await? {
        return Err(ApiError::Forbidden("An admin user already exists".into()));
    }
    let (email, name) = form.validate()?;
    let user = store
        .create_first_admin(NewUser {
            group_id: FIRST_GROUP_ID,
            email,
            name,
            password_hash: Some(hash_password(&form.password)?),
            admin: true,
            instance_admin: true,
            external: None,
        })
        .await?
        .ok_or_else(|| ApiError::Forbidden("An admin user already exists".into()))?;
    tracing::info!("Registered first admin user {}", user.id);
    Ok(user)
}
