//! # Password reset tokens
//!
//! A token is 32 random bytes, hex encoded, valid for [`RESET_TOKEN_TTL_HOURS`] and
//! bound to one email address. Issuing a token drops any earlier token for the same
//! address; completing a reset consumes the token. Expired tokens are deleted the
//! first time they are looked up.
//!
//! Delivery goes through the [`Mailer`] trait. [`LogMailer`] only logs the link and is
//! what the server uses when no outbound mail is configured.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use store::{ResetToken, Store};

use super::password::hash_password;
use crate::error::{ApiError, ApiResult};

pub const RESET_TOKEN_TTL_HOURS: i64 = 1;

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_reset_link(&self, email: &str, link: &str) -> ApiResult<()>;
}

#[derive(Clone, Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_reset_link(&self, email: &str, link: &str) -> ApiResult<()> {
        tracing::info!("Password reset requested for {}: {}", email, link);
        Ok(())
    }
}

fn new_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Issue a token for `email` if it belongs to an account. Unknown addresses are
/// silently ignored so callers can answer identically either way.
pub async fn request_reset(
    store: &dyn Store,
    mailer: &dyn Mailer,
    base_url: &str,
    email: &str,
) -> ApiResult<()> {
    let email = email.trim().to_lowercase();
    if store.user_by_email(&email).await?.is_none() {
        tracing::debug!("Password reset requested for unknown address");
        return Ok(());
    }
    let token = ResetToken {
        token: new_token(),
        email: email.clone(),
        expires_at: Utc::now() + Duration::hours(RESET_TOKEN_TTL_HOURS),
    };
    let link = format!("{}/reset/{}", base_url.trim_end_matches('/'), token.token);
    store.replace_reset_token(token).await?;
    mailer.send_reset_link(&email, &link).await
}

/// The live token, or `None` when unknown or expired.
pub async fn valid_token(store: &dyn Store, token: &str) -> ApiResult<Option<ResetToken>> {
    let Some(found) = store.reset_token(token).await? else {
        return Ok(None);
    };
    if found.is_expired(Utc::now()) {
        store.delete_reset_token(token).await?;
        return Ok(None);
    }
    Ok(Some(found))
}

pub async fn complete_reset(store: &dyn Store, token: &str, password: &str) -> ApiResult<()> {
    if password.trim().is_empty() {
        return Err(ApiError::BadRequest("Password is required".into()));
    }
    let found = valid_token(store, token)
        .await?
        .ok_or_else(|| ApiError::BadRequest("Invalid or expired reset link".into()))?;
    let user = store
        .user_by_email(&found.email)
        .await?
        .ok_or_else(|| ApiError::BadRequest("Invalid or expired reset link".into()))?;
    store.set_password(user.id, &hash_password(password)?).await?;
    store.delete_reset_token(token).await?;
    tracing::info!("Password reset completed for user {}", user.id);
    Ok(())
}
