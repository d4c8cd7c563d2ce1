//! # External identities
//!
//! An [`IdentityVerifier`] owns the provider round trip: it builds the authorization
//! URL and turns the authorization code from the callback into a verified
//! [`ExternalIdentity`]. Token exchange and ID-token checks stay behind that trait;
//! this module maps verified identities onto local accounts.
//!
//! [`upsert_external_identity`] signs someone in:
//!
//! 1. An account already linked to `(provider, subject)` has its name refreshed.
//! 2. Otherwise an account with the same email and no link yet gets linked.
//! 3. Otherwise a new account is created in a fresh group, as that group's admin.
//!
//! Accounts created this way are never instance admins and carry no password.
//! [`link_external_identity`] attaches an identity to an account that is already
//! signed in, and [`unlink_external_identity`] detaches it.
//!
//! Between the redirect to the provider and the callback, the attempt is kept in the
//! session as a [`PendingSignIn`]. The provider must echo its `state` back within
//! [`STATE_TTL_SECS`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use store::{ExternalLink, NewUser, Store, User, UserId};

use crate::error::{ApiError, ApiResult};

pub const STATE_TTL_SECS: i64 = 600;

#[derive(Debug, Clone, PartialEq)]
pub struct ExternalIdentity {
    pub provider: String,
    pub subject: String,
    pub email: String,
    pub name: String,
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Provider name, as shown on the login page.
    fn provider(&self) -> &str;

    /// Where to send the browser; the provider returns `state` to the callback.
    fn authorization_url(&self, state: &str) -> String;

    /// Exchange `code` and verify the identity it stands for.
    async fn verify(&self, code: &str) -> ApiResult<ExternalIdentity>;
}

/// An external sign-in started but not yet completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingSignIn {
    pub state: String,
    /// Unix seconds.
    pub issued_at: i64,
    /// Set when the identity is to be linked to this signed-in user.
    pub link_to: Option<UserId>,
}

impl PendingSignIn {
    pub fn new(link_to: Option<UserId>) -> Self {
        let mut bytes = [0u8; 16];
        OsRng.fill_bytes(&mut bytes);
        Self {
            state: hex::encode(bytes),
            issued_at: Utc::now().timestamp(),
            link_to,
        }
    }

    /// Match the `state` the provider echoed and reject stale attempts.
    pub fn check(&self, returned: Option<&str>, now: DateTime<Utc>) -> ApiResult<()> {
        if returned != Some(self.state.as_str()) {
            return Err(ApiError::BadRequest("Invalid state parameter".into()));
        }
        if now.timestamp() - self.issued_at > STATE_TTL_SECS {
            return Err(ApiError::BadRequest("State expired".into()));
        }
        Ok(())
    }
}

pub async fn upsert_external_identity(
    store: &dyn Store,
    identity: ExternalIdentity,
) -> ApiResult<User> {
    let link = ExternalLink {
        provider: identity.provider,
        subject: identity.subject,
    };
    let email = identity.email.trim().to_lowercase();

    if let Some(user) = store.user_by_external(&link.provider, &link.subject).await? {
        store.link_external(user.id, link, &identity.name).await?;
        return fetch(store, user.id).await;
    }

    if let Some(user) = store.user_by_email(&email).await? {
        if user.external.is_some() {
            return Err(ApiError::Conflict(
                "Email is already linked to another identity".into(),
            ));
        }
        tracing::info!("Linking {} identity to existing user {}", link.provider, user.id);
        store.link_external(user.id, link, &identity.name).await?;
        return fetch(store, user.id).await;
    }

    let user = store
        .create_user_in_new_group(NewUser {
            group_id: 0,
            email,
            name: identity.name,
            password_hash: None,
            admin: true,
            instance_admin: false,
            external: Some(link),
        })
        .await?;
    tracing::info!(
        "Created user {} in new group {} from external identity",
        user.id,
        user.group_id
    );
    Ok(user)
}

/// Attach `identity` to `user_id`. The account keeps its own name and email.
pub async fn link_external_identity(
    store: &dyn Store,
    user_id: UserId,
    identity: ExternalIdentity,
) -> ApiResult<User> {
    let user = fetch(store, user_id).await?;
    if user.external.is_some() {
        return Err(ApiError::BadRequest(
            "An external identity is already linked".into(),
        ));
    }
    if store
        .user_by_external(&identity.provider, &identity.subject)
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict(
            "This identity is linked to another account".into(),
        ));
    }
    let link = ExternalLink {
        provider: identity.provider,
        subject: identity.subject,
    };
    tracing::info!("Linking {} identity to user {}", link.provider, user.id);
    store.link_external(user.id, link, &user.name).await?;
    fetch(store, user.id).await
}

pub async fn unlink_external_identity(store: &dyn Store, user_id: UserId) -> ApiResult<()> {
    store.unlink_external(user_id).await?;
    tracing::info!("Unlinked external identity from user {}", user_id);
    Ok(())
}

async fn fetch(store: &dyn Store, id: UserId) -> ApiResult<User> {
    store
        .user(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("user {id} not found")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use store::MemoryStore;

    fn identity(subject: &str, email: &str) -> ExternalIdentity {
        ExternalIdentity {
            provider: "keycloak".into(),
            subject: subject.into(),
            email: email.into(),
            name: "Grace".into(),
        }
    }

    #[tokio::test]
    async fn test_new_identity_creates_group_admin() {
        let store = MemoryStore::new();
        let user = upsert_external_identity(&store, identity("sub-1", "grace@x.org"))
            .await
            .unwrap();
        assert!(user.admin);
        assert!(!user.instance_admin);
        assert!(user.password_hash.is_none());

        // Same subject again resolves to the same account
        let mut again = identity("sub-1", "grace@x.org");
        again.name = "Grace H.".into();
        let same = upsert_external_identity(&store, again).await.unwrap();
        assert_eq!(same.id, user.id);
        assert_eq!(same.name, "Grace H.");
    }

    #[tokio::test]
    async fn test_links_existing_email_account() {
        let store = MemoryStore::new();
        let local = store
            .create_user(NewUser {
                group_id: 3,
                email: "grace@x.org".into(),
                name: "Grace".into(),
                password_hash: None,
                admin: false,
                instance_admin: false,
                external: None,
            })
            .await
            .unwrap();

        let linked = upsert_external_identity(&store, identity("sub-9", "Grace@X.org"))
            .await
            .unwrap();
        assert_eq!(linked.id, local.id);
        assert_eq!(linked.group_id, 3);
        assert_eq!(linked.external.unwrap().subject, "sub-9");

        // A different subject for the same email is refused
        let err = upsert_external_identity(&store, identity("sub-10", "grace@x.org"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_link_and_unlink() {
        let store = MemoryStore::new();
        let local = store
            .create_user(NewUser {
                group_id: 2,
                email: "ada@x.org".into(),
                name: "Ada".into(),
                password_hash: None,
                admin: false,
                instance_admin: false,
                external: None,
            })
            .await
            .unwrap();

        let linked = link_external_identity(&store, local.id, identity("sub-1", "other@x.org"))
            .await
            .unwrap();
        assert_eq!(linked.name, "Ada");
        assert_eq!(linked.email, "ada@x.org");
        assert_eq!(linked.external.unwrap().subject, "sub-1");

        // Already linked
        assert!(matches!(
            link_external_identity(&store, local.id, identity("sub-2", "ada@x.org")).await,
            Err(ApiError::BadRequest(_))
        ));

        unlink_external_identity(&store, local.id).await.unwrap();
        assert!(store.user(local.id).await.unwrap().unwrap().external.is_none());
        assert!(store.user_by_external("keycloak", "sub-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_link_refuses_identity_of_another_account() {
        let store = MemoryStore::new();
        upsert_external_identity(&store, identity("sub-1", "grace@x.org"))
            .await
            .unwrap();
        let other = store
            .create_user(NewUser {
                group_id: 0,
                email: "ada@x.org".into(),
                name: "Ada".into(),
                password_hash: None,
                admin: false,
                instance_admin: false,
                external: None,
            })
            .await
            .unwrap();

        let err = link_external_identity(&store, other.id, identity("sub-1", "ada@x.org"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[test]
    fn test_pending_sign_in_checks_state_and_age() {
        let pending = PendingSignIn::new(None);
        assert_eq!(pending.state.len(), 32);
        let now = Utc::now();
        assert!(pending.check(Some(&pending.state), now).is_ok());
        assert!(pending.check(Some("forged"), now).is_err());
        assert!(pending.check(None, now).is_err());

        let late = now + chrono::Duration::seconds(STATE_TTL_SECS + 5);
        assert_eq!(
            pending.check(Some(&pending.state), late),
            Err(ApiError::BadRequest("State expired".into()))
        );
    }
}
