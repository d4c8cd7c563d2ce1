//! # Guard chain
//!
//! A [`Guard`] inspects a request before any handler runs and answers a
//! [`Decision`]: let it through, or reject it with an [`ApiError`]. A [`Chain`] is an
//! ordered list of guards evaluated left to right; the first rejection wins and later
//! guards never run.
//!
//! Routes start from one of two chains:
//!
//! - [`Chain::public`]: no guards (login, registration, share-code views).
//! - [`Chain::authenticated`]: [`RequireAuth`] first, so resource guards appended
//!   after it always see a resolved caller.
//!
//! CORS is not a guard; the HTTP layer applies it to every route.
//!
//! Guards fail closed. A store error while deciding is a rejection carrying that
//! error (404 for a missing resource, 500 otherwise), and a path id that does not
//! parse is a 400.

mod guards;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use store::{Store, UserId};

use crate::auth::SessionData;
use crate::error::{ApiError, ApiResult};

pub use guards::{
    CollectionIdOwner, ListIdDeleter, ListIdEditor, ListIdOwner, ListIdViewer, RequireAdmin,
    RequireAuth, RequireGroupAdmin, RequireInstanceAdmin,
};

#[derive(Debug, PartialEq)]
pub enum Decision {
    Continue,
    Reject(ApiError),
}

impl Decision {
    /// `Ok(true)` continues, `Ok(false)` is Forbidden, an error rejects with itself.
    pub fn from_check(check: ApiResult<bool>) -> Self {
        match check {
            Ok(true) => Self::Continue,
            Ok(false) => Self::Reject(ApiError::forbidden()),
            Err(err) => Self::Reject(err),
        }
    }
}

/// Everything a guard may look at.
pub struct GuardContext<'a> {
    pub store: &'a dyn Store,
    pub session: &'a SessionData,
    params: &'a HashMap<String, String>,
}

impl<'a> GuardContext<'a> {
    pub fn new(
        store: &'a dyn Store,
        session: &'a SessionData,
        params: &'a HashMap<String, String>,
    ) -> Self {
        Self {
            store,
            session,
            params,
        }
    }

    pub fn user_id(&self) -> ApiResult<UserId> {
        self.session.identity()
    }

    /// Parse the integer path parameter `name`.
    pub fn param_id(&self, name: &str) -> ApiResult<i64> {
        self.params
            .get(name)
            .and_then(|raw| raw.parse().ok())
            .ok_or_else(|| ApiError::BadRequest(format!("Invalid {name} supplied in path")))
    }
}

#[async_trait]
pub trait Guard: Send + Sync {
    async fn admit(&self, cx: &GuardContext<'_>) -> Decision;
}

#[derive(Clone, Default)]
pub struct Chain {
    guards: Vec<Arc<dyn Guard>>,
}

impl Chain {
    pub fn public() -> Self {
        Self::default()
    }

    pub fn authenticated() -> Self {
        Self::public().then(RequireAuth)
    }

    /// Append `guard` to the end of the chain.
    pub fn then(mut self, guard: impl Guard + 'static) -> Self {
        self.guards.push(Arc::new(guard));
        self
    }

    pub async fn admit(&self, cx: &GuardContext<'_>) -> Decision {
        for guard in &self.guards {
            if let Decision::Reject(err) = guard.admit(cx).await {
                return Decision::Reject(err);
            }
        }
        Decision::Continue
    }
}
