//! Session claims and the identity resolver.

use serde::{Deserialize, Serialize};
use store::UserId;

use crate::error::{ApiError, ApiResult};

/// Session key holding the `authenticated` flag.
pub const SESSION_AUTHENTICATED_KEY: &str = "authenticated";

/// Key for storing user ID in session.
pub const SESSION_USER_ID_KEY: &str = "user_id";

/// Session key holding an external sign-in awaiting its callback.
pub const SESSION_PENDING_SIGN_IN_KEY: &str = "pending_sign_in";

/// What the HTTP layer read from the signed session cookie.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    pub authenticated: bool,
    pub user_id: Option<UserId>,
}

impl SessionData {
    pub fn signed_in(user_id: UserId) -> Self {
        Self {
            authenticated: true,
            user_id: Some(user_id),
        }
    }

    /// Resolve the caller's user id. Both claims must be present.
    pub fn identity(&self) -> ApiResult<UserId> {
        match (self.authenticated, self.user_id) {
            (true, Some(id)) => Ok(id),
            _ => Err(ApiError::Unauthenticated),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_requires_both_claims() {
        assert_eq!(SessionData::signed_in(4).identity(), Ok(4));
        assert_eq!(
            SessionData::default().identity(),
            Err(ApiError::Unauthenticated)
        );
        let stale = SessionData {
            authenticated: false,
            user_id: Some(4),
        };
        assert_eq!(stale.identity(), Err(ApiError::Unauthenticated));
    }
}
