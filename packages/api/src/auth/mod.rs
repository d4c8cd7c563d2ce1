//! Authentication: session claims, local credentials, external identities and
//! password reset.

pub mod accounts;
mod external;
mod password;
pub mod reset;
mod session;

pub use accounts::{login, register_first_admin, registration_open, AccountForm};
pub use external::{
    link_external_identity, unlink_external_identity, upsert_external_identity, ExternalIdentity,
    IdentityVerifier, PendingSignIn,
};
pub use password::{hash_password, verify_password};
pub use reset::{LogMailer, Mailer};
pub use session::{
    SessionData, SESSION_AUTHENTICATED_KEY, SESSION_PENDING_SIGN_IN_KEY, SESSION_USER_ID_KEY,
};
