use std::sync::Arc;

use store::Store;

use crate::auth::{IdentityVerifier, LogMailer, Mailer};
use crate::settings::Settings;
use crate::share_code::ShareCodeAllocator;

/// Process-wide state, built once at startup and shared read-only by every request.
#[derive(Clone)]
pub struct AppContext {
    pub store: Arc<dyn Store>,
    pub settings: Arc<Settings>,
    pub codes: ShareCodeAllocator,
    pub mailer: Arc<dyn Mailer>,
    /// External sign-in provider; `None` leaves the `/auth/oidc` routes answering 404.
    pub verifier: Option<Arc<dyn IdentityVerifier>>,
}

impl AppContext {
    pub fn new(store: Arc<dyn Store>, settings: Settings) -> Self {
        Self {
            store,
            settings: Arc::new(settings),
            codes: ShareCodeAllocator::new(),
            mailer: Arc::new(LogMailer),
            verifier: None,
        }
    }

    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = mailer;
        self
    }

    pub fn with_verifier(mut self, verifier: Arc<dyn IdentityVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    pub fn with_codes(mut self, codes: ShareCodeAllocator) -> Self {
        self.codes = codes;
        self
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }
}
