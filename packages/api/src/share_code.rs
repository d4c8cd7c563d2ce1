//! # Share-code allocation
//!
//! A share code is [`SHARE_CODE_LEN`] symbols drawn uniformly, with [`OsRng`], from
//! [`ALPHABET`]: upper and lower case letters and digits minus the look-alikes
//! (`0 O o`, `1 I i l`, `5 S s`). Codes for lists and collections share one namespace.
//!
//! [`ShareCodeAllocator::allocate`] draws a candidate and asks the store to claim it
//! for the target; the store checks both columns and writes in one atomic step. A
//! taken candidate is discarded and a new one drawn, up to `max_attempts` times. A
//! target found already published keeps its code, so concurrent publishers of the
//! same list agree on one code.

use std::fmt;
use std::sync::Arc;

use rand::rngs::OsRng;
use rand::Rng;
use store::{ClaimOutcome, ShareTarget, Store};

use crate::error::{ApiError, ApiResult};

pub const SHARE_CODE_LEN: usize = 8;

pub const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRTUVWXYZabcdefghjkmnpqrtuvwxyz2346789";

const DEFAULT_MAX_ATTEMPTS: usize = 32;

/// Draw one candidate code.
pub fn generate_code() -> String {
    let mut rng = OsRng;
    (0..SHARE_CODE_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

type CodeSource = Arc<dyn Fn() -> String + Send + Sync>;

#[derive(Clone)]
pub struct ShareCodeAllocator {
    source: CodeSource,
    max_attempts: usize,
}

impl Default for ShareCodeAllocator {
    fn default() -> Self {
        Self {
            source: Arc::new(generate_code),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl fmt::Debug for ShareCodeAllocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShareCodeAllocator")
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

impl ShareCodeAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `source` instead of the random generator.
    pub fn with_source(source: impl Fn() -> String + Send + Sync + 'static) -> Self {
        Self {
            source: Arc::new(source),
            ..Self::default()
        }
    }

    pub fn max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Mint a code unused by any list or collection and write it to `target`. A target
    /// that already carries a code keeps it, and that code is returned instead.
    pub async fn allocate(&self, store: &dyn Store, target: ShareTarget) -> ApiResult<String> {
        for attempt in 1..=self.max_attempts {
            let code = (self.source)();
            match store.claim_share_code(target, &code).await? {
                ClaimOutcome::Claimed => {
                    tracing::info!("Published {:?} after {} attempt(s)", target, attempt);
                    return Ok(code);
                }
                ClaimOutcome::AlreadyPublished(existing) => {
                    tracing::debug!("{:?} is already published", target);
                    return Ok(existing);
                }
                ClaimOutcome::Taken => {
                    tracing::debug!("Share code collision on attempt {}", attempt);
                }
            }
        }
        Err(ApiError::Unexpected(format!(
            "no free share code after {} attempts",
            self.max_attempts
        )))
    }
}
