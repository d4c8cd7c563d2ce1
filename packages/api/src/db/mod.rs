//! # Database module: PostgreSQL pool, migrations and the [`PgStore`]
//!
//! Everything here is gated behind the `server` feature so the service modules
//! and their unit tests build without SQLx.
//!
//! | Item | Purpose |
//! |------|---------|
//! | [`connect`] | Open a pool for [`crate::settings::Database`]. |
//! | [`migrate`] | Apply the embedded migrations in `packages/api/migrations`. |
//! | [`PgStore`] | The production [`store::Store`] implementation. |

mod pool;
mod postgres;

pub use pool::{connect, migrate};
pub use postgres::PgStore;
