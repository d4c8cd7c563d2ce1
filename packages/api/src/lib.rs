//! # API crate: access control and services of the list-sharing service
//!
//! Everything the HTTP layer needs to decide *whether* a request may proceed and
//! *what* it does once admitted. Handlers in the `web` crate stay thin: they run a
//! [`guard::Chain`], then call one of the service functions below with an
//! [`AppContext`].
//!
//! ## Modules
//!
//! | Module | Feature gate | Purpose |
//! |--------|-------------|---------|
//! | [`guard`] | | Guard chain and the concrete route guards |
//! | [`permissions`] | | Ownership, view, edit and delete rules for lists and collections |
//! | [`groups`] | | Group membership, admin checks and the per-group sharing switch |
//! | [`share_code`] | | Collision-free public share codes |
//! | [`cascade`] | | Collection membership and the publish cascade to member lists |
//! | [`auth`] | | Password login, first-admin bootstrap, password reset, external identities |
//! | [`lists`], [`items`], [`collections`], [`sharing`], [`admin`] | | Service operations behind the routes |
//! | [`settings`] | | Layered configuration (`listshare.toml` + environment) |
//! | [`db`] | `server` | PostgreSQL pool, migrations and the `PgStore` |

pub mod admin;
pub mod auth;
pub mod cascade;
pub mod collections;
pub mod context;
#[cfg(feature = "server")]
pub mod db;
pub mod error;
pub mod groups;
pub mod guard;
pub mod items;
pub mod lists;
pub mod permissions;
pub mod settings;
pub mod share_code;
pub mod sharing;

pub use context::AppContext;
pub use error::{ApiError, ApiResult};
pub use settings::Settings;
