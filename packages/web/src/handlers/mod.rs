//! Thin JSON handlers. Guards have already run by the time any of these is called;
//! each one unpacks the request, calls one `api` service and shapes the response.

pub mod admin;
pub mod auth;
pub mod collections;
pub mod lists;
pub mod oidc;
pub mod shared;

use serde::Deserialize;

/// `?name=` on name checks and collection deletion.
#[derive(Debug, Default, Deserialize)]
pub struct NameQuery {
    pub name: Option<String>,
}
