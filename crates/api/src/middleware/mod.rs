//! Request extractors that guard handlers.
//!
//! - [`auth::AuthUser`] -- Extracts the calling person from a JWT Bearer token.

pub mod auth;
