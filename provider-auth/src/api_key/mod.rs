//! API key authentication for service providers.
//!
//! Provides the `ProviderAuth` trait and one implementation per header scheme used by
//! the voice providers (custom header, bearer token, HTTP basic).

mod auth;
mod basic;
mod bearer;

pub use auth::{ApiKeyAuth, ApiKeyProvider, AuthMethod, ProviderAuth};
pub use basic::BasicAuth;
pub use bearer::BearerTokenAuth;
