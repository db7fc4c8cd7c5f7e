//! HTTP client building with middleware.

mod client;
mod response;
mod retry;

pub use client::{AuthenticatedClient, AuthenticatedClientBuilder, HttpClientConfig};
pub use response::error_for_status;
pub use retry::RetryAfterPolicy;
