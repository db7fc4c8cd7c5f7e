//! Telephony provider trait.

use crate::types::call::{DialRequest, DialedCall};
use crate::Error;
use async_trait::async_trait;

/// Abstraction for programmable voice services (Twilio, Vonage, Plivo).
///
/// Only the outbound leg needs an API call; inbound calls and follow-up turns reach the
/// application through provider webhooks.
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait Provider: Send + Sync {
    /// Ask the provider to dial `request.to`.
    ///
    /// Returns as soon as the provider has queued the call. The outcome arrives later on
    /// `request.status_callback_url`. This is a write: implementations must not retry it.
    async fn place_call(&self, request: DialRequest) -> std::result::Result<DialedCall, Error>;

    /// Return unique identifier for this provider (e.g., "twilio").
    fn provider_id(&self) -> &'static str;
}
