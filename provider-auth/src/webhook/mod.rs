//! Webhook signature validation.

mod twilio;
mod url_signer;

pub use twilio::{TwilioSignatureValidator, SIGNATURE_HEADER};
pub use url_signer::UrlSigner;

use std::collections::HashMap;

use crate::error::Error;

/// The parts of an incoming webhook that a signature can cover.
#[derive(Debug, Clone)]
pub struct WebhookRequest<'a> {
    /// Full public URL the provider requested, including the query string.
    pub url: &'a str,
    /// Request headers with lowercase names.
    pub headers: &'a HashMap<String, String>,
    /// Raw request body bytes.
    pub body: &'a [u8],
}

/// Trait for validating webhook signatures.
pub trait WebhookValidator: Send + Sync {
    /// Validate a webhook request.
    ///
    /// Returns `Ok(false)` when a signature is present but does not match, and an error
    /// when the signature header is missing or malformed.
    fn validate(&self, request: &WebhookRequest<'_>) -> Result<bool, Error>;

    /// Get the provider identifier for this validator.
    fn provider_id(&self) -> &str;
}
