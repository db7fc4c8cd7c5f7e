//! # provider-auth
//!
//! Authentication plumbing shared by every external voice provider:
//! - API key, bearer token and basic authentication (Deepgram, ElevenLabs, OpenAI, Twilio)
//! - HTTP client building with retry middleware
//! - Response status classification (rate limits, rejected credentials)
//! - Webhook signature validation for telephony callbacks
//!
//! ## Usage
//!
//! ```rust,ignore
//! use provider_auth::{
//!     api_key::{ApiKeyAuth, ApiKeyProvider},
//!     http::AuthenticatedClientBuilder,
//! };
//!
//! let client = AuthenticatedClientBuilder::new()
//!     .with_auth(Box::new(ApiKeyAuth::new(ApiKeyProvider::Deepgram, key)))
//!     .build()?;
//! ```

pub mod api_key;
pub mod error;
pub mod http;
pub mod webhook;

// Re-export commonly used types
pub use error::{Error, ErrorKind};
