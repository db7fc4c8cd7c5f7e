//! Text-to-speech provider trait.

use crate::types::synthesis::{Audio, Request};
use crate::Error;
use async_trait::async_trait;

/// Abstraction for text-to-speech services (ElevenLabs, Polly).
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait Provider: Send + Sync {
    async fn synthesize(&self, request: Request) -> std::result::Result<Audio, Error>;

    /// Return unique identifier for this provider (e.g., "elevenlabs").
    fn provider_id(&self) -> &'static str;
}
