//! Speech-to-text provider trait.

use crate::types::transcription::{Request, Transcript};
use crate::Error;
use async_trait::async_trait;

/// Abstraction for speech-to-text services (Deepgram, AssemblyAI, Whisper).
///
/// Caller turns are short, so transcription is synchronous: one request per recording.
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait Provider: Send + Sync {
    /// Transcribe the recording at `request.audio_url`.
    async fn transcribe(&self, request: Request) -> std::result::Result<Transcript, Error>;

    /// Return unique identifier for this provider (e.g., "deepgram").
    fn provider_id(&self) -> &'static str;
}
