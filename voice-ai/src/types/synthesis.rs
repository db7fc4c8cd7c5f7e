//! Types for text-to-speech operations.

/// Text to be spoken back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub text: String,
    /// Overrides the provider's configured default voice.
    pub voice_id: Option<String>,
}

/// Synthesized audio ready to stream to the telephony provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Audio {
    pub content_type: String,
    pub bytes: Vec<u8>,
}
