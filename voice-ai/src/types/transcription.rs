//! Types for speech-to-text operations.

use serde::{Deserialize, Serialize};

/// A recorded caller utterance to transcribe.
///
/// `audio_url` must be reachable by the provider; recordings hosted by the telephony
/// provider are fetched directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub audio_url: String,
    pub language_code: Option<String>,
}

/// Result of a synchronous transcription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub text: String,
    pub confidence: Option<f64>,
}

impl Transcript {
    /// True when the caller said nothing intelligible.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}
