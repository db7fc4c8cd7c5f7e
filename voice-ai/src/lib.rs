//! Voice AI abstraction layer for the providers behind a phone conversation.
//!
//! This crate provides trait-based abstractions for the voice call workflow:
//! - Telephony: placing outbound calls and reporting their status
//! - Speech-to-text transcription of caller recordings
//! - Text-to-speech synthesis of assistant replies
//! - LLM chat completions that drive the conversation
//!
//! The design is provider-agnostic so Twilio, Deepgram, ElevenLabs or OpenAI can be
//! swapped for another vendor without changing application code.

pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::Error;
pub use types::completion::{Message, Role};
