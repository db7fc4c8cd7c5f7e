//! Provider traits, one per capability.

pub mod completion;
pub mod synthesis;
pub mod telephony;
pub mod transcription;
