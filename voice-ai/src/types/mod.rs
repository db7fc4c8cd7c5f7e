pub mod call;
pub mod completion;
pub mod synthesis;
pub mod transcription;
