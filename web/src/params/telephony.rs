//! Form fields Twilio posts to the voice webhooks. Names follow Twilio's casing.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct CallForm {
    pub(crate) call_sid: Option<String>,
    pub(crate) from: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct RecordingForm {
    pub(crate) call_sid: Option<String>,
    pub(crate) recording_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct StatusForm {
    pub(crate) call_sid: String,
    pub(crate) call_status: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TurnQuery {
    #[serde(default)]
    pub(crate) state: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SpeechQuery {
    pub(crate) text: String,
    /// Signature over `text`, added when speech URLs are signed.
    pub(crate) sig: Option<String>,
}
