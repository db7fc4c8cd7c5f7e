//! Builder for TwiML, the XML call instructions returned from telephony webhooks.

use std::fmt::Write as _;

/// How long the caller may speak in one turn, in seconds.
pub const MAX_RECORDING_SECS: u32 = 30;
/// Seconds of silence that end a recording.
pub const SILENCE_TIMEOUT_SECS: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Verb {
    Say(String),
    Play(String),
    Record { action: String },
    Hangup,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoiceResponse {
    verbs: Vec<Verb>,
}

impl VoiceResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Speak `text` with the telephony provider's built-in voice.
    pub fn say(mut self, text: impl Into<String>) -> Self {
        self.verbs.push(Verb::Say(text.into()));
        self
    }

    /// Play audio fetched from `url`.
    pub fn play(mut self, url: impl Into<String>) -> Self {
        self.verbs.push(Verb::Play(url.into()));
        self
    }

    /// Record the caller's next utterance and post the recording to `action`.
    pub fn record(mut self, action: impl Into<String>) -> Self {
        self.verbs.push(Verb::Record {
            action: action.into(),
        });
        self
    }

    pub fn hangup(mut self) -> Self {
        self.verbs.push(Verb::Hangup);
        self
    }

    pub fn ends_call(&self) -> bool {
        self.verbs.last() == Some(&Verb::Hangup)
    }

    pub fn to_xml(&self) -> String {
        let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8"?><Response>"#);
        for verb in &self.verbs {
            // Writing to a String cannot fail.
            let _ = match verb {
                Verb::Say(text) => write!(xml, "<Say>{}</Say>", escape(text)),
                Verb::Play(url) => write!(xml, "<Play>{}</Play>", escape(url)),
                Verb::Record { action } => write!(
                    xml,
                    r#"<Record action="{}" method="POST" maxLength="{}" timeout="{}" playBeep="false" trim="trim-silence"/>"#,
                    escape(action),
                    MAX_RECORDING_SECS,
                    SILENCE_TIMEOUT_SECS
                ),
                Verb::Hangup => write!(xml, "<Hangup/>"),
            };
        }
        xml.push_str("</Response>");
        xml
    }
}

fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c => escaped.push(c),
        }
    }
    escaped
}
