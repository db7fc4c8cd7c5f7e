//! Conversation state carried between webhook turns.
//!
//! Nothing about a call is kept in the server: the state travels in the `state` query
//! parameter of the next turn URL as URL-safe base64 JSON.

use super::intent::{Extracted, Intent, TimeHint};
use crate::call_purpose::CallPurpose;
use crate::error::Error;
use crate::Id;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use voice_ai::Message;

/// Messages of history replayed to the language model.
const MAX_HISTORY: usize = 6;
/// Longest message kept in history, in characters.
const MAX_HISTORY_CHARS: usize = 280;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationState {
    /// Outbound call record this conversation belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purpose: Option<CallPurpose>,
    /// Number the call is connected to, as reported by the telephony provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caller_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<Id>,
    /// Session the conversation is about, e.g. the one a reminder call was placed for.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<Id>,
    /// Request still being filled in over several turns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending: Option<Intent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<TimeHint>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<Message>,
    pub turns: u32,
}

impl ConversationState {
    pub fn inbound(caller_phone: Option<String>) -> Self {
        Self {
            caller_phone,
            ..Default::default()
        }
    }

    pub fn outbound(
        call_id: Id,
        purpose: CallPurpose,
        client_id: Option<Id>,
        session_id: Option<Id>,
    ) -> Self {
        Self {
            call_id: Some(call_id),
            purpose: Some(purpose),
            client_id,
            session_id,
            ..Default::default()
        }
    }

    pub fn encode(&self) -> Result<String, Error> {
        let json = serde_json::to_vec(self)
            .map_err(|err| Error::config(format!("Unable to serialize conversation state: {err}")))?;
        Ok(URL_SAFE_NO_PAD.encode(json))
    }

    /// Decodes a state produced by [`ConversationState::encode`]. An empty string is a new
    /// conversation.
    pub fn decode(encoded: &str) -> Result<Self, Error> {
        let encoded = encoded.trim();
        if encoded.is_empty() {
            return Ok(Self::default());
        }

        let bytes = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|_| Error::validation("Conversation state is not valid base64"))?;
        serde_json::from_slice(&bytes)
            .map_err(|_| Error::validation("Conversation state is not valid JSON"))
    }

    /// Copies any slots recognised in the latest utterance over the stored ones.
    pub fn absorb(&mut self, extracted: &Extracted) {
        if let Some(name) = &extracted.name {
            self.name = Some(name.clone());
        }
        if let Some(phone) = &extracted.phone {
            self.phone = Some(phone.clone());
        }
        if let Some(date) = extracted.date {
            self.date = Some(date);
        }
        if let Some(time) = extracted.time {
            self.time = Some(time);
        }
    }

    /// Forgets the request in progress once it has been carried out.
    pub fn finish_request(&mut self) {
        self.pending = None;
        self.date = None;
        self.time = None;
    }

    /// Phone number to identify the caller by: one they said, else the one they called from.
    pub fn lookup_phone(&self) -> Option<&str> {
        self.phone.as_deref().or(self.caller_phone.as_deref())
    }

    pub fn remember(&mut self, utterance: &str, reply: &str) {
        self.history.push(Message::user(truncate(utterance)));
        self.history.push(Message::assistant(truncate(reply)));
        if self.history.len() > MAX_HISTORY {
            let excess = self.history.len() - MAX_HISTORY;
            self.history.drain(..excess);
        }
    }
}

fn truncate(text: &str) -> String {
    text.chars().take(MAX_HISTORY_CHARS).collect()
}
