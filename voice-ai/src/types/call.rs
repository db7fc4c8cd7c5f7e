//! Types for telephony operations.

use serde::{Deserialize, Serialize};

/// Call progress as reported by the telephony provider.
///
/// Calls move Queued → Initiated → Ringing → InProgress and end in exactly one of
/// Completed, Busy, Failed, NoAnswer or Canceled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    Queued,
    Initiated,
    Ringing,
    InProgress,
    Completed,
    Busy,
    Failed,
    NoAnswer,
    Canceled,
}

impl Status {
    /// Parses the provider's status string (`"no-answer"`, `"in-progress"`, ...).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "queued" => Some(Status::Queued),
            "initiated" => Some(Status::Initiated),
            "ringing" => Some(Status::Ringing),
            "in-progress" => Some(Status::InProgress),
            "completed" => Some(Status::Completed),
            "busy" => Some(Status::Busy),
            "failed" => Some(Status::Failed),
            "no-answer" => Some(Status::NoAnswer),
            "canceled" => Some(Status::Canceled),
            _ => None,
        }
    }

    /// Final statuses; nothing follows them for the same call.
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            Status::Completed | Status::Busy | Status::Failed | Status::NoAnswer | Status::Canceled
        )
    }
}

/// Everything the provider needs to place an outbound call.
///
/// `answer_url` is fetched by the provider once the callee picks up; it must return
/// call instructions. `status_callback_url` receives progress updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialRequest {
    pub to: String,
    pub from: String,
    pub answer_url: String,
    pub status_callback_url: String,
}

/// The provider's acknowledgement of a dial request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialedCall {
    pub call_sid: String,
    pub status: Status,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_provider_spelling() {
        assert_eq!(Status::parse("no-answer"), Some(Status::NoAnswer));
        assert_eq!(Status::parse("In-Progress"), Some(Status::InProgress));
        assert_eq!(Status::parse("answered"), None);
    }

    #[test]
    fn ringing_is_not_final() {
        assert!(!Status::Ringing.is_final());
        assert!(Status::Busy.is_final());
    }
}
