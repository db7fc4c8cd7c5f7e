//! Stand-in for a provider whose credentials are missing.

use async_trait::async_trait;
use voice_ai::types::call::{DialRequest, DialedCall};
use voice_ai::types::completion::{Completion, Request as CompletionRequest};
use voice_ai::types::transcription::{Request as TranscriptionRequest, Transcript};
use voice_ai::{traits, Error};

#[derive(Debug, Clone, Copy)]
pub struct Provider {
    name: &'static str,
}

impl Provider {
    pub fn new(name: &'static str) -> Self {
        Self { name }
    }

    fn missing(&self) -> Error {
        Error::Configuration(format!("{} credentials are not configured", self.name))
    }
}

#[async_trait]
impl traits::telephony::Provider for Provider {
    async fn place_call(&self, _request: DialRequest) -> Result<DialedCall, Error> {
        Err(self.missing())
    }

    fn provider_id(&self) -> &'static str {
        self.name
    }
}

#[async_trait]
impl traits::transcription::Provider for Provider {
    async fn transcribe(&self, _request: TranscriptionRequest) -> Result<Transcript, Error> {
        Err(self.missing())
    }

    fn provider_id(&self) -> &'static str {
        self.name
    }
}

#[async_trait]
impl traits::completion::Provider for Provider {
    async fn complete(&self, _request: CompletionRequest) -> Result<Completion, Error> {
        Err(self.missing())
    }

    fn provider_id(&self) -> &'static str {
        self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use traits::completion::Provider as _;

    #[tokio::test]
    async fn every_call_is_a_configuration_error() {
        let provider = Provider::new("openai");
        let err = provider
            .complete(CompletionRequest::new(vec![]))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Configuration(ref msg) if msg.contains("openai")));
    }
}
