//! OpenAI chat completions client.

use super::{build_client, joined, transport_error};
use crate::error::Error;
use async_trait::async_trait;
use log::*;
use provider_auth::api_key::{ApiKeyProvider, BearerTokenAuth};
use provider_auth::http::{error_for_status, AuthenticatedClient};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use voice_ai::traits::completion::Provider;
use voice_ai::types::completion::{Completion, Request};
use voice_ai::Message;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct Client {
    client: AuthenticatedClient,
    completions_url: String,
    model: String,
}

impl Client {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: String,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<Self, Error> {
        let auth = BearerTokenAuth::new(ApiKeyProvider::OpenAi, SecretString::new(api_key));
        Ok(Self {
            client: build_client(Box::new(auth), timeout, max_retries)?,
            completions_url: joined(base_url, "/chat/completions"),
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl Provider for Client {
    async fn complete(&self, request: Request) -> Result<Completion, voice_ai::Error> {
        let response = self
            .client
            .post(&self.completions_url)
            .json(&ChatRequest {
                model: &self.model,
                messages: &request.messages,
                temperature: request.temperature,
                max_tokens: request.max_tokens,
            })
            .send()
            .await
            .map_err(transport_error)?;
        let response = error_for_status(response).await?;

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|err| voice_ai::Error::Deserialization(err.to_string()))?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                warn!("OpenAI returned no choices");
                voice_ai::Error::Deserialization("completion has no choices".to_string())
            })?;

        Ok(Completion {
            content,
            model: body.model,
        })
    }

    fn provider_id(&self) -> &'static str {
        "openai"
    }
}
