//! Deepgram pre-recorded speech-to-text client.

use super::{build_client, joined, transport_error};
use crate::error::Error;
use async_trait::async_trait;
use log::*;
use provider_auth::api_key::{ApiKeyAuth, ApiKeyProvider};
use provider_auth::http::{error_for_status, AuthenticatedClient};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use voice_ai::traits::transcription::Provider;
use voice_ai::types::transcription::{Request, Transcript};

#[derive(Debug, Serialize)]
struct ListenRequest<'a> {
    url: &'a str,
}

#[derive(Debug, Deserialize)]
struct ListenResponse {
    results: ListenResults,
}

#[derive(Debug, Deserialize)]
struct ListenResults {
    #[serde(default)]
    channels: Vec<Channel>,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(default)]
    alternatives: Vec<Alternative>,
}

#[derive(Debug, Deserialize)]
struct Alternative {
    #[serde(default)]
    transcript: String,
    #[serde(default)]
    confidence: Option<f64>,
}

pub struct Client {
    client: AuthenticatedClient,
    listen_url: String,
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
        let auth = ApiKeyAuth::new(ApiKeyProvider::Deepgram, SecretString::new(api_key));
        Ok(Self {
            client: build_client(Box::new(auth), timeout, max_retries)?,
            listen_url: joined(base_url, "/listen"),
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl Provider for Client {
    async fn transcribe(&self, request: Request) -> Result<Transcript, voice_ai::Error> {
        let mut query = vec![
            ("model", self.model.as_str()),
            ("smart_format", "true"),
            ("punctuate", "true"),
        ];
        if let Some(language) = request.language_code.as_deref() {
            query.push(("language", language));
        }

        let response = self
            .client
            .post(&self.listen_url)
            .query(&query)
            .json(&ListenRequest {
                url: &request.audio_url,
            })
            .send()
            .await
            .map_err(transport_error)?;
        let response = error_for_status(response).await?;

        let body: ListenResponse = response
            .json()
            .await
            .map_err(|err| voice_ai::Error::Deserialization(err.to_string()))?;

        let transcript = body
            .results
            .channels
            .into_iter()
            .next()
            .and_then(|channel| channel.alternatives.into_iter().next())
            .map(|best| Transcript {
                text: best.transcript.trim().to_string(),
                confidence: best.confidence,
            })
            .unwrap_or(Transcript {
                text: String::new(),
                confidence: None,
            });

        debug!(
            "Deepgram transcribed {} chars (confidence {:?})",
            transcript.text.len(),
            transcript.confidence
        );
        Ok(transcript)
    }

    fn provider_id(&self) -> &'static str {
        "deepgram"
    }
}
