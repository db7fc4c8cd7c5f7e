//! ElevenLabs text-to-speech client.

use super::{build_client, joined, transport_error};
use crate::error::Error;
use async_trait::async_trait;
use log::*;
use provider_auth::api_key::{ApiKeyAuth, ApiKeyProvider};
use provider_auth::http::{error_for_status, AuthenticatedClient};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use secrecy::SecretString;
use serde::Serialize;
use std::time::Duration;
use voice_ai::traits::synthesis::Provider;
use voice_ai::types::synthesis::{Audio, Request};

const MODEL_ID: &str = "eleven_turbo_v2_5";
const AUDIO_MPEG: &str = "audio/mpeg";

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    model_id: &'a str,
}

pub struct Client {
    client: AuthenticatedClient,
    base_url: String,
    voice_id: String,
}

impl Client {
    pub fn new(
        base_url: &str,
        voice_id: &str,
        api_key: String,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<Self, Error> {
        let auth = ApiKeyAuth::new(ApiKeyProvider::ElevenLabs, SecretString::new(api_key));
        Ok(Self {
            client: build_client(Box::new(auth), timeout, max_retries)?,
            base_url: base_url.to_string(),
            voice_id: voice_id.to_string(),
        })
    }
}

#[async_trait]
impl Provider for Client {
    async fn synthesize(&self, request: Request) -> Result<Audio, voice_ai::Error> {
        let voice_id = request.voice_id.as_deref().unwrap_or(&self.voice_id);
        let url = joined(&self.base_url, &format!("/text-to-speech/{voice_id}"));

        let response = self
            .client
            .post(url)
            .header(ACCEPT, AUDIO_MPEG)
            .json(&SpeechRequest {
                text: &request.text,
                model_id: MODEL_ID,
            })
            .send()
            .await
            .map_err(transport_error)?;
        let response = error_for_status(response).await?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or(AUDIO_MPEG)
            .to_string();
        let bytes = response.bytes().await.map_err(transport_error)?.to_vec();

        debug!(
            "ElevenLabs synthesized {} bytes for {} chars",
            bytes.len(),
            request.text.len()
        );
        Ok(Audio {
            content_type,
            bytes,
        })
    }

    fn provider_id(&self) -> &'static str {
        "elevenlabs"
    }
}
