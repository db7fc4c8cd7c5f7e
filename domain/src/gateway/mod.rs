//! Clients for the external voice providers.
//!
//! Each provider implements one of the `voice_ai` traits. [`VoiceServices`] wires them up
//! from configuration once at startup; a provider without credentials is replaced by
//! [`unconfigured`] so calls fail with a configuration error instead of at boot.

use crate::error::Error;
use log::*;
use provider_auth::api_key::ProviderAuth;
use provider_auth::http::{AuthenticatedClient, AuthenticatedClientBuilder};
use provider_auth::webhook::UrlSigner;
use secrecy::SecretString;
use service::config::Config;
use std::sync::Arc;
use std::time::Duration;
use voice_ai::traits::completion::Provider as CompletionProvider;
use voice_ai::traits::synthesis::Provider as SynthesisProvider;
use voice_ai::traits::telephony::Provider as TelephonyProvider;
use voice_ai::traits::transcription::Provider as TranscriptionProvider;

pub mod deepgram;
pub mod elevenlabs;
pub mod openai;
pub mod twilio;
pub mod twiml;
pub mod unconfigured;

/// The providers a call needs, shared across requests.
#[derive(Clone)]
pub struct VoiceServices {
    pub telephony: Arc<dyn TelephonyProvider>,
    pub transcription: Arc<dyn TranscriptionProvider>,
    /// Replies are spoken by the telephony provider's own voice when this is `None`.
    pub synthesis: Option<Arc<dyn SynthesisProvider>>,
    pub completion: Arc<dyn CompletionProvider>,
    /// Signs the text in synthesized speech URLs. Keyed with the Twilio auth token.
    pub speech_signer: Option<Arc<UrlSigner>>,
}

impl VoiceServices {
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let timeout = Duration::from_secs(config.provider_timeout_secs);
        let retries = config.provider_max_retries;

        let telephony: Arc<dyn TelephonyProvider> =
            match (config.twilio_account_sid(), config.twilio_auth_token()) {
                (Some(account_sid), Some(auth_token)) => Arc::new(twilio::Client::new(
                    config.twilio_base_url(),
                    account_sid,
                    auth_token,
                    timeout,
                )?),
                _ => {
                    warn!("Twilio credentials are not set; outbound calls will fail");
                    Arc::new(unconfigured::Provider::new("twilio"))
                }
            };

        let transcription: Arc<dyn TranscriptionProvider> = match config.deepgram_api_key() {
            Some(api_key) => Arc::new(deepgram::Client::new(
                config.deepgram_base_url(),
                config.deepgram_model(),
                api_key,
                timeout,
                retries,
            )?),
            None => {
                warn!("DEEPGRAM_API_KEY is not set; caller speech cannot be transcribed");
                Arc::new(unconfigured::Provider::new("deepgram"))
            }
        };

        let synthesis: Option<Arc<dyn SynthesisProvider>> = match config.elevenlabs_api_key() {
            Some(api_key) => Some(Arc::new(elevenlabs::Client::new(
                config.elevenlabs_base_url(),
                config.elevenlabs_voice_id(),
                api_key,
                timeout,
                retries,
            )?)),
            None => {
                info!("ELEVENLABS_API_KEY is not set; replies use the telephony voice");
                None
            }
        };

        let completion: Arc<dyn CompletionProvider> = match config.openai_api_key() {
            Some(api_key) => Arc::new(openai::Client::new(
                config.openai_base_url(),
                config.openai_model(),
                api_key,
                timeout,
                retries,
            )?),
            None => {
                warn!("OPENAI_API_KEY is not set; open questions cannot be answered");
                Arc::new(unconfigured::Provider::new("openai"))
            }
        };

        let speech_signer = config
            .twilio_auth_token()
            .map(|token| Arc::new(UrlSigner::new(SecretString::new(token))));
        if synthesis.is_some() && speech_signer.is_none() {
            warn!("TWILIO_AUTH_TOKEN is not set; speech URLs are not signed");
        }

        Ok(Self {
            telephony,
            transcription,
            synthesis,
            completion,
            speech_signer,
        })
    }
}

/// Builds a provider client or reports which provider was misconfigured.
fn build_client(
    auth: Box<dyn ProviderAuth>,
    timeout: Duration,
    max_retries: u32,
) -> Result<AuthenticatedClient, Error> {
    let provider = auth.provider().as_str();
    AuthenticatedClientBuilder::new()
        .with_auth(auth)
        .with_timeout(timeout)
        .with_max_retries(max_retries)
        .build()
        .map_err(|err| {
            warn!("Failed to build {provider} client: {err}");
            Error::config(format!("{provider}: {err}"))
        })
}

/// Maps a transport failure from the middleware stack onto the provider error taxonomy.
fn transport_error<E>(err: E) -> voice_ai::Error
where
    provider_auth::Error: From<E>,
{
    voice_ai::Error::from(provider_auth::Error::from(err))
}

fn joined(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}
