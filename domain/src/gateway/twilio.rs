//! Twilio programmable voice client for placing outbound calls.

use super::{build_client, joined, transport_error};
use crate::error::Error;
use async_trait::async_trait;
use log::*;
use provider_auth::api_key::{ApiKeyProvider, BasicAuth};
use provider_auth::http::{error_for_status, AuthenticatedClient};
use secrecy::SecretString;
use serde::Deserialize;
use std::time::Duration;
use voice_ai::traits::telephony::Provider;
use voice_ai::types::call::{DialRequest, DialedCall, Status};

/// Progress events Twilio should post to the status callback.
const STATUS_EVENTS: [&str; 4] = ["initiated", "ringing", "answered", "completed"];

/// Subset of Twilio's Call resource that the dispatcher cares about.
#[derive(Debug, Deserialize)]
struct CallResource {
    sid: String,
    #[serde(default)]
    status: Option<String>,
}

pub struct Client {
    client: AuthenticatedClient,
    calls_url: String,
}

impl Client {
    /// Placing a call is a write, so the client never retries.
    pub fn new(
        base_url: &str,
        account_sid: String,
        auth_token: String,
        timeout: Duration,
    ) -> Result<Self, Error> {
        let calls_url = joined(base_url, &format!("/Accounts/{account_sid}/Calls.json"));
        let auth = BasicAuth::new(
            ApiKeyProvider::Twilio,
            account_sid,
            SecretString::new(auth_token),
        );

        Ok(Self {
            client: build_client(Box::new(auth), timeout, 0)?,
            calls_url,
        })
    }
}

#[async_trait]
impl Provider for Client {
    async fn place_call(&self, request: DialRequest) -> Result<DialedCall, voice_ai::Error> {
        let mut form: Vec<(&str, &str)> = vec![
            ("To", request.to.as_str()),
            ("From", request.from.as_str()),
            ("Url", request.answer_url.as_str()),
            ("Method", "POST"),
            ("StatusCallback", request.status_callback_url.as_str()),
            ("StatusCallbackMethod", "POST"),
        ];
        form.extend(STATUS_EVENTS.iter().map(|event| ("StatusCallbackEvent", *event)));

        let response = self
            .client
            .post(&self.calls_url)
            .form(&form)
            .send()
            .await
            .map_err(transport_error)?;
        let response = error_for_status(response).await.map_err(|err| {
            warn!("Twilio rejected call to {}: {err}", request.to);
            voice_ai::Error::from(err)
        })?;

        let call: CallResource = response
            .json()
            .await
            .map_err(|err| voice_ai::Error::Deserialization(err.to_string()))?;
        let status = call
            .status
            .as_deref()
            .and_then(Status::parse)
            .unwrap_or(Status::Queued);

        info!("Twilio queued call {} to {}", call.sid, request.to);
        Ok(DialedCall {
            call_sid: call.sid,
            status,
        })
    }

    fn provider_id(&self) -> &'static str {
        "twilio"
    }
}
