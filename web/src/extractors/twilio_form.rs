use axum::{
    body::{to_bytes, Body},
    extract::{FromRef, FromRequest, Request},
    http::StatusCode,
    Form,
};
use provider_auth::webhook::{WebhookRequest, WebhookValidator};
use serde::de::DeserializeOwned;
use std::collections::HashMap;

use crate::{extractors::RejectionType, AppState};
use log::*;

/// Telephony webhooks are small form posts.
const MAX_WEBHOOK_BYTES: usize = 64 * 1024;

/// Form body of a telephony webhook, accepted only when its Twilio signature checks out
/// (or when signature validation is turned off).
pub(crate) struct TwilioForm<T>(pub T);

impl<S, T> FromRequest<S> for TwilioForm<T>
where
    AppState: FromRef<S>,
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = RejectionType;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let (parts, body) = req.into_parts();
        let bytes = to_bytes(body, MAX_WEBHOOK_BYTES).await.map_err(|_| {
            (
                StatusCode::PAYLOAD_TOO_LARGE,
                "Webhook body is too large".to_string(),
            )
        })?;

        if let Some(validator) = app_state.signature_validator.as_deref() {
            // Twilio signs the public URL it requested, which is our base URL plus the path.
            let path = parts
                .uri
                .path_and_query()
                .map(|path_and_query| path_and_query.as_str())
                .unwrap_or("/");
            let url = app_state.settings.url_for(path);
            let headers: HashMap<String, String> = parts
                .headers
                .iter()
                .filter_map(|(name, value)| {
                    value
                        .to_str()
                        .ok()
                        .map(|value| (name.as_str().to_string(), value.to_string()))
                })
                .collect();

            let request = WebhookRequest {
                url: &url,
                headers: &headers,
                body: &bytes,
            };
            match validator.validate(&request) {
                Ok(true) => {}
                Ok(false) => {
                    warn!("Rejected telephony webhook for {path}: signature mismatch");
                    return Err((StatusCode::FORBIDDEN, "Invalid signature".to_string()));
                }
                Err(err) => {
                    warn!("Rejected telephony webhook for {path}: {err}");
                    return Err((StatusCode::FORBIDDEN, "Invalid signature".to_string()));
                }
            }
        }

        let req = Request::from_parts(parts, Body::from(bytes));
        let Form(value) = Form::<T>::from_request(req, state)
            .await
            .map_err(|rejection| (rejection.status(), rejection.body_text()))?;

        Ok(TwilioForm(value))
    }
}
