//! Voice webhooks called by Twilio while a call is in progress. Every call-flow endpoint
//! answers with TwiML, including when something fails, so the caller always hears a reply.

use crate::extractors::twilio_form::TwilioForm;
use crate::params::telephony::{CallForm, RecordingForm, SpeechQuery, StatusForm, TurnQuery};
use crate::{AppState, Error};
use axum::extract::{Path, Query, State};
use axum::http::{header::CONTENT_TYPE, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use domain::agent::{AgentContext, ConversationState};
use domain::call_flow;
use domain::gateway::twiml::VoiceResponse;
use domain::Id;

use log::*;

fn twiml(response: VoiceResponse) -> Response {
    ([(CONTENT_TYPE, "application/xml")], response.to_xml()).into_response()
}

/// POST answer an inbound call
#[utoipa::path(
    post,
    path = "/telephony/inbound",
    responses(
        (status = 200, description = "TwiML greeting the caller", content_type = "application/xml"),
        (status = 403, description = "Webhook signature did not match"),
    )
)]
pub async fn inbound(
    State(app_state): State<AppState>,
    TwilioForm(form): TwilioForm<CallForm>,
) -> Response {
    info!("Inbound call {:?}", form.call_sid);

    twiml(call_flow::answer_inbound(
        &app_state.agent,
        &app_state.settings,
        &app_state.voice,
        form.from.as_deref(),
    ))
}

/// POST answer an outbound call placed by the dispatcher
#[utoipa::path(
    post,
    path = "/telephony/outbound/{call_id}",
    params(("call_id" = Uuid, Path, description = "Outbound call id")),
    responses(
        (status = 200, description = "TwiML greeting the callee", content_type = "application/xml"),
        (status = 403, description = "Webhook signature did not match"),
    )
)]
pub async fn outbound(
    State(app_state): State<AppState>,
    Path(call_id): Path<Id>,
    TwilioForm(form): TwilioForm<CallForm>,
) -> Response {
    info!("Outbound call {call_id} answered ({:?})", form.call_sid);

    twiml(
        call_flow::answer_outbound(
            app_state.db_conn_ref(),
            &app_state.settings,
            &app_state.voice,
            call_id,
        )
        .await,
    )
}

/// POST handle one recorded caller utterance
#[utoipa::path(
    post,
    path = "/telephony/turn",
    params(("state" = Option<String>, Query, description = "Encoded conversation state")),
    responses(
        (status = 200, description = "TwiML with the agent's reply", content_type = "application/xml"),
        (status = 403, description = "Webhook signature did not match"),
    )
)]
pub async fn turn(
    State(app_state): State<AppState>,
    Query(query): Query<TurnQuery>,
    TwilioForm(form): TwilioForm<RecordingForm>,
) -> Response {
    let state = match ConversationState::decode(&query.state) {
        Ok(state) => state,
        Err(err) => return twiml(call_flow::fallback(&err)),
    };

    let ctx = AgentContext {
        db: app_state.db_conn_ref(),
        settings: &app_state.settings,
        completion: app_state.voice.completion.as_ref(),
        call_sid: form.call_sid.as_deref(),
        now: Utc::now(),
    };

    twiml(
        call_flow::handle_turn(
            &ctx,
            &app_state.agent,
            &app_state.voice,
            state,
            form.recording_url.as_deref(),
        )
        .await,
    )
}

/// GET synthesized audio for a line of agent speech
#[utoipa::path(
    get,
    path = "/telephony/speech",
    params(
        ("text" = String, Query, description = "Text to speak"),
        ("sig" = Option<String>, Query, description = "Signature over the text, required when TWILIO_AUTH_TOKEN is set"),
    ),
    responses(
        (status = 200, description = "Synthesized audio", content_type = "audio/mpeg"),
        (status = 403, description = "Missing or invalid text signature"),
        (status = 422, description = "Text is empty or too long"),
        (status = 502, description = "Speech provider failed"),
    )
)]
pub async fn speech(
    State(app_state): State<AppState>,
    Query(query): Query<SpeechQuery>,
) -> Result<Response, Error> {
    debug!("GET speech for {} characters", query.text.chars().count());

    if let Some(signer) = app_state.voice.speech_signer.as_deref() {
        let signed = query
            .sig
            .as_deref()
            .is_some_and(|sig| signer.verify(&query.text, sig));
        if !signed {
            warn!("Rejected speech request without a valid signature");
            return Ok(StatusCode::FORBIDDEN.into_response());
        }
    }

    let audio = call_flow::synthesize_speech(&app_state.voice, &query.text).await?;

    Ok(([(CONTENT_TYPE, audio.content_type)], audio.bytes).into_response())
}

/// POST call lifecycle updates for outbound calls
#[utoipa::path(
    post,
    path = "/telephony/status",
    responses(
        (status = 204, description = "Status recorded"),
        (status = 403, description = "Webhook signature did not match"),
    )
)]
pub async fn status(
    State(app_state): State<AppState>,
    TwilioForm(form): TwilioForm<StatusForm>,
) -> Result<impl IntoResponse, Error> {
    debug!("Call {} is now {}", form.call_sid, form.call_status);

    if app_state
        .dispatcher
        .handle_status_callback(&form.call_sid, &form.call_status)
        .await?
        .is_none()
    {
        debug!("Ignoring status for unknown call {}", form.call_sid);
    }

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::router::define_routes;
    use crate::test_support::{app_state, app_state_with, config, voice};
    use axum::body::{to_bytes, Body};
    use axum::http::{header::CONTENT_TYPE, Request, StatusCode};
    use domain::gateway::VoiceServices;
    use provider_auth::webhook::{TwilioSignatureValidator, UrlSigner, SIGNATURE_HEADER};
    use sea_orm::DatabaseConnection;
    use secrecy::SecretString;
    use std::sync::Arc;
    use tower::ServiceExt;
    use voice_ai::traits::{completion, synthesis, telephony, transcription};
    use voice_ai::types::synthesis::Audio;

    const INBOUND_BODY: &str = "CallSid=CA123&From=%2B15555550123";

    fn form_post(uri: &str, body: &'static str) -> Request<Body> {
        Request::post(uri)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn inbound_greets_and_records() {
        let app = define_routes(app_state(DatabaseConnection::Disconnected, config(&[])));

        let response = app
            .oneshot(form_post("/telephony/inbound", INBOUND_BODY))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/xml");
        let xml = body_text(response).await;
        assert!(xml.contains("<Say"));
        assert!(xml.contains("<Record action=\"http://localhost:4000/telephony/turn?state="));
    }

    #[tokio::test]
    async fn inbound_without_a_valid_signature_is_forbidden() {
        let app = define_routes(app_state(
            DatabaseConnection::Disconnected,
            config(&["--twilio-auth-token", "auth-token"]),
        ));

        let response = app
            .oneshot(form_post("/telephony/inbound", INBOUND_BODY))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn inbound_with_a_valid_signature_is_answered() {
        let app = define_routes(app_state(
            DatabaseConnection::Disconnected,
            config(&["--twilio-auth-token", "auth-token"]),
        ));
        let signature = TwilioSignatureValidator::new(SecretString::new("auth-token".to_string()))
            .sign(
                "http://localhost:4000/telephony/inbound",
                INBOUND_BODY.as_bytes(),
            )
            .unwrap();
        let mut request = form_post("/telephony/inbound", INBOUND_BODY);
        request
            .headers_mut()
            .insert(SIGNATURE_HEADER, signature.parse().unwrap());

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn a_garbled_state_hangs_up_with_an_apology() {
        let app = define_routes(app_state(DatabaseConnection::Disconnected, config(&[])));

        let response = app
            .oneshot(form_post(
                "/telephony/turn?state=not-base64!",
                "CallSid=CA123&RecordingUrl=https%3A%2F%2Fapi.twilio.com%2Frec",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let xml = body_text(response).await;
        assert!(xml.contains("<Hangup/>"));
    }

    #[tokio::test]
    async fn a_turn_without_a_recording_asks_again() {
        let app = define_routes(app_state(DatabaseConnection::Disconnected, config(&[])));

        let response = app
            .oneshot(form_post("/telephony/turn", "CallSid=CA123"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let xml = body_text(response).await;
        assert!(xml.contains("<Record"));
        assert!(!xml.contains("<Hangup/>"));
    }

    #[tokio::test]
    async fn speech_returns_synthesized_audio() {
        let mut tts = synthesis::MockProvider::new();
        tts.expect_synthesize().returning(|_| {
            Ok(Audio {
                content_type: "audio/mpeg".to_string(),
                bytes: vec![0xff, 0xfb],
            })
        });
        let voice = voice(
            telephony::MockProvider::new(),
            transcription::MockProvider::new(),
            completion::MockProvider::new(),
            Some(tts),
        );
        let app = define_routes(app_state_with(
            DatabaseConnection::Disconnected,
            config(&[]),
            voice,
        ));

        let response = app
            .oneshot(
                Request::get("/telephony/speech?text=See%20you%20tomorrow")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "audio/mpeg");
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(bytes.as_ref(), &[0xff, 0xfb]);
    }

    fn signed_voice() -> (VoiceServices, Arc<UrlSigner>) {
        let mut tts = synthesis::MockProvider::new();
        tts.expect_synthesize().returning(|_| {
            Ok(Audio {
                content_type: "audio/mpeg".to_string(),
                bytes: vec![0xff, 0xfb],
            })
        });
        let mut voice = voice(
            telephony::MockProvider::new(),
            transcription::MockProvider::new(),
            completion::MockProvider::new(),
            Some(tts),
        );
        let signer = Arc::new(UrlSigner::new(SecretString::new("auth-token".to_string())));
        voice.speech_signer = Some(Arc::clone(&signer));
        (voice, signer)
    }

    #[tokio::test]
    async fn unsigned_speech_text_is_forbidden_when_signing_is_on() {
        let (voice, _) = signed_voice();
        let app = define_routes(app_state_with(
            DatabaseConnection::Disconnected,
            config(&[]),
            voice,
        ));

        let response = app
            .oneshot(
                Request::get("/telephony/speech?text=Buy%20cheap%20watches")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn speech_signed_for_other_text_is_forbidden() {
        let (voice, signer) = signed_voice();
        let signature = signer.sign("See you tomorrow").unwrap();
        let app = define_routes(app_state_with(
            DatabaseConnection::Disconnected,
            config(&[]),
            voice,
        ));

        let response = app
            .oneshot(
                Request::get(format!(
                    "/telephony/speech?text=Buy%20cheap%20watches&sig={signature}"
                ))
                .body(Body::empty())
                .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn signed_speech_text_is_synthesized() {
        let (voice, signer) = signed_voice();
        let signature = signer.sign("See you tomorrow").unwrap();
        let app = define_routes(app_state_with(
            DatabaseConnection::Disconnected,
            config(&[]),
            voice,
        ));

        let response = app
            .oneshot(
                Request::get(format!(
                    "/telephony/speech?text=See%20you%20tomorrow&sig={signature}"
                ))
                .body(Body::empty())
                .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "audio/mpeg");
    }

    #[tokio::test]
    async fn speech_without_a_synthesizer_is_a_server_error() {
        let app = define_routes(app_state(DatabaseConnection::Disconnected, config(&[])));

        let response = app
            .oneshot(
                Request::get("/telephony/speech?text=Hello")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
