//! Turns telephony webhooks into call instructions.
//!
//! A call is a loop of: speak a line, record the caller, transcribe, ask the agent, speak
//! the reply. The conversation state rides along in the recording callback URL. Anything
//! that fails mid-call is answered with the scripted fallback and a hangup.

use crate::agent::{prompts, AgentContext, AgentKind, ConversationState};
use crate::error::Error;
use crate::gateway::twiml::VoiceResponse;
use crate::gateway::VoiceServices;
use crate::settings::Settings;
use crate::{client, session, Id};
use entity_api::outbound_call;
use log::*;
use sea_orm::DatabaseConnection;
use voice_ai::types::synthesis::{Audio, Request as SynthesisRequest};
use voice_ai::types::transcription::Request as TranscriptionRequest;
use voice_ai::Message;

/// Longest reply the speech endpoint will synthesize.
pub const MAX_SPEECH_CHARS: usize = 1000;

/// Greets an inbound caller and starts recording their first utterance.
pub fn answer_inbound(
    agent: &AgentKind,
    settings: &Settings,
    services: &VoiceServices,
    caller: Option<&str>,
) -> VoiceResponse {
    let caller_phone = caller.and_then(|raw| client::normalize_phone(raw).ok());
    info!(
        "Answering inbound call with the {} agent (caller known: {})",
        agent.name(),
        caller_phone.is_some()
    );

    let mut state = ConversationState::inbound(caller_phone);
    state.history.push(Message::assistant(agent.greeting()));

    speak_and_listen(settings, services, agent.greeting(), &state)
        .unwrap_or_else(|err| fallback(&err))
}

/// Greets the callee of an outbound call according to why the call was placed.
pub async fn answer_outbound(
    db: &DatabaseConnection,
    settings: &Settings,
    services: &VoiceServices,
    call_id: Id,
) -> VoiceResponse {
    match outbound_greeting(db, settings, services, call_id).await {
        Ok(response) => response,
        Err(err) => fallback(&err),
    }
}

async fn outbound_greeting(
    db: &DatabaseConnection,
    settings: &Settings,
    services: &VoiceServices,
    call_id: Id,
) -> Result<VoiceResponse, Error> {
    let call = outbound_call::find_by_id(db, call_id).await?;
    let about = match call.session_id {
        Some(session_id) => match session::find_by_id(db, session_id).await {
            Ok(found) => Some(found),
            Err(err) if err.is_not_found() => None,
            Err(err) => return Err(err),
        },
        None => None,
    };

    let tz = settings.business_hours.timezone();
    let greeting = prompts::outbound_greeting(call.purpose, about.as_ref(), tz);
    info!("Outbound {} call {} answered", call.purpose, call.id);

    let mut state =
        ConversationState::outbound(call.id, call.purpose, call.client_id, call.session_id);
    state.history.push(Message::assistant(greeting.as_str()));

    speak_and_listen(settings, services, &greeting, &state)
}

/// Handles one recorded caller utterance.
pub async fn handle_turn(
    ctx: &AgentContext<'_>,
    agent: &AgentKind,
    services: &VoiceServices,
    state: ConversationState,
    recording_url: Option<&str>,
) -> VoiceResponse {
    match turn(ctx, agent, services, state, recording_url).await {
        Ok(response) => response,
        Err(err) => fallback(&err),
    }
}

async fn turn(
    ctx: &AgentContext<'_>,
    agent: &AgentKind,
    services: &VoiceServices,
    state: ConversationState,
    recording_url: Option<&str>,
) -> Result<VoiceResponse, Error> {
    let Some(audio_url) = recording_url.map(str::trim).filter(|url| !url.is_empty()) else {
        debug!("Turn arrived without a recording");
        return speak_and_listen(ctx.settings, services, prompts::DID_NOT_CATCH, &state);
    };

    let transcript = services
        .transcription
        .transcribe(TranscriptionRequest {
            audio_url: audio_url.to_string(),
            language_code: None,
        })
        .await?;
    if transcript.is_empty() {
        debug!("Caller said nothing intelligible");
        return speak_and_listen(ctx.settings, services, prompts::DID_NOT_CATCH, &state);
    }

    let turn = agent
        .handle_utterance(ctx, state, transcript.text.trim())
        .await?;

    if turn.end_call {
        Ok(speak(ctx.settings, services, VoiceResponse::new(), &turn.reply).hangup())
    } else {
        speak_and_listen(ctx.settings, services, &turn.reply, &turn.state)
    }
}

/// Synthesizes `text` for the telephony provider to play back.
pub async fn synthesize_speech(services: &VoiceServices, text: &str) -> Result<Audio, Error> {
    let text = text.trim();
    if text.is_empty() {
        return Err(Error::validation("Nothing to say"));
    }
    if text.chars().count() > MAX_SPEECH_CHARS {
        return Err(Error::validation(format!(
            "Speech text is limited to {MAX_SPEECH_CHARS} characters"
        )));
    }

    let synthesis = services
        .synthesis
        .as_ref()
        .ok_or_else(|| Error::config("Speech synthesis is not configured"))?;
    Ok(synthesis
        .synthesize(SynthesisRequest {
            text: text.to_string(),
            voice_id: None,
        })
        .await?)
}

fn speak_and_listen(
    settings: &Settings,
    services: &VoiceServices,
    text: &str,
    state: &ConversationState,
) -> Result<VoiceResponse, Error> {
    let action = settings.url_for(&format!("/telephony/turn?state={}", state.encode()?));
    Ok(speak(settings, services, VoiceResponse::new(), text).record(action))
}

fn speak(
    settings: &Settings,
    services: &VoiceServices,
    response: VoiceResponse,
    text: &str,
) -> VoiceResponse {
    if services.synthesis.is_none() {
        return response.say(text);
    }

    let mut path = format!("/telephony/speech?text={}", urlencoding::encode(text));
    if let Some(signer) = services.speech_signer.as_deref() {
        match signer.sign(text) {
            Ok(signature) => path.push_str(&format!("&sig={signature}")),
            Err(err) => {
                warn!("Unable to sign speech URL, using the telephony voice: {err}");
                return response.say(text);
            }
        }
    }
    response.play(settings.url_for(&path))
}

/// Apologises and hangs up. The built-in voice is used since synthesis may be what failed.
pub fn fallback(err: &Error) -> VoiceResponse {
    error!("Call degraded to fallback reply: {err}");
    VoiceResponse::new().say(prompts::FALLBACK_REPLY).hangup()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::test_support::{completion_replying, now, silent_completion};
    use crate::agent::BasicAgent;
    use provider_auth::webhook::UrlSigner;
    use sea_orm::DatabaseConnection;
    use secrecy::SecretString;
    use std::sync::Arc;
    use voice_ai::traits::completion::Provider as CompletionProvider;
    use voice_ai::traits::{synthesis, telephony, transcription};
    use voice_ai::types::transcription::Transcript;

    fn transcribing(text: &'static str) -> transcription::MockProvider {
        let mut stt = transcription::MockProvider::new();
        stt.expect_transcribe().returning(move |_| {
            Ok(Transcript {
                text: text.to_string(),
                confidence: Some(0.9),
            })
        });
        stt.expect_provider_id().return_const("deepgram");
        stt
    }

    fn services(
        transcription: transcription::MockProvider,
        completion: impl CompletionProvider + 'static,
        with_tts: bool,
    ) -> VoiceServices {
        VoiceServices {
            telephony: Arc::new(telephony::MockProvider::new()),
            transcription: Arc::new(transcription),
            synthesis: with_tts
                .then(|| Arc::new(synthesis::MockProvider::new()) as Arc<dyn synthesis::Provider>),
            completion: Arc::new(completion),
            speech_signer: None,
        }
    }

    fn state_in(xml: &str) -> ConversationState {
        let start = xml.find("state=").unwrap() + "state=".len();
        let end = start + xml[start..].find('"').unwrap();
        ConversationState::decode(&xml[start..end]).unwrap()
    }

    #[test]
    fn inbound_call_is_greeted_and_recorded() {
        let settings = Settings::for_tests();
        let services = services(
            transcription::MockProvider::new(),
            silent_completion(),
            false,
        );
        let agent = AgentKind::Session(crate::agent::SessionAgent);

        let xml = answer_inbound(&agent, &settings, &services, Some("(555) 555-0123")).to_xml();

        assert!(xml.contains(&format!("<Say>{}</Say>", prompts::SESSION_GREETING)));
        assert!(xml.contains(r#"<Record action="https://voice.example.com/telephony/turn?state="#));
        let state = state_in(&xml);
        assert_eq!(state.caller_phone.as_deref(), Some("+15555550123"));
        assert_eq!(state.history.len(), 1);
    }

    #[test]
    fn synthesized_replies_are_played_from_the_speech_endpoint() {
        let settings = Settings::for_tests();
        let services = services(
            transcription::MockProvider::new(),
            silent_completion(),
            true,
        );

        let xml = answer_inbound(&AgentKind::Basic(BasicAgent), &settings, &services, None)
            .to_xml();

        assert!(xml.contains("<Play>https://voice.example.com/telephony/speech?text=Hello%21"));
        assert!(!xml.contains("<Say>"));
    }

    #[test]
    fn speech_urls_carry_a_signature_over_the_text() {
        let settings = Settings::for_tests();
        let mut services = services(
            transcription::MockProvider::new(),
            silent_completion(),
            true,
        );
        let signer = UrlSigner::new(SecretString::new("auth-token".to_string()));
        let signature = signer.sign(prompts::BASIC_GREETING).unwrap();
        services.speech_signer = Some(Arc::new(signer));

        let xml = answer_inbound(&AgentKind::Basic(BasicAgent), &settings, &services, None)
            .to_xml();

        assert!(xml.contains(&format!("&amp;sig={signature}</Play>")));
    }

    #[tokio::test]
    async fn silence_asks_the_caller_to_repeat() {
        let db = DatabaseConnection::Disconnected;
        let settings = Settings::for_tests();
        let completion = silent_completion();
        let services = services(transcribing("  "), silent_completion(), false);
        let ctx = AgentContext {
            db: &db,
            settings: &settings,
            completion: &completion,
            call_sid: Some("CA1"),
            now: now(),
        };

        let xml = handle_turn(
            &ctx,
            &AgentKind::Basic(BasicAgent),
            &services,
            ConversationState::default(),
            Some("https://api.twilio.com/recordings/RE1"),
        )
        .await
        .to_xml();

        assert!(xml.contains(prompts::DID_NOT_CATCH));
        assert!(xml.contains("<Record "));
    }

    #[tokio::test]
    async fn a_missing_recording_asks_the_caller_to_repeat() {
        let db = DatabaseConnection::Disconnected;
        let settings = Settings::for_tests();
        let completion = silent_completion();
        let services = services(
            transcription::MockProvider::new(),
            silent_completion(),
            false,
        );
        let ctx = AgentContext {
            db: &db,
            settings: &settings,
            completion: &completion,
            call_sid: None,
            now: now(),
        };

        let xml = handle_turn(
            &ctx,
            &AgentKind::Basic(BasicAgent),
            &services,
            ConversationState::default(),
            None,
        )
        .await
        .to_xml();

        assert!(xml.contains(prompts::DID_NOT_CATCH));
    }

    #[tokio::test]
    async fn the_agent_reply_is_spoken_and_state_carried_forward() {
        let db = DatabaseConnection::Disconnected;
        let settings = Settings::for_tests();
        let completion = completion_replying("Sessions are sixty minutes long.");
        let services = services(
            transcribing("How long is a session?"),
            silent_completion(),
            false,
        );
        let ctx = AgentContext {
            db: &db,
            settings: &settings,
            completion: &completion,
            call_sid: Some("CA1"),
            now: now(),
        };

        let xml = handle_turn(
            &ctx,
            &AgentKind::Basic(BasicAgent),
            &services,
            ConversationState::default(),
            Some("https://api.twilio.com/recordings/RE1"),
        )
        .await
        .to_xml();

        assert!(xml.contains("<Say>Sessions are sixty minutes long.</Say>"));
        let state = state_in(&xml);
        assert_eq!(state.turns, 1);
        assert_eq!(state.history[0], Message::user("How long is a session?"));
    }

    #[tokio::test]
    async fn goodbye_hangs_up() {
        let db = DatabaseConnection::Disconnected;
        let settings = Settings::for_tests();
        let completion = silent_completion();
        let services = services(transcribing("No thanks, bye"), silent_completion(), false);
        let ctx = AgentContext {
            db: &db,
            settings: &settings,
            completion: &completion,
            call_sid: Some("CA1"),
            now: now(),
        };

        let response = handle_turn(
            &ctx,
            &AgentKind::Basic(BasicAgent),
            &services,
            ConversationState::default(),
            Some("https://api.twilio.com/recordings/RE1"),
        )
        .await;

        assert!(response.ends_call());
        assert!(response.to_xml().contains(prompts::GOODBYE));
    }

    #[tokio::test]
    async fn provider_failures_degrade_to_the_fallback_reply() {
        let db = DatabaseConnection::Disconnected;
        let settings = Settings::for_tests();
        let completion = silent_completion();
        let mut stt = transcription::MockProvider::new();
        stt.expect_transcribe()
            .returning(|_| Err(voice_ai::Error::Timeout("deepgram".to_string())));
        let services = services(stt, silent_completion(), true);
        let ctx = AgentContext {
            db: &db,
            settings: &settings,
            completion: &completion,
            call_sid: Some("CA1"),
            now: now(),
        };

        let response = handle_turn(
            &ctx,
            &AgentKind::Basic(BasicAgent),
            &services,
            ConversationState::default(),
            Some("https://api.twilio.com/recordings/RE1"),
        )
        .await;

        assert!(response.ends_call());
        assert!(response
            .to_xml()
            .contains(&format!("<Say>{}</Say>", prompts::FALLBACK_REPLY.replace('\'', "&apos;"))));
    }

    #[tokio::test]
    async fn speech_requires_text_and_a_synthesizer() {
        let services = services(
            transcription::MockProvider::new(),
            silent_completion(),
            false,
        );

        assert!(synthesize_speech(&services, "   ")
            .await
            .unwrap_err()
            .is_validation());
        assert!(synthesize_speech(&services, "Hello")
            .await
            .is_err());
    }
}
