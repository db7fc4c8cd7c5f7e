//! The conversational agent that answers callers.
//!
//! Two variants exist. [`SessionAgent`] understands scheduling requests and carries them
//! out through the session manager, falling back to the language model for anything else.
//! [`BasicAgent`] hands every turn to the language model with a customer-service prompt.
//! Which one answers is decided once at startup.

use crate::error::Error;
use crate::settings::Settings;
use chrono::{DateTime, Utc};
use log::*;
use sea_orm::DatabaseConnection;
use voice_ai::traits::completion::Provider as CompletionProvider;
use voice_ai::types::completion::Request;
use voice_ai::Message;

pub mod basic;
pub mod intent;
pub mod prompts;
pub mod session;
pub mod state;

pub use basic::BasicAgent;
pub use intent::Intent;
pub use session::SessionAgent;
pub use state::ConversationState;

/// Turns after which the assistant wraps the call up.
const MAX_TURNS: u32 = 20;

/// What the agent needs to answer one turn.
pub struct AgentContext<'a> {
    pub db: &'a DatabaseConnection,
    pub settings: &'a Settings,
    pub completion: &'a dyn CompletionProvider,
    /// Provider call id, used to make bookings made during this turn idempotent.
    pub call_sid: Option<&'a str>,
    pub now: DateTime<Utc>,
}

/// The agent's answer to one caller utterance.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentTurn {
    pub intent: Intent,
    pub reply: String,
    pub state: ConversationState,
    pub end_call: bool,
}

impl AgentTurn {
    pub(crate) fn reply(intent: Intent, reply: impl Into<String>, state: ConversationState) -> Self {
        Self {
            intent,
            reply: reply.into(),
            state,
            end_call: false,
        }
    }

    pub(crate) fn goodbye(reply: impl Into<String>, state: ConversationState) -> Self {
        Self {
            intent: Intent::Goodbye,
            reply: reply.into(),
            state,
            end_call: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentKind {
    Session(SessionAgent),
    Basic(BasicAgent),
}

impl AgentKind {
    pub fn from_settings(settings: &Settings) -> Self {
        if settings.use_session_agent {
            AgentKind::Session(SessionAgent)
        } else {
            AgentKind::Basic(BasicAgent)
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AgentKind::Session(_) => "session",
            AgentKind::Basic(_) => "basic",
        }
    }

    /// First line spoken on an inbound call.
    pub fn greeting(&self) -> &'static str {
        match self {
            AgentKind::Session(_) => prompts::SESSION_GREETING,
            AgentKind::Basic(_) => prompts::BASIC_GREETING,
        }
    }

    /// Answers one caller utterance. Errors are left to the caller, which speaks the
    /// scripted fallback and hangs up.
    pub async fn handle_utterance(
        &self,
        ctx: &AgentContext<'_>,
        mut state: ConversationState,
        utterance: &str,
    ) -> Result<AgentTurn, Error> {
        state.turns += 1;
        if state.turns > MAX_TURNS {
            info!("Ending call after {MAX_TURNS} turns");
            return Ok(AgentTurn::goodbye(prompts::GOODBYE, state));
        }

        let mut turn = match self {
            AgentKind::Session(agent) => agent.handle(ctx, state, utterance).await?,
            AgentKind::Basic(agent) => agent.handle(ctx, state, utterance).await?,
        };
        debug!("Agent turn: intent={}, end_call={}", turn.intent, turn.end_call);

        turn.state.remember(utterance, &turn.reply);
        Ok(turn)
    }
}

/// Asks the language model for the next reply given the system prompt and recent history.
/// Returns `None` when the model answered with nothing usable.
pub(crate) async fn ask_model(
    ctx: &AgentContext<'_>,
    instructions: &str,
    history: &[Message],
    utterance: &str,
) -> Result<Option<String>, Error> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(Message::system(instructions));
    messages.extend(history.iter().cloned());
    messages.push(Message::user(utterance));

    let completion = ctx.completion.complete(Request::new(messages)).await?;
    debug!(
        "{} answered with model {:?}",
        ctx.completion.provider_id(),
        completion.model
    );

    let reply = completion.content.trim();
    Ok((!reply.is_empty()).then(|| reply.to_string()))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use voice_ai::traits::completion::MockProvider;
    use voice_ai::types::completion::Completion;

    pub fn completion_replying(content: &'static str) -> MockProvider {
        let mut completion = MockProvider::new();
        completion.expect_complete().returning(move |_| {
            Ok(Completion {
                content: content.to_string(),
                model: Some("gpt-4o-mini".to_string()),
            })
        });
        completion.expect_provider_id().return_const("openai");
        completion
    }

    pub fn silent_completion() -> MockProvider {
        let mut completion = MockProvider::new();
        completion.expect_complete().never();
        completion.expect_provider_id().return_const("openai");
        completion
    }

    /// A Sunday morning in New York.
    pub fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2030-09-15T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn agent_is_chosen_from_settings() {
        let mut settings = Settings::for_tests();
        assert_eq!(AgentKind::from_settings(&settings).name(), "session");

        settings.use_session_agent = false;
        let agent = AgentKind::from_settings(&settings);
        assert_eq!(agent, AgentKind::Basic(BasicAgent));
        assert_eq!(agent.greeting(), prompts::BASIC_GREETING);
    }

    #[tokio::test]
    async fn long_calls_are_wrapped_up() -> Result<(), Error> {
        let db = DatabaseConnection::Disconnected;
        let settings = Settings::for_tests();
        let completion = silent_completion();
        let ctx = AgentContext {
            db: &db,
            settings: &settings,
            completion: &completion,
            call_sid: None,
            now: now(),
        };
        let state = ConversationState {
            turns: MAX_TURNS,
            ..Default::default()
        };

        let turn = AgentKind::Session(SessionAgent)
            .handle_utterance(&ctx, state, "and another thing")
            .await?;

        assert!(turn.end_call);
        assert_eq!(turn.reply, prompts::GOODBYE);
        Ok(())
    }

    #[tokio::test]
    async fn each_turn_is_remembered() -> Result<(), Error> {
        let db = DatabaseConnection::Disconnected;
        let settings = Settings::for_tests();
        let completion = completion_replying("We're open every day from nine to six.");
        let ctx = AgentContext {
            db: &db,
            settings: &settings,
            completion: &completion,
            call_sid: None,
            now: now(),
        };

        let turn = AgentKind::Basic(BasicAgent)
            .handle_utterance(&ctx, ConversationState::default(), "When are you open?")
            .await?;

        assert_eq!(turn.state.turns, 1);
        assert_eq!(turn.state.history.len(), 2);
        assert_eq!(turn.state.history[0], Message::user("When are you open?"));
        Ok(())
    }
}
