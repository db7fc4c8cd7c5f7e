use super::intent::{self, Intent};
use super::{ask_model, prompts, AgentContext, AgentTurn, ConversationState};
use crate::error::Error;

const CLARIFY: &str = "Could you tell me a bit more about what you need?";

/// Customer-service agent: every turn is answered by the language model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BasicAgent;

impl BasicAgent {
    pub async fn handle(
        &self,
        ctx: &AgentContext<'_>,
        state: ConversationState,
        utterance: &str,
    ) -> Result<AgentTurn, Error> {
        if intent::detect_intent(utterance) == Some(Intent::Goodbye) {
            return Ok(AgentTurn::goodbye(prompts::GOODBYE, state));
        }

        let reply = ask_model(ctx, prompts::basic_instructions(), &state.history, utterance)
            .await?
            .unwrap_or_else(|| CLARIFY.to_string());

        Ok(AgentTurn::reply(Intent::General, reply, state))
    }
}
