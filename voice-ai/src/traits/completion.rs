//! LLM completion provider trait.

use crate::types::completion::{Completion, Request};
use crate::Error;
use async_trait::async_trait;

/// Abstraction for chat-completion LLMs.
///
/// The conversation agent only ever needs a single assistant reply per turn, so there is
/// no streaming variant.
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait Provider: Send + Sync {
    /// Produce the next assistant message for `request.messages`.
    async fn complete(&self, request: Request) -> std::result::Result<Completion, Error>;

    /// Return unique identifier for this provider (e.g., "openai").
    fn provider_id(&self) -> &'static str;
}
