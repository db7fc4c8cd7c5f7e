//! Scheduling rules, the conversational agent, outbound dispatch and call flow.
//!
//! Entity types are re-exported from `entity_api` so that consumers of the `domain` crate
//! (chiefly `web`) never depend on the entity layer directly.
pub use entity_api::{
    call_purpose, call_status, clients, outbound_calls, session_status, sessions, trainers, Id,
};

pub mod agent;
pub mod call_flow;
pub mod client;
pub mod error;
pub mod gateway;
pub mod outbound;
pub mod retry;
pub mod scheduling;
pub mod session;
pub mod settings;

/// Parses an id received from an outer layer (path segment, query parameter).
pub fn parse_id(id: &str) -> Result<Id, error::Error> {
    Ok(entity_api::parse_id(id)?)
}
