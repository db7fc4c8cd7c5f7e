//! This module holds typed parameters for various endpoint inputs.
//!
//! By using typed parameters, inputs are validated (by type) and correctly formatted before
//! they are processed by the domain layer. Query parameters derive `IntoParams`, request
//! bodies derive `ToSchema`, so both show up in the OpenAPI document.

pub(crate) mod client;
pub(crate) mod outbound_call;
pub(crate) mod session;
pub(crate) mod telephony;
pub(crate) mod trainer;
