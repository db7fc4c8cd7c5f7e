use uuid::Uuid;

pub mod clients;
pub mod outbound_calls;
pub mod sessions;
pub mod trainers;

pub mod call_purpose;
pub mod call_status;
pub mod session_status;

/// A type alias that represents any Entity's internal id field data type.
/// Aliased so that it's easy to change the underlying type if necessary.
pub type Id = Uuid;
