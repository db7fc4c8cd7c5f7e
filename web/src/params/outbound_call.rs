use domain::call_purpose::CallPurpose;
use domain::outbound::CallTarget;
use domain::Id;
use serde::Deserialize;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub(crate) struct TestCallParams {
    pub(crate) phone_number: String,
    /// `scheduling` or `follow_up`
    #[serde(default = "default_call_type")]
    pub(crate) call_type: CallPurpose,
    #[schema(value_type = Option<Uuid>)]
    pub(crate) client_id: Option<Id>,
}

/// Calls to place in one request. Client ids are dialed at the phone number on file.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub(crate) struct BulkCallParams {
    #[serde(default)]
    pub(crate) phone_numbers: Vec<String>,
    #[serde(default)]
    #[schema(value_type = Vec<Uuid>)]
    pub(crate) client_ids: Vec<Id>,
    /// `scheduling` or `follow_up`
    #[serde(default = "default_bulk_call_type")]
    pub(crate) call_type: CallPurpose,
}

impl BulkCallParams {
    pub(crate) fn into_targets(self) -> (CallPurpose, Vec<CallTarget>) {
        let targets = self
            .client_ids
            .into_iter()
            .map(CallTarget::Client)
            .chain(self.phone_numbers.into_iter().map(CallTarget::Phone))
            .collect();
        (self.call_type, targets)
    }
}

fn default_bulk_call_type() -> CallPurpose {
    CallPurpose::FollowUp
}

fn default_call_type() -> CallPurpose {
    CallPurpose::Scheduling
}
