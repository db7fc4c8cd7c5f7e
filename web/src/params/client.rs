use domain::client::NewClient;
use domain::Id;
use serde::Deserialize;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
#[schema(as = client::CreateParams)]
pub(crate) struct CreateParams {
    pub(crate) name: String,
    /// Any common format; stored normalized as +<digits>
    pub(crate) phone: String,
    pub(crate) email: Option<String>,
    #[serde(default)]
    pub(crate) notes: String,
    #[schema(value_type = Option<Uuid>)]
    pub(crate) trainer_id: Option<Id>,
    /// Sessions in the client's first package
    #[serde(default)]
    pub(crate) package_size: i32,
}

impl From<CreateParams> for NewClient {
    fn from(params: CreateParams) -> Self {
        NewClient {
            name: params.name,
            phone: params.phone,
            email: params.email,
            notes: params.notes,
            trainer_id: params.trainer_id,
            package_size: params.package_size,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub(crate) struct PackageParams {
    /// Sessions to add to the client's remaining balance
    pub(crate) sessions: i32,
}
