use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::IntoParams;

#[derive(Debug, Deserialize, IntoParams)]
pub(crate) struct AvailableSlotsParams {
    /// Local date in the business timezone, YYYY-MM-DD
    pub(crate) date: NaiveDate,
}
