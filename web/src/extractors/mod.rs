pub(crate) mod twilio_form;

use axum::http::StatusCode;

type RejectionType = (StatusCode, String);
