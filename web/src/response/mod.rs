//! Response bodies that are not entity models.

use chrono::{DateTime, FixedOffset, NaiveDate};
use domain::call_status::CallStatus;
use domain::outbound::{BulkCallResult, BulkCallSummary, TickSummary};
use domain::session::AppointmentStats;
use domain::Id;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct Health {
    pub status: String,
    /// Whether the scheduling agent (rather than the basic agent) answers calls
    pub session_agent: bool,
    pub database_connected: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RemainingSessions {
    #[schema(value_type = Uuid)]
    pub client_id: Id,
    pub sessions_remaining: i32,
    pub package_size: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AvailableSlots {
    #[schema(value_type = Uuid)]
    pub trainer_id: Id,
    #[schema(value_type = String, format = Date)]
    pub date: NaiveDate,
    #[schema(value_type = Vec<String>)]
    pub slots: Vec<DateTime<FixedOffset>>,
}

/// Outcome of one dispatcher pass.
#[derive(Debug, Serialize, ToSchema)]
pub struct DispatchSummary {
    /// Reminder calls dialed
    pub dispatched: usize,
    /// Failed or unanswered calls dialed again
    pub retried: usize,
    pub timed_out: usize,
    pub abandoned: usize,
    pub errors: usize,
}

impl From<TickSummary> for DispatchSummary {
    fn from(summary: TickSummary) -> Self {
        Self {
            dispatched: summary.dispatched,
            retried: summary.retried,
            timed_out: summary.timed_out,
            abandoned: summary.abandoned,
            errors: summary.errors,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BulkCallOutcome {
    /// The phone number or client the call was for
    pub target: String,
    #[schema(value_type = Option<Uuid>)]
    pub call_id: Option<Id>,
    pub status: Option<CallStatus>,
    pub error: Option<String>,
}

/// Per-target results of a bulk call request.
#[derive(Debug, Serialize, ToSchema)]
pub struct BulkCalls {
    pub total: usize,
    pub placed: usize,
    pub failed: usize,
    pub results: Vec<BulkCallOutcome>,
}

impl From<BulkCallSummary> for BulkCalls {
    fn from(summary: BulkCallSummary) -> Self {
        Self {
            total: summary.total,
            placed: summary.placed,
            failed: summary.failed,
            results: summary
                .results
                .into_iter()
                .map(|result: BulkCallResult| BulkCallOutcome {
                    target: result.target,
                    call_id: result.call_id,
                    status: result.status,
                    error: result.error,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionStats {
    pub upcoming_7_days: usize,
    /// Sessions due a reminder call now
    pub reminders_due: usize,
    /// Sessions still to come today, in the business timezone
    pub sessions_today: usize,
    /// Whether the scheduling agent answers calls
    pub session_agent: bool,
}

impl SessionStats {
    pub fn new(stats: AppointmentStats, session_agent: bool) -> Self {
        Self {
            upcoming_7_days: stats.upcoming_7_days,
            reminders_due: stats.reminders_due,
            sessions_today: stats.sessions_today,
            session_agent,
        }
    }
}
