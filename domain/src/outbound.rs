//! Outbound calls: reminder dispatch, retries and provider status callbacks.
//!
//! Each call record moves `pending -> dialing -> {completed, failed, no_answer}`. Failed and
//! unanswered calls are dialed again after a fixed backoff until the attempt budget is
//! spent, at which point the record is `abandoned` and never retried. A dial only queues
//! the call with the provider; how it ended arrives later on the status webhook.

use crate::call_purpose::CallPurpose;
use crate::call_status::CallStatus;
use crate::error::Error;
use crate::outbound_calls::Model as Call;
use crate::session_status::SessionStatus;
use crate::settings::Settings;
use crate::sessions::Model as Session;
use crate::{client, session, Id};
use chrono::{DateTime, Utc};
use entity_api::outbound_call::{self, Outcome};
use log::*;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use voice_ai::traits::telephony::Provider as TelephonyProvider;
use voice_ai::types::call::{DialRequest, Status as ProviderStatus};

/// Something that happened to a call record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallEvent {
    /// The provider accepted a dial request.
    Dialed,
    /// The provider rejected the dial request outright.
    DialRejected,
    Completed,
    Failed,
    NoAnswer,
    /// No final status arrived within the call timeout.
    TimedOut,
}

/// Pure transition function for call records.
///
/// `attempts` is the number of dials made so far, including the one this event is about.
/// Events that don't apply to `current` leave it unchanged, and terminal statuses never move.
pub fn next_status(
    current: CallStatus,
    event: CallEvent,
    attempts: i32,
    max_attempts: i32,
) -> CallStatus {
    let exhausted = attempts >= max_attempts;
    let unsuccessful = |status| if exhausted { CallStatus::Abandoned } else { status };

    match (current, event) {
        (CallStatus::Completed | CallStatus::Abandoned, _) => current,
        (CallStatus::Pending | CallStatus::Failed | CallStatus::NoAnswer, CallEvent::Dialed) => {
            CallStatus::Dialing
        }
        (
            CallStatus::Pending | CallStatus::Failed | CallStatus::NoAnswer,
            CallEvent::DialRejected,
        ) => unsuccessful(CallStatus::Failed),
        (CallStatus::Dialing, CallEvent::Completed) => CallStatus::Completed,
        (CallStatus::Dialing, CallEvent::Failed | CallEvent::TimedOut) => {
            unsuccessful(CallStatus::Failed)
        }
        (CallStatus::Dialing, CallEvent::NoAnswer) => unsuccessful(CallStatus::NoAnswer),
        _ => current,
    }
}

/// Maps a provider status onto a call event. Progress statuses (queued, ringing,
/// in-progress) map to `None`.
pub fn map_provider_status(status: ProviderStatus) -> Option<CallEvent> {
    match status {
        ProviderStatus::Completed => Some(CallEvent::Completed),
        ProviderStatus::Busy | ProviderStatus::Failed | ProviderStatus::Canceled => {
            Some(CallEvent::Failed)
        }
        ProviderStatus::NoAnswer => Some(CallEvent::NoAnswer),
        ProviderStatus::Queued
        | ProviderStatus::Initiated
        | ProviderStatus::Ringing
        | ProviderStatus::InProgress => None,
    }
}

/// What one dispatcher pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickSummary {
    /// Reminder calls placed for sessions that became due.
    pub dispatched: usize,
    /// Failed or unanswered calls dialed again.
    pub retried: usize,
    /// Calls given up on because no final status arrived in time.
    pub timed_out: usize,
    /// Calls that ran out of attempts during this pass.
    pub abandoned: usize,
    /// Sessions or calls that could not be processed; see the log.
    pub errors: usize,
}

impl TickSummary {
    pub fn is_quiet(&self) -> bool {
        *self == TickSummary::default()
    }

    fn count(&mut self, call: &Call) {
        if call.status == CallStatus::Abandoned {
            self.abandoned += 1;
        }
    }
}

/// Owns the collaborators outbound calling needs and serializes dispatcher passes, so a
/// manual trigger never races the periodic one into dialing the same reminder twice.
pub struct Dispatcher {
    db: Arc<DatabaseConnection>,
    settings: Arc<Settings>,
    telephony: Arc<dyn TelephonyProvider>,
    running: Mutex<()>,
}

impl Dispatcher {
    pub fn new(
        db: Arc<DatabaseConnection>,
        settings: Arc<Settings>,
        telephony: Arc<dyn TelephonyProvider>,
    ) -> Self {
        Self {
            db,
            settings,
            telephony,
            running: Mutex::new(()),
        }
    }

    pub async fn tick(&self, now: DateTime<Utc>) -> Result<TickSummary, Error> {
        let _running = self.running.lock().await;
        tick(&self.db, &self.settings, self.telephony.as_ref(), now).await
    }

    pub async fn place_adhoc_call(
        &self,
        phone: &str,
        purpose: CallPurpose,
        client_id: Option<Id>,
    ) -> Result<Call, Error> {
        place_adhoc_call(
            &self.db,
            &self.settings,
            self.telephony.as_ref(),
            phone,
            purpose,
            client_id,
        )
        .await
    }

    pub async fn place_bulk_calls(
        &self,
        purpose: CallPurpose,
        targets: Vec<CallTarget>,
    ) -> Result<BulkCallSummary, Error> {
        place_bulk_calls(
            &self.db,
            &self.settings,
            self.telephony.as_ref(),
            purpose,
            targets,
        )
        .await
    }

    pub async fn handle_status_callback(
        &self,
        call_sid: &str,
        provider_status: &str,
    ) -> Result<Option<Call>, Error> {
        handle_status_callback(
            &self.db,
            &self.settings,
            call_sid,
            provider_status,
            Utc::now(),
        )
        .await
    }
}

/// Runs a dispatcher pass every `dispatch_interval` until the returned task is aborted.
/// Passes that would overlap a slow one are skipped rather than queued.
pub fn spawn_dispatcher(dispatcher: Arc<Dispatcher>) -> JoinHandle<()> {
    let period = dispatcher.settings.outbound.dispatch_interval;
    info!("Starting outbound call dispatcher (every {period:?})");

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            match dispatcher.tick(Utc::now()).await {
                Ok(summary) if summary.is_quiet() => debug!("Dispatcher pass: nothing to do"),
                Ok(summary) => info!("Dispatcher pass: {summary:?}"),
                Err(err) => error!("Dispatcher pass failed: {err}"),
            }
        }
    })
}

/// One dispatcher pass: time out stuck calls, dial reminders that became due, then
/// retry calls whose backoff has elapsed or that were left `pending` for longer than
/// the call timeout. A failure on one session or call is logged
/// and counted; it does not stop the pass.
pub async fn tick(
    db: &DatabaseConnection,
    settings: &Settings,
    telephony: &dyn TelephonyProvider,
    now: DateTime<Utc>,
) -> Result<TickSummary, Error> {
    let mut summary = TickSummary::default();

    let cutoff = (now - settings.outbound.call_timeout).fixed_offset();
    for stuck in outbound_call::find_stale_dialing(db, cutoff).await? {
        let id = stuck.id;
        match time_out(db, settings, stuck, now).await {
            Ok(call) => {
                summary.timed_out += 1;
                summary.count(&call);
            }
            Err(err) => {
                error!("Unable to time out call {id}: {err}");
                summary.errors += 1;
            }
        }
    }

    let due = session::find_due_reminders(db, now, settings.reminder_window_hours).await?;
    for session in due {
        let id = session.id;
        match dispatch_reminder(db, settings, telephony, session, now).await {
            Ok(Some(call)) => {
                summary.dispatched += 1;
                summary.count(&call);
            }
            Ok(None) => {}
            Err(err) => {
                error!("Unable to dispatch reminder for session {id}: {err}");
                summary.errors += 1;
            }
        }
    }

    for call in outbound_call::find_retryable(db, now.fixed_offset(), cutoff).await? {
        let id = call.id;
        match retry(db, settings, telephony, call, now).await {
            Ok(call) => {
                summary.retried += 1;
                summary.count(&call);
            }
            Err(err) => {
                error!("Unable to retry call {id}: {err}");
                summary.errors += 1;
            }
        }
    }

    Ok(summary)
}

/// Places a call that isn't tied to a session, e.g. a scheduling or follow-up call.
pub async fn place_adhoc_call(
    db: &DatabaseConnection,
    settings: &Settings,
    telephony: &dyn TelephonyProvider,
    phone: &str,
    purpose: CallPurpose,
    client_id: Option<Id>,
) -> Result<Call, Error> {
    if purpose == CallPurpose::Reminder {
        return Err(Error::validation(
            "Reminder calls are placed for a session by the dispatcher",
        ));
    }
    if settings.from_phone.is_none() {
        return Err(Error::config("TWILIO_PHONE_NUMBER is not configured"));
    }
    let phone = client::normalize_phone(phone)?;

    let client_id = match client_id {
        Some(id) => Some(client::find_by_id(db, id).await?.id),
        None => client::find_by_phone(db, &phone).await?.map(|found| found.id),
    };

    let call = outbound_call::create(db, purpose, None, client_id, &phone).await?;
    info!("Placing {purpose} call {} to {phone}", call.id);
    dial(db, settings, telephony, call, Utc::now()).await
}

/// Most calls a single bulk request may place.
pub const MAX_BULK_CALLS: usize = 100;

/// Who an ad-hoc call in a bulk request goes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallTarget {
    Client(Id),
    Phone(String),
}

impl std::fmt::Display for CallTarget {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallTarget::Client(id) => write!(fmt, "client {id}"),
            CallTarget::Phone(phone) => write!(fmt, "{phone}"),
        }
    }
}

/// What happened to one target of a bulk request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkCallResult {
    pub target: String,
    pub call_id: Option<Id>,
    pub status: Option<CallStatus>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkCallSummary {
    pub total: usize,
    /// Calls the provider accepted.
    pub placed: usize,
    /// Targets that could not be called, or whose dial was rejected.
    pub failed: usize,
    pub results: Vec<BulkCallResult>,
}

/// Places one ad-hoc call per target, in order. A target that fails is reported in the
/// summary and does not stop the rest.
pub async fn place_bulk_calls(
    db: &DatabaseConnection,
    settings: &Settings,
    telephony: &dyn TelephonyProvider,
    purpose: CallPurpose,
    targets: Vec<CallTarget>,
) -> Result<BulkCallSummary, Error> {
    if targets.is_empty() {
        return Err(Error::validation("At least one client or phone number is required"));
    }
    if targets.len() > MAX_BULK_CALLS {
        return Err(Error::validation(format!(
            "At most {MAX_BULK_CALLS} calls can be placed at once"
        )));
    }
    if purpose == CallPurpose::Reminder {
        return Err(Error::validation(
            "Reminder calls are placed for a session by the dispatcher",
        ));
    }

    info!("Placing {} {purpose} calls", targets.len());
    let mut summary = BulkCallSummary {
        total: targets.len(),
        ..Default::default()
    };

    for target in targets {
        let placed = match &target {
            CallTarget::Client(id) => match client::find_by_id(db, *id).await {
                Ok(found) => {
                    place_adhoc_call(db, settings, telephony, &found.phone, purpose, Some(found.id))
                        .await
                }
                Err(err) => Err(err),
            },
            CallTarget::Phone(phone) => {
                place_adhoc_call(db, settings, telephony, phone, purpose, None).await
            }
        };

        let result = match placed {
            Ok(call) => {
                if call.status == CallStatus::Dialing {
                    summary.placed += 1;
                } else {
                    summary.failed += 1;
                }
                BulkCallResult {
                    target: target.to_string(),
                    call_id: Some(call.id),
                    status: Some(call.status),
                    error: call.last_error,
                }
            }
            Err(err) => {
                warn!("Unable to call {target}: {err}");
                summary.failed += 1;
                BulkCallResult {
                    target: target.to_string(),
                    call_id: None,
                    status: None,
                    error: Some(bulk_error_message(&err)),
                }
            }
        };
        summary.results.push(result);
    }

    info!(
        "Bulk {purpose} calls: {} placed, {} failed",
        summary.placed, summary.failed
    );
    Ok(summary)
}

fn bulk_error_message(err: &Error) -> String {
    match err.user_message() {
        Some(message) => message.to_string(),
        None if err.is_not_found() => "Client not found".to_string(),
        None => "Unable to place the call".to_string(),
    }
}

/// Applies a provider status callback to the call it belongs to.
///
/// Callbacks for unknown calls (inbound calls, or records already cleaned up) and
/// progress updates are ignored. Duplicate final callbacks leave the record unchanged.
pub async fn handle_status_callback(
    db: &DatabaseConnection,
    settings: &Settings,
    call_sid: &str,
    provider_status: &str,
    now: DateTime<Utc>,
) -> Result<Option<Call>, Error> {
    let status = ProviderStatus::parse(provider_status).ok_or_else(|| {
        Error::validation(format!("Unknown call status '{provider_status}'"))
    })?;

    let Some(call) = outbound_call::find_by_call_sid(db, call_sid).await? else {
        debug!("Status {provider_status} for untracked call {call_sid}");
        return Ok(None);
    };
    let Some(event) = map_provider_status(status) else {
        debug!("Call {} is {provider_status}", call.id);
        return Ok(Some(call));
    };
    if call.status != CallStatus::Dialing {
        debug!(
            "Ignoring {provider_status} for call {} which is already {}",
            call.id, call.status
        );
        return Ok(Some(call));
    }

    let last_error = (event != CallEvent::Completed)
        .then(|| format!("Provider reported {provider_status}"));
    let updated = settle(db, settings, call, event, last_error, now).await?;
    Ok(Some(updated))
}

async fn time_out(
    db: &DatabaseConnection,
    settings: &Settings,
    call: Call,
    now: DateTime<Utc>,
) -> Result<Call, Error> {
    warn!(
        "Call {} has been dialing since {:?} without a final status",
        call.id, call.dialed_at
    );
    let last_error = format!(
        "No final status within {} minutes",
        settings.outbound.call_timeout.num_minutes()
    );
    settle(db, settings, call, CallEvent::TimedOut, Some(last_error), now).await
}

/// Records the end of a dial and schedules the next attempt when one is allowed.
async fn settle(
    db: &DatabaseConnection,
    settings: &Settings,
    call: Call,
    event: CallEvent,
    last_error: Option<String>,
    now: DateTime<Utc>,
) -> Result<Call, Error> {
    let status = next_status(call.status, event, call.attempts, settings.outbound.max_attempts);
    let next_attempt_at = status
        .is_retryable()
        .then(|| (now + settings.outbound.retry_backoff).fixed_offset());

    if status == CallStatus::Abandoned {
        error!(
            "Giving up on {} call {} to {} after {} attempts",
            call.purpose, call.id, call.to_phone, call.attempts
        );
    }

    let outcome = Outcome {
        status,
        attempts: call.attempts,
        next_attempt_at,
        last_error,
    };
    Ok(outbound_call::record_outcome(db, call, outcome).await?)
}

/// Creates and dials a reminder call for `session`, then flags the reminder as sent.
/// Returns `None` when the session already has a call record.
async fn dispatch_reminder(
    db: &DatabaseConnection,
    settings: &Settings,
    telephony: &dyn TelephonyProvider,
    session: Session,
    now: DateTime<Utc>,
) -> Result<Option<Call>, Error> {
    if let Some(existing) = outbound_call::find_latest_for_session(db, session.id).await? {
        debug!(
            "Session {} already has reminder call {} ({})",
            session.id, existing.id, existing.status
        );
        return Ok(None);
    }

    let client = client::find_by_id(db, session.client_id).await?;
    let call = outbound_call::create(
        db,
        CallPurpose::Reminder,
        Some(session.id),
        Some(client.id),
        &client.phone,
    )
    .await?;
    info!(
        "Dispatching reminder call {} for session {} at {}",
        call.id, session.id, session.date_time
    );

    let call = dial(db, settings, telephony, call, now).await?;
    // Flagged even when the dial failed: the call record now owns retrying it.
    session::mark_reminder_sent(db, session.id).await?;
    Ok(Some(call))
}

async fn retry(
    db: &DatabaseConnection,
    settings: &Settings,
    telephony: &dyn TelephonyProvider,
    call: Call,
    now: DateTime<Utc>,
) -> Result<Call, Error> {
    if let (CallPurpose::Reminder, Some(session_id)) = (call.purpose, call.session_id) {
        let about = session::find_by_id(db, session_id).await?;
        if about.status != SessionStatus::Scheduled || about.date_time <= now {
            info!(
                "Not retrying call {}: session {session_id} is {} at {}",
                call.id, about.status, about.date_time
            );
            let outcome = Outcome {
                status: CallStatus::Abandoned,
                attempts: call.attempts,
                next_attempt_at: None,
                last_error: Some("Session is no longer upcoming".to_string()),
            };
            return Ok(outbound_call::record_outcome(db, call, outcome).await?);
        }
    }

    info!("Retrying call {} (attempt {})", call.id, call.attempts + 1);
    dial(db, settings, telephony, call, now).await
}

/// Asks the provider to place `call`. A request that can't be made or that the provider
/// rejects counts as an attempt and is recorded as a failure, so the retry loop owns it
/// from then on; it is never retried here.
async fn dial(
    db: &DatabaseConnection,
    settings: &Settings,
    telephony: &dyn TelephonyProvider,
    call: Call,
    now: DateTime<Utc>,
) -> Result<Call, Error> {
    let Some(from) = settings.from_phone.clone() else {
        let reason = "TWILIO_PHONE_NUMBER is not configured".to_string();
        error!("Unable to dial call {}: {reason}", call.id);
        return record_rejection(db, settings, call, reason, now).await;
    };

    let request = DialRequest {
        to: call.to_phone.clone(),
        from,
        answer_url: settings.url_for(&format!("/telephony/outbound/{}", call.id)),
        status_callback_url: settings.url_for("/telephony/status"),
    };

    match telephony.place_call(request).await {
        Ok(dialed) => {
            debug!(
                "{} queued call {} as {}",
                telephony.provider_id(),
                call.id,
                dialed.call_sid
            );
            Ok(outbound_call::mark_dialing(db, call, &dialed.call_sid, now.fixed_offset()).await?)
        }
        Err(err) => {
            warn!("{} rejected call {}: {err}", telephony.provider_id(), call.id);
            record_rejection(db, settings, call, err.to_string(), now).await
        }
    }
}

async fn record_rejection(
    db: &DatabaseConnection,
    settings: &Settings,
    call: Call,
    reason: String,
    now: DateTime<Utc>,
) -> Result<Call, Error> {
    let attempts = call.attempts + 1;
    let status = next_status(
        call.status,
        CallEvent::DialRejected,
        attempts,
        settings.outbound.max_attempts,
    );
    let outcome = Outcome {
        status,
        attempts,
        next_attempt_at: status
            .is_retryable()
            .then(|| (now + settings.outbound.retry_backoff).fixed_offset()),
        last_error: Some(reason),
    };
    Ok(outbound_call::record_outcome(db, call, outcome).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_dial_moves_to_dialing() {
        assert_eq!(
            next_status(CallStatus::Pending, CallEvent::Dialed, 1, 3),
            CallStatus::Dialing
        );
        assert_eq!(
            next_status(CallStatus::NoAnswer, CallEvent::Dialed, 2, 3),
            CallStatus::Dialing
        );
    }

    #[test]
    fn unsuccessful_calls_are_retryable_until_attempts_run_out() {
        assert_eq!(
            next_status(CallStatus::Dialing, CallEvent::NoAnswer, 1, 3),
            CallStatus::NoAnswer
        );
        assert_eq!(
            next_status(CallStatus::Dialing, CallEvent::Failed, 2, 3),
            CallStatus::Failed
        );
        assert_eq!(
            next_status(CallStatus::Dialing, CallEvent::NoAnswer, 3, 3),
            CallStatus::Abandoned
        );
        assert_eq!(
            next_status(CallStatus::Dialing, CallEvent::TimedOut, 3, 3),
            CallStatus::Abandoned
        );
    }

    #[test]
    fn a_rejected_dial_counts_as_an_attempt() {
        assert_eq!(
            next_status(CallStatus::Pending, CallEvent::DialRejected, 1, 3),
            CallStatus::Failed
        );
        assert_eq!(
            next_status(CallStatus::Failed, CallEvent::DialRejected, 3, 3),
            CallStatus::Abandoned
        );
    }

    #[test]
    fn terminal_statuses_never_move() {
        for event in [
            CallEvent::Dialed,
            CallEvent::Completed,
            CallEvent::Failed,
            CallEvent::NoAnswer,
            CallEvent::TimedOut,
        ] {
            assert_eq!(
                next_status(CallStatus::Completed, event, 1, 3),
                CallStatus::Completed
            );
            assert_eq!(
                next_status(CallStatus::Abandoned, event, 3, 3),
                CallStatus::Abandoned
            );
        }
    }

    #[test]
    fn events_that_do_not_apply_are_ignored() {
        assert_eq!(
            next_status(CallStatus::Pending, CallEvent::Completed, 0, 3),
            CallStatus::Pending
        );
        assert_eq!(
            next_status(CallStatus::Dialing, CallEvent::Dialed, 1, 3),
            CallStatus::Dialing
        );
    }

    #[test]
    fn provider_statuses_map_to_events() {
        assert_eq!(
            map_provider_status(ProviderStatus::Completed),
            Some(CallEvent::Completed)
        );
        assert_eq!(
            map_provider_status(ProviderStatus::Busy),
            Some(CallEvent::Failed)
        );
        assert_eq!(
            map_provider_status(ProviderStatus::Canceled),
            Some(CallEvent::Failed)
        );
        assert_eq!(
            map_provider_status(ProviderStatus::NoAnswer),
            Some(CallEvent::NoAnswer)
        );
        assert_eq!(map_provider_status(ProviderStatus::Ringing), None);
        assert_eq!(map_provider_status(ProviderStatus::InProgress), None);
    }

    #[test]
    fn an_empty_summary_is_quiet() {
        let mut summary = TickSummary::default();
        assert!(summary.is_quiet());
        summary.dispatched = 1;
        assert!(!summary.is_quiet());
    }
}
