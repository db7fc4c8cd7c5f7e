use super::intent::{self, Intent, TimeHint};
use super::{ask_model, prompts, AgentContext, AgentTurn, ConversationState};
use crate::call_purpose::CallPurpose;
use crate::client::{self, NewClient};
use crate::clients::Model as Client;
use crate::error::Error;
use crate::session::{self, NewSession};
use crate::sessions::Model as Session;
use crate::Id;
use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone};
use entity::session_status::SessionStatus;
use log::*;

/// Scheduling agent: books, moves, cancels and confirms sessions over the phone.
///
/// Requests are filled in over several turns. Whatever is still missing (name, phone,
/// date or time) is asked for one question at a time and kept in the conversation state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionAgent;

impl SessionAgent {
    pub async fn handle(
        &self,
        ctx: &AgentContext<'_>,
        mut state: ConversationState,
        utterance: &str,
    ) -> Result<AgentTurn, Error> {
        let extracted = intent::extract(utterance, today(ctx));
        state.absorb(&extracted);

        // A bare answer ("3pm", "yes") continues whatever was being asked.
        let intent = match (extracted.intent, state.pending) {
            (None | Some(Intent::Confirm), Some(pending)) => pending,
            (Some(intent), _) => intent,
            (None, None) => Intent::General,
        };

        let mut end_call = false;
        let reply = match intent {
            Intent::Goodbye => {
                state.finish_request();
                end_call = true;
                prompts::GOODBYE.to_string()
            }
            Intent::Book => self.book(ctx, &mut state).await?,
            Intent::Reschedule => self.reschedule(ctx, &mut state).await?,
            Intent::Cancel => self.cancel(ctx, &mut state).await?,
            Intent::CheckRemaining => self.remaining(ctx, &mut state).await?,
            Intent::Availability => self.availability(ctx, &mut state).await?,
            Intent::Confirm => {
                let (reply, done) = self.confirm(ctx, &mut state).await?;
                end_call = done;
                reply
            }
            Intent::General => self.general(ctx, &state, utterance).await?,
        };

        Ok(AgentTurn {
            intent,
            reply,
            state,
            end_call,
        })
    }

    async fn book(
        &self,
        ctx: &AgentContext<'_>,
        state: &mut ConversationState,
    ) -> Result<String, Error> {
        state.pending = Some(Intent::Book);

        let known_client = find_client(ctx, state).await?;
        if known_client.is_none() {
            if state.name.is_none() {
                return Ok("I'd be happy to schedule a training session for you. Could you please tell me your name?".to_string());
            }
            if state.lookup_phone().is_none() {
                return Ok(
                    "Great! Could you please provide your phone number for the session?"
                        .to_string(),
                );
            }
        }
        let Some(date) = state.date else {
            return Ok("What date would you prefer for your training session?".to_string());
        };
        let Some(time) = state.time else {
            return Ok("What time would work best for you?".to_string());
        };

        let client = match known_client {
            Some(client) => client,
            None => match register_caller(ctx, state).await {
                Ok(client) => client,
                Err(err) if err.is_validation() => {
                    state.phone = None;
                    return Ok(format!(
                        "{} Could you tell me your phone number again?",
                        err.user_message().unwrap_or("I didn't quite get that.")
                    ));
                }
                Err(err) => return Err(err),
            },
        };

        let trainer_id = client.trainer_id.or(ctx.settings.default_trainer_id);
        let Some(start) = resolve_start(ctx, trainer_id, date, time).await? else {
            state.time = None;
            return no_opening(ctx, trainer_id, date).await;
        };

        let new_session = NewSession {
            client_id: client.id,
            trainer_id: None,
            date_time: start,
            duration_minutes: None,
            location: None,
            notes: "Booked by phone".to_string(),
            idempotency_key: ctx.call_sid.map(|sid| format!("{sid}-{}", state.turns)),
        };

        match session::create(ctx.db, ctx.settings, new_session).await {
            Ok(booked) => {
                state.session_id = Some(booked.id);
                state.finish_request();
                Ok(format!(
                    "Perfect! I've scheduled your training session for {} at {}.{} Is there anything else I can help with?",
                    prompts::spoken_time(&booked.date_time, timezone(ctx)),
                    booked.location,
                    package_note(&client)
                ))
            }
            Err(err) => self.unbookable(ctx, state, trainer_id, date, err).await,
        }
    }

    async fn reschedule(
        &self,
        ctx: &AgentContext<'_>,
        state: &mut ConversationState,
    ) -> Result<String, Error> {
        state.pending = Some(Intent::Reschedule);

        let Some(client) = find_client(ctx, state).await? else {
            return Ok(ask_for_client(state, "find your session"));
        };
        let Some(existing) = target_session(ctx, state, &client).await? else {
            state.finish_request();
            return Ok("I don't see any upcoming sessions for you. Would you like to book one?".to_string());
        };

        let (Some(date), Some(time)) = (state.date, state.time) else {
            return Ok(format!(
                "Your next session is on {}. What day and time would you like to move it to?",
                prompts::spoken_time(&existing.date_time, timezone(ctx))
            ));
        };

        let trainer_id = Some(existing.trainer_id);
        let Some(start) = resolve_start(ctx, trainer_id, date, time).await? else {
            state.time = None;
            return no_opening(ctx, trainer_id, date).await;
        };

        match session::reschedule(ctx.db, ctx.settings, existing.id, start).await {
            Ok(moved) => {
                state.finish_request();
                Ok(format!(
                    "Done! Your session is now on {} at {}. Is there anything else I can help with?",
                    prompts::spoken_time(&moved.date_time, timezone(ctx)),
                    moved.location
                ))
            }
            Err(err) => self.unbookable(ctx, state, trainer_id, date, err).await,
        }
    }

    async fn cancel(
        &self,
        ctx: &AgentContext<'_>,
        state: &mut ConversationState,
    ) -> Result<String, Error> {
        state.pending = Some(Intent::Cancel);

        let Some(client) = find_client(ctx, state).await? else {
            return Ok(ask_for_client(state, "find your upcoming sessions"));
        };
        let Some(existing) = target_session(ctx, state, &client).await? else {
            state.finish_request();
            return Ok("I don't see any upcoming sessions to cancel. Is there anything else I can help with?".to_string());
        };

        let cancelled =
            session::cancel(ctx.db, existing.id, Some("Cancelled by phone".to_string())).await?;
        state.finish_request();
        state.session_id = None;

        Ok(format!(
            "Your session on {} has been cancelled. Would you like to book another time?",
            prompts::spoken_time(&cancelled.date_time, timezone(ctx))
        ))
    }

    async fn remaining(
        &self,
        ctx: &AgentContext<'_>,
        state: &mut ConversationState,
    ) -> Result<String, Error> {
        state.pending = Some(Intent::CheckRemaining);

        let Some(client) = find_client(ctx, state).await? else {
            return Ok(ask_for_client(state, "check your remaining sessions"));
        };
        state.pending = None;

        let remaining = client::sessions_remaining(ctx.db, client.id).await?;
        Ok(match remaining {
            0 => "You don't have any sessions remaining in your package. Your trainer can set you up with a new one.".to_string(),
            1 => "You have 1 training session remaining in your package.".to_string(),
            n => format!("You have {n} training sessions remaining in your package."),
        })
    }

    async fn availability(
        &self,
        ctx: &AgentContext<'_>,
        state: &mut ConversationState,
    ) -> Result<String, Error> {
        state.pending = Some(Intent::Availability);

        let Some(date) = state.date else {
            return Ok("What date would you like to check availability for?".to_string());
        };

        let trainer_id = find_client(ctx, state)
            .await?
            .and_then(|client| client.trainer_id)
            .or(ctx.settings.default_trainer_id);
        let Some(trainer_id) = trainer_id else {
            warn!("Availability asked for but no trainer is known for the caller");
            state.finish_request();
            return Ok("I'm not able to look up the schedule right now. Is there anything else I can help with?".to_string());
        };

        let slots =
            session::available_slots(ctx.db, ctx.settings, trainer_id, date, ctx.now).await?;
        if slots.is_empty() {
            state.date = None;
            return Ok(format!(
                "I don't have any open slots on {}. Would another day work?",
                spoken_date(date)
            ));
        }

        // The natural next answer is a time, which should book on this date.
        state.pending = Some(Intent::Book);
        state.time = None;
        Ok(format!(
            "On {} I have {}. Would you like me to book one of those?",
            spoken_date(date),
            prompts::spoken_slots(&slots, timezone(ctx), 5)
        ))
    }

    /// Returns the reply and whether the call should end.
    async fn confirm(
        &self,
        ctx: &AgentContext<'_>,
        state: &mut ConversationState,
    ) -> Result<(String, bool), Error> {
        let upcoming = match state.session_id {
            Some(id) => Some(session::find_by_id(ctx.db, id).await?)
                .filter(|found| found.status == SessionStatus::Scheduled),
            None => match find_client(ctx, state).await? {
                Some(client) => session::next_for_client(ctx.db, client.id, ctx.now).await?,
                None => None,
            },
        };
        let Some(upcoming) = upcoming else {
            state.pending = None;
            return Ok((
                "I don't see an upcoming session to confirm. Would you like to book one?"
                    .to_string(),
                false,
            ));
        };

        session::mark_confirmed(ctx.db, upcoming.id).await?;
        state.session_id = Some(upcoming.id);
        state.pending = None;

        let when = prompts::spoken_time(&upcoming.date_time, timezone(ctx));
        if state.purpose == Some(CallPurpose::Reminder) {
            Ok((format!("Great, you're confirmed for {when}. See you then! Goodbye."), true))
        } else {
            Ok((
                format!("Great, you're confirmed for {when}. Is there anything else I can help with?"),
                false,
            ))
        }
    }

    async fn general(
        &self,
        ctx: &AgentContext<'_>,
        state: &ConversationState,
        utterance: &str,
    ) -> Result<String, Error> {
        let instructions = match state.purpose {
            Some(purpose) => {
                let about = match state.session_id {
                    Some(id) => match session::find_by_id(ctx.db, id).await {
                        Ok(found) => Some(found),
                        Err(err) if err.is_not_found() => None,
                        Err(err) => return Err(err),
                    },
                    None => None,
                };
                prompts::outbound_instructions(purpose, about.as_ref(), timezone(ctx))
            }
            None => prompts::session_instructions(ctx.settings, today(ctx)),
        };

        Ok(ask_model(ctx, &instructions, &state.history, utterance)
            .await?
            .unwrap_or_else(|| prompts::CAPABILITIES.to_string()))
    }

    /// Turns a rejected booking into a spoken explanation. Validation problems ask for a
    /// different time; a taken slot offers the nearest alternatives.
    async fn unbookable(
        &self,
        ctx: &AgentContext<'_>,
        state: &mut ConversationState,
        trainer_id: Option<Id>,
        date: NaiveDate,
        err: Error,
    ) -> Result<String, Error> {
        if err.is_conflict() {
            state.time = None;
            let alternatives = alternatives(ctx, trainer_id, date).await?;
            return Ok(format!("That time slot is no longer available.{alternatives}"));
        }
        if err.is_validation() {
            state.time = None;
            let reason = err
                .user_message()
                .unwrap_or("That time doesn't work.")
                .to_string();
            debug!("Booking rejected: {reason}");
            return Ok(format!("{reason} What other time would work for you?"));
        }
        Err(err)
    }
}

fn timezone(ctx: &AgentContext<'_>) -> chrono_tz::Tz {
    ctx.settings.business_hours.timezone()
}

fn today(ctx: &AgentContext<'_>) -> NaiveDate {
    ctx.now.with_timezone(&timezone(ctx)).date_naive()
}

fn spoken_date(date: NaiveDate) -> String {
    date.format("%A, %B %-d").to_string()
}

/// The caller's client record, found by id from earlier turns or by phone number.
async fn find_client(
    ctx: &AgentContext<'_>,
    state: &mut ConversationState,
) -> Result<Option<Client>, Error> {
    if let Some(id) = state.client_id {
        match client::find_by_id(ctx.db, id).await {
            Ok(found) => return Ok(Some(found)),
            Err(err) if err.is_not_found() => state.client_id = None,
            Err(err) => return Err(err),
        }
    }

    let Some(phone) = state.lookup_phone().map(str::to_string) else {
        return Ok(None);
    };
    let found = match client::find_by_phone(ctx.db, &phone).await {
        Ok(found) => found,
        Err(err) if err.is_validation() => {
            debug!("Ignoring unusable phone number {phone}");
            state.phone = None;
            None
        }
        Err(err) => return Err(err),
    };

    if let Some(found) = &found {
        state.client_id = Some(found.id);
    }
    Ok(found)
}

fn ask_for_client(state: &mut ConversationState, purpose: &str) -> String {
    if state.lookup_phone().is_none() {
        format!("Could you please provide your phone number so I can {purpose}?")
    } else {
        state.phone = None;
        "I couldn't find a client with that phone number. Could you double-check it for me?"
            .to_string()
    }
}

/// Creates a client record for a new caller from the name and number they gave.
async fn register_caller(
    ctx: &AgentContext<'_>,
    state: &mut ConversationState,
) -> Result<Client, Error> {
    let new_client = NewClient {
        name: state.name.clone().unwrap_or_default(),
        phone: state.lookup_phone().unwrap_or_default().to_string(),
        email: None,
        notes: "Registered by phone".to_string(),
        trainer_id: ctx.settings.default_trainer_id,
        package_size: 0,
    };

    let created = client::create(ctx.db, new_client).await?;
    info!("Registered new caller {} as client {}", created.name, created.id);
    state.client_id = Some(created.id);
    Ok(created)
}

/// The session a reschedule or cancel refers to: the one this call is about, else the
/// client's next scheduled session.
async fn target_session(
    ctx: &AgentContext<'_>,
    state: &mut ConversationState,
    client: &Client,
) -> Result<Option<Session>, Error> {
    if let Some(id) = state.session_id {
        match session::find_by_id(ctx.db, id).await {
            Ok(found) if found.client_id == client.id && found.status == SessionStatus::Scheduled => {
                return Ok(Some(found))
            }
            Ok(_) => {}
            Err(err) if err.is_not_found() => {}
            Err(err) => return Err(err),
        }
    }

    let next = session::next_for_client(ctx.db, client.id, ctx.now).await?;
    state.session_id = next.as_ref().map(|found| found.id);
    Ok(next)
}

/// Concrete start time for a date and time hint. A part of the day picks the first open
/// slot in it. `None` when nothing fits.
async fn resolve_start(
    ctx: &AgentContext<'_>,
    trainer_id: Option<Id>,
    date: NaiveDate,
    time: TimeHint,
) -> Result<Option<DateTime<FixedOffset>>, Error> {
    match time {
        TimeHint::At(time) => Ok(timezone(ctx)
            .from_local_datetime(&date.and_time(time))
            .earliest()
            .map(|start| start.fixed_offset())),
        TimeHint::Part(part) => {
            let Some(trainer_id) = trainer_id else {
                return Ok(None);
            };
            let (from, to) = part.range();
            let tz = timezone(ctx);
            let slots =
                session::available_slots(ctx.db, ctx.settings, trainer_id, date, ctx.now).await?;
            Ok(slots.into_iter().find(|slot| {
                let local = slot.with_timezone(&tz).time();
                local >= from && local < to
            }))
        }
    }
}

async fn no_opening(
    ctx: &AgentContext<'_>,
    trainer_id: Option<Id>,
    date: NaiveDate,
) -> Result<String, Error> {
    let alternatives = alternatives(ctx, trainer_id, date).await?;
    Ok(format!(
        "I don't have an opening then on {}.{alternatives}",
        spoken_date(date)
    ))
}

/// A sentence offering up to three open slots on `date`, with a leading space.
async fn alternatives(
    ctx: &AgentContext<'_>,
    trainer_id: Option<Id>,
    date: NaiveDate,
) -> Result<String, Error> {
    let Some(trainer_id) = trainer_id else {
        return Ok(" What other day or time would work for you?".to_string());
    };

    let slots = session::available_slots(ctx.db, ctx.settings, trainer_id, date, ctx.now).await?;
    if slots.is_empty() {
        Ok(" I don't have anything else open that day. Would another day work?".to_string())
    } else {
        Ok(format!(
            " I do have {} on {}. Would any of those work?",
            prompts::spoken_slots(&slots, timezone(ctx), 3),
            spoken_date(date)
        ))
    }
}

/// Package exhaustion never blocks a booking; the caller is told and the trainer can follow up.
fn package_note(client: &Client) -> String {
    if client.sessions_remaining <= 0 {
        warn!(
            "Client {} booked a session with no sessions left in their package",
            client.id
        );
        " Just so you know, your package has no sessions left, so please talk to your trainer about renewing it.".to_string()
    } else {
        format!(
            " You have {} sessions remaining in your package.",
            client.sessions_remaining
        )
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::settings::Settings;
    use sea_orm::DatabaseConnection;

    fn ctx<'a>(
        db: &'a DatabaseConnection,
        settings: &'a Settings,
        completion: &'a dyn voice_ai::traits::completion::Provider,
    ) -> AgentContext<'a> {
        AgentContext {
            db,
            settings,
            completion,
            call_sid: Some("CA123"),
            now: now(),
        }
    }

    #[tokio::test]
    async fn booking_asks_for_missing_details_in_order() -> Result<(), Error> {
        let db = DatabaseConnection::Disconnected;
        let settings = Settings::for_tests();
        let completion = silent_completion();
        let ctx = ctx(&db, &settings, &completion);

        let turn = SessionAgent
            .handle(&ctx, ConversationState::default(), "I want to book a session")
            .await?;
        assert_eq!(turn.intent, Intent::Book);
        assert!(turn.reply.contains("your name"));

        let turn = SessionAgent
            .handle(&ctx, turn.state, "My name is Casey Lin")
            .await?;
        assert_eq!(turn.intent, Intent::Book);
        assert_eq!(turn.state.name.as_deref(), Some("Casey Lin"));
        assert!(turn.reply.contains("phone number"));
        Ok(())
    }

    #[tokio::test]
    async fn goodbye_ends_the_call() -> Result<(), Error> {
        let db = DatabaseConnection::Disconnected;
        let settings = Settings::for_tests();
        let completion = silent_completion();
        let ctx = ctx(&db, &settings, &completion);

        let mut state = ConversationState::default();
        state.pending = Some(Intent::Book);

        let turn = SessionAgent.handle(&ctx, state, "no thanks, bye").await?;

        assert!(turn.end_call);
        assert_eq!(turn.state.pending, None);
        Ok(())
    }

    #[tokio::test]
    async fn small_talk_goes_to_the_model() -> Result<(), Error> {
        let db = DatabaseConnection::Disconnected;
        let settings = Settings::for_tests();
        let completion = completion_replying("Bring water and comfortable shoes.");
        let ctx = ctx(&db, &settings, &completion);

        let turn = SessionAgent
            .handle(&ctx, ConversationState::default(), "What should I bring?")
            .await?;

        assert_eq!(turn.intent, Intent::General);
        assert_eq!(turn.reply, "Bring water and comfortable shoes.");
        Ok(())
    }

    #[tokio::test]
    async fn availability_needs_a_date() -> Result<(), Error> {
        let db = DatabaseConnection::Disconnected;
        let settings = Settings::for_tests();
        let completion = silent_completion();
        let ctx = ctx(&db, &settings, &completion);

        let turn = SessionAgent
            .handle(&ctx, ConversationState::default(), "What times are available?")
            .await?;

        assert_eq!(turn.intent, Intent::Availability);
        assert!(turn.reply.contains("What date"));
        Ok(())
    }

    #[test]
    fn an_empty_package_is_mentioned_but_not_fatal() {
        let now = chrono::Utc::now().fixed_offset();
        let mut client = Client {
            id: Id::new_v4(),
            name: "Casey Lin".to_string(),
            phone: "+15555550124".to_string(),
            email: None,
            notes: String::new(),
            trainer_id: None,
            package_size: 10,
            sessions_remaining: 0,
            last_session_at: None,
            created_at: now,
            updated_at: now,
        };
        assert!(package_note(&client).contains("no sessions left"));

        client.sessions_remaining = 4;
        assert_eq!(
            package_note(&client),
            " You have 4 sessions remaining in your package."
        );
    }
}
