//! System prompts and scripted lines spoken by the assistant.

use crate::call_purpose::CallPurpose;
use crate::sessions::Model as Session;
use crate::settings::Settings;
use chrono::{DateTime, NaiveDate, TimeZone};
use chrono_tz::Tz;

pub const SESSION_GREETING: &str = "Hello! I'm your personal training assistant. I can help you schedule, reschedule, or cancel your training sessions. I can also check your remaining sessions and answer questions about your training. How can I help you today?";

pub const BASIC_GREETING: &str =
    "Hello! Thanks for calling our personal training service. How can I help you today?";

/// Spoken when a provider or the store fails mid-call. The call is hung up afterwards.
pub const FALLBACK_REPLY: &str = "I'm sorry, I'm having trouble right now. Please try again later. Goodbye.";

pub const GOODBYE: &str = "Thanks for calling. Have a great workout! Goodbye.";

pub const DID_NOT_CATCH: &str = "Sorry, I didn't catch that. Could you say it again?";

pub const CAPABILITIES: &str = "I can help you schedule, reschedule, or cancel training sessions. I can also check your remaining sessions. What would you like to do?";

const BASIC_INSTRUCTIONS: &str = "You are a helpful customer service representative for a personal training business. \
Be professional, friendly, and helpful. Answer questions about training services, scheduling, and general inquiries. \
If you cannot help with something specific, politely direct them to contact the business directly. \
Your replies are spoken on a phone call: keep them to two or three short sentences.";

const OUTBOUND_BASE: &str = "You are a professional training session assistant calling on behalf of a personal training business. \
Be polite, professional, and concise. Keep calls brief and focused on the specific purpose. \
Your replies are spoken on a phone call: keep them to two or three short sentences.";

pub fn basic_instructions() -> &'static str {
    BASIC_INSTRUCTIONS
}

/// Prompt for inbound calls handled by the scheduling agent.
pub fn session_instructions(settings: &Settings, today: NaiveDate) -> String {
    format!(
        "You are a professional personal training assistant for a fitness business. \
You help clients with their training sessions and provide excellent customer service.

CORE CAPABILITIES:
- Schedule new training sessions
- Reschedule existing sessions
- Cancel sessions
- Check session availability
- Verify remaining sessions in client packages
- Answer questions about training programs

GUIDELINES:
1. Be professional, friendly, and helpful
2. Collect the client's name, phone number and preferred date and time
3. Confirm session details before booking
4. Offer alternative times if a requested slot is unavailable
5. Keep replies to two or three short sentences; they are spoken on a phone call

SESSION DURATION: {duration} minutes (default)
LOCATION: {location} (default)
TIMEZONE: {timezone}
TODAY: {today}",
        duration = settings.session_minutes,
        location = settings.default_location,
        timezone = settings.business_hours.timezone(),
        today = today.format("%A, %B %-d, %Y"),
    )
}

/// Prompt for a call placed by the dispatcher or on request.
pub fn outbound_instructions(purpose: CallPurpose, session: Option<&Session>, tz: Tz) -> String {
    let goals = match (purpose, session) {
        (CallPurpose::Reminder, Some(session)) => format!(
            "This is a session reminder call. Key details:
- Client: {client}
- Session time: {when}
- Location: {location}
- Duration: {duration} minutes

Your goals:
1. Confirm the client can attend the session
2. If they can't attend, offer to reschedule and collect their preferred new date and time
3. Answer any questions about the session",
            client = session.client_name,
            when = spoken_time(&session.date_time, tz),
            location = session.location,
            duration = session.duration_minutes,
        ),
        (CallPurpose::Reminder, None) => {
            "This is a session reminder call. Confirm attendance and offer to reschedule if needed."
                .to_string()
        }
        (CallPurpose::FollowUp, _) => "This is a follow-up call to:
1. Check on the client's progress
2. Encourage them to schedule their next session
3. Answer any questions about their training

Be encouraging and supportive. Focus on their goals and progress."
            .to_string(),
        (CallPurpose::Scheduling, _) => "This is a scheduling call to:
1. Help the client book a training session
2. Find a time that works for both the client and trainer
3. Confirm session details (date, time, location)

Be flexible and offer multiple time options if possible."
            .to_string(),
    };

    format!("{OUTBOUND_BASE}\n\n{goals}")
}

/// First line spoken when an outbound call is answered.
pub fn outbound_greeting(purpose: CallPurpose, session: Option<&Session>, tz: Tz) -> String {
    match (purpose, session) {
        (CallPurpose::Reminder, Some(session)) => format!(
            "Hi {}! This is a friendly reminder about your training session scheduled for {} at {}. Please confirm if you'll be able to make it.",
            first_name(&session.client_name),
            spoken_time(&session.date_time, tz),
            session.location
        ),
        (CallPurpose::Reminder, None) => {
            "Hi! This is a reminder about your upcoming training session.".to_string()
        }
        (CallPurpose::FollowUp, _) => "Hi! I'm calling to follow up on your training progress and see if you'd like to schedule your next session.".to_string(),
        (CallPurpose::Scheduling, _) => {
            "Hi! I'm calling to help you schedule your training session. When would work best for you?"
                .to_string()
        }
    }
}

/// Renders a session time the way it is read out, e.g. "Monday, September 16 at 2:00 PM".
pub fn spoken_time<T: TimeZone>(at: &DateTime<T>, tz: Tz) -> String {
    at.with_timezone(&tz)
        .format("%A, %B %-d at %-I:%M %p")
        .to_string()
}

/// Lists up to `limit` slot times, e.g. "9:00 AM, 9:30 AM and 10:00 AM".
pub fn spoken_slots<T: TimeZone>(slots: &[DateTime<T>], tz: Tz, limit: usize) -> String {
    let times: Vec<String> = slots
        .iter()
        .take(limit)
        .map(|slot| slot.with_timezone(&tz).format("%-I:%M %p").to_string())
        .collect();

    match times.split_last() {
        None => String::new(),
        Some((last, [])) => last.clone(),
        Some((last, rest)) => format!("{} and {}", rest.join(", "), last),
    }
}

fn first_name(full_name: &str) -> &str {
    full_name.split_whitespace().next().unwrap_or("there")
}
