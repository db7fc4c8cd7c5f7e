//! Keyword intent detection and slot extraction for caller utterances.

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Weekday};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Book,
    Reschedule,
    Cancel,
    CheckRemaining,
    Availability,
    Confirm,
    Goodbye,
    General,
}

impl std::fmt::Display for Intent {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Intent::Book => write!(fmt, "book"),
            Intent::Reschedule => write!(fmt, "reschedule"),
            Intent::Cancel => write!(fmt, "cancel"),
            Intent::CheckRemaining => write!(fmt, "check_remaining"),
            Intent::Availability => write!(fmt, "availability"),
            Intent::Confirm => write!(fmt, "confirm"),
            Intent::Goodbye => write!(fmt, "goodbye"),
            Intent::General => write!(fmt, "general"),
        }
    }
}

/// A rough time of day, resolved against open slots when booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayPart {
    Morning,
    Afternoon,
    Evening,
}

impl DayPart {
    /// Local time range `[from, to)` the part of day covers.
    pub fn range(&self) -> (NaiveTime, NaiveTime) {
        let at = |h, m, s| NaiveTime::from_hms_opt(h, m, s).unwrap_or(NaiveTime::MIN);
        match self {
            DayPart::Morning => (NaiveTime::MIN, at(12, 0, 0)),
            DayPart::Afternoon => (at(12, 0, 0), at(17, 0, 0)),
            DayPart::Evening => (at(17, 0, 0), at(23, 59, 59)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeHint {
    At(NaiveTime),
    Part(DayPart),
}

/// Everything recognised in one utterance.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Extracted {
    pub intent: Option<Intent>,
    pub date: Option<NaiveDate>,
    pub time: Option<TimeHint>,
    /// Digits as spoken; not yet normalized.
    pub phone: Option<String>,
    pub name: Option<String>,
}

impl Extracted {
    pub fn intent(&self) -> Intent {
        self.intent.unwrap_or(Intent::General)
    }
}

// Order matters: the first matching rule wins, so "reschedule" is tried before "schedule".
static INTENT_RULES: Lazy<Vec<(Intent, Regex)>> = Lazy::new(|| {
    [
        (Intent::Reschedule, r"\b(reschedul\w*|move|change|push (it )?back)\b"),
        (Intent::Cancel, r"\b(cancel\w*|call off|remove)\b"),
        (
            Intent::CheckRemaining,
            r"\b(remaining|sessions left|how many( sessions)?|package)\b",
        ),
        (
            Intent::Availability,
            r"\b(available|availability|free|openings?|open slots?)\b",
        ),
        (Intent::Goodbye, r"\b(good ?bye|bye|that'?s all|that is all|no thanks)\b"),
        (
            Intent::Confirm,
            r"\b(yes|yeah|yep|confirm\w*|i'?ll be there|see you( then)?|sounds good)\b",
        ),
        (
            Intent::Book,
            r"\b(schedul\w*|book\w*|appointment|session|training|sign me up)\b",
        ),
    ]
    .into_iter()
    .map(|(intent, pattern)| {
        let re = Regex::new(&format!("(?i){pattern}")).expect("intent pattern compiles");
        (intent, re)
    })
    .collect()
});

static WEEKDAY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(monday|tuesday|wednesday|thursday|friday|saturday|sunday)\b")
        .expect("pattern compiles")
});
static RELATIVE_DAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(today|tomorrow|next week)\b").expect("pattern compiles"));
static NUMERIC_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{1,2})/(\d{1,2})(?:/(\d{2}|\d{4}))?\b").expect("pattern compiles")
});
static CLOCK_12H: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})(?::(\d{2}))?\s*(am|pm|a\.m\.?|p\.m\.?)(?:[^a-z]|$)")
        .expect("pattern compiles")
});
static CLOCK_24H: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([01]?\d|2[0-3]):([0-5]\d)\b").expect("pattern compiles"));
static DAY_PART: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(morning|afternoon|evening|noon)\b").expect("pattern compiles")
});
static PHONE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\+?\d[\d\s().-]{8,}\d").expect("pattern compiles"));
static NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:my name is|this is|name's)\s+([a-z][a-z'-]*(?:\s+[a-z][a-z'-]*){0,2})")
        .expect("pattern compiles")
});

/// Words that end a name captured after "this is".
const NAME_STOP_WORDS: &[&str] = &[
    "and", "calling", "from", "about", "i", "my", "to", "with", "here", "speaking", "again",
];

/// Detects what the caller wants and pulls out any date, time, phone number and name.
///
/// Relative dates resolve against `today` in the business timezone.
pub fn extract(text: &str, today: NaiveDate) -> Extracted {
    Extracted {
        intent: detect_intent(text),
        date: extract_date(text, today),
        time: extract_time(text),
        phone: extract_phone(text),
        name: extract_name(text),
    }
}

pub fn detect_intent(text: &str) -> Option<Intent> {
    INTENT_RULES
        .iter()
        .find(|(_, re)| re.is_match(text))
        .map(|(intent, _)| *intent)
}

pub fn extract_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    if let Some(captures) = RELATIVE_DAY.captures(text) {
        return match captures[1].to_ascii_lowercase().as_str() {
            "today" => Some(today),
            "tomorrow" => today.succ_opt(),
            _ => Some(today + Duration::days(7)),
        };
    }

    if let Some(captures) = WEEKDAY.captures(text) {
        let weekday: Weekday = captures[1].parse().ok()?;
        return Some(next_weekday(today, weekday));
    }

    let captures = NUMERIC_DATE.captures(text)?;
    let month: u32 = captures[1].parse().ok()?;
    let day: u32 = captures[2].parse().ok()?;
    match captures.get(3) {
        Some(year) => {
            let year: i32 = year.as_str().parse().ok()?;
            let year = if year < 100 { 2000 + year } else { year };
            NaiveDate::from_ymd_opt(year, month, day)
        }
        // Without a year the next occurrence of that date is meant.
        None => NaiveDate::from_ymd_opt(today.year(), month, day)
            .filter(|date| *date >= today)
            .or_else(|| NaiveDate::from_ymd_opt(today.year() + 1, month, day)),
    }
}

/// The first `weekday` strictly after `today`; "monday" said on a Monday means next week.
fn next_weekday(today: NaiveDate, weekday: Weekday) -> NaiveDate {
    let ahead = (7 + weekday.num_days_from_monday() - today.weekday().num_days_from_monday()) % 7;
    let ahead = if ahead == 0 { 7 } else { ahead };
    today + Duration::days(i64::from(ahead))
}

pub fn extract_time(text: &str) -> Option<TimeHint> {
    if let Some(captures) = CLOCK_12H.captures(text) {
        let hour: u32 = captures[1].parse().ok()?;
        let minute: u32 = captures.get(2).map_or(Some(0), |m| m.as_str().parse().ok())?;
        if !(1..=12).contains(&hour) {
            return None;
        }
        let pm = captures[3].to_ascii_lowercase().starts_with('p');
        let hour = match (hour, pm) {
            (12, false) => 0,
            (12, true) => 12,
            (hour, true) => hour + 12,
            (hour, false) => hour,
        };
        return NaiveTime::from_hms_opt(hour, minute, 0).map(TimeHint::At);
    }

    if let Some(captures) = CLOCK_24H.captures(text) {
        let hour: u32 = captures[1].parse().ok()?;
        let minute: u32 = captures[2].parse().ok()?;
        return NaiveTime::from_hms_opt(hour, minute, 0).map(TimeHint::At);
    }

    let captures = DAY_PART.captures(text)?;
    match captures[1].to_ascii_lowercase().as_str() {
        "noon" => NaiveTime::from_hms_opt(12, 0, 0).map(TimeHint::At),
        "morning" => Some(TimeHint::Part(DayPart::Morning)),
        "afternoon" => Some(TimeHint::Part(DayPart::Afternoon)),
        _ => Some(TimeHint::Part(DayPart::Evening)),
    }
}

pub fn extract_phone(text: &str) -> Option<String> {
    PHONE
        .find_iter(text)
        .map(|m| m.as_str().trim().to_string())
        .find(|candidate| {
            let digits = candidate.chars().filter(char::is_ascii_digit).count();
            (10..=15).contains(&digits)
        })
}

pub fn extract_name(text: &str) -> Option<String> {
    let captures = NAME.captures(text)?;
    let words: Vec<String> = captures[1]
        .split_whitespace()
        .take_while(|word| !NAME_STOP_WORDS.contains(&word.to_ascii_lowercase().as_str()))
        .map(capitalize)
        .collect();

    if words.is_empty() {
        None
    } else {
        Some(words.join(" "))
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // A Monday.
    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 9, 16).unwrap()
    }

    fn time(h: u32, m: u32) -> Option<TimeHint> {
        Some(TimeHint::At(NaiveTime::from_hms_opt(h, m, 0).unwrap()))
    }

    #[test]
    fn reschedule_wins_over_schedule() {
        assert_eq!(
            detect_intent("I need to reschedule my session"),
            Some(Intent::Reschedule)
        );
        assert_eq!(
            detect_intent("I'd like to schedule a session"),
            Some(Intent::Book)
        );
    }

    #[test]
    fn common_requests_are_recognised() {
        assert_eq!(detect_intent("Please cancel Thursday"), Some(Intent::Cancel));
        assert_eq!(
            detect_intent("How many sessions do I have left?"),
            Some(Intent::CheckRemaining)
        );
        assert_eq!(
            detect_intent("Are you free on Friday?"),
            Some(Intent::Availability)
        );
        assert_eq!(detect_intent("Yes, I'll be there"), Some(Intent::Confirm));
        assert_eq!(detect_intent("Okay, bye!"), Some(Intent::Goodbye));
        assert_eq!(detect_intent("What should I eat before a workout?"), None);
    }

    #[test]
    fn relative_dates_resolve_against_today() {
        assert_eq!(extract_date("tomorrow please", today()), today().succ_opt());
        assert_eq!(
            extract_date("sometime next week", today()),
            Some(today() + Duration::days(7))
        );
    }

    #[test]
    fn weekday_names_mean_the_next_one() {
        assert_eq!(
            extract_date("how about Wednesday", today()),
            NaiveDate::from_ymd_opt(2030, 9, 18)
        );
        assert_eq!(
            extract_date("monday works", today()),
            NaiveDate::from_ymd_opt(2030, 9, 23)
        );
    }

    #[test]
    fn numeric_dates_roll_into_next_year_when_past() {
        assert_eq!(
            extract_date("on 12/15", today()),
            NaiveDate::from_ymd_opt(2030, 12, 15)
        );
        assert_eq!(
            extract_date("on 1/5", today()),
            NaiveDate::from_ymd_opt(2031, 1, 5)
        );
        assert_eq!(
            extract_date("10/2/31", today()),
            NaiveDate::from_ymd_opt(2031, 10, 2)
        );
    }

    #[test]
    fn clock_times_are_parsed() {
        assert_eq!(extract_time("at 2 pm"), time(14, 0));
        assert_eq!(extract_time("2:30PM works"), time(14, 30));
        assert_eq!(extract_time("12 a.m."), time(0, 0));
        assert_eq!(extract_time("say 14:00"), time(14, 0));
        assert_eq!(extract_time("around noon"), time(12, 0));
    }

    #[test]
    fn parts_of_day_are_hints() {
        assert_eq!(
            extract_time("tomorrow afternoon"),
            Some(TimeHint::Part(DayPart::Afternoon))
        );
        assert_eq!(extract_time("whenever"), None);
    }

    #[test]
    fn phone_numbers_need_ten_digits() {
        assert_eq!(
            extract_phone("it's 555-555-0123 thanks"),
            Some("555-555-0123".to_string())
        );
        assert_eq!(extract_phone("call 555-0123"), None);
    }

    #[test]
    fn names_stop_at_filler_words() {
        assert_eq!(
            extract_name("Hi, this is jordan reyes calling about my session"),
            Some("Jordan Reyes".to_string())
        );
        assert_eq!(extract_name("My name is Casey"), Some("Casey".to_string()));
        assert_eq!(extract_name("I want to book"), None);
    }

    #[test]
    fn extract_collects_every_slot() {
        let extracted = extract(
            "This is Casey, can I book Friday at 3pm? My number is 555 555 0124",
            today(),
        );
        assert_eq!(extracted.intent(), Intent::Book);
        assert_eq!(extracted.date, NaiveDate::from_ymd_opt(2030, 9, 20));
        assert_eq!(extracted.time, time(15, 0));
        assert_eq!(extracted.phone, Some("555 555 0124".to_string()));
        assert_eq!(extracted.name, Some("Casey".to_string()));
    }
}
