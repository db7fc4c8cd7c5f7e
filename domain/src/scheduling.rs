//! Pure scheduling rules: business hours, conflict detection, slot search and
//! reminder eligibility. Nothing in here touches the store.

use crate::error::Error;
use crate::sessions::Model as Session;
use crate::Id;
use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc, Weekday,
};
use chrono_tz::Tz;
use entity::session_status::SessionStatus;

/// Opening window for a single weekday, half-open `[open, close)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub open: NaiveTime,
    pub close: NaiveTime,
}

impl DayWindow {
    pub fn new(open: NaiveTime, close: NaiveTime) -> Result<Self, Error> {
        if open >= close {
            return Err(Error::config(format!(
                "Business hours must open before they close ({open} - {close})"
            )));
        }
        Ok(Self { open, close })
    }

    fn contains(&self, time: NaiveTime) -> bool {
        time >= self.open && time < self.close
    }
}

/// Per-weekday opening hours in a single IANA timezone.
#[derive(Debug, Clone, PartialEq)]
pub struct BusinessHours {
    timezone: Tz,
    // Indexed by `Weekday::num_days_from_monday`; `None` means closed.
    windows: [Option<DayWindow>; 7],
}

impl BusinessHours {
    pub fn new(timezone: Tz, windows: [Option<DayWindow>; 7]) -> Self {
        Self { timezone, windows }
    }

    /// Same window every day of the week.
    pub fn daily(timezone: Tz, window: DayWindow) -> Self {
        Self::new(timezone, [Some(window); 7])
    }

    /// Parses an hours description such as `daily=09:00-18:00` or
    /// `mon-fri=06:00-20:00,sat=08:00-12:00,sun=closed`. Later entries override
    /// earlier ones, so `daily=09:00-18:00,sun=closed` works as expected.
    pub fn from_spec(spec: &str, timezone: &str) -> Result<Self, Error> {
        let timezone: Tz = timezone
            .trim()
            .parse()
            .map_err(|_| Error::config(format!("Unknown timezone: {timezone}")))?;

        let mut windows = [None; 7];
        for entry in spec.split([',', ';']).map(str::trim).filter(|e| !e.is_empty()) {
            let (days, hours) = entry
                .split_once('=')
                .ok_or_else(|| Error::config(format!("Invalid business hours entry: {entry}")))?;

            let window = parse_window(hours.trim())?;
            for day in parse_days(days.trim())? {
                windows[day.num_days_from_monday() as usize] = window;
            }
        }

        if windows.iter().all(Option::is_none) {
            return Err(Error::config(format!(
                "Business hours never open: {spec}"
            )));
        }

        Ok(Self::new(timezone, windows))
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn window_for(&self, weekday: Weekday) -> Option<DayWindow> {
        self.windows[weekday.num_days_from_monday() as usize]
    }

    pub fn is_within_business_hours<T: TimeZone>(&self, at: &DateTime<T>) -> bool {
        let local = at.with_timezone(&self.timezone);
        self.window_for(local.weekday())
            .is_some_and(|window| window.contains(local.time()))
    }

    /// True when a session of `duration` starting at `start` begins inside the window and
    /// ends no later than closing time on the same local day.
    pub fn session_fits<T: TimeZone>(&self, start: &DateTime<T>, duration: Duration) -> bool {
        let local_start = start.with_timezone(&self.timezone);
        let Some(window) = self.window_for(local_start.weekday()) else {
            return false;
        };
        if !window.contains(local_start.time()) {
            return false;
        }

        let local_end = local_start.clone() + duration;
        local_end.date_naive() == local_start.date_naive() && local_end.time() <= window.close
    }

    /// Candidate start times for `date` (local to the business) that fit a session of
    /// `session_length` and do not collide with `existing` sessions of `trainer_id`.
    ///
    /// Candidates step by `slot_size` from opening time. Local times skipped by a DST
    /// transition are left out.
    pub fn find_available_slots(
        &self,
        trainer_id: Id,
        date: NaiveDate,
        existing: &[Session],
        slot_size: Duration,
        session_length: Duration,
    ) -> Vec<DateTime<FixedOffset>> {
        let Some(window) = self.window_for(date.weekday()) else {
            return Vec::new();
        };
        if slot_size <= Duration::zero() || session_length <= Duration::zero() {
            return Vec::new();
        }

        let close = date.and_time(window.close);
        let mut candidate = date.and_time(window.open);
        let mut slots = Vec::new();

        while candidate + session_length <= close {
            if let Some(start) = self.timezone.from_local_datetime(&candidate).single() {
                let start = start.fixed_offset();
                if !has_conflict(trainer_id, start, session_length, existing) {
                    slots.push(start);
                }
            }
            candidate += slot_size;
        }

        slots
    }
}

fn parse_window(hours: &str) -> Result<Option<DayWindow>, Error> {
    if hours.eq_ignore_ascii_case("closed") {
        return Ok(None);
    }

    let (open, close) = hours
        .split_once('-')
        .ok_or_else(|| Error::config(format!("Invalid business hours window: {hours}")))?;
    let parse_time = |value: &str| {
        NaiveTime::parse_from_str(value.trim(), "%H:%M")
            .map_err(|_| Error::config(format!("Invalid time of day: {value}")))
    };

    DayWindow::new(parse_time(open)?, parse_time(close)?).map(Some)
}

fn parse_days(days: &str) -> Result<Vec<Weekday>, Error> {
    if days.eq_ignore_ascii_case("daily") {
        return Ok(all_weekdays().collect());
    }

    let parse_day = |value: &str| {
        value
            .trim()
            .parse::<Weekday>()
            .map_err(|_| Error::config(format!("Invalid weekday: {value}")))
    };

    match days.split_once('-') {
        Some((first, last)) => {
            let first = parse_day(first)?;
            let last = parse_day(last)?;
            let mut range = vec![first];
            let mut day = first;
            while day != last {
                day = day.succ();
                range.push(day);
            }
            Ok(range)
        }
        None => Ok(vec![parse_day(days)?]),
    }
}

fn all_weekdays() -> impl Iterator<Item = Weekday> {
    [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ]
    .into_iter()
}

/// Whether `[start, start + duration)` intersects any non-cancelled session of
/// `trainer_id` in `existing`. Back-to-back sessions do not conflict.
pub fn has_conflict(
    trainer_id: Id,
    start: DateTime<FixedOffset>,
    duration: Duration,
    existing: &[Session],
) -> bool {
    let end = start + duration;
    existing.iter().any(|session| {
        session.trainer_id == trainer_id
            && session.status != SessionStatus::Cancelled
            && session.date_time < end
            && start < session.end_time()
    })
}

/// A reminder is due for a scheduled session without a reminder that starts within
/// the next `window_hours`.
pub fn is_reminder_due(session: &Session, now: DateTime<Utc>, window_hours: i64) -> bool {
    if session.status != SessionStatus::Scheduled || session.reminder_sent {
        return false;
    }

    let until_start = session.date_time.with_timezone(&Utc) - now;
    until_start >= Duration::zero() && until_start <= Duration::hours(window_hours)
}

/// Parses a session start time. Only RFC 3339 timestamps with an explicit offset are
/// accepted so a time can never be silently interpreted in the server's zone.
pub fn parse_session_time(value: &str) -> Result<DateTime<FixedOffset>, Error> {
    DateTime::parse_from_rfc3339(value.trim()).map_err(|_| {
        Error::validation(format!(
            "'{value}' is not a valid session time; use RFC 3339 with an offset, e.g. 2025-09-15T14:00:00-04:00"
        ))
    })
}
