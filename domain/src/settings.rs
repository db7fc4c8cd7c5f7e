//! Typed, validated view of the scheduling and calling parts of `service::config::Config`.

use crate::error::Error;
use crate::scheduling::BusinessHours;
use crate::Id;
use chrono::Duration;
use service::config::Config;

pub const DEFAULT_LOCATION: &str = "Gym";

#[derive(Debug, Clone, PartialEq)]
pub struct OutboundSettings {
    /// Dials made for one call record before it is abandoned.
    pub max_attempts: i32,
    /// Wait between a failed or unanswered dial and the next attempt.
    pub retry_backoff: Duration,
    /// Calls still dialing after this long are treated as failed.
    pub call_timeout: Duration,
    pub dispatch_interval: std::time::Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub business_hours: BusinessHours,
    pub slot_minutes: i64,
    pub session_minutes: i64,
    pub reminder_window_hours: i64,
    pub default_trainer_id: Option<Id>,
    pub default_location: String,
    pub use_session_agent: bool,
    /// Public URL the telephony provider calls back on, without a trailing slash.
    pub base_url: String,
    pub from_phone: Option<String>,
    pub outbound: OutboundSettings,
}

impl Settings {
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let business_hours =
            BusinessHours::from_spec(config.business_hours(), config.business_timezone())?;

        if config.slot_minutes == 0 || config.session_minutes == 0 {
            return Err(Error::config(
                "SLOT_MINUTES and SESSION_MINUTES must be greater than zero",
            ));
        }
        if config.outbound_max_attempts == 0 {
            return Err(Error::config("OUTBOUND_MAX_ATTEMPTS must be at least 1"));
        }

        let default_trainer_id = config
            .default_trainer_id()
            .map(|id| {
                entity_api::parse_id(id)
                    .map_err(|_| Error::config(format!("DEFAULT_TRAINER_ID is not a UUID: {id}")))
            })
            .transpose()?;

        Ok(Self {
            business_hours,
            slot_minutes: i64::from(config.slot_minutes),
            session_minutes: i64::from(config.session_minutes),
            reminder_window_hours: i64::from(config.reminder_window_hours),
            default_trainer_id,
            default_location: DEFAULT_LOCATION.to_string(),
            use_session_agent: config.use_session_agent,
            base_url: config.base_url().to_string(),
            from_phone: config.twilio_phone_number(),
            outbound: OutboundSettings {
                max_attempts: i32::try_from(config.outbound_max_attempts).unwrap_or(i32::MAX),
                retry_backoff: Duration::seconds(
                    i64::try_from(config.outbound_retry_backoff_secs).unwrap_or(i64::MAX / 1000),
                ),
                call_timeout: Duration::seconds(
                    i64::try_from(config.call_timeout_secs).unwrap_or(i64::MAX / 1000),
                ),
                dispatch_interval: std::time::Duration::from_secs(
                    config.dispatch_interval_secs.max(1),
                ),
            },
        })
    }

    pub fn slot_size(&self) -> Duration {
        Duration::minutes(self.slot_minutes)
    }

    pub fn session_length(&self) -> Duration {
        Duration::minutes(self.session_minutes)
    }

    /// Absolute URL for a path on this service.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[cfg(test)]
impl Settings {
    /// New York business hours, 09:00-18:00 every day, 30 minute slots, 60 minute sessions.
    pub(crate) fn for_tests() -> Self {
        Self {
            business_hours: BusinessHours::from_spec("daily=09:00-18:00", "America/New_York")
                .expect("valid business hours"),
            slot_minutes: 30,
            session_minutes: 60,
            reminder_window_hours: 24,
            default_trainer_id: None,
            default_location: DEFAULT_LOCATION.to_string(),
            use_session_agent: true,
            base_url: "https://voice.example.com".to_string(),
            from_phone: Some("+15555550100".to_string()),
            outbound: OutboundSettings {
                max_attempts: 3,
                retry_backoff: Duration::minutes(15),
                call_timeout: Duration::minutes(30),
                dispatch_interval: std::time::Duration::from_secs(300),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn config(args: &[&str]) -> Config {
        let mut argv = vec!["trainer_voice_rs"];
        argv.extend_from_slice(args);
        Config::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults_produce_valid_settings() {
        let settings = Settings::from_config(&config(&[
            "--base-url",
            "https://voice.example.com/",
            "--business-hours",
            "daily=09:00-18:00",
            "--business-timezone",
            "America/New_York",
            "--slot-minutes",
            "30",
            "--session-minutes",
            "60",
        ]))
        .unwrap();

        assert_eq!(settings.session_length(), Duration::minutes(60));
        assert_eq!(
            settings.url_for("/telephony/status"),
            "https://voice.example.com/telephony/status"
        );
        assert_eq!(settings.default_location, "Gym");
    }

    #[test]
    fn invalid_trainer_id_is_a_config_error() {
        let result = Settings::from_config(&config(&["--default-trainer-id", "sam"]));
        assert!(result.is_err());
    }

    #[test]
    fn zero_attempts_is_rejected() {
        let result = Settings::from_config(&config(&["--outbound-max-attempts", "0"]));
        assert!(result.is_err());
    }
}
