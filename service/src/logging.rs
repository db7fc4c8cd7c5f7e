use crate::config::Config;
use log::LevelFilter;
use simplelog::{self, ConfigBuilder};

/// Dependencies whose logs are suppressed unless running at Trace level.
const FILTERED_MODULES: &[&str] = &[
    "sqlx", "sea_orm", "tower", "hyper", "hyper_util", "axum", "reqwest", "rustls",
];

pub struct Logger {}

impl Logger {
    /// Initializes the global logger from the configured level filter.
    ///
    /// At Trace level every dependency log is shown; otherwise the modules in
    /// `FILTERED_MODULES` are muted so call handling and dispatcher output stay readable.
    pub fn init_logger(config: &Config) {
        let log_level_filter = Self::convert_level_filter(config.log_level_filter);
        let log_config = Self::build_log_config(config.log_level_filter != LevelFilter::Trace);

        // A second init (e.g. seed_db after a test harness) is harmless; keep the first logger.
        if let Err(e) = simplelog::TermLogger::init(
            log_level_filter,
            log_config,
            simplelog::TerminalMode::Mixed,
            simplelog::ColorChoice::Auto,
        ) {
            eprintln!("Logger already initialized: {e}");
        }
    }

    fn convert_level_filter(level: LevelFilter) -> simplelog::LevelFilter {
        match level {
            LevelFilter::Off => simplelog::LevelFilter::Off,
            LevelFilter::Error => simplelog::LevelFilter::Error,
            LevelFilter::Warn => simplelog::LevelFilter::Warn,
            LevelFilter::Info => simplelog::LevelFilter::Info,
            LevelFilter::Debug => simplelog::LevelFilter::Debug,
            LevelFilter::Trace => simplelog::LevelFilter::Trace,
        }
    }

    fn build_log_config(apply_filters: bool) -> simplelog::Config {
        let mut builder = ConfigBuilder::new();
        builder.set_time_format_rfc3339();

        if apply_filters {
            for module in FILTERED_MODULES {
                builder.add_filter_ignore_str(module);
            }
        }

        builder.build()
    }
}
