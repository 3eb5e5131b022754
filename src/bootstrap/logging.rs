//! Setup for the application logging.
//!
//! It redirects the log output to stdout with the level defined in the
//! configuration:
//!
//! - `Off`
//! - `Error`
//! - `Warn`
//! - `Info`
//! - `Debug`
//! - `Trace`
use std::sync::Once;

use log::{info, LevelFilter};

use crate::config::{Configuration, LogLevel};

static INIT: Once = Once::new();

/// It redirects the log output to stdout with the log level defined in the
/// configuration.
pub fn setup(cfg: &Configuration) {
    let level = config_level_or_default(cfg.core.log_level);

    if level == LevelFilter::Off {
        return;
    }

    INIT.call_once(|| {
        stdout_config(level);
    });
}

fn config_level_or_default(log_level: Option<LogLevel>) -> LevelFilter {
    match log_level {
        None => LevelFilter::Info,
        Some(level) => match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        },
    }
}

fn stdout_config(level: LevelFilter) {
    if let Err(_err) = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} [{}][{}] {}",
                chrono::Local::now().format("%+"),
                record.target(),
                record.level(),
                message
            ));
        })
        .level(level)
        .chain(std::io::stdout())
        .apply()
    {
        panic!("Failed to initialize logging.")
    }

    info!("logging initialized.");
}

#[cfg(test)]
mod tests {
    use log::LevelFilter;

    use super::config_level_or_default;
    use crate::config::LogLevel;

    #[test]
    fn it_should_default_to_info() {
        assert_eq!(config_level_or_default(None), LevelFilter::Info);
    }

    #[test]
    fn it_should_map_the_configured_level() {
        assert_eq!(config_level_or_default(Some(LogLevel::Debug)), LevelFilter::Debug);
        assert_eq!(config_level_or_default(Some(LogLevel::Off)), LevelFilter::Off);
    }
}
