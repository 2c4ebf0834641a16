//! Thin wrapper over `simplelog` so that binaries and tests can switch the
//! solver diagnostics on with a single call.
//!
//! The crate itself only talks to the `log` facade; nothing is printed until one of
//! the functions below installs a backend.
use crate::settings::FlashSettings;
use log::LevelFilter;
use simplelog::{ColorChoice, Config, SimpleLogger, TermLogger, TerminalMode};

/// Installs a terminal logger, falling back to a plain stdout logger when no terminal
/// is attached. Returns `false` if a global logger has already been set.
pub fn init_logger(level: LevelFilter) -> bool {
    if TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .is_ok()
    {
        return true;
    }
    SimpleLogger::init(level, Config::default()).is_ok()
}

/// "trace", "debug", "info", "warn", "error", "off"; anything else maps to `Info`
pub fn parse_level(level: &str) -> LevelFilter {
    level.trim().parse::<LevelFilter>().unwrap_or(LevelFilter::Info)
}

pub fn init_logger_from_settings(settings: &FlashSettings) -> bool {
    init_logger(parse_level(&settings.log_level))
}
