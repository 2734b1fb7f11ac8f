//! Diagnostic output for both binaries.
//!
//! A single `tracing` subscriber is installed at startup. It writes to stderr, so the one line a
//! monitoring plugin prints on stdout stays untouched.

use std::fmt;

use chrono::{DateTime, Local, Locale};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;

/// Maps a `-v` count to a level: warnings by default, everything at three and above.
pub fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Installs the global subscriber. Must be called once, before anything logs.
pub fn init(level: LevelFilter, timer: Option<LocalizedTime>) {
    let builder = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false);

    match timer {
        Some(timer) => builder.with_timer(timer).init(),
        None => builder.without_time().init(),
    }
}

/// Timestamps rendered as locale date and time (`%x %X`).
#[derive(Debug, Clone, Copy)]
pub struct LocalizedTime {
    locale: Locale,
}

impl LocalizedTime {
    pub fn new(locale: Locale) -> Self {
        LocalizedTime { locale }
    }

    pub fn format(&self, at: &DateTime<Local>) -> String {
        at.format_localized("%x %X", self.locale).to_string()
    }

    pub fn now(&self) -> String {
        self.format(&Local::now())
    }
}

impl Default for LocalizedTime {
    fn default() -> Self {
        LocalizedTime::new(Locale::POSIX)
    }
}

impl FormatTime for LocalizedTime {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        write!(w, "{}", self.now())
    }
}

/// Parses a locale name such as `de_DE` or `POSIX`, for use as a clap value parser.
pub fn parse_locale(name: &str) -> Result<Locale, String> {
    Locale::try_from(name).map_err(|_| format!("unknown locale '{}'", name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_level_for() {
        assert_eq!(level_for(0), LevelFilter::WARN);
        assert_eq!(level_for(1), LevelFilter::INFO);
        assert_eq!(level_for(2), LevelFilter::DEBUG);
        assert_eq!(level_for(3), LevelFilter::TRACE);
        assert_eq!(level_for(200), LevelFilter::TRACE);
    }

    #[test]
    fn test_parse_locale() {
        assert!(matches!(parse_locale("POSIX"), Ok(Locale::POSIX)));
        assert!(matches!(parse_locale("de_DE"), Ok(Locale::de_DE)));
        assert!(parse_locale("xx_NOPE").is_err());
    }

    #[test]
    fn test_localized_format() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(LocalizedTime::default().format(&at), "03/09/24 14:05:07");
        assert_eq!(LocalizedTime::new(Locale::de_DE).format(&at), "09.03.2024 14:05:07");
    }
}
