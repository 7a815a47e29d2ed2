//! A thin wrapper around the `log` crate, plus a callback-based logger that
//! lets callers receive messages without configuring a concrete backend.

use log::{Level, LevelFilter, Metadata, Record};

pub(crate) use log::{debug, error, info, trace, warn};

/// Codes used to specify different levels of logging.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[non_exhaustive]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warning => write!(f, "warning"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

impl From<Level> for LogLevel {
    fn from(value: Level) -> Self {
        match value {
            Level::Trace => LogLevel::Trace,
            Level::Debug => LogLevel::Debug,
            Level::Info => LogLevel::Info,
            Level::Warn => LogLevel::Warning,
            Level::Error => LogLevel::Error,
        }
    }
}

impl From<LogLevel> for LevelFilter {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Trace => LevelFilter::Trace,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Warning => LevelFilter::Warn,
            LogLevel::Error => LevelFilter::Error,
        }
    }
}

/// Set the maximum level of message that will be logged.
pub fn set_log_level(level: LogLevel) {
    log::set_max_level(level.into());
}

pub(crate) fn is_log_enabled(level: LogLevel) -> bool {
    log::max_level() >= LevelFilter::from(level)
}

/// Set the callback function that is called when logging.
///
/// The `callback` function's first parameter is the level of the message
/// being logged, and the second is the message itself.
pub fn set_logging_callback<T>(callback: T)
where
    T: Fn(LogLevel, &str) + Send + Sync + 'static,
{
    let logger = Box::new(CallbackLogger { callback });

    let _ = log::set_boxed_logger(logger).map(|()| log::set_max_level(LevelFilter::Trace));
}

struct CallbackLogger<T: Fn(LogLevel, &str)> {
    callback: T,
}

impl<T: Fn(LogLevel, &str) + Send + Sync> log::Log for CallbackLogger<T> {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            (self.callback)(record.level().into(), &format!("{}", record.args()));
        }
    }

    fn flush(&self) {}
}

/// Flatten an error's `source()` chain into a single string, for one-line
/// logging of a failure that recovered locally (e.g. a per-plugin parse
/// error that became a Message instead of propagating).
pub(crate) fn format_details(error: &(dyn std::error::Error + 'static)) -> String {
    let mut details = error.to_string();
    let mut source = error.source();
    while let Some(e) = source {
        details.push_str(": ");
        details.push_str(&e.to_string());
        source = e.source();
    }
    details
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_from_log_level_should_map_each_variant() {
        assert_eq!(LogLevel::Trace, Level::Trace.into());
        assert_eq!(LogLevel::Debug, Level::Debug.into());
        assert_eq!(LogLevel::Info, Level::Info.into());
        assert_eq!(LogLevel::Warning, Level::Warn.into());
        assert_eq!(LogLevel::Error, Level::Error.into());
    }

    #[test]
    fn format_details_should_include_the_whole_source_chain() {
        #[derive(Debug)]
        struct Inner;
        impl std::fmt::Display for Inner {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "inner cause")
            }
        }
        impl std::error::Error for Inner {}

        #[derive(Debug)]
        struct Outer(Inner);
        impl std::fmt::Display for Outer {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "outer failure")
            }
        }
        impl std::error::Error for Outer {
            fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
                Some(&self.0)
            }
        }

        let details = format_details(&Outer(Inner));
        assert_eq!("outer failure: inner cause", details);
    }
}
