/*
Logger setup shared by the serial forwarder tools.

There are four severity streams (debug, info, warning, error). Each one is its own
log4rs appender that only accepts records of exactly its level, so every stream can be
pointed at a different sink (stdout, stderr or a file).

Verbosity follows the -D count of the tools:
    0   warnings and errors from everything, plus the tool's own info lines
    1   debug and info from libraries too, info lines get an "INFO:  " prefix
    2+  as 1, with file:line of the log call in every line
*/

use std::io;
use std::path::PathBuf;

use log::{Level, LevelFilter, Record, SetLoggerError};
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::append::file::FileAppender;
use log4rs::append::Append;
use log4rs::config::runtime::ConfigErrors;
use log4rs::config::{Appender, Config, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;
use log4rs::filter::{Filter, Response};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};
use thiserror::Error;

const TIMESTAMP_PATTERN: &str = "{d(%Y/%m/%d %H:%M:%S%.6f)}";
const LOCATION_PATTERN: &str = "{f}:{L}: ";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("unable to open log file {path}: {source}")]
    File { path: PathBuf, source: io::Error },
    #[error("invalid logger configuration: {0}")]
    Config(#[from] ConfigErrors),
    #[error("unable to install logger: {0}")]
    Init(#[from] SetLoggerError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, Display)]
#[strum(serialize_all = "lowercase")]
pub enum LogStream {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogStream {
    pub fn level(self) -> Level {
        match self {
            LogStream::Debug => Level::Debug,
            LogStream::Info => Level::Info,
            LogStream::Warning => Level::Warn,
            LogStream::Error => Level::Error,
        }
    }

    fn prefix(self, debug_level: u8) -> &'static str {
        match self {
            LogStream::Debug => "DEBUG: ",
            // plain progress lines when not debugging
            LogStream::Info if debug_level == 0 => "",
            LogStream::Info => "INFO:  ",
            LogStream::Warning => "WARN:  ",
            LogStream::Error => "ERROR: ",
        }
    }
}

/// Where a stream's lines end up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogSink {
    Stdout,
    Stderr,
    File(PathBuf),
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Number of -D flags given
    pub debug_level: u8,
    pub debug: LogSink,
    pub info: LogSink,
    pub warning: LogSink,
    pub error: LogSink,
    /// Log targets (crate names) whose debug and info output needs debug_level >= 1
    pub library_targets: Vec<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            debug_level: 0,
            debug: LogSink::Stdout,
            info: LogSink::Stdout,
            warning: LogSink::Stdout,
            error: LogSink::Stdout,
            library_targets: Vec::new(),
        }
    }
}

impl LogConfig {
    pub fn with_debug_level(debug_level: u8) -> Self {
        LogConfig {
            debug_level,
            ..LogConfig::default()
        }
    }

    pub fn sink(&self, stream: LogStream) -> &LogSink {
        match stream {
            LogStream::Debug => &self.debug,
            LogStream::Info => &self.info,
            LogStream::Warning => &self.warning,
            LogStream::Error => &self.error,
        }
    }

    pub fn set_sink(&mut self, stream: LogStream, sink: LogSink) {
        match stream {
            LogStream::Debug => self.debug = sink,
            LogStream::Info => self.info = sink,
            LogStream::Warning => self.warning = sink,
            LogStream::Error => self.error = sink,
        }
    }

    /// Point every stream at the same sink
    pub fn all_to(mut self, sink: LogSink) -> Self {
        for stream in LogStream::iter() {
            self.set_sink(stream, sink.clone());
        }
        self
    }

    pub fn library_target(mut self, target: &str) -> Self {
        self.library_targets.push(target.to_string());
        self
    }
}

/// Accepts records of exactly one level
#[derive(Debug)]
struct SeverityFilter(Level);

impl Filter for SeverityFilter {
    fn filter(&self, record: &Record) -> Response {
        if record.level() == self.0 {
            Response::Neutral
        } else {
            Response::Reject
        }
    }
}

fn line_pattern(stream: LogStream, debug_level: u8) -> String {
    let location = if debug_level > 1 { LOCATION_PATTERN } else { "" };
    format!(
        "{}{} {}{{m}}{{n}}",
        stream.prefix(debug_level),
        TIMESTAMP_PATTERN,
        location
    )
}

fn build_appender(sink: &LogSink, pattern: &str) -> Result<Box<dyn Append>, LoggingError> {
    let encoder = Box::new(PatternEncoder::new(pattern));
    let appender: Box<dyn Append> = match sink {
        LogSink::Stdout => Box::new(
            ConsoleAppender::builder()
                .encoder(encoder)
                .target(Target::Stdout)
                .build(),
        ),
        LogSink::Stderr => Box::new(
            ConsoleAppender::builder()
                .encoder(encoder)
                .target(Target::Stderr)
                .build(),
        ),
        LogSink::File(path) => Box::new(
            FileAppender::builder()
                .encoder(encoder)
                .build(path)
                .map_err(|source| LoggingError::File {
                    path: path.clone(),
                    source,
                })?,
        ),
    };
    Ok(appender)
}

pub fn configure_logger(log_config: &LogConfig) -> Result<Config, LoggingError> {
    let mut builder = Config::builder();
    let mut root = Root::builder();

    for stream in LogStream::iter() {
        let name = stream.to_string();
        let appender = build_appender(
            log_config.sink(stream),
            &line_pattern(stream, log_config.debug_level),
        )?;
        builder = builder.appender(
            Appender::builder()
                .filter(Box::new(SeverityFilter(stream.level())))
                .build(name.clone(), appender),
        );
        root = root.appender(name);
    }

    let (root_level, library_level) = if log_config.debug_level > 0 {
        (LevelFilter::Debug, LevelFilter::Debug)
    } else {
        (LevelFilter::Info, LevelFilter::Warn)
    };
    for target in &log_config.library_targets {
        builder = builder.logger(Logger::builder().build(target.clone(), library_level));
    }

    Ok(builder.build(root.build(root_level))?)
}

pub fn init_logger(log_config: &LogConfig) -> Result<log4rs::Handle, LoggingError> {
    let config = configure_logger(log_config)?;
    let handle = log4rs::init_config(config)?;
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::{debug, error, info, warn};
    use tempdir::TempDir;

    #[test]
    fn test_line_patterns() {
        assert_eq!(
            line_pattern(LogStream::Info, 0),
            "{d(%Y/%m/%d %H:%M:%S%.6f)} {m}{n}"
        );
        assert_eq!(
            line_pattern(LogStream::Info, 1),
            "INFO:  {d(%Y/%m/%d %H:%M:%S%.6f)} {m}{n}"
        );
        assert_eq!(
            line_pattern(LogStream::Error, 2),
            "ERROR: {d(%Y/%m/%d %H:%M:%S%.6f)} {f}:{L}: {m}{n}"
        );
    }

    #[test]
    fn test_severity_filter() {
        let filter = SeverityFilter(Level::Warn);
        let verdict = filter.filter(&Record::builder().args(format_args!("w")).level(Level::Warn).build());
        assert!(matches!(verdict, Response::Neutral));
        let verdict = filter.filter(&Record::builder().args(format_args!("e")).level(Level::Error).build());
        assert!(matches!(verdict, Response::Reject));
    }

    #[test]
    fn test_sink_assignment() {
        let mut config = LogConfig::default().all_to(LogSink::Stderr);
        for stream in LogStream::iter() {
            assert_eq!(config.sink(stream), &LogSink::Stderr);
        }
        config.set_sink(LogStream::Error, LogSink::Stdout);
        assert_eq!(config.sink(LogStream::Error), &LogSink::Stdout);
        assert_eq!(config.sink(LogStream::Warning), &LogSink::Stderr);
    }

    #[test]
    fn test_configure_console() {
        assert!(configure_logger(&LogConfig::with_debug_level(2)).is_ok());
    }

    #[test]
    fn test_configure_unwritable_path_fails() {
        let dir = TempDir::new("logging").unwrap();
        // FileAppender creates missing parent dirs, so put a plain file where a dir should be
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"").unwrap();
        let config = LogConfig::default().all_to(LogSink::File(blocker.join("log.txt")));
        assert!(matches!(
            configure_logger(&config),
            Err(LoggingError::File { .. })
        ));
    }

    // Installs the global logger, so this is the only test that may call init_logger
    #[test]
    fn test_log_severities() {
        let dir = TempDir::new("logging").unwrap();
        let log_path = dir.path().join("all_logs.log");
        let config = LogConfig::default()
            .all_to(LogSink::File(log_path.clone()))
            .library_target("noisy_lib");
        init_logger(&config).unwrap();

        error!("This is an error message");
        info!("This is an info message");
        debug!("This is a debug message");
        warn!("This is a warning message");
        info!(target: "noisy_lib", "This is library chatter");
        warn!(target: "noisy_lib", "This is a library warning");

        let logged = std::fs::read_to_string(&log_path).unwrap();
        let lines: Vec<&str> = logged.lines().collect();
        assert_eq!(lines.len(), 4, "{}", logged);
        assert!(lines[0].starts_with("ERROR: ") && lines[0].ends_with("This is an error message"));
        assert!(!lines[1].starts_with("INFO") && lines[1].ends_with("This is an info message"));
        assert!(lines[2].starts_with("WARN:  ") && lines[2].ends_with("This is a warning message"));
        assert!(lines[3].starts_with("WARN:  ") && lines[3].ends_with("This is a library warning"));
    }
}
