// ABOUTME: User-facing log channel with the accumulated error flag.
// ABOUTME: Console sink supports normal, quiet (CI), and JSON output modes.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};

/// Severity of a log entry. `Error` entries flip the run-level error flag
/// that decides the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Message,
    Warning,
    Error,
}

/// One recorded log line.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// Capability for recording deployment progress and failures.
///
/// The accumulated `has_errors` flag is the sole success/failure signal the
/// outer process reads; components never branch on it mid-run.
pub trait Logger: Send + Sync {
    fn log(&self, level: LogLevel, message: &str);

    fn has_errors(&self) -> bool;

    fn message(&self, message: &str) {
        self.log(LogLevel::Message, message);
    }

    fn warning(&self, message: &str) {
        self.log(LogLevel::Warning, message);
    }

    fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }
}

/// Output mode for console feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-friendly output with progress messages
    Normal,
    /// Minimal output for CI (errors only)
    Quiet,
    /// JSON lines for scripting
    Json,
}

/// Console sink: messages to stdout, warnings and errors to stderr.
pub struct ConsoleLogger {
    mode: OutputMode,
    errors: AtomicBool,
}

impl ConsoleLogger {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            errors: AtomicBool::new(false),
        }
    }
}

impl Logger for ConsoleLogger {
    fn log(&self, level: LogLevel, message: &str) {
        if level == LogLevel::Error {
            self.errors.store(true, Ordering::SeqCst);
        }

        match (self.mode, level) {
            (OutputMode::Normal, LogLevel::Message) => println!("{message}"),
            (OutputMode::Normal, LogLevel::Warning) => eprintln!("Warning: {message}"),
            (OutputMode::Quiet, LogLevel::Message | LogLevel::Warning) => {}
            (OutputMode::Normal | OutputMode::Quiet, LogLevel::Error) => {
                eprintln!("Error: {message}")
            }
            (OutputMode::Json, _) => {
                let event = JsonEvent {
                    event: match level {
                        LogLevel::Message => "message",
                        LogLevel::Warning => "warning",
                        LogLevel::Error => "error",
                    },
                    message,
                };
                if let Ok(json) = serde_json::to_string(&event) {
                    if level == LogLevel::Message {
                        println!("{json}");
                    } else {
                        eprintln!("{json}");
                    }
                }
            }
        }
    }

    fn has_errors(&self) -> bool {
        self.errors.load(Ordering::SeqCst)
    }
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    event: &'a str,
    message: &'a str,
}

/// A true no-op sink. Selected explicitly where output must be swallowed;
/// never installed as a hidden default.
pub struct NullLogger;

impl Logger for NullLogger {
    fn log(&self, _level: LogLevel, _message: &str) {}

    fn has_errors(&self) -> bool {
        false
    }
}

/// Recording sink for tests: keeps every entry and the error flag.
#[derive(Default)]
pub struct MemoryLogger {
    entries: Mutex<Vec<LogEntry>>,
    errors: AtomicBool,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.entries.lock().iter().map(|e| e.message.clone()).collect()
    }
}

impl Logger for MemoryLogger {
    fn log(&self, level: LogLevel, message: &str) {
        if level == LogLevel::Error {
            self.errors.store(true, Ordering::SeqCst);
        }
        self.entries.lock().push(LogEntry {
            level,
            message: message.to_string(),
            at: Utc::now(),
        });
    }

    fn has_errors(&self) -> bool {
        self.errors.load(Ordering::SeqCst)
    }
}
