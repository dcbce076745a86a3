// ABOUTME: Append-only structured trace of deployment steps and durations.
// ABOUTME: One JSON record per line; written for post-hoc diagnosis only.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::time::Instant;

/// Process-wide trace sink for one deployment run.
///
/// The trace is never consulted for control flow, so every write failure is
/// demoted to a diagnostic and otherwise ignored.
pub struct Tracer {
    sink: Option<Mutex<File>>,
}

impl Tracer {
    /// Open (or create) the trace file in append mode, creating parent
    /// directories as needed.
    pub fn create(path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            sink: Some(Mutex::new(file)),
        })
    }

    /// A tracer that records nothing. Used by tests and when the trace file
    /// cannot be opened.
    pub fn disabled() -> Self {
        Self { sink: None }
    }

    /// Begin a named step. The returned guard records the step's duration
    /// when finished or dropped.
    pub fn step(&self, name: &str) -> TraceStep<'_> {
        TraceStep {
            tracer: self,
            name: name.to_string(),
            started_at: Utc::now(),
            started: Instant::now(),
            recorded: false,
        }
    }

    fn record(&self, record: &TraceRecord<'_>) {
        let Some(sink) = &self.sink else {
            return;
        };

        match serde_json::to_string(record) {
            Ok(json) => {
                let mut file = sink.lock();
                if let Err(e) = writeln!(file, "{json}") {
                    tracing::debug!("trace write failed: {e}");
                }
            }
            Err(e) => tracing::debug!("trace serialization failed: {e}"),
        }
    }
}

/// Guard for one in-flight trace step.
pub struct TraceStep<'a> {
    tracer: &'a Tracer,
    name: String,
    started_at: DateTime<Utc>,
    started: Instant,
    recorded: bool,
}

impl TraceStep<'_> {
    /// Record the step now instead of at drop.
    pub fn finish(mut self) {
        self.record();
    }

    fn record(&mut self) {
        if self.recorded {
            return;
        }
        self.recorded = true;
        self.tracer.record(&TraceRecord {
            step: &self.name,
            started_at: self.started_at,
            duration_ms: self.started.elapsed().as_millis() as u64,
        });
    }
}

impl Drop for TraceStep<'_> {
    fn drop(&mut self) {
        self.record();
    }
}

#[derive(Serialize)]
struct TraceRecord<'a> {
    step: &'a str,
    started_at: DateTime<Utc>,
    duration_ms: u64,
}
