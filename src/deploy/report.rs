// ABOUTME: Immutable summary of one finished deployment run.
// ABOUTME: Models "handled failure" vs "success" without exception machinery.

use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::types::ChangesetId;

use super::DeployErrorKind;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    Failed(DeployErrorKind),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Succeeded)
    }
}

/// Finalized record of one `deploy()` call. Produced on every completed run,
/// including recovered domain failures; infrastructure faults propagate as
/// errors instead.
#[derive(Debug)]
pub struct DeploymentReport {
    /// Target changeset, if the run got far enough to resolve one.
    pub changeset: Option<ChangesetId>,
    pub outcome: Outcome,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
}
