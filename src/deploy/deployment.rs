// ABOUTME: Generic deployment unit of work parameterized by state marker.
// ABOUTME: Carries the lock, target changeset, and staged path across phases.

use chrono::{DateTime, Utc};
use std::marker::PhantomData;
use std::path::Path;
use std::time::Instant;

use crate::env::Environment;
use crate::types::Changeset;

use super::lock::DeployLock;
use super::report::{DeploymentReport, Outcome};
use super::state::{Built, Pending, Promoted, Resolved};
use super::DeployErrorKind;

/// One deployment run in progress, parameterized by its current phase.
///
/// The state parameter `S` makes phase ordering a compile-time property:
/// a deployment cannot build before the lock is held or promote before the
/// build finished. The lock travels inside the value, so dropping a
/// deployment on any path releases it.
#[derive(Debug)]
pub struct Deployment<S> {
    pub(crate) env: Environment,
    pub(crate) lock: Option<DeployLock>,
    pub(crate) changeset: Option<Changeset>,
    pub(crate) staged: Option<std::path::PathBuf>,
    pub(crate) started_at: DateTime<Utc>,
    pub(crate) started: Instant,
    pub(crate) _state: PhantomData<S>,
}

impl Deployment<Pending> {
    /// Start a new deployment run for an application root.
    pub fn new(env: Environment) -> Self {
        Deployment {
            env,
            lock: None,
            changeset: None,
            staged: None,
            started_at: Utc::now(),
            started: Instant::now(),
            _state: PhantomData,
        }
    }
}

impl<S> Deployment<S> {
    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// The target changeset, once resolved.
    pub fn changeset(&self) -> Option<&Changeset> {
        self.changeset.as_ref()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// End the run as failed, releasing the lock and cleaning up any staged
    /// output that never got promoted.
    pub fn into_failed_report(mut self, kind: DeployErrorKind) -> DeploymentReport {
        if let Some(staged) = self.staged.take() {
            if staged.exists() {
                if let Err(e) = std::fs::remove_dir_all(&staged) {
                    tracing::warn!("failed to remove staging directory {}: {e}", staged.display());
                }
            }
        }
        if let Some(mut lock) = self.lock.take() {
            lock.release();
        }

        DeploymentReport {
            changeset: self.changeset.take().map(|c| c.id),
            outcome: Outcome::Failed(kind),
            started_at: self.started_at,
            duration: self.started.elapsed(),
        }
    }
}

// State-specific accessors.

impl Deployment<Resolved> {
    /// The target changeset. Guaranteed present in this state.
    pub fn target(&self) -> &Changeset {
        self.changeset.as_ref().expect("resolved deployment has a changeset")
    }
}

impl Deployment<Built> {
    pub fn target(&self) -> &Changeset {
        self.changeset.as_ref().expect("built deployment has a changeset")
    }

    /// Where the build staged its output.
    pub fn staged_path(&self) -> &Path {
        self.staged.as_deref().expect("built deployment has a staged path")
    }
}

impl Deployment<Promoted> {
    pub fn target(&self) -> &Changeset {
        self.changeset.as_ref().expect("promoted deployment has a changeset")
    }

    /// End the run as succeeded, releasing the lock explicitly.
    pub fn finish(mut self) -> DeploymentReport {
        if let Some(mut lock) = self.lock.take() {
            lock.release();
        }

        DeploymentReport {
            changeset: self.changeset.take().map(|c| c.id),
            outcome: Outcome::Succeeded,
            started_at: self.started_at,
            duration: self.started.elapsed(),
        }
    }
}
