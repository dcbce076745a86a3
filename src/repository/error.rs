// ABOUTME: Error types for source repository operations.
// ABOUTME: Distinguishes provisioning problems from unresolvable changesets.

use crate::types::ChangesetIdError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors from resolving or materializing source snapshots.
///
/// All variants are fatal to the deployment run; the orchestrator never
/// creates or repairs a repository on its own.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// No repository exists at the deployment repository path.
    #[error("deployment repository is not initialized at {0}")]
    Uninitialized(PathBuf),

    /// The repository exists but has no commits yet.
    #[error("deployment repository has no commits yet")]
    Empty,

    /// The requested changeset is unknown to the repository.
    #[error("no such changeset: {0}")]
    NoSuchChangeset(String),

    /// The backend reported an identifier this pipeline cannot accept.
    #[error("repository reported an invalid changeset id: {0}")]
    InvalidChangeset(#[from] ChangesetIdError),

    /// A source-control command ran and failed.
    #[error("git {command} failed with status {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: i32,
        stderr: String,
    },

    /// The source-control binary could not be spawned at all.
    #[error("failed to run git: {0}")]
    Io(#[from] std::io::Error),
}
