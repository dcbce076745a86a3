// ABOUTME: Versioned source provider abstraction for the deployment pipeline.
// ABOUTME: Exposes the current changeset and materializes working snapshots.

mod error;
mod git;

pub use error::RepositoryError;
pub use git::GitRepository;

use crate::types::{Changeset, ChangesetId};
use async_trait::async_trait;
use std::path::Path;

/// A versioned source store the orchestrator deploys from.
///
/// `head` must never mutate working state; `sync` is the only operation
/// allowed to touch the working tree.
#[async_trait]
pub trait SourceRepository: Send + Sync {
    /// The latest changeset at the repository head.
    async fn head(&self) -> Result<Changeset, RepositoryError>;

    /// Materialize the working tree at the given changeset.
    async fn sync(&self, id: &ChangesetId) -> Result<(), RepositoryError>;

    /// The working tree builds read from.
    fn working_tree(&self) -> &Path;
}
