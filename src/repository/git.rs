// ABOUTME: Git-backed source repository adapter.
// ABOUTME: Shells out to git with a scoped environment, never mutating globals.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tokio::process::Command;

use crate::types::{Changeset, ChangesetId};

use super::{RepositoryError, SourceRepository};
use async_trait::async_trait;

/// Format string for resolving the head changeset: hash, author, strict ISO
/// date, subject — one field per line.
const HEAD_FORMAT: &str = "%H%n%an%n%aI%n%s";

/// Source provider backed by a git repository with a working tree.
pub struct GitRepository {
    path: PathBuf,
}

impl GitRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Run a git subcommand against this repository.
    ///
    /// `GIT_DIR`/`GIT_WORK_TREE` are removed from the child environment so an
    /// ambient override (e.g. from the post-push hook that triggered us)
    /// cannot redirect the command to an unrelated repository. The working
    /// directory is pinned to the repository path instead.
    async fn git(&self, args: &[&str]) -> Result<std::process::Output, RepositoryError> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.path)
            .env_remove("GIT_DIR")
            .env_remove("GIT_WORK_TREE")
            .env_remove("GIT_INDEX_FILE")
            .output()
            .await?;
        Ok(output)
    }

    fn ensure_initialized(&self) -> Result<(), RepositoryError> {
        if !self.path.join(".git").exists() {
            return Err(RepositoryError::Uninitialized(self.path.clone()));
        }
        Ok(())
    }

    fn command_failed(command: &str, output: &std::process::Output) -> RepositoryError {
        RepositoryError::CommandFailed {
            command: command.to_string(),
            status: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
    }
}

#[async_trait]
impl SourceRepository for GitRepository {
    async fn head(&self) -> Result<Changeset, RepositoryError> {
        self.ensure_initialized()?;

        let format = format!("--format={HEAD_FORMAT}");
        let output = self.git(&["log", "-1", &format]).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("does not have any commits") {
                return Err(RepositoryError::Empty);
            }
            return Err(Self::command_failed("log", &output));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut lines = stdout.lines();

        let id = match lines.next() {
            Some(hash) => ChangesetId::new(hash.trim())?,
            None => return Err(RepositoryError::Empty),
        };

        let mut changeset = Changeset::new(id);
        changeset.author = lines.next().map(|s| s.to_string()).filter(|s| !s.is_empty());
        changeset.timestamp = lines
            .next()
            .and_then(|s| DateTime::parse_from_rfc3339(s.trim()).ok())
            .map(|dt| dt.with_timezone(&Utc));
        changeset.message = lines.next().map(|s| s.to_string()).filter(|s| !s.is_empty());

        Ok(changeset)
    }

    async fn sync(&self, id: &ChangesetId) -> Result<(), RepositoryError> {
        self.ensure_initialized()?;

        // Verify the object exists before touching the working tree.
        let spec = format!("{id}^{{commit}}");
        let probe = self.git(&["cat-file", "-e", &spec]).await?;
        if !probe.status.success() {
            return Err(RepositoryError::NoSuchChangeset(id.to_string()));
        }

        let checkout = self
            .git(&["checkout", "--force", "--detach", id.as_str()])
            .await?;
        if !checkout.status.success() {
            return Err(Self::command_failed("checkout", &checkout));
        }

        // Drop anything a previous build left behind in the tree.
        let clean = self.git(&["clean", "-fd"]).await?;
        if !clean.status.success() {
            return Err(Self::command_failed("clean", &clean));
        }

        Ok(())
    }

    fn working_tree(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn head_on_missing_repository_is_uninitialized() {
        let dir = tempfile::tempdir().unwrap();
        let repo = GitRepository::new(dir.path().join("repository"));

        let err = repo.head().await.unwrap_err();
        assert!(matches!(err, RepositoryError::Uninitialized(_)));
    }

    #[tokio::test]
    async fn sync_on_missing_repository_is_uninitialized() {
        let dir = tempfile::tempdir().unwrap();
        let repo = GitRepository::new(dir.path());
        let id = ChangesetId::new("abc123").unwrap();

        let err = repo.sync(&id).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Uninitialized(_)));
    }

    #[test]
    fn working_tree_is_the_repository_path() {
        let repo = GitRepository::new("/srv/app/repository");
        assert_eq!(repo.working_tree(), Path::new("/srv/app/repository"));
    }
}
