// ABOUTME: Error taxonomy for one deployment run.
// ABOUTME: Domain failures are recovered into log entries; only faults propagate.

use chrono::{DateTime, Utc};

use crate::build::BuildError;
use crate::repository::RepositoryError;

/// Who holds a contested deployment lock.
#[derive(Debug, Clone)]
pub struct LockHolderInfo {
    pub holder: String,
    pub pid: u32,
    pub started_at: DateTime<Utc>,
}

/// Errors that can end a deployment run.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// Another run holds the deployment lock.
    #[error(
        "another deployment is in progress (held by {} pid {} since {})",
        .0.holder, .0.pid, .0.started_at
    )]
    LockHeld(LockHolderInfo),

    /// The lock file could not be acquired or maintained.
    #[error("deployment lock error: {0}")]
    Lock(String),

    /// The source repository could not provide a snapshot.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// The builder reported a failure.
    #[error(transparent)]
    Build(#[from] BuildError),

    /// A pre-deploy hook refused the run.
    #[error("pre-deploy hook failed: {0}")]
    Hook(String),

    /// Promoting the staged artifact to live failed.
    #[error("promotion failed: {0}")]
    Promotion(String),

    /// Unexpected filesystem or process failure.
    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployErrorKind {
    LockHeld,
    Lock,
    Repository,
    Build,
    Hook,
    Promotion,
    Infrastructure,
}

impl DeployError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> DeployErrorKind {
        match self {
            DeployError::LockHeld(_) => DeployErrorKind::LockHeld,
            DeployError::Lock(_) => DeployErrorKind::Lock,
            DeployError::Repository(_) => DeployErrorKind::Repository,
            DeployError::Build(_) => DeployErrorKind::Build,
            DeployError::Hook(_) => DeployErrorKind::Hook,
            DeployError::Promotion(_) => DeployErrorKind::Promotion,
            DeployError::Io(_) => DeployErrorKind::Infrastructure,
        }
    }

    /// Whether this error must propagate out of the run as a fault instead
    /// of being recovered into a failed outcome.
    pub fn is_fault(&self) -> bool {
        matches!(
            self.kind(),
            DeployErrorKind::Infrastructure | DeployErrorKind::Promotion
        )
    }

    /// Returns lock holder details if this is a contested-lock error.
    pub fn lock_holder_info(&self) -> Option<&LockHolderInfo> {
        match self {
            DeployError::LockHeld(info) => Some(info),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_held_exposes_holder_info() {
        let err = DeployError::LockHeld(LockHolderInfo {
            holder: "build-agent".to_string(),
            pid: 4242,
            started_at: Utc::now(),
        });

        assert_eq!(err.kind(), DeployErrorKind::LockHeld);
        let info = err.lock_holder_info().unwrap();
        assert_eq!(info.holder, "build-agent");
        assert_eq!(info.pid, 4242);
    }

    #[test]
    fn domain_errors_are_not_faults() {
        let err = DeployError::Repository(RepositoryError::Empty);
        assert!(!err.is_fault());

        let err = DeployError::Lock("parent directory vanished".to_string());
        assert!(!err.is_fault());
    }

    #[test]
    fn io_and_promotion_errors_are_faults() {
        let err = DeployError::Io(std::io::Error::other("disk gone"));
        assert!(err.is_fault());

        let err = DeployError::Promotion("web root is a non-empty directory".to_string());
        assert!(err.is_fault());
    }
}
