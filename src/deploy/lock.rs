// ABOUTME: Cross-process deployment lock backed by a file under the app root.
// ABOUTME: Atomic create-if-absent acquisition with holder info stored as JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::error::{DeployError, LockHolderInfo};

/// Poll interval while waiting for a contested lock.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Information about who holds the deployment lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    /// Hostname of the machine that holds the lock.
    pub holder: String,
    /// Process ID of the lock holder.
    pub pid: u32,
    /// When the lock was acquired.
    pub started_at: DateTime<Utc>,
    /// Application root being deployed.
    pub root: String,
}

impl LockInfo {
    /// Create new lock info for the current process.
    pub fn new(root: &Path) -> Self {
        Self {
            holder: gethostname::gethostname().to_string_lossy().into_owned(),
            pid: std::process::id(),
            started_at: Utc::now(),
            root: root.display().to_string(),
        }
    }

    /// Check if this lock is stale (older than 1 hour).
    pub fn is_stale(&self) -> bool {
        let age = Utc::now() - self.started_at;
        age.num_hours() >= 1
    }

    fn holder_info(&self) -> LockHolderInfo {
        LockHolderInfo {
            holder: self.holder.clone(),
            pid: self.pid,
            started_at: self.started_at,
        }
    }
}

/// How long to wait for a contested lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockPolicy {
    /// Fail immediately if another run holds the lock.
    NoWait,
    /// Poll until the deadline, then fail. Never unbounded.
    Wait(Duration),
}

/// The deployment lock for one application root.
///
/// Backed by a marker file whose atomic creation is the cross-process
/// check-and-set. Repeated acquisition through the same `DeployLock` value is
/// a no-op; a second `DeployLock` for the same path — in this process or any
/// other — is refused until release. The lock releases on drop, so a fault
/// anywhere in the protected section cannot leave the file behind.
#[derive(Debug)]
pub struct DeployLock {
    path: PathBuf,
    root: PathBuf,
    held: bool,
}

impl DeployLock {
    pub fn new(path: PathBuf, root: PathBuf) -> Self {
        Self {
            path,
            root,
            held: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_held(&self) -> bool {
        self.held
    }

    /// Acquire the lock under the given policy.
    ///
    /// `force` breaks an existing lock even if it is not stale; it applies to
    /// the first attempt only, so a waiting acquirer cannot repeatedly stomp
    /// a faster competitor.
    pub async fn acquire(&mut self, policy: LockPolicy, force: bool) -> Result<(), DeployError> {
        match policy {
            LockPolicy::NoWait => self.try_acquire(force).await,
            LockPolicy::Wait(timeout) => {
                let deadline = std::time::Instant::now() + timeout;
                let mut force = force;
                loop {
                    match self.try_acquire(force).await {
                        Ok(()) => return Ok(()),
                        Err(e @ DeployError::LockHeld(_)) => {
                            if std::time::Instant::now() >= deadline {
                                return Err(e);
                            }
                            tokio::time::sleep(WAIT_POLL_INTERVAL).await;
                        }
                        Err(e) => return Err(e),
                    }
                    force = false;
                }
            }
        }
    }

    /// Try to acquire the lock without waiting.
    ///
    /// Atomic create-if-not-exists closes the check-and-set window: two
    /// racing acquirers can never both observe "unheld". A stale or
    /// unreadable lock is broken with a warning, then acquisition retries
    /// exactly once.
    pub async fn try_acquire(&mut self, force: bool) -> Result<(), DeployError> {
        if self.held {
            // Re-acquisition by the holder is a no-op.
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| DeployError::Lock(format!("failed to create lock directory: {e}")))?;
        }

        if self.write_marker()? {
            self.held = true;
            return Ok(());
        }

        // Lock file exists - decide whether the current holder may be evicted.
        let should_break = match self.read_marker() {
            Some(existing) => {
                if force {
                    tracing::warn!(
                        "Breaking lock held by {} (pid {}) since {}",
                        existing.holder,
                        existing.pid,
                        existing.started_at
                    );
                    true
                } else if existing.is_stale() {
                    tracing::warn!(
                        "Auto-breaking stale lock held by {} (pid {}) since {}",
                        existing.holder,
                        existing.pid,
                        existing.started_at
                    );
                    true
                } else {
                    return Err(DeployError::LockHeld(existing.holder_info()));
                }
            }
            None => {
                // Unreadable or corrupted lock info, break it.
                tracing::warn!("Lock info unreadable, breaking lock");
                true
            }
        };

        if should_break {
            let _ = std::fs::remove_file(&self.path);
        }

        if self.write_marker()? {
            self.held = true;
            return Ok(());
        }

        match self.read_marker() {
            Some(existing) => Err(DeployError::LockHeld(existing.holder_info())),
            None => Err(DeployError::Lock(
                "lock acquired by another process during break".to_string(),
            )),
        }
    }

    /// Release the lock. Idempotent: releasing an unheld lock is a no-op.
    pub fn release(&mut self) {
        if !self.held {
            return;
        }
        self.held = false;

        // Only remove the marker if it is still ours; a forced break by
        // another run must not lose that run's lock.
        match self.read_marker() {
            Some(info) if info.pid != std::process::id() => {
                tracing::warn!(
                    "Deployment lock at {} was taken over by pid {}; leaving it in place",
                    self.path.display(),
                    info.pid
                );
            }
            _ => {
                if let Err(e) = std::fs::remove_file(&self.path) {
                    if e.kind() != std::io::ErrorKind::NotFound {
                        tracing::warn!(
                            "Failed to remove deployment lock at {}: {e}",
                            self.path.display()
                        );
                    }
                }
            }
        }
    }

    /// Atomically create the marker file. Returns false if it already exists.
    fn write_marker(&self) -> Result<bool, DeployError> {
        let info = LockInfo::new(&self.root);
        let json = serde_json::to_string(&info)
            .map_err(|e| DeployError::Lock(format!("failed to serialize lock info: {e}")))?;

        let mut file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => return Err(DeployError::Lock(format!("failed to create lock file: {e}"))),
        };

        if let Err(e) = file.write_all(json.as_bytes()) {
            let _ = std::fs::remove_file(&self.path);
            return Err(DeployError::Lock(format!("failed to write lock info: {e}")));
        }

        Ok(true)
    }

    fn read_marker(&self) -> Option<LockInfo> {
        let content = std::fs::read_to_string(&self.path).ok()?;
        serde_json::from_str(&content).ok()
    }
}

impl Drop for DeployLock {
    fn drop(&mut self) {
        self.release();
    }
}
