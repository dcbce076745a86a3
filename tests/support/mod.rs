// ABOUTME: Test support utilities.
// ABOUTME: Provides an app-root fixture and a stub source repository.

use std::path::{Path, PathBuf};
use std::sync::Once;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use stevedore::env::Environment;
use stevedore::repository::{RepositoryError, SourceRepository};
use stevedore::types::{Changeset, ChangesetId};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env()
            .add_directive("stevedore=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Fresh application root plus its resolved environment.
#[allow(dead_code)]
pub fn app_root() -> (tempfile::TempDir, Environment) {
    let dir = tempfile::tempdir().unwrap();
    let env = Environment::for_root(dir.path()).unwrap();
    (dir, env)
}

/// An in-process source repository with scripted behavior.
///
/// `sync` writes the configured files into the working tree, so tests can
/// exercise the full build/promote path without a source-control backend.
#[allow(dead_code)]
pub struct StubRepository {
    tree: PathBuf,
    head: Option<Changeset>,
    files: Vec<(String, String)>,
    executables: Vec<(String, String)>,
    sync_delay: Option<Duration>,
    head_calls: AtomicUsize,
    sync_calls: AtomicUsize,
}

#[allow(dead_code)]
impl StubRepository {
    pub fn new(tree: impl Into<PathBuf>) -> Self {
        Self {
            tree: tree.into(),
            head: None,
            files: Vec::new(),
            executables: Vec::new(),
            sync_delay: None,
            head_calls: AtomicUsize::new(0),
            sync_calls: AtomicUsize::new(0),
        }
    }

    /// Report this changeset id from `head`. Without it, `head` reports an
    /// empty repository.
    pub fn with_head(mut self, id: &str) -> Self {
        self.head = Some(Changeset::new(ChangesetId::new(id).unwrap()));
        self
    }

    /// Write this file into the working tree on every `sync`.
    pub fn with_file(mut self, path: &str, content: &str) -> Self {
        self.files.push((path.to_string(), content.to_string()));
        self
    }

    /// Write this file into the working tree with the executable bit set.
    pub fn with_executable(mut self, path: &str, content: &str) -> Self {
        self.executables.push((path.to_string(), content.to_string()));
        self
    }

    /// Make `sync` take a while, so lock contention is observable.
    pub fn with_sync_delay(mut self, delay: Duration) -> Self {
        self.sync_delay = Some(delay);
        self
    }

    pub fn head_calls(&self) -> usize {
        self.head_calls.load(Ordering::SeqCst)
    }

    pub fn sync_calls(&self) -> usize {
        self.sync_calls.load(Ordering::SeqCst)
    }

    fn write(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }
}

#[async_trait]
impl SourceRepository for StubRepository {
    async fn head(&self) -> Result<Changeset, RepositoryError> {
        self.head_calls.fetch_add(1, Ordering::SeqCst);
        self.head.clone().ok_or(RepositoryError::Empty)
    }

    async fn sync(&self, _id: &ChangesetId) -> Result<(), RepositoryError> {
        self.sync_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.sync_delay {
            tokio::time::sleep(delay).await;
        }

        std::fs::create_dir_all(&self.tree)?;
        for (path, content) in &self.files {
            Self::write(&self.tree.join(path), content);
        }
        for (path, content) in &self.executables {
            let path = self.tree.join(path);
            Self::write(&path, content);
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
            }
        }
        Ok(())
    }

    fn working_tree(&self) -> &Path {
        &self.tree
    }
}
