// ABOUTME: Path resolution for one application root.
// ABOUTME: Every deployment path derives from a fixed relative subpath of the root.

use std::path::{Path, PathBuf};

/// Versioned source repository the orchestrator deploys from.
pub const REPOSITORY_DIR: &str = "repository";

/// Cache of built artifacts, one directory per deployed changeset.
pub const DEPLOYMENT_CACHE_DIR: &str = "deployments";

/// Live web root served to the outside; points at the current artifact.
pub const WEB_ROOT_DIR: &str = "site";

/// Cross-process mutual-exclusion marker for deployments.
pub const LOCK_DIR: &str = ".stevedore/locks";
pub const DEPLOYMENT_LOCK_FILE: &str = "deploy.lock";

/// Structured step/duration trace, one JSON record per line.
pub const TRACE_DIR: &str = ".stevedore/trace";
pub const TRACE_FILE: &str = "trace.jsonl";

/// Lifecycle hook scripts run around a deployment.
pub const HOOKS_DIR: &str = ".stevedore/hooks";

/// Immutable per-run view of where everything lives for one application root.
///
/// Created once by the entry point and shared read-only with every other
/// component. All derived paths are rooted under the application root; only
/// the temp path and the optional extensions cache live outside it.
#[derive(Debug, Clone)]
pub struct Environment {
    root: PathBuf,
    temp_path: PathBuf,
    extensions_cache_path: Option<PathBuf>,
}

impl Environment {
    /// Resolve the environment for an application root. A relative root is
    /// anchored at the current working directory so every derived path is
    /// absolute.
    pub fn for_root(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into();
        let root = if root.is_absolute() {
            root
        } else {
            std::env::current_dir()?.join(root)
        };

        Ok(Self {
            root,
            temp_path: std::env::temp_dir(),
            extensions_cache_path: None,
        })
    }

    pub fn with_extensions_cache(mut self, path: Option<PathBuf>) -> Self {
        self.extensions_cache_path = path;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    pub fn extensions_cache_path(&self) -> Option<&Path> {
        self.extensions_cache_path.as_deref()
    }

    pub fn repository_path(&self) -> PathBuf {
        self.root.join(REPOSITORY_DIR)
    }

    pub fn deployment_cache_path(&self) -> PathBuf {
        self.root.join(DEPLOYMENT_CACHE_DIR)
    }

    pub fn web_root_path(&self) -> PathBuf {
        self.root.join(WEB_ROOT_DIR)
    }

    pub fn lock_file_path(&self) -> PathBuf {
        self.root.join(LOCK_DIR).join(DEPLOYMENT_LOCK_FILE)
    }

    pub fn trace_file_path(&self) -> PathBuf {
        self.root.join(TRACE_DIR).join(TRACE_FILE)
    }

    pub fn hooks_path(&self) -> PathBuf {
        self.root.join(HOOKS_DIR)
    }
}
