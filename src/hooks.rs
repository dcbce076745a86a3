// ABOUTME: Lifecycle hook scripts run around a deployment.
// ABOUTME: Discovers and executes pre-deploy, post-deploy, and on-error scripts.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use crate::types::ChangesetId;

/// Hook execution points in the deployment lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPoint {
    /// Before the build starts. Failure aborts the deployment.
    PreDeploy,
    /// After successful promotion. Failure logs a warning.
    PostDeploy,
    /// On deployment failure. Failure logs a warning.
    OnError,
}

impl HookPoint {
    /// Get the hook filename for this point.
    pub fn filename(&self) -> &'static str {
        match self {
            HookPoint::PreDeploy => "pre-deploy",
            HookPoint::PostDeploy => "post-deploy",
            HookPoint::OnError => "on-error",
        }
    }

    /// Whether failure at this hook point should abort the deployment.
    pub fn is_fatal(&self) -> bool {
        matches!(self, HookPoint::PreDeploy)
    }
}

/// Context passed to hooks via environment variables.
#[derive(Debug, Clone)]
pub struct HookContext {
    pub root: PathBuf,
    pub changeset: Option<ChangesetId>,
    pub previous: Option<ChangesetId>,
}

impl HookContext {
    /// Convert context to environment variables.
    pub fn to_env(&self) -> HashMap<String, String> {
        let mut env = HashMap::new();
        env.insert(
            "STEVEDORE_ROOT".to_string(),
            self.root.display().to_string(),
        );
        if let Some(ref changeset) = self.changeset {
            env.insert("STEVEDORE_CHANGESET".to_string(), changeset.to_string());
        }
        if let Some(ref previous) = self.previous {
            env.insert(
                "STEVEDORE_PREVIOUS_CHANGESET".to_string(),
                previous.to_string(),
            );
        }
        env
    }
}

/// Result of running a hook.
#[derive(Debug)]
pub struct HookResult {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Discovers and runs hooks from the application root.
pub struct HookRunner {
    hooks_dir: PathBuf,
}

impl HookRunner {
    /// Create a hook runner looking under the given hooks directory.
    pub fn new(hooks_dir: impl Into<PathBuf>) -> Self {
        Self {
            hooks_dir: hooks_dir.into(),
        }
    }

    /// Check if a hook exists for the given point.
    pub fn hook_exists(&self, point: HookPoint) -> bool {
        self.hook_path(point).is_file()
    }

    fn hook_path(&self, point: HookPoint) -> PathBuf {
        self.hooks_dir.join(point.filename())
    }

    /// Run a hook if it exists.
    ///
    /// Returns None if the hook doesn't exist, or Some(HookResult) if it ran.
    pub async fn run(&self, point: HookPoint, context: &HookContext) -> Option<HookResult> {
        let hook_path = self.hook_path(point);

        if !hook_path.is_file() {
            return None;
        }

        tracing::info!("Running {} hook: {}", point.filename(), hook_path.display());

        let output = Command::new(&hook_path)
            .current_dir(&context.root)
            .envs(context.to_env())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await;

        match output {
            Ok(output) => {
                let result = HookResult {
                    success: output.status.success(),
                    exit_code: output.status.code(),
                    stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                };

                if result.success {
                    tracing::info!("{} hook completed successfully", point.filename());
                } else {
                    tracing::warn!(
                        "{} hook failed with exit code {:?}",
                        point.filename(),
                        result.exit_code
                    );
                }

                Some(result)
            }
            Err(e) => {
                tracing::error!("Failed to execute {} hook: {}", point.filename(), e);
                Some(HookResult {
                    success: false,
                    exit_code: None,
                    stdout: String::new(),
                    stderr: e.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hook_point_filenames() {
        assert_eq!(HookPoint::PreDeploy.filename(), "pre-deploy");
        assert_eq!(HookPoint::PostDeploy.filename(), "post-deploy");
        assert_eq!(HookPoint::OnError.filename(), "on-error");
    }

    #[test]
    fn only_pre_deploy_is_fatal() {
        assert!(HookPoint::PreDeploy.is_fatal());
        assert!(!HookPoint::PostDeploy.is_fatal());
        assert!(!HookPoint::OnError.is_fatal());
    }

    #[test]
    fn hook_context_to_env() {
        let context = HookContext {
            root: PathBuf::from("/srv/app"),
            changeset: Some(ChangesetId::new("def456").unwrap()),
            previous: Some(ChangesetId::new("abc123").unwrap()),
        };

        let env = context.to_env();
        assert_eq!(env.get("STEVEDORE_ROOT"), Some(&"/srv/app".to_string()));
        assert_eq!(
            env.get("STEVEDORE_CHANGESET"),
            Some(&"def456".to_string())
        );
        assert_eq!(
            env.get("STEVEDORE_PREVIOUS_CHANGESET"),
            Some(&"abc123".to_string())
        );
    }

    #[test]
    fn hook_context_without_changesets() {
        let context = HookContext {
            root: PathBuf::from("/srv/app"),
            changeset: None,
            previous: None,
        };

        let env = context.to_env();
        assert!(!env.contains_key("STEVEDORE_CHANGESET"));
        assert!(!env.contains_key("STEVEDORE_PREVIOUS_CHANGESET"));
    }

    #[test]
    fn missing_hooks_dir_means_no_hooks() {
        let runner = HookRunner::new("/nonexistent/.stevedore/hooks");
        assert!(!runner.hook_exists(HookPoint::PreDeploy));
    }
}
