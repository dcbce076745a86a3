// ABOUTME: State transition methods for the deployment pipeline.
// ABOUTME: Each method consumes self and returns the next phase on success.

use std::marker::PhantomData;
use std::path::PathBuf;

use crate::build::{BuildRequest, Builder, BuilderFactory};
use crate::logger::Logger;
use crate::repository::SourceRepository;

use super::deployment::Deployment;
use super::error::DeployError;
use super::lock::{DeployLock, LockPolicy};
use super::state::{Built, Locked, Pending, Promoted, Resolved};
use super::status;

/// Result type for transitions: on failure the deployment comes back with
/// the error so the caller can finalize a report (and the lock stays scoped
/// to the returned value).
pub type TransitionResult<T, S> = Result<Deployment<T>, (Deployment<S>, DeployError)>;

impl<S> Deployment<S> {
    /// Internal helper to move to the next phase.
    fn transition<T>(self) -> Deployment<T> {
        Deployment {
            env: self.env,
            lock: self.lock,
            changeset: self.changeset,
            staged: self.staged,
            started_at: self.started_at,
            started: self.started,
            _state: PhantomData,
        }
    }

    /// Staging directory for a changeset; dot-prefixed so a crashed run's
    /// leftovers are never mistaken for a promoted artifact.
    fn staging_dir(&self, changeset: &crate::types::ChangesetId) -> PathBuf {
        self.env
            .deployment_cache_path()
            .join(format!(".staging-{changeset}"))
    }
}

// =============================================================================
// Pending -> Locked
// =============================================================================

impl Deployment<Pending> {
    /// Acquire the deployment lock for the application root.
    ///
    /// On failure no work has been performed and nothing was mutated.
    #[must_use = "deployment state must be used"]
    pub async fn acquire_lock(
        mut self,
        policy: LockPolicy,
        force: bool,
    ) -> TransitionResult<Locked, Pending> {
        let mut lock = DeployLock::new(
            self.env.lock_file_path(),
            self.env.root().to_path_buf(),
        );

        match lock.acquire(policy, force).await {
            Ok(()) => {
                self.lock = Some(lock);
                Ok(self.transition())
            }
            Err(e) => Err((self, e)),
        }
    }
}

// =============================================================================
// Locked -> Resolved
// =============================================================================

impl Deployment<Locked> {
    /// Resolve the latest changeset from the source repository.
    #[must_use = "deployment state must be used"]
    pub async fn resolve<R: SourceRepository>(
        mut self,
        repository: &R,
    ) -> TransitionResult<Resolved, Locked> {
        match repository.head().await {
            Ok(changeset) => {
                self.changeset = Some(changeset);
                Ok(self.transition())
            }
            Err(e) => Err((self, e.into())),
        }
    }
}

// =============================================================================
// Resolved -> Built
// =============================================================================

impl Deployment<Resolved> {
    /// Materialize the working tree and build it into a fresh staging
    /// directory under the deployment cache.
    ///
    /// Builder diagnostics flow through the shared logger so they interleave
    /// with orchestration output. On failure the staging directory is
    /// removed; the previously promoted artifact is never touched.
    #[must_use = "deployment state must be used"]
    pub async fn build<R: SourceRepository>(
        mut self,
        repository: &R,
        factory: &BuilderFactory,
        logger: &dyn Logger,
    ) -> TransitionResult<Built, Resolved> {
        let id = self.target().id.clone();

        if let Err(e) = repository.sync(&id).await {
            return Err((self, e.into()));
        }

        let staging = self.staging_dir(&id);
        if staging.exists() {
            // Leftover from a crashed run; builds always start clean.
            if let Err(e) = std::fs::remove_dir_all(&staging) {
                return Err((self, DeployError::Io(e)));
            }
        }

        let builder = match factory.create_builder(repository.working_tree()) {
            Ok(builder) => builder,
            Err(e) => return Err((self, DeployError::Build(e.into()))),
        };
        logger.message(&format!(
            "Building changeset {} with the {} builder",
            id.short(),
            builder.name()
        ));

        let request = BuildRequest {
            source: repository.working_tree(),
            output: &staging,
            properties: factory.properties(),
        };

        match builder.build(&request, logger).await {
            Ok(outcome) => {
                tracing::debug!(
                    files = outcome.files_staged,
                    changeset = %id,
                    "build finished"
                );
                self.staged = Some(staging);
                Ok(self.transition())
            }
            Err(e) => {
                if staging.exists() {
                    let _ = std::fs::remove_dir_all(&staging);
                }
                Err((self, e.into()))
            }
        }
    }
}

// =============================================================================
// Built -> Promoted
// =============================================================================

impl Deployment<Built> {
    /// Atomically promote the staged output to the live deployment.
    ///
    /// The staged directory becomes `deployments/{changeset}`, the web root
    /// link flips to it, and the pointer record is committed last. Until the
    /// pointer commits, the previous deployment stays current.
    #[must_use = "deployment state must be used"]
    pub async fn promote(mut self) -> TransitionResult<Promoted, Built> {
        match self.promote_staged() {
            Ok(()) => {
                self.staged = None;
                Ok(self.transition())
            }
            Err(e) => Err((self, e)),
        }
    }

    fn promote_staged(&self) -> Result<(), DeployError> {
        let id = self.target().id.clone();
        let cache = self.env.deployment_cache_path();
        let artifact = cache.join(id.as_str());
        let staged = self.staged_path().to_path_buf();

        // A redeploy of the same changeset moves the old artifact aside
        // first; the live link keeps resolving until the swap below.
        let aside = cache.join(format!(".{}.old", id.as_str()));
        let mut moved_aside = false;
        if artifact.exists() {
            if aside.exists() {
                std::fs::remove_dir_all(&aside)?;
            }
            std::fs::rename(&artifact, &aside)?;
            moved_aside = true;
        }

        if let Err(e) = std::fs::rename(&staged, &artifact) {
            if moved_aside {
                let _ = std::fs::rename(&aside, &artifact);
            }
            return Err(DeployError::Io(e));
        }

        status::point_web_root(&self.env.web_root_path(), &artifact)
            .map_err(|e| DeployError::Promotion(e.to_string()))?;

        let record = status::DeploymentRecord::succeeded(id);
        status::write_current(&cache, &record)?;

        if moved_aside {
            let _ = std::fs::remove_dir_all(&aside);
        }

        Ok(())
    }
}
