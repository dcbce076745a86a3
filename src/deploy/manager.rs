// ABOUTME: Orchestrates one deployment run end to end.
// ABOUTME: Recovers domain failures into log entries; only faults propagate.

use std::sync::Arc;

use crate::build::BuilderFactory;
use crate::env::Environment;
use crate::hooks::{HookContext, HookPoint, HookRunner};
use crate::logger::Logger;
use crate::repository::SourceRepository;
use crate::trace::Tracer;
use crate::types::ChangesetId;

use super::deployment::Deployment;
use super::error::{DeployError, DeployErrorKind};
use super::lock::LockPolicy;
use super::report::DeploymentReport;
use super::status::{self, DeploymentRecord};

/// Drives the deployment state machine for one application root.
///
/// `deploy()` returns `Ok` for every completed run — succeeded or failed for
/// domain reasons — with the failure visible in the report and the logger's
/// error flag. Only infrastructure faults come back as `Err`, after being
/// logged and after the lock has been released.
pub struct DeploymentManager<R> {
    env: Environment,
    repository: R,
    builder_factory: BuilderFactory,
    logger: Arc<dyn Logger>,
    tracer: Tracer,
    hooks: HookRunner,
    policy: LockPolicy,
    force: bool,
}

impl<R: SourceRepository> DeploymentManager<R> {
    pub fn new(
        env: Environment,
        repository: R,
        builder_factory: BuilderFactory,
        logger: Arc<dyn Logger>,
        tracer: Tracer,
    ) -> Self {
        let hooks = HookRunner::new(env.hooks_path());
        Self {
            env,
            repository,
            builder_factory,
            logger,
            tracer,
            hooks,
            policy: LockPolicy::NoWait,
            force: false,
        }
    }

    /// How long to wait for a contested deployment lock.
    pub fn with_lock_policy(mut self, policy: LockPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Break an existing lock even if it is not stale.
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Perform one deployment run.
    pub async fn deploy(&self) -> Result<DeploymentReport, DeployError> {
        let deployment = Deployment::new(self.env.clone());

        let step = self.tracer.step("acquire-lock");
        let deployment = match deployment.acquire_lock(self.policy, self.force).await {
            Ok(deployment) => deployment,
            Err((deployment, e)) => return self.fail(deployment, e).await,
        };
        step.finish();
        tracing::debug!(root = %self.env.root().display(), "deployment lock acquired");

        let previous = status::read_current(&self.env.deployment_cache_path())
            .ok()
            .flatten()
            .map(|record| record.changeset);

        let step = self.tracer.step("resolve-changeset");
        let deployment = match deployment.resolve(&self.repository).await {
            Ok(deployment) => deployment,
            Err((deployment, e)) => return self.fail(deployment, e).await,
        };
        step.finish();

        let target = deployment.target().id.clone();
        match &previous {
            Some(previous) if *previous != target => self.logger.message(&format!(
                "Deploying changeset {} (replacing {})",
                target.short(),
                previous.short()
            )),
            Some(_) => self
                .logger
                .message(&format!("Redeploying changeset {}", target.short())),
            None => self
                .logger
                .message(&format!("Deploying changeset {}", target.short())),
        }

        let context = HookContext {
            root: self.env.root().to_path_buf(),
            changeset: Some(target.clone()),
            previous: previous.clone(),
        };

        if let Some(result) = self.hooks.run(HookPoint::PreDeploy, &context).await {
            if !result.success {
                let detail = if result.stderr.trim().is_empty() {
                    format!("exit code {:?}", result.exit_code)
                } else {
                    result.stderr.trim().to_string()
                };
                return self.fail(deployment, DeployError::Hook(detail)).await;
            }
        }

        let step = self.tracer.step("build");
        let deployment = match deployment
            .build(&self.repository, &self.builder_factory, self.logger.as_ref())
            .await
        {
            Ok(deployment) => deployment,
            Err((deployment, e)) => return self.fail(deployment, e).await,
        };
        step.finish();

        let step = self.tracer.step("promote");
        let deployment = match deployment.promote().await {
            Ok(deployment) => deployment,
            Err((deployment, e)) => return self.fail(deployment, e).await,
        };
        step.finish();

        self.logger
            .message(&format!("Deployment of {} complete", target.short()));

        if let Some(result) = self.hooks.run(HookPoint::PostDeploy, &context).await {
            if !result.success {
                self.logger.warning("post-deploy hook failed");
            }
        }

        self.record_history(DeploymentRecord::succeeded(target));
        Ok(deployment.finish())
    }

    /// Finalize a failed run: log the error, run the on-error hook, record
    /// history, release the lock via the report, and decide propagation.
    async fn fail<S>(
        &self,
        deployment: Deployment<S>,
        error: DeployError,
    ) -> Result<DeploymentReport, DeployError> {
        self.logger.error(&error.to_string());

        let changeset: Option<ChangesetId> = deployment.changeset().map(|c| c.id.clone());

        // A contested lock means nothing happened; hooks and history are
        // reserved for runs that actually owned the root.
        if error.kind() != DeployErrorKind::LockHeld {
            let context = HookContext {
                root: self.env.root().to_path_buf(),
                changeset: changeset.clone(),
                previous: None,
            };
            if let Some(result) = self.hooks.run(HookPoint::OnError, &context).await {
                if !result.success {
                    self.logger.warning("on-error hook failed");
                }
            }

            if let Some(changeset) = changeset {
                self.record_history(DeploymentRecord::failed(changeset));
            }
        }

        let report = deployment.into_failed_report(error.kind());
        if error.is_fault() {
            Err(error)
        } else {
            Ok(report)
        }
    }

    fn record_history(&self, record: DeploymentRecord) {
        if let Err(e) = status::append_history(&self.env.deployment_cache_path(), &record) {
            self.logger
                .warning(&format!("failed to record deployment history: {e}"));
        }
    }
}
