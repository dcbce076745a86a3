// ABOUTME: End-to-end tests for the deployment manager.
// ABOUTME: Covers promotion, failed builds, lock contention, and lock release.

mod support;

use std::sync::Arc;
use std::time::Duration;

use stevedore::build::{BuildProperties, BuilderFactory};
use stevedore::deploy::{status, DeployErrorKind, DeploymentManager, Outcome};
use stevedore::env::Environment;
use stevedore::logger::{Logger, MemoryLogger};
use stevedore::trace::Tracer;

use support::{app_root, StubRepository};

fn manager(
    env: &Environment,
    repository: StubRepository,
    logger: Arc<MemoryLogger>,
) -> DeploymentManager<StubRepository> {
    DeploymentManager::new(
        env.clone(),
        repository,
        BuilderFactory::new(BuildProperties::new()),
        logger,
        Tracer::disabled(),
    )
}

fn repository_with_site(env: &Environment, head: &str) -> StubRepository {
    StubRepository::new(env.repository_path())
        .with_head(head)
        .with_file("index.html", &format!("<html>{head}</html>"))
}

fn lock_file_exists(env: &Environment) -> bool {
    env.lock_file_path().exists()
}

#[tokio::test]
async fn successful_deploy_promotes_and_records_the_changeset() {
    support::init_tracing();
    let (_dir, env) = app_root();
    let logger = Arc::new(MemoryLogger::new());

    let report = manager(&env, repository_with_site(&env, "def456"), logger.clone())
        .deploy()
        .await
        .expect("no fault expected");

    assert!(report.outcome.is_success());
    assert_eq!(report.changeset.as_ref().unwrap().as_str(), "def456");
    assert!(!logger.has_errors());

    let artifact = env.deployment_cache_path().join("def456");
    assert!(artifact.join("index.html").exists());

    let current = status::read_current(&env.deployment_cache_path())
        .unwrap()
        .expect("pointer should be written");
    assert_eq!(current.changeset.as_str(), "def456");

    #[cfg(unix)]
    {
        let target = std::fs::read_link(env.web_root_path()).unwrap();
        assert_eq!(target, artifact);
    }
}

#[tokio::test]
async fn new_deploy_replaces_the_previous_one_atomically() {
    let (_dir, env) = app_root();

    let logger = Arc::new(MemoryLogger::new());
    manager(&env, repository_with_site(&env, "abc123"), logger)
        .deploy()
        .await
        .unwrap();

    let logger = Arc::new(MemoryLogger::new());
    let report = manager(&env, repository_with_site(&env, "def456"), logger.clone())
        .deploy()
        .await
        .unwrap();

    assert!(report.outcome.is_success());
    // Both artifacts are retained; the pointer and link moved.
    assert!(env.deployment_cache_path().join("abc123/index.html").exists());
    assert!(env.deployment_cache_path().join("def456/index.html").exists());

    let current = status::read_current(&env.deployment_cache_path())
        .unwrap()
        .unwrap();
    assert_eq!(current.changeset.as_str(), "def456");
    let previous = status::read_previous(&env.deployment_cache_path())
        .unwrap()
        .unwrap();
    assert_eq!(previous.changeset.as_str(), "abc123");
}

#[tokio::test]
async fn redeploying_the_same_changeset_succeeds() {
    let (_dir, env) = app_root();

    for _ in 0..2 {
        let logger = Arc::new(MemoryLogger::new());
        let report = manager(&env, repository_with_site(&env, "abc123"), logger.clone())
            .deploy()
            .await
            .unwrap();
        assert!(report.outcome.is_success());
        assert!(!logger.has_errors());
    }

    assert!(env.deployment_cache_path().join("abc123/index.html").exists());
}

#[cfg(unix)]
#[tokio::test]
async fn failed_build_leaves_the_previous_deployment_untouched() {
    let (_dir, env) = app_root();

    let logger = Arc::new(MemoryLogger::new());
    manager(&env, repository_with_site(&env, "abc123"), logger)
        .deploy()
        .await
        .unwrap();

    // def456 carries a build script that fails.
    let broken = StubRepository::new(env.repository_path())
        .with_head("def456")
        .with_executable(
            ".stevedore/build",
            "#!/bin/sh\necho compiling >&2\nexit 3\n",
        );

    let logger = Arc::new(MemoryLogger::new());
    let report = manager(&env, broken, logger.clone())
        .deploy()
        .await
        .expect("build failure is a recovered domain error, not a fault");

    assert_eq!(report.outcome, Outcome::Failed(DeployErrorKind::Build));
    assert!(logger.has_errors());

    // The pointer still names the last successful changeset.
    let current = status::read_current(&env.deployment_cache_path())
        .unwrap()
        .unwrap();
    assert_eq!(current.changeset.as_str(), "abc123");
    assert!(env.deployment_cache_path().join("abc123/index.html").exists());
    assert!(!env.deployment_cache_path().join("def456").exists());

    // No staging leftovers either.
    assert!(!env.deployment_cache_path().join(".staging-def456").exists());

    #[cfg(unix)]
    {
        let target = std::fs::read_link(env.web_root_path()).unwrap();
        assert_eq!(target, env.deployment_cache_path().join("abc123"));
    }
}

#[tokio::test]
async fn repository_error_is_logged_and_aborts_the_run() {
    let (_dir, env) = app_root();
    let logger = Arc::new(MemoryLogger::new());

    // No head configured: the stub reports an empty repository.
    let repository = StubRepository::new(env.repository_path());
    let report = manager(&env, repository, logger.clone())
        .deploy()
        .await
        .expect("repository errors are recovered");

    assert_eq!(report.outcome, Outcome::Failed(DeployErrorKind::Repository));
    assert!(logger.has_errors());
    assert!(status::read_current(&env.deployment_cache_path())
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn contested_lock_aborts_before_touching_the_repository() {
    let (_dir, env) = app_root();
    let logger = Arc::new(MemoryLogger::new());

    // Simulate another run holding the lock.
    let lock_path = env.lock_file_path();
    std::fs::create_dir_all(lock_path.parent().unwrap()).unwrap();
    let foreign = serde_json::json!({
        "holder": "other-machine",
        "pid": 99999,
        "started_at": chrono::Utc::now().to_rfc3339(),
        "root": env.root().display().to_string(),
    });
    std::fs::write(&lock_path, foreign.to_string()).unwrap();

    let repository = repository_with_site(&env, "def456");
    let mgr = manager(&env, repository, logger.clone());
    let report = mgr.deploy().await.expect("contested lock is a recovered error");

    assert_eq!(report.outcome, Outcome::Failed(DeployErrorKind::LockHeld));
    assert!(logger.has_errors());
    assert!(logger
        .messages()
        .iter()
        .any(|m| m.contains("another deployment is in progress")));
    assert!(status::read_current(&env.deployment_cache_path())
        .unwrap()
        .is_none());
    assert!(!env.deployment_cache_path().join("def456").exists());
}

#[tokio::test]
async fn lock_is_released_after_every_run() {
    let (_dir, env) = app_root();

    // Success, failure, success: the lock never survives a run.
    let runs: Vec<StubRepository> = vec![
        repository_with_site(&env, "abc123"),
        StubRepository::new(env.repository_path()),
        repository_with_site(&env, "def456"),
    ];

    for repository in runs {
        let logger = Arc::new(MemoryLogger::new());
        let _ = manager(&env, repository, logger).deploy().await;
        assert!(!lock_file_exists(&env), "lock must be released after the run");
    }
}

#[tokio::test]
async fn concurrent_deploys_serialize_through_the_lock() {
    let (_dir, env) = app_root();

    let slow = |head: &str| {
        StubRepository::new(env.repository_path())
            .with_head(head)
            .with_file("index.html", "<html></html>")
            .with_sync_delay(Duration::from_millis(300))
    };

    let logger_a = Arc::new(MemoryLogger::new());
    let logger_b = Arc::new(MemoryLogger::new());
    let manager_a = manager(&env, slow("abc123"), logger_a.clone());
    let manager_b = manager(&env, slow("abc123"), logger_b.clone());

    let (a, b) = tokio::join!(manager_a.deploy(), manager_b.deploy());
    let a = a.expect("no fault");
    let b = b.expect("no fault");

    let successes = [&a, &b]
        .iter()
        .filter(|r| r.outcome.is_success())
        .count();
    assert_eq!(successes, 1, "exactly one run may proceed past the lock");

    let loser = if a.outcome.is_success() { &b } else { &a };
    assert_eq!(loser.outcome, Outcome::Failed(DeployErrorKind::LockHeld));

    assert!(!lock_file_exists(&env));
}

#[cfg(unix)]
#[tokio::test]
async fn failing_pre_deploy_hook_aborts_the_run() {
    use std::os::unix::fs::PermissionsExt;

    let (_dir, env) = app_root();
    let hooks = env.hooks_path();
    std::fs::create_dir_all(&hooks).unwrap();
    let hook = hooks.join("pre-deploy");
    std::fs::write(&hook, "#!/bin/sh\necho refusing >&2\nexit 1\n").unwrap();
    std::fs::set_permissions(&hook, std::fs::Permissions::from_mode(0o755)).unwrap();

    let logger = Arc::new(MemoryLogger::new());
    let report = manager(&env, repository_with_site(&env, "def456"), logger.clone())
        .deploy()
        .await
        .expect("hook refusal is a recovered error");

    assert_eq!(report.outcome, Outcome::Failed(DeployErrorKind::Hook));
    assert!(logger.has_errors());
    assert!(status::read_current(&env.deployment_cache_path())
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn history_records_every_resolved_run() {
    let (_dir, env) = app_root();

    let logger = Arc::new(MemoryLogger::new());
    manager(&env, repository_with_site(&env, "abc123"), logger)
        .deploy()
        .await
        .unwrap();

    let logger = Arc::new(MemoryLogger::new());
    manager(&env, repository_with_site(&env, "def456"), logger)
        .deploy()
        .await
        .unwrap();

    let history =
        std::fs::read_to_string(env.deployment_cache_path().join(status::HISTORY_LOG)).unwrap();
    let lines: Vec<&str> = history.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("abc123"));
    assert!(lines[1].contains("def456"));
}

#[tokio::test]
async fn builder_output_flows_through_the_shared_logger() {
    let (_dir, env) = app_root();
    let logger = Arc::new(MemoryLogger::new());

    manager(&env, repository_with_site(&env, "abc123"), logger.clone())
        .deploy()
        .await
        .unwrap();

    let messages = logger.messages();
    assert!(messages.iter().any(|m| m.contains("copy builder")));
    assert!(messages.iter().any(|m| m.contains("Staged")));
}
