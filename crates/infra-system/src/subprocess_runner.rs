// Subprocess runner implementation
// reason: tokio::process so the launcher awaits the child without blocking the runtime
use async_trait::async_trait;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use tokio::process::Command;
use tracing::info;

use trainlaunch_core::domain::LaunchPlan;
use trainlaunch_core::port::{RunError, RunOutcome, TimeProvider, TrainingRunner};

/// Runs the training entry point as a child process
///
/// stdio is inherited so the training framework's output reaches the
/// terminal unchanged. The child sees the launcher's environment plus the
/// plan's variables.
pub struct SubprocessRunner {
    time_provider: Arc<dyn TimeProvider>,
}

impl SubprocessRunner {
    pub fn new(time_provider: Arc<dyn TimeProvider>) -> Self {
        Self { time_provider }
    }

    fn build_command(plan: &LaunchPlan) -> Command {
        let mut command = Command::new(&plan.program);
        command
            .args(plan.argv())
            .envs(plan.env.iter())
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        if let Some(dir) = &plan.working_dir {
            command.current_dir(dir);
        }

        command
    }

    #[cfg(unix)]
    fn terminating_signal(status: &ExitStatus) -> Option<i32> {
        use std::os::unix::process::ExitStatusExt;
        status.signal()
    }

    #[cfg(not(unix))]
    fn terminating_signal(_status: &ExitStatus) -> Option<i32> {
        None
    }
}

#[async_trait]
impl TrainingRunner for SubprocessRunner {
    async fn run(&self, plan: &LaunchPlan) -> Result<RunOutcome, RunError> {
        let start_time = self.time_provider.now_millis();

        let mut child = Self::build_command(plan)
            .spawn()
            .map_err(|e| RunError::SpawnFailed {
                program: plan.program.clone(),
                reason: e.to_string(),
            })?;

        info!(pid = ?child.id(), program = %plan.program, "Training process started");

        let status = child
            .wait()
            .await
            .map_err(|e| RunError::WaitFailed(e.to_string()))?;

        let duration_ms = self.time_provider.now_millis() - start_time;

        Ok(RunOutcome {
            exit_code: status.code(),
            signal: Self::terminating_signal(&status),
            duration_ms,
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use trainlaunch_core::domain::{LaunchEnv, OverrideSet};
    use trainlaunch_core::port::time_provider::SystemTimeProvider;

    fn runner() -> SubprocessRunner {
        SubprocessRunner::new(Arc::new(SystemTimeProvider))
    }

    fn sh(script: &str) -> LaunchPlan {
        LaunchPlan::new(OverrideSet::new()).with_program("sh", vec!["-c".into(), script.into()])
    }

    #[tokio::test]
    async fn test_exit_code_propagated() {
        let outcome = runner().run(&sh("exit 3")).await.unwrap();

        assert_eq!(outcome.exit_code, Some(3));
        assert_eq!(outcome.signal, None);
        assert_eq!(outcome.propagated_code(), 3);
    }

    #[tokio::test]
    async fn test_signal_death_reported() {
        let outcome = runner().run(&sh("kill -9 $$")).await.unwrap();

        assert_eq!(outcome.exit_code, None);
        assert_eq!(outcome.signal, Some(9));
        assert_eq!(outcome.propagated_code(), 137);
    }

    #[tokio::test]
    async fn test_env_reaches_child() {
        let mut plan = sh(r#"test "$NCCL_P2P_DISABLE" = 1 && test "$WANDB_MODE" = disabled"#);
        plan.env = LaunchEnv::training_defaults();

        let outcome = runner().run(&plan).await.unwrap();
        assert!(outcome.success());
    }

    #[tokio::test]
    async fn test_working_dir_applied() {
        let dir = std::env::temp_dir();
        // $0 is the expected directory
        let mut plan = sh(r#"test "$(pwd -P)" = "$(cd "$0" && pwd -P)""#)
            .with_working_dir(dir.clone());
        plan.entry_args.push(dir.display().to_string());

        let outcome = runner().run(&plan).await.unwrap();
        assert!(outcome.success());
    }

    #[tokio::test]
    async fn test_missing_program_fails_to_spawn() {
        let plan = LaunchPlan::new(OverrideSet::new())
            .with_program("trainlaunch-missing-binary", Vec::new());

        let result = runner().run(&plan).await;
        assert!(matches!(result, Err(RunError::SpawnFailed { .. })));
    }
}
