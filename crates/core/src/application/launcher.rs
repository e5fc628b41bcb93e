// Launcher - reset, configure, invoke
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::{LaunchEnv, LaunchPlan, ResetPolicy, ResetReport};
use crate::error::Result;
use crate::port::{ProcessReaper, RunOutcome, TimeProvider, TrainingRunner};

/// Launches one training run
///
/// The three steps are strictly sequential: reset completes before the
/// environment is attached, and both before the entry point starts.
pub struct Launcher {
    reaper: Arc<dyn ProcessReaper>,
    runner: Arc<dyn TrainingRunner>,
    time_provider: Arc<dyn TimeProvider>,
}

impl Launcher {
    pub fn new(
        reaper: Arc<dyn ProcessReaper>,
        runner: Arc<dyn TrainingRunner>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            reaper,
            runner,
            time_provider,
        }
    }

    /// Best-effort cleanup of stale training processes
    ///
    /// Never fails: every error is logged and counted.
    pub async fn reset_environment(&self, policy: &ResetPolicy) -> ResetReport {
        let mut report = ResetReport::default();

        if !policy.enabled {
            info!("Reset disabled, leaving running processes alone");
            return report;
        }

        for argv in &policy.stop_commands {
            report.commands_run += 1;
            if let Err(e) = self.reaper.run_stop_command(argv).await {
                report.commands_failed += 1;
                warn!(command = ?argv, error = %e, "Stop command failed (ignored)");
            }
        }

        if let Some(pattern) = policy.kill_pattern.as_deref() {
            match self.reaper.terminate_matching(pattern, policy.signal).await {
                Ok(count) => report.processes_signalled = count,
                Err(e) => warn!(pattern = %pattern, error = %e, "Process cleanup failed (ignored)"),
            }
        }

        info!(
            commands_run = report.commands_run,
            commands_failed = report.commands_failed,
            processes_signalled = report.processes_signalled,
            "Environment reset completed"
        );

        report
    }

    /// Attach environment variables to the plan's child process
    ///
    /// The launcher's own environment is left untouched; the child inherits
    /// it with `env` layered on top.
    pub fn configure_environment(&self, plan: &mut LaunchPlan, env: &LaunchEnv) {
        plan.env.merge(env);
        for (name, value) in plan.env.iter() {
            info!(name = %name, value = %value, "Child environment variable set");
        }
    }

    /// Run the training entry point and wait for it to exit
    pub async fn invoke(&self, plan: &LaunchPlan) -> Result<RunOutcome> {
        info!(
            program = %plan.program,
            args = ?plan.argv(),
            "Invoking training entry point"
        );

        let outcome = self.runner.run(plan).await?;

        if outcome.success() {
            info!(duration_ms = outcome.duration_ms, "Training process exited successfully");
        } else {
            warn!(
                exit_code = ?outcome.exit_code,
                signal = ?outcome.signal,
                duration_ms = outcome.duration_ms,
                "Training process exited unsuccessfully"
            );
        }

        Ok(outcome)
    }

    /// Reset, configure and invoke, in that order
    pub async fn launch(
        &self,
        mut plan: LaunchPlan,
        env: &LaunchEnv,
        policy: &ResetPolicy,
    ) -> Result<RunOutcome> {
        let started = self.time_provider.now_millis();

        self.reset_environment(policy).await;
        self.configure_environment(&mut plan, env);
        let outcome = self.invoke(&plan).await?;

        info!(
            total_ms = self.time_provider.now_millis() - started,
            exit_code = outcome.propagated_code(),
            "Launch finished"
        );

        Ok(outcome)
    }
}
