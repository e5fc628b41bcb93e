//! End-to-end launch tests
//!
//! Real reaper and runner, with `sh` standing in for the training entry point.
#![cfg(unix)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use trainlaunch_core::application::Launcher;
use trainlaunch_core::domain::{
    KillSignal, LaunchEnv, LaunchPlan, OverrideSet, ResetPolicy, TrainingProfile,
};
use trainlaunch_core::port::time_provider::SystemTimeProvider;
use trainlaunch_infra_system::{SubprocessRunner, SystemProcessReaper};

/// Writes its positional args and two env vars to files, then exits 7
const RECORDER_SCRIPT: &str = r#"printf '%s\n' "$@" > "$RECORD_ARGS"
printf '%s\n' "$NCCL_P2P_DISABLE" "$WANDB_MODE" > "$RECORD_ENV"
exit 7"#;

fn launcher() -> Launcher {
    let time_provider = Arc::new(SystemTimeProvider);
    Launcher::new(
        Arc::new(SystemProcessReaper::new(time_provider.clone())),
        Arc::new(SubprocessRunner::new(time_provider.clone())),
        time_provider,
    )
}

fn scratch(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("trainlaunch_e2e_{}_{}", name, std::process::id()));
    let _ = std::fs::remove_file(&path);
    path
}

fn recorder_plan(overrides: OverrideSet) -> LaunchPlan {
    LaunchPlan::new(overrides).with_program(
        "sh",
        vec!["-c".into(), RECORDER_SCRIPT.into(), "recorder".into()],
    )
}

fn recorder_env(args_file: &Path, env_file: &Path) -> LaunchEnv {
    let mut env = LaunchEnv::training_defaults();
    env.set("RECORD_ARGS", args_file.display().to_string()).unwrap();
    env.set("RECORD_ENV", env_file.display().to_string()).unwrap();
    env
}

#[tokio::test]
async fn test_entry_point_receives_exact_args_and_env() {
    let args_file = scratch("args");
    let env_file = scratch("env");

    let overrides = TrainingProfile::default().to_overrides().unwrap();
    let expected_args = overrides.to_args();

    let outcome = launcher()
        .launch(
            recorder_plan(overrides),
            &recorder_env(&args_file, &env_file),
            &ResetPolicy::disabled(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.exit_code, Some(7));
    assert_eq!(outcome.propagated_code(), 7);

    let args: Vec<String> = std::fs::read_to_string(&args_file)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect();
    assert_eq!(args, expected_args);

    let env = std::fs::read_to_string(&env_file).unwrap();
    assert_eq!(env, "1\ndisabled\n");

    std::fs::remove_file(&args_file).ok();
    std::fs::remove_file(&env_file).ok();
}

#[tokio::test]
async fn test_stale_process_cleared_before_launch() {
    let mut stale = tokio::process::Command::new("sleep")
        .arg("928374")
        .spawn()
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let args_file = scratch("stale_args");
    let env_file = scratch("stale_env");
    let policy = ResetPolicy {
        enabled: true,
        stop_commands: vec![vec!["true".into()], vec!["trainlaunch-missing-binary".into()]],
        kill_pattern: Some("sleep 928374".into()),
        signal: KillSignal::Kill,
    };

    let launcher = launcher();
    let report = launcher.reset_environment(&policy).await;
    assert_eq!(report.commands_run, 2);
    assert_eq!(report.commands_failed, 1);
    assert_eq!(report.processes_signalled, 1);

    let status = tokio::time::timeout(Duration::from_secs(5), stale.wait())
        .await
        .expect("stale process should be gone")
        .unwrap();
    assert!(!status.success());

    let overrides = OverrideSet::from_assignments(["trainer.max_steps=1"]).unwrap();
    let outcome = launcher
        .launch(recorder_plan(overrides), &recorder_env(&args_file, &env_file), &policy)
        .await
        .unwrap();
    assert_eq!(outcome.exit_code, Some(7));

    std::fs::remove_file(&args_file).ok();
    std::fs::remove_file(&env_file).ok();
}

#[tokio::test]
async fn test_reset_is_idempotent() {
    let policy = ResetPolicy {
        enabled: true,
        stop_commands: Vec::new(),
        kill_pattern: Some("trainlaunch-nothing-matches-this".into()),
        signal: KillSignal::Term,
    };

    let launcher = launcher();
    let first = launcher.reset_environment(&policy).await;
    let second = launcher.reset_environment(&policy).await;

    assert_eq!(first.processes_signalled, 0);
    assert_eq!(first, second);
}
