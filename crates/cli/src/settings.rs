//! Layered launcher configuration
//!
//! Sources, lowest precedence first:
//!
//! 1. built-in defaults (the stock 0.5B GRPO run)
//! 2. a TOML file (`--config`, `TRAINLAUNCH_CONFIG`, or
//!    `<config dir>/trainlaunch/launch.toml` when present)
//! 3. `TRAINLAUNCH__`-prefixed environment variables, `__` between levels
//!    (e.g. `TRAINLAUNCH__PROFILE__MAX_STEPS=20`)

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use trainlaunch_core::domain::env::{NCCL_P2P_DISABLE, WANDB_MODE};
use trainlaunch_core::domain::plan::{DEFAULT_ENTRY_MODULE, DEFAULT_PROGRAM};
use trainlaunch_core::domain::{LaunchEnv, LaunchPlan, OverrideSet, ResetPolicy, TrainingProfile};

const ENV_PREFIX: &str = "TRAINLAUNCH";
const ENV_SEPARATOR: &str = "__";
const DEFAULT_CONFIG_FILE: &str = "launch.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherSettings {
    pub program: String,
    pub entry_args: Vec<String>,
    pub working_dir: Option<String>,
    pub profile: TrainingProfile,
    /// `NAME=VALUE` variables for the training process
    pub env: Vec<String>,
    pub reset: ResetPolicy,
    /// Extra `KEY=VALUE` overrides applied over the profile
    pub overrides: Vec<String>,
}

impl Default for LauncherSettings {
    fn default() -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            entry_args: vec!["-m".to_string(), DEFAULT_ENTRY_MODULE.to_string()],
            working_dir: None,
            profile: TrainingProfile::default(),
            env: vec![
                format!("{}=1", NCCL_P2P_DISABLE),
                format!("{}=disabled", WANDB_MODE),
            ],
            reset: ResetPolicy::default(),
            overrides: Vec::new(),
        }
    }
}

/// Per-user config file, if one exists
fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "trainlaunch")
        .map(|dirs| dirs.config_dir().join(DEFAULT_CONFIG_FILE))
        .filter(|path| path.exists())
}

fn expand(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(s) => PathBuf::from(shellexpand::tilde(s).into_owned()),
        None => path.to_path_buf(),
    }
}

impl LauncherSettings {
    /// Load settings from defaults, an optional file and the environment
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let defaults =
            Config::try_from(&LauncherSettings::default()).context("Invalid built-in defaults")?;

        let mut builder = Config::builder().add_source(defaults);

        let file = explicit.map(expand).or_else(default_config_path);
        if let Some(path) = &file {
            tracing::info!(path = %path.display(), "Loading launcher config file");
            builder = builder.add_source(File::from(path.as_path()).required(true));
        }

        let settings: LauncherSettings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator(ENV_SEPARATOR)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read launcher configuration")?
            .try_deserialize()
            .context("Invalid launcher configuration")?;

        Ok(settings.expanded())
    }

    /// Tilde-expand every path-like setting
    fn expanded(mut self) -> Self {
        self.working_dir = self
            .working_dir
            .map(|dir| shellexpand::tilde(&dir).into_owned());
        let profile = &mut self.profile;
        profile.config = expand(&profile.config);
        profile.reward_function = expand(&profile.reward_function);
        profile.critic_model_path = profile.critic_model_path.as_deref().map(expand);
        profile.critic_tokenizer_path = profile.critic_tokenizer_path.as_deref().map(expand);
        self
    }

    /// Configured variables, then `extra` (later wins)
    pub fn launch_env(&self, extra: &[String]) -> Result<LaunchEnv> {
        let mut env = LaunchEnv::new();
        for raw in self.env.iter().chain(extra) {
            let (name, value) = raw.split_once('=').with_context(|| {
                format!("Malformed env assignment (expected NAME=VALUE): {:?}", raw)
            })?;
            env.set(name, value)?;
        }
        Ok(env)
    }

    /// Reset policy with an empty kill pattern treated as "no pattern"
    pub fn reset_policy(&self) -> ResetPolicy {
        let mut policy = self.reset.clone();
        if policy.kill_pattern.as_deref().is_some_and(|p| p.trim().is_empty()) {
            policy.kill_pattern = None;
        }
        policy
    }

    /// Profile overrides, then configured overrides, then `extra` (later wins)
    pub fn build_plan(&self, extra: &[String]) -> Result<LaunchPlan> {
        let mut overrides = self
            .profile
            .to_overrides()
            .context("Invalid training profile")?;
        overrides.merge(
            OverrideSet::from_assignments(&self.overrides).context("Invalid configured override")?,
        );
        overrides.merge(OverrideSet::from_assignments(extra).context("Invalid --set override")?);

        let mut plan = LaunchPlan::new(overrides)
            .with_program(self.program.clone(), self.entry_args.clone());
        if let Some(dir) = &self.working_dir {
            plan = plan.with_working_dir(dir);
        }
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;
    use trainlaunch_core::domain::{AdvantageEstimator, KillSignal, OverrideValue};

    // Serializes tests that read or write TRAINLAUNCH__* process variables
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn env_guard() -> std::sync::MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn write_config(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "trainlaunch_settings_{}_{}.toml",
            name,
            std::process::id()
        ));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_defaults_build_stock_plan() {
        let settings = LauncherSettings::default();
        let plan = settings.build_plan(&[]).unwrap();

        assert_eq!(plan.program, "python3");
        assert_eq!(plan.argv()[..2], ["-m", "verl.trainer.main"]);
        assert_eq!(plan.overrides.len(), 11);
        assert_eq!(settings.launch_env(&[]).unwrap().get(WANDB_MODE), Some("disabled"));
    }

    #[test]
    fn test_file_layer_overrides_defaults() {
        let _guard = env_guard();
        let path = write_config(
            "file_layer",
            r#"
working_dir = "/srv/easyr1"
overrides = ["trainer.experiment_name=qwen2_0_5b"]
env = ["NCCL_P2P_DISABLE=1", "CUDA_VISIBLE_DEVICES=0,1"]

[profile]
adv_estimator = "rloo"
max_steps = 200
critic_model_path = "/models/Qwen2-0.5B"

[reset]
signal = "term"
stop_commands = [["ray", "stop", "--force"]]
"#,
        );

        let settings = LauncherSettings::load(Some(&path)).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(settings.profile.adv_estimator, AdvantageEstimator::Rloo);
        assert_eq!(settings.profile.max_steps, 200);
        assert_eq!(settings.profile.rollout_n, 8);
        assert_eq!(settings.reset.signal, KillSignal::Term);
        assert_eq!(
            settings.reset.stop_commands,
            vec![vec!["ray".to_string(), "stop".into(), "--force".into()]]
        );
        assert_eq!(settings.reset.kill_pattern.as_deref(), Some("python3"));

        // env replaces the built-in list wholesale
        let env = settings.launch_env(&[]).unwrap();
        assert_eq!(env.get("CUDA_VISIBLE_DEVICES"), Some("0,1"));
        assert_eq!(env.get(NCCL_P2P_DISABLE), Some("1"));
        assert_eq!(env.get(WANDB_MODE), None);

        let plan = settings.build_plan(&[]).unwrap();
        assert_eq!(plan.working_dir, Some(PathBuf::from("/srv/easyr1")));
        assert_eq!(
            plan.overrides.get("trainer.experiment_name"),
            Some(&OverrideValue::from("qwen2_0_5b"))
        );
        assert_eq!(
            plan.overrides.get("worker.critic.model.model_path"),
            Some(&OverrideValue::Path(PathBuf::from("/models/Qwen2-0.5B")))
        );
    }

    #[test]
    fn test_cli_overrides_win() {
        let settings = LauncherSettings {
            overrides: vec!["trainer.max_steps=50".into()],
            ..Default::default()
        };
        let plan = settings
            .build_plan(&["trainer.max_steps=5".into(), "trainer.save_freq=1".into()])
            .unwrap();

        assert_eq!(
            plan.overrides.get("trainer.max_steps"),
            Some(&OverrideValue::Int(5))
        );
        assert_eq!(plan.overrides.to_args().last().unwrap(), "trainer.save_freq=1");
    }

    #[test]
    fn test_bad_override_rejected() {
        let settings = LauncherSettings::default();
        assert!(settings.build_plan(&["no_equals_sign".into()]).is_err());
    }

    #[test]
    fn test_extra_env_wins() {
        let settings = LauncherSettings::default();
        let env = settings
            .launch_env(&["WANDB_MODE=offline".into()])
            .unwrap();
        assert_eq!(env.get(WANDB_MODE), Some("offline"));
        assert!(settings.launch_env(&["NOEQUALS".into()]).is_err());
    }

    #[test]
    fn test_empty_kill_pattern_disables_kill() {
        let mut settings = LauncherSettings::default();
        settings.reset.kill_pattern = Some(" ".into());
        assert_eq!(settings.reset_policy().kill_pattern, None);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let _guard = env_guard();
        let missing = std::env::temp_dir().join("trainlaunch_definitely_missing.toml");
        assert!(LauncherSettings::load(Some(&missing)).is_err());
    }

    #[test]
    fn test_env_layer_beats_file() {
        let _guard = env_guard();
        let path = write_config(
            "env_layer",
            r#"
[profile]
max_steps = 200
"#,
        );

        std::env::set_var("TRAINLAUNCH__PROFILE__MAX_STEPS", "20");
        std::env::set_var("TRAINLAUNCH__PROFILE__ROLLOUT_GPU_MEMORY_UTILIZATION", "1.0");
        let loaded = LauncherSettings::load(Some(&path));
        std::env::remove_var("TRAINLAUNCH__PROFILE__MAX_STEPS");
        std::env::remove_var("TRAINLAUNCH__PROFILE__ROLLOUT_GPU_MEMORY_UTILIZATION");
        std::fs::remove_file(&path).ok();

        let settings = loaded.unwrap();
        assert_eq!(settings.profile.max_steps, 20);
        assert_eq!(settings.profile.rollout_gpu_memory_utilization, 1.0);
        assert_eq!(
            settings.build_plan(&[]).unwrap().overrides.get("trainer.max_steps"),
            Some(&OverrideValue::Int(20))
        );
    }

    #[test]
    fn test_tilde_paths_expanded() {
        let _guard = env_guard();
        let path = write_config(
            "tilde",
            r#"
working_dir = "~/EasyR1"

[profile]
config = "~/EasyR1/examples/config_0.5b.yaml"
reward_function = "examples/reward_function/math.py"
critic_model_path = "~/models/q"
critic_tokenizer_path = "~/models/q"
"#,
        );

        let loaded = LauncherSettings::load(Some(&path));
        std::fs::remove_file(&path).ok();
        let settings = loaded.unwrap();

        let home = PathBuf::from(shellexpand::tilde("~").into_owned());
        assert!(!home.starts_with("~"));

        assert_eq!(
            settings.working_dir.map(PathBuf::from),
            Some(home.join("EasyR1"))
        );
        assert_eq!(
            settings.profile.config,
            home.join("EasyR1/examples/config_0.5b.yaml")
        );
        // Relative paths are left alone
        assert_eq!(
            settings.profile.reward_function,
            PathBuf::from("examples/reward_function/math.py")
        );
        assert_eq!(settings.profile.critic_model_path, Some(home.join("models/q")));
        assert_eq!(settings.profile.critic_tokenizer_path, Some(home.join("models/q")));
    }
}
