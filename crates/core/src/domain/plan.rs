// Launch Plan
//
// Everything needed to start the training entry point once.

use std::path::PathBuf;

use super::env::LaunchEnv;
use super::overrides::OverrideSet;

pub const DEFAULT_PROGRAM: &str = "python3";
pub const DEFAULT_ENTRY_MODULE: &str = "verl.trainer.main";

/// Program, arguments and environment for one training run
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchPlan {
    pub program: String,
    /// Arguments placed before the overrides (e.g. `-m <module>`)
    pub entry_args: Vec<String>,
    pub overrides: OverrideSet,
    pub env: LaunchEnv,
    pub working_dir: Option<PathBuf>,
}

impl LaunchPlan {
    /// Plan for `python3 -m verl.trainer.main <overrides>`
    pub fn new(overrides: OverrideSet) -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            entry_args: vec!["-m".to_string(), DEFAULT_ENTRY_MODULE.to_string()],
            overrides,
            env: LaunchEnv::new(),
            working_dir: None,
        }
    }

    pub fn with_program(mut self, program: impl Into<String>, entry_args: Vec<String>) -> Self {
        self.program = program.into();
        self.entry_args = entry_args;
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Full argument vector, excluding the program itself
    pub fn argv(&self) -> Vec<String> {
        let mut args = self.entry_args.clone();
        args.extend(self.overrides.to_args());
        args
    }

    /// Shell-quoted one-line rendering, env assignments first
    pub fn command_line(&self) -> String {
        let mut parts: Vec<String> = self
            .env
            .iter()
            .map(|(name, value)| format!("{}={}", name, shell_quote(value)))
            .collect();
        parts.push(shell_quote(&self.program));
        parts.extend(self.argv().iter().map(|a| shell_quote(a)));
        parts.join(" ")
    }
}

fn shell_quote(s: &str) -> String {
    let safe = !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c));
    if safe {
        s.to_string()
    } else {
        format!("'{}'", s.replace('\'', r"'\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argv_puts_entry_args_first() {
        let overrides =
            OverrideSet::from_assignments(["trainer.max_steps=10", "worker.rollout.n=8"]).unwrap();
        let plan = LaunchPlan::new(overrides);

        assert_eq!(
            plan.argv(),
            vec!["-m", "verl.trainer.main", "trainer.max_steps=10", "worker.rollout.n=8"]
        );
    }

    #[test]
    fn test_command_line_quotes_unsafe_text() {
        let overrides = OverrideSet::from_assignments(["trainer.experiment_name=it's a run"]).unwrap();
        let mut plan = LaunchPlan::new(overrides);
        plan.env = LaunchEnv::training_defaults();

        assert_eq!(
            plan.command_line(),
            "NCCL_P2P_DISABLE=1 WANDB_MODE=disabled python3 -m verl.trainer.main \
             'trainer.experiment_name=it'\\''s a run'"
        );
    }

    #[test]
    fn test_with_program() {
        let plan = LaunchPlan::new(OverrideSet::new())
            .with_program("torchrun", vec!["train.py".into()])
            .with_working_dir("/srv/easyr1");

        assert_eq!(plan.program, "torchrun");
        assert_eq!(plan.argv(), vec!["train.py"]);
        assert_eq!(plan.working_dir, Some(PathBuf::from("/srv/easyr1")));
    }
}
