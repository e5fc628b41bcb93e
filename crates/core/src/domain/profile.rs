// Training Profile
//
// Typed view over the override keys the training entry point recognizes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use super::error::{DomainError, Result};
use super::overrides::{OverrideKey, OverrideSet, OverrideValue};

pub const KEY_CONFIG: &str = "config";
pub const KEY_ADV_ESTIMATOR: &str = "algorithm.adv_estimator";
pub const KEY_MAX_STEPS: &str = "trainer.max_steps";
pub const KEY_N_GPUS_PER_NODE: &str = "trainer.n_gpus_per_node";
pub const KEY_ACTOR_STRATEGY: &str = "worker.actor.strategy";
pub const KEY_CRITIC_STRATEGY: &str = "worker.critic.strategy";
pub const KEY_ROLLOUT_NAME: &str = "worker.rollout.name";
pub const KEY_ROLLOUT_N: &str = "worker.rollout.n";
pub const KEY_ROLLOUT_GPU_MEMORY_UTILIZATION: &str = "worker.rollout.gpu_memory_utilization";
pub const KEY_ROLLOUT_TENSOR_PARALLEL_SIZE: &str = "worker.rollout.tensor_parallel_size";
pub const KEY_REWARD_FUNCTION: &str = "worker.reward.reward_function";
pub const KEY_CRITIC_MODEL_PATH: &str = "worker.critic.model.model_path";
pub const KEY_CRITIC_TOKENIZER_PATH: &str = "worker.critic.model.tokenizer_path";

/// Advantage estimator selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvantageEstimator {
    Gae,
    Grpo,
    ReinforcePlusPlus,
    Remax,
    Rloo,
}

impl fmt::Display for AdvantageEstimator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdvantageEstimator::Gae => write!(f, "gae"),
            AdvantageEstimator::Grpo => write!(f, "grpo"),
            AdvantageEstimator::ReinforcePlusPlus => write!(f, "reinforce_plus_plus"),
            AdvantageEstimator::Remax => write!(f, "remax"),
            AdvantageEstimator::Rloo => write!(f, "rloo"),
        }
    }
}

/// Training run parameters
///
/// Defaults match the stock 0.5B GRPO run on a two-GPU node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingProfile {
    pub config: PathBuf,
    pub adv_estimator: AdvantageEstimator,
    pub max_steps: u64,
    pub n_gpus_per_node: u32,
    pub actor_strategy: String,
    pub critic_strategy: String,
    pub rollout_engine: String,
    pub rollout_n: u32,
    pub rollout_gpu_memory_utilization: f64,
    pub rollout_tensor_parallel_size: u32,
    pub reward_function: PathBuf,
    pub critic_model_path: Option<PathBuf>,
    pub critic_tokenizer_path: Option<PathBuf>,
}

impl Default for TrainingProfile {
    fn default() -> Self {
        Self {
            config: PathBuf::from("examples/config_0.5b.yaml"),
            adv_estimator: AdvantageEstimator::Grpo,
            max_steps: 10,
            n_gpus_per_node: 2,
            actor_strategy: "fsdp".to_string(),
            critic_strategy: "fsdp".to_string(),
            rollout_engine: "vllm".to_string(),
            rollout_n: 8,
            rollout_gpu_memory_utilization: 0.5,
            rollout_tensor_parallel_size: 1,
            reward_function: PathBuf::from("examples/reward_function/math.py"),
            critic_model_path: None,
            critic_tokenizer_path: None,
        }
    }
}

fn invalid(key: &str, reason: impl Into<String>) -> DomainError {
    DomainError::InvalidValue {
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn require_positive(key: &str, value: u64) -> Result<()> {
    if value == 0 {
        return Err(invalid(key, "must be at least 1"));
    }
    Ok(())
}

fn require_non_empty(key: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(key, "must not be empty"));
    }
    Ok(())
}

impl TrainingProfile {
    /// Check every field constraint
    pub fn validate(&self) -> Result<()> {
        if self.config.as_os_str().is_empty() {
            return Err(invalid(KEY_CONFIG, "path must not be empty"));
        }
        require_positive(KEY_MAX_STEPS, self.max_steps)?;
        require_positive(KEY_N_GPUS_PER_NODE, u64::from(self.n_gpus_per_node))?;
        require_non_empty(KEY_ACTOR_STRATEGY, &self.actor_strategy)?;
        require_non_empty(KEY_CRITIC_STRATEGY, &self.critic_strategy)?;
        require_non_empty(KEY_ROLLOUT_NAME, &self.rollout_engine)?;
        require_positive(KEY_ROLLOUT_N, u64::from(self.rollout_n))?;

        let util = self.rollout_gpu_memory_utilization;
        if !(util > 0.0 && util <= 1.0) {
            return Err(invalid(
                KEY_ROLLOUT_GPU_MEMORY_UTILIZATION,
                format!("{} is outside (0, 1]", util),
            ));
        }

        let tp = self.rollout_tensor_parallel_size;
        require_positive(KEY_ROLLOUT_TENSOR_PARALLEL_SIZE, u64::from(tp))?;
        if self.n_gpus_per_node % tp != 0 {
            return Err(invalid(
                KEY_ROLLOUT_TENSOR_PARALLEL_SIZE,
                format!("{} does not divide {} GPUs per node", tp, self.n_gpus_per_node),
            ));
        }

        if self.reward_function.as_os_str().is_empty() {
            return Err(invalid(KEY_REWARD_FUNCTION, "path must not be empty"));
        }

        Ok(())
    }

    /// Validate and render the profile as an override set
    pub fn to_overrides(&self) -> Result<OverrideSet> {
        self.validate()?;

        let key = |k: &str| OverrideKey::new(k);
        let max_steps = i64::try_from(self.max_steps)
            .map_err(|_| invalid(KEY_MAX_STEPS, "too large"))?;

        let mut set = OverrideSet::new();
        set.insert(key(KEY_CONFIG)?, self.config.clone())?;
        set.insert(key(KEY_ADV_ESTIMATOR)?, self.adv_estimator.to_string())?;
        set.insert(key(KEY_MAX_STEPS)?, max_steps)?;
        set.insert(key(KEY_N_GPUS_PER_NODE)?, self.n_gpus_per_node)?;
        set.insert(key(KEY_ACTOR_STRATEGY)?, self.actor_strategy.as_str())?;
        set.insert(key(KEY_CRITIC_STRATEGY)?, self.critic_strategy.as_str())?;
        set.insert(key(KEY_ROLLOUT_NAME)?, self.rollout_engine.as_str())?;
        set.insert(key(KEY_ROLLOUT_N)?, self.rollout_n)?;

        let util_key = key(KEY_ROLLOUT_GPU_MEMORY_UTILIZATION)?;
        let util = OverrideValue::float(&util_key, self.rollout_gpu_memory_utilization)?;
        set.insert(util_key, util)?;

        set.insert(
            key(KEY_ROLLOUT_TENSOR_PARALLEL_SIZE)?,
            self.rollout_tensor_parallel_size,
        )?;
        set.insert(key(KEY_REWARD_FUNCTION)?, self.reward_function.clone())?;

        if let Some(path) = &self.critic_model_path {
            set.insert(key(KEY_CRITIC_MODEL_PATH)?, path.clone())?;
        }
        if let Some(path) = &self.critic_tokenizer_path {
            set.insert(key(KEY_CRITIC_TOKENIZER_PATH)?, path.clone())?;
        }

        Ok(set)
    }
}
