// Launch Environment
//
// Variables handed to the training process on top of the inherited
// environment.

use super::error::{DomainError, Result};

/// Disables GPU peer-to-peer transfers in the collective communication library
pub const NCCL_P2P_DISABLE: &str = "NCCL_P2P_DISABLE";

/// Experiment tracking mode
pub const WANDB_MODE: &str = "WANDB_MODE";

/// Ordered, unique environment assignments
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchEnv {
    vars: Vec<(String, String)>,
}

fn check_var(name: &str, value: &str) -> Result<()> {
    let reason = if name.is_empty() {
        Some("name must not be empty")
    } else if name.contains('=') {
        Some("name must not contain '='")
    } else if name.contains('\0') || value.contains('\0') {
        Some("must not contain NUL bytes")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(DomainError::InvalidEnvVar {
            name: name.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

impl LaunchEnv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interconnect and tracking settings for a single-node training run
    pub fn training_defaults() -> Self {
        Self {
            vars: vec![
                (NCCL_P2P_DISABLE.to_string(), "1".to_string()),
                (WANDB_MODE.to_string(), "disabled".to_string()),
            ],
        }
    }

    /// Insert or replace a variable
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let name = name.into();
        let value = value.into();
        check_var(&name, &value)?;

        match self.vars.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.vars.push((name, value)),
        }
        Ok(())
    }

    /// Apply every variable of `other`, replacing existing names
    pub fn merge(&mut self, other: &LaunchEnv) {
        for (name, value) in &other.vars {
            match self.vars.iter_mut().find(|(n, _)| n == name) {
                Some(entry) => entry.1 = value.clone(),
                None => self.vars.push((name.clone(), value.clone())),
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}
