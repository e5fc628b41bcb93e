// Reset Policy
//
// How stale training processes are cleared before a launch.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Signal used to terminate matching processes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KillSignal {
    /// SIGTERM, escalating to SIGKILL after a grace period
    Term,
    /// SIGKILL
    Kill,
}

impl fmt::Display for KillSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KillSignal::Term => write!(f, "TERM"),
            KillSignal::Kill => write!(f, "KILL"),
        }
    }
}

/// Reset step configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResetPolicy {
    pub enabled: bool,
    /// Commands run before signalling, each as argv
    pub stop_commands: Vec<Vec<String>>,
    /// Substring matched against full process command lines
    pub kill_pattern: Option<String>,
    pub signal: KillSignal,
}

impl Default for ResetPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            stop_commands: vec![vec!["ray".to_string(), "stop".to_string()]],
            kill_pattern: Some("python3".to_string()),
            signal: KillSignal::Kill,
        }
    }
}

impl ResetPolicy {
    /// Policy that leaves running processes alone
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            stop_commands: Vec::new(),
            kill_pattern: None,
            signal: KillSignal::Kill,
        }
    }
}

/// Outcome of a reset step
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResetReport {
    pub commands_run: usize,
    pub commands_failed: usize,
    pub processes_signalled: usize,
}
