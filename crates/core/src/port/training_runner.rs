// Training Runner Port
// Abstraction for executing the external training entry point

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::LaunchPlan;

/// How the training process ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    /// Exit code, if the process exited normally
    pub exit_code: Option<i32>,
    /// Terminating signal, if the process was killed (unix only)
    pub signal: Option<i32>,
    pub duration_ms: i64,
}

impl RunOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Exit status to report for the launcher itself
    ///
    /// Death by signal N maps to 128 + N, as shells report it.
    pub fn propagated_code(&self) -> i32 {
        match (self.exit_code, self.signal) {
            (Some(code), _) => code,
            (None, Some(signal)) => 128 + signal,
            (None, None) => 1,
        }
    }
}

/// Run errors
#[derive(Error, Debug)]
pub enum RunError {
    #[error("Spawn failed for {program}: {reason}")]
    SpawnFailed { program: String, reason: String },

    #[error("Waiting for training process failed: {0}")]
    WaitFailed(String),
}

/// Training Runner trait
///
/// Implementations:
/// - SubprocessRunner: spawns the program as a child process
#[async_trait]
pub trait TrainingRunner: Send + Sync {
    /// Start the plan's program and block until it exits
    ///
    /// # Errors
    /// - RunError::SpawnFailed if the program cannot be started
    /// - RunError::WaitFailed if the exit status cannot be collected
    async fn run(&self, plan: &LaunchPlan) -> Result<RunOutcome, RunError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Mock TrainingRunner that records plans and returns a fixed exit code
    pub struct RecordingRunner {
        journal: Arc<Mutex<Vec<String>>>,
        plans: Mutex<Vec<LaunchPlan>>,
        exit_code: Option<i32>,
    }

    impl RecordingRunner {
        pub fn new(journal: Arc<Mutex<Vec<String>>>, exit_code: i32) -> Self {
            Self {
                journal,
                plans: Mutex::new(Vec::new()),
                exit_code: Some(exit_code),
            }
        }

        /// Runner whose spawn always fails
        pub fn unspawnable(journal: Arc<Mutex<Vec<String>>>) -> Self {
            Self {
                journal,
                plans: Mutex::new(Vec::new()),
                exit_code: None,
            }
        }

        pub fn plans(&self) -> Vec<LaunchPlan> {
            self.plans.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TrainingRunner for RecordingRunner {
        async fn run(&self, plan: &LaunchPlan) -> Result<RunOutcome, RunError> {
            self.journal.lock().unwrap().push("run".to_string());
            self.plans.lock().unwrap().push(plan.clone());

            match self.exit_code {
                Some(code) => Ok(RunOutcome {
                    exit_code: Some(code),
                    signal: None,
                    duration_ms: 0,
                }),
                None => Err(RunError::SpawnFailed {
                    program: plan.program.clone(),
                    reason: "mock spawn failure".to_string(),
                }),
            }
        }
    }
}
