// Process Reaper Port
// Abstraction over stopping and signalling stale training processes

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::KillSignal;

/// Reaper errors
///
/// The launcher treats all of these as non-fatal.
#[derive(Error, Debug)]
pub enum ReapError {
    #[error("Stop command failed to start: {0}")]
    CommandSpawn(String),

    #[error("Stop command exited with {0:?}")]
    CommandFailed(Option<i32>),

    #[error("Empty stop command")]
    EmptyCommand,

    #[error("Signal delivery failed: {0}")]
    Signal(String),
}

/// Process Reaper trait
///
/// Implementations:
/// - SystemProcessReaper: sysinfo process table + signals
#[async_trait]
pub trait ProcessReaper: Send + Sync {
    /// Run one stop command (argv form) to completion
    ///
    /// # Errors
    /// - ReapError::CommandSpawn if the program cannot be started
    /// - ReapError::CommandFailed if it exits unsuccessfully
    async fn run_stop_command(&self, argv: &[String]) -> Result<(), ReapError>;

    /// Signal every process whose full command line contains `pattern`
    ///
    /// The calling process and its parent are never signalled.
    ///
    /// # Returns
    /// Number of processes signalled (zero is not an error)
    async fn terminate_matching(&self, pattern: &str, signal: KillSignal)
        -> Result<usize, ReapError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Recorded reaper call
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum ReapCall {
        StopCommand(Vec<String>),
        Terminate(String, KillSignal),
    }

    /// Mock ProcessReaper that records calls into a shared journal
    pub struct MockProcessReaper {
        journal: Arc<Mutex<Vec<String>>>,
        calls: Mutex<Vec<ReapCall>>,
        fail_commands: bool,
        matches: usize,
    }

    impl MockProcessReaper {
        pub fn new(journal: Arc<Mutex<Vec<String>>>) -> Self {
            Self {
                journal,
                calls: Mutex::new(Vec::new()),
                fail_commands: false,
                matches: 0,
            }
        }

        /// Every stop command reports failure
        pub fn failing(mut self) -> Self {
            self.fail_commands = true;
            self
        }

        /// terminate_matching reports this many processes
        pub fn with_matches(mut self, matches: usize) -> Self {
            self.matches = matches;
            self
        }

        pub fn calls(&self) -> Vec<ReapCall> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ProcessReaper for MockProcessReaper {
        async fn run_stop_command(&self, argv: &[String]) -> Result<(), ReapError> {
            self.calls
                .lock()
                .unwrap()
                .push(ReapCall::StopCommand(argv.to_vec()));
            self.journal.lock().unwrap().push("reset".to_string());

            if self.fail_commands {
                Err(ReapError::CommandSpawn("mock failure".to_string()))
            } else {
                Ok(())
            }
        }

        async fn terminate_matching(
            &self,
            pattern: &str,
            signal: KillSignal,
        ) -> Result<usize, ReapError> {
            self.calls
                .lock()
                .unwrap()
                .push(ReapCall::Terminate(pattern.to_string(), signal));
            self.journal.lock().unwrap().push("reset".to_string());
            Ok(self.matches)
        }
    }
}
