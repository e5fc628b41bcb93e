// Port Layer - Interfaces for external dependencies

pub mod process_reaper;
pub mod time_provider;
pub mod training_runner;

// Re-exports
pub use process_reaper::{ProcessReaper, ReapError};
pub use time_provider::TimeProvider;
pub use training_runner::{RunError, RunOutcome, TrainingRunner};
