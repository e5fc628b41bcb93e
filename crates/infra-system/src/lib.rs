// trainlaunch Infrastructure - System Adapters
// Implements: ProcessReaper, TrainingRunner

pub mod process_reaper_impl;
pub mod subprocess_runner;

pub use process_reaper_impl::SystemProcessReaper;
pub use subprocess_runner::SubprocessRunner;
