// Domain Layer - Pure launch configuration model

pub mod env;
pub mod error;
pub mod overrides;
pub mod plan;
pub mod profile;
pub mod reset;

// Re-exports
pub use env::LaunchEnv;
pub use error::DomainError;
pub use overrides::{OverrideKey, OverrideSet, OverrideValue};
pub use plan::LaunchPlan;
pub use profile::{AdvantageEstimator, TrainingProfile};
pub use reset::{KillSignal, ResetPolicy, ResetReport};
