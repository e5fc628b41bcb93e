// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum DomainError {
    #[error("Invalid override key: {0:?}")]
    InvalidKey(String),

    #[error("Duplicate override key: {0}")]
    DuplicateKey(String),

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Malformed assignment (expected KEY=VALUE): {0:?}")]
    MalformedAssignment(String),

    #[error("Invalid environment variable {name:?}: {reason}")]
    InvalidEnvVar { name: String, reason: String },
}

pub type Result<T> = std::result::Result<T, DomainError>;
