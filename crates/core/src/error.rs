// Central Error Type for the Application

use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    #[error("Run error: {0}")]
    Run(#[from] crate::port::RunError),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
