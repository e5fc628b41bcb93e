// trainlaunch Core - Domain Logic & Ports
// NO infrastructure dependencies: process and OS access live in infra-system

pub mod application;
pub mod domain;
pub mod error;
pub mod port;

pub use error::{AppError, Result};
