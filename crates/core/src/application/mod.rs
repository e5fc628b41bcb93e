// Application Layer - Use cases over the domain and ports

pub mod constants;
pub mod launcher;

pub use launcher::Launcher;
