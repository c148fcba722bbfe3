//! ProEdit Application
//!
//! The application shell: an editing session that wires panel actions and
//! surface gestures through history into the canvas, plus file operations.

mod config;
pub mod file_ops;
mod session;

pub use config::{AppConfig, ConfigError};
pub use session::Session;
