//! Shared utilities for the A-share analyst
//!
//! Logging setup and the `KEY=VALUE` env file that stores secrets such as
//! the OpenRouter API key.

pub mod env_file;
pub mod logging;

pub use env_file::{EnvFile, EnvFileError};
pub use logging::init_tracing;
