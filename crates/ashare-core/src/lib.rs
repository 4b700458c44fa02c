//! Core abstractions shared by the A-share analyst crates
//!
//! Defines the [`Agent`] trait, the per-run [`Context`] and the error type
//! every layer converts into at the agent boundary.

pub mod agent;
pub mod context;
pub mod error;

pub use agent::Agent;
pub use context::Context;
pub use error::{Error, Result};
