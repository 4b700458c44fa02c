//! Agent runtime for the A-share analyst
//!
//! The [`AgentExecutor`] drives a model through a bounded tool-calling loop
//! until it produces a final answer.

pub mod executor;

pub use executor::{AgentExecutor, ExecutorConfig, ExecutorEventHandler, NoOpEventHandler};
