//! Tool framework for the A-share analyst
//!
//! A [`Tool`] is a named async function with a JSON-schema input that the
//! model may call. Tools live in a [`ToolRegistry`].

pub mod registry;
pub mod tool;

pub use registry::ToolRegistry;
pub use tool::Tool;
