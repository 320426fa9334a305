//! Tool management framework for marketdesk
//!
//! This crate provides the `Tool` trait implemented by every function an agent
//! can call, and the registry agents draw their tool sets from.

pub mod registry;
pub mod tool;

pub use registry::ToolRegistry;
pub use tool::Tool;
