//! Core abstractions for marketdesk
//!
//! This crate defines the fundamental traits and types used throughout the
//! marketdesk workspace: the [`Agent`] trait implemented by the supervisor's
//! workers, the run-scoped [`Context`], and the shared error types.

pub mod agent;
pub mod context;
pub mod error;

pub use agent::Agent;
pub use context::Context;
pub use error::{Error, Result};
