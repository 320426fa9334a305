//! Core Agent trait definition

use crate::{Context, Result};
use async_trait::async_trait;
use desk_llm::Message;

/// Core trait implemented by every worker the supervisor can hand off to
///
/// Agents consume and produce the shared message history: the supervisor
/// invokes a worker with the conversation so far, and the worker returns the
/// messages it appended (its own reasoning, tool results, and final answer).
#[async_trait]
pub trait Agent: Send + Sync {
    /// Run the agent against the conversation so far
    ///
    /// Returns the messages this agent produced. How many of them are folded
    /// back into the shared history is the caller's decision (see the
    /// supervisor's output mode).
    async fn invoke(&self, messages: Vec<Message>, context: &mut Context) -> Result<Vec<Message>>;

    /// Get the agent's name
    ///
    /// Names must be unique within a supervisor and are used to derive the
    /// handoff tool name (`transfer_to_<name>`).
    fn name(&self) -> &str;

    /// Shutdown the agent, releasing held resources (optional)
    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}
