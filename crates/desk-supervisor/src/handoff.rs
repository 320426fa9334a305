//! Handoff tools and the message pair recorded when control returns to the
//! supervisor.

use async_trait::async_trait;
use desk_llm::tools::schema;
use desk_llm::{ContentBlock, Message, MessageContent, Role};
use desk_tools::Tool;
use serde_json::{json, Value};
use uuid::Uuid;

/// Derives the tool name the supervisor calls to hand off to an agent.
pub fn handoff_tool_name(agent_name: &str) -> String {
    format!("transfer_to_{agent_name}")
}

/// A no-op tool whose invocation signals a handoff. The supervisor loop
/// intercepts the call and routes to the named worker; executing the tool
/// just produces the acknowledgment that lands in the history.
pub struct HandoffTool {
    agent_name: String,
    tool_name: String,
    description: String,
}

impl HandoffTool {
    pub fn new(agent_name: impl Into<String>) -> Self {
        let agent_name = agent_name.into();
        Self {
            tool_name: handoff_tool_name(&agent_name),
            description: format!("Ask agent '{agent_name}' for help"),
            agent_name,
        }
    }

    pub fn agent_name(&self) -> &str {
        &self.agent_name
    }

    /// The acknowledgment recorded as the tool result.
    pub fn acknowledgment(&self) -> String {
        format!("Successfully transferred to {}", self.agent_name)
    }
}

#[async_trait]
impl Tool for HandoffTool {
    async fn execute(&self, _params: Value) -> desk_core::Result<Value> {
        Ok(Value::String(self.acknowledgment()))
    }

    fn name(&self) -> &str {
        &self.tool_name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn input_schema(&self) -> Value {
        schema::object(json!({}), vec![])
    }
}

/// Builds the (assistant, tool result) pair appended to the history when a
/// worker hands control back, so the transcript shows the transfer
/// explicitly.
pub fn handoff_back_messages(agent_name: &str, supervisor_name: &str) -> (Message, Message) {
    let tool_call_id = Uuid::new_v4().to_string();
    let tool_name = format!("transfer_back_to_{supervisor_name}");

    let announcement = Message {
        role: Role::Assistant,
        content: Some(MessageContent::Blocks(vec![
            ContentBlock::Text {
                text: format!("Transferring back to {supervisor_name}"),
            },
            ContentBlock::ToolUse {
                id: tool_call_id.clone(),
                name: tool_name,
                input: json!({}),
            },
        ])),
        name: Some(agent_name.to_string()),
    };
    let acknowledgment = Message::tool_result(
        tool_call_id,
        format!("Successfully transferred back to {supervisor_name}"),
    );

    (announcement, acknowledgment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_name_derivation() {
        assert_eq!(handoff_tool_name("data_engineer"), "transfer_to_data_engineer");
    }

    #[tokio::test]
    async fn handoff_tool_acknowledges() {
        let tool = HandoffTool::new("data_analyst");
        assert_eq!(tool.name(), "transfer_to_data_analyst");
        let result = tool.execute(json!({})).await.unwrap();
        assert_eq!(
            result,
            Value::String("Successfully transferred to data_analyst".to_string())
        );
    }

    #[test]
    fn handoff_back_pair_shares_tool_call_id() {
        let (announcement, acknowledgment) = handoff_back_messages("data_engineer", "supervisor");
        assert_eq!(announcement.name.as_deref(), Some("data_engineer"));

        let uses = announcement.tool_uses();
        assert_eq!(uses.len(), 1);
        let ContentBlock::ToolUse { id, name, .. } = uses[0] else {
            panic!("expected tool use block");
        };
        assert_eq!(name, "transfer_back_to_supervisor");

        let Some(MessageContent::Blocks(blocks)) = &acknowledgment.content else {
            panic!("expected block content");
        };
        let ContentBlock::ToolResult { tool_use_id, content, .. } = &blocks[0] else {
            panic!("expected tool result block");
        };
        assert_eq!(tool_use_id, id);
        assert_eq!(content, "Successfully transferred back to supervisor");
    }
}
