//! React execution loop: call the model, run requested tools, feed results
//! back, repeat until the model answers in plain text or the iteration cap
//! is hit.

use std::sync::Arc;

use async_trait::async_trait;
use desk_core::{Agent, Context, Error, Result};
use desk_llm::{
    CompletionRequest, ContentBlock, LLMProvider, Message, StopReason, ToolDefinition,
};
use desk_tools::ToolRegistry;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::handoff::handoff_tool_name;
use crate::tags::{process_input_message, process_output_message};

/// Configuration for one react agent.
#[derive(Debug, Clone)]
pub struct ReactConfig {
    /// Maximum number of model/tool iterations (prevents infinite loops)
    pub max_iterations: usize,

    /// Model to use
    pub model: String,

    /// System prompt
    pub system_prompt: Option<String>,

    /// Max tokens per completion
    pub max_tokens: usize,

    /// Temperature
    pub temperature: Option<f32>,
}

impl Default for ReactConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            model: "gpt-4.1".to_string(),
            system_prompt: None,
            max_tokens: 4096,
            temperature: Some(0.7),
        }
    }
}

/// Result of one react run: the messages the agent appended and, when a
/// handoff tool was called, the name of the target agent.
#[derive(Debug, Clone)]
pub struct ReactOutcome {
    pub messages: Vec<Message>,
    pub handoff: Option<String>,
}

/// A named agent driving the react loop over a provider and tool registry.
///
/// When `handoff_agents` is non-empty (the supervisor case), a call to a
/// `transfer_to_<agent>` tool short-circuits the loop: the acknowledgment is
/// recorded and the outcome names the target so the caller can route.
pub struct ReactAgent {
    name: String,
    provider: Arc<dyn LLMProvider>,
    tools: Arc<ToolRegistry>,
    config: ReactConfig,
    handoff_agents: Vec<String>,
    parallel_tool_calls: Option<bool>,
    tag_messages: bool,
}

impl ReactAgent {
    pub fn new(
        name: impl Into<String>,
        provider: Arc<dyn LLMProvider>,
        tools: Arc<ToolRegistry>,
        config: ReactConfig,
    ) -> Self {
        Self {
            name: name.into(),
            provider,
            tools,
            config,
            handoff_agents: Vec::new(),
            parallel_tool_calls: None,
            tag_messages: false,
        }
    }

    /// Declares the agents this agent may hand off to.
    pub fn with_handoff_agents(mut self, agents: Vec<String>) -> Self {
        self.handoff_agents = agents;
        self
    }

    /// Forces sequential tool calls on providers that support the flag.
    pub fn with_parallel_tool_calls(mut self, allowed: bool) -> Self {
        self.parallel_tool_calls = Some(allowed);
        self
    }

    /// Enables name/content tag processing on model input and output.
    pub fn with_message_tagging(mut self, enabled: bool) -> Self {
        self.tag_messages = enabled;
        self
    }

    pub fn config(&self) -> &ReactConfig {
        &self.config
    }

    /// Runs the loop against the conversation so far, returning the outcome
    /// with only the newly produced messages.
    pub async fn run(&self, history: &[Message]) -> Result<ReactOutcome> {
        let mut conversation = history.to_vec();
        let start = conversation.len();

        for iteration in 1..=self.config.max_iterations {
            debug!(agent = self.name, iteration, "react iteration");

            let response = self.complete(&conversation).await?;
            let mut message = response.message.with_name(self.name.clone());
            if self.tag_messages {
                message = process_output_message(&message);
            }
            conversation.push(message.clone());

            match response.stop_reason {
                StopReason::EndTurn | StopReason::StopSequence => {
                    info!(
                        agent = self.name,
                        iteration,
                        input_tokens = response.usage.input_tokens,
                        output_tokens = response.usage.output_tokens,
                        "agent completed"
                    );
                    return Ok(ReactOutcome {
                        messages: conversation.split_off(start),
                        handoff: None,
                    });
                }

                StopReason::ToolUse => {
                    let (results, handoff) = self.execute_tools(&message).await;
                    conversation.extend(results);
                    if handoff.is_some() {
                        info!(agent = self.name, target = handoff.as_deref(), "handoff requested");
                        return Ok(ReactOutcome {
                            messages: conversation.split_off(start),
                            handoff,
                        });
                    }
                }

                StopReason::MaxTokens => {
                    warn!(agent = self.name, "completion truncated at max tokens");
                    return Ok(ReactOutcome {
                        messages: conversation.split_off(start),
                        handoff: None,
                    });
                }
            }
        }

        warn!(
            agent = self.name,
            max_iterations = self.config.max_iterations,
            "iteration cap reached"
        );
        conversation.push(Message::assistant_named(
            &self.name,
            "Stopped: maximum number of reasoning steps reached.",
        ));
        Ok(ReactOutcome {
            messages: conversation.split_off(start),
            handoff: None,
        })
    }

    async fn complete(&self, conversation: &[Message]) -> Result<desk_llm::CompletionResponse> {
        let messages: Vec<Message> = if self.tag_messages {
            conversation.iter().map(process_input_message).collect()
        } else {
            conversation.to_vec()
        };

        let mut builder = CompletionRequest::builder(&self.config.model)
            .messages(messages)
            .max_tokens(self.config.max_tokens);
        if let Some(system) = &self.config.system_prompt {
            builder = builder.system(system.clone());
        }
        if let Some(temperature) = self.config.temperature {
            builder = builder.temperature(temperature);
        }
        let tools = self.tool_definitions();
        if !tools.is_empty() {
            builder = builder.tools(tools);
        }
        if let Some(allowed) = self.parallel_tool_calls {
            builder = builder.parallel_tool_calls(allowed);
        }

        self.provider
            .complete(builder.build())
            .await
            .map_err(|err| Error::ProcessingFailed(err.to_string()))
    }

    fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .list_tools()
            .iter()
            .map(|tool| ToolDefinition::new(tool.name(), tool.description(), tool.input_schema()))
            .collect()
    }

    /// Executes the tool calls in an assistant message. A handoff call stops
    /// processing; remaining calls in the same message are dropped since the
    /// conversation is about to move to another agent.
    async fn execute_tools(&self, message: &Message) -> (Vec<Message>, Option<String>) {
        let mut results = Vec::new();

        for tool_use in message.tool_uses() {
            let ContentBlock::ToolUse { id, name, input } = tool_use else {
                continue;
            };

            if let Some(target) = self.handoff_target(name) {
                results.push(Message::tool_result(
                    id.clone(),
                    format!("Successfully transferred to {target}"),
                ));
                return (results, Some(target));
            }

            let Some(tool) = self.tools.get(name) else {
                warn!(agent = self.name, tool = name, "unknown tool requested");
                results.push(Message::tool_error(
                    id.clone(),
                    format!("Tool not found: {name}"),
                ));
                continue;
            };

            debug!(agent = self.name, tool = name, "executing tool");
            match tool.execute(input.clone()).await {
                Ok(result) => {
                    let rendered = render_tool_result(&result);
                    results.push(Message::tool_result(id.clone(), rendered));
                }
                Err(err) => {
                    warn!(agent = self.name, tool = name, %err, "tool execution failed");
                    results.push(Message::tool_error(id.clone(), err.to_string()));
                }
            }
        }

        (results, None)
    }

    fn handoff_target(&self, tool_name: &str) -> Option<String> {
        self.handoff_agents
            .iter()
            .find(|agent| handoff_tool_name(agent) == tool_name)
            .cloned()
    }
}

fn render_tool_result(result: &Value) -> String {
    match result {
        Value::String(s) => s.clone(),
        other => serde_json::to_string(other).unwrap_or_else(|_| other.to_string()),
    }
}

#[async_trait]
impl Agent for ReactAgent {
    async fn invoke(&self, messages: Vec<Message>, _context: &mut Context) -> Result<Vec<Message>> {
        let outcome = self.run(&messages).await?;
        Ok(outcome.messages)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use desk_llm::{CompletionResponse, LLMError, MessageContent, Role, TokenUsage};
    use desk_tools::Tool;
    use serde_json::json;
    use std::sync::Mutex;

    /// Provider that replays a scripted list of responses.
    struct ScriptedProvider {
        responses: Mutex<Vec<CompletionResponse>>,
    }

    impl ScriptedProvider {
        fn new(mut responses: Vec<CompletionResponse>) -> Self {
            responses.reverse();
            Self {
                responses: Mutex::new(responses),
            }
        }
    }

    #[async_trait]
    impl LLMProvider for ScriptedProvider {
        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> desk_llm::Result<CompletionResponse> {
            self.responses
                .lock()
                .map_err(|_| LLMError::RequestFailed("lock poisoned".to_string()))?
                .pop()
                .ok_or_else(|| LLMError::RequestFailed("no scripted response left".to_string()))
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn text_response(text: &str) -> CompletionResponse {
        CompletionResponse {
            message: Message::assistant(text),
            stop_reason: StopReason::EndTurn,
            usage: TokenUsage {
                input_tokens: 1,
                output_tokens: 1,
            },
        }
    }

    fn tool_response(id: &str, name: &str, input: Value) -> CompletionResponse {
        CompletionResponse {
            message: Message {
                role: Role::Assistant,
                content: Some(MessageContent::Blocks(vec![ContentBlock::ToolUse {
                    id: id.to_string(),
                    name: name.to_string(),
                    input,
                }])),
                name: None,
            },
            stop_reason: StopReason::ToolUse,
            usage: TokenUsage {
                input_tokens: 1,
                output_tokens: 1,
            },
        }
    }

    struct UppercaseTool;

    #[async_trait]
    impl Tool for UppercaseTool {
        async fn execute(&self, params: Value) -> desk_core::Result<Value> {
            let text = params["text"].as_str().unwrap_or_default();
            Ok(json!({ "result": text.to_uppercase() }))
        }

        fn name(&self) -> &str {
            "uppercase"
        }

        fn description(&self) -> &str {
            "Uppercase a string"
        }

        fn input_schema(&self) -> Value {
            desk_llm::tools::schema::object(
                json!({"text": desk_llm::tools::schema::string("Text")}),
                vec!["text"],
            )
        }
    }

    fn agent(provider: ScriptedProvider, registry: ToolRegistry) -> ReactAgent {
        ReactAgent::new(
            "worker",
            Arc::new(provider),
            Arc::new(registry),
            ReactConfig::default(),
        )
    }

    #[tokio::test]
    async fn plain_answer_ends_the_loop() {
        let agent = agent(
            ScriptedProvider::new(vec![text_response("done")]),
            ToolRegistry::new(),
        );
        let outcome = agent.run(&[Message::user("hi")]).await.unwrap();
        assert_eq!(outcome.messages.len(), 1);
        assert_eq!(outcome.messages[0].text(), Some("done"));
        assert_eq!(outcome.messages[0].name.as_deref(), Some("worker"));
        assert!(outcome.handoff.is_none());
    }

    #[tokio::test]
    async fn tool_call_loops_back_with_result() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(UppercaseTool));
        let agent = agent(
            ScriptedProvider::new(vec![
                tool_response("call_1", "uppercase", json!({"text": "abc"})),
                text_response("ABC it is"),
            ]),
            registry,
        );

        let outcome = agent.run(&[Message::user("shout abc")]).await.unwrap();
        // assistant tool call, tool result, final answer
        assert_eq!(outcome.messages.len(), 3);
        let Some(MessageContent::Blocks(blocks)) = &outcome.messages[1].content else {
            panic!("expected tool result blocks");
        };
        let ContentBlock::ToolResult { content, .. } = &blocks[0] else {
            panic!("expected tool result");
        };
        assert!(content.contains("ABC"));
        assert_eq!(outcome.messages[2].text(), Some("ABC it is"));
    }

    #[tokio::test]
    async fn unknown_tool_yields_error_result() {
        let agent = agent(
            ScriptedProvider::new(vec![
                tool_response("call_1", "nonexistent", json!({})),
                text_response("giving up"),
            ]),
            ToolRegistry::new(),
        );
        let outcome = agent.run(&[Message::user("hi")]).await.unwrap();
        let Some(MessageContent::Blocks(blocks)) = &outcome.messages[1].content else {
            panic!("expected blocks");
        };
        let ContentBlock::ToolResult { content, is_error, .. } = &blocks[0] else {
            panic!("expected tool result");
        };
        assert_eq!(*is_error, Some(true));
        assert!(content.contains("Tool not found"));
    }

    #[tokio::test]
    async fn handoff_call_short_circuits() {
        let agent = agent(
            ScriptedProvider::new(vec![tool_response(
                "call_1",
                "transfer_to_data_engineer",
                json!({}),
            )]),
            ToolRegistry::new(),
        )
        .with_handoff_agents(vec!["data_engineer".to_string()]);

        let outcome = agent.run(&[Message::user("fetch cpi")]).await.unwrap();
        assert_eq!(outcome.handoff.as_deref(), Some("data_engineer"));
        // assistant handoff call plus acknowledgment
        assert_eq!(outcome.messages.len(), 2);
        let Some(MessageContent::Blocks(blocks)) = &outcome.messages[1].content else {
            panic!("expected blocks");
        };
        let ContentBlock::ToolResult { content, .. } = &blocks[0] else {
            panic!("expected tool result");
        };
        assert_eq!(content, "Successfully transferred to data_engineer");
    }

    #[tokio::test]
    async fn iteration_cap_appends_stop_notice() {
        let mut responses = Vec::new();
        for i in 0..3 {
            responses.push(tool_response(&format!("call_{i}"), "missing", json!({})));
        }
        let provider = ScriptedProvider::new(responses);
        let config = ReactConfig {
            max_iterations: 3,
            ..ReactConfig::default()
        };
        let agent = ReactAgent::new(
            "worker",
            Arc::new(provider),
            Arc::new(ToolRegistry::new()),
            config,
        );

        let outcome = agent.run(&[Message::user("hi")]).await.unwrap();
        let last = outcome.messages.last().unwrap();
        assert!(last.text().unwrap_or_default().contains("maximum number"));
    }
}
