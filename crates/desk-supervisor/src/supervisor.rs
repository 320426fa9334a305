//! The supervisor agent: routes requests to named workers over handoff
//! tools and folds their output back into the shared history.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use desk_core::{Agent, Context, Error, Result};
use desk_llm::{LLMProvider, Message};
use desk_tools::{Tool, ToolRegistry};
use tracing::{info, warn};

use crate::handoff::{handoff_back_messages, HandoffTool};
use crate::react::{ReactAgent, ReactConfig};

const DEFAULT_SUPERVISOR_NAME: &str = "supervisor";
const MAX_HANDOFF_CYCLES: usize = 10;

/// How a worker's messages fold into the shared history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Add the worker's entire message trace
    FullHistory,
    /// Add only the worker's last message
    #[default]
    LastMessage,
}

/// Builder for a [`Supervisor`].
pub struct SupervisorBuilder {
    provider: Arc<dyn LLMProvider>,
    workers: Vec<Arc<dyn Agent>>,
    tools: Vec<Arc<dyn Tool>>,
    config: ReactConfig,
    output_mode: OutputMode,
    add_handoff_back_messages: bool,
    supervisor_name: String,
    tag_messages: bool,
}

impl SupervisorBuilder {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            provider,
            workers: Vec::new(),
            tools: Vec::new(),
            config: ReactConfig::default(),
            output_mode: OutputMode::default(),
            add_handoff_back_messages: true,
            supervisor_name: DEFAULT_SUPERVISOR_NAME.to_string(),
            tag_messages: false,
        }
    }

    /// Adds a worker the supervisor can hand off to.
    pub fn worker(mut self, agent: Arc<dyn Agent>) -> Self {
        self.workers.push(agent);
        self
    }

    /// Adds a tool the supervisor itself can call.
    pub fn tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    /// Sets the supervisor's system prompt.
    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    /// Overrides the full react configuration (model, caps, temperature).
    pub fn config(mut self, config: ReactConfig) -> Self {
        self.config = config;
        self
    }

    pub fn output_mode(mut self, mode: OutputMode) -> Self {
        self.output_mode = mode;
        self
    }

    pub fn add_handoff_back_messages(mut self, enabled: bool) -> Self {
        self.add_handoff_back_messages = enabled;
        self
    }

    pub fn supervisor_name(mut self, name: impl Into<String>) -> Self {
        self.supervisor_name = name.into();
        self
    }

    /// Enables name/content tag processing on the supervisor's model traffic.
    pub fn tag_messages(mut self, enabled: bool) -> Self {
        self.tag_messages = enabled;
        self
    }

    /// Validates worker names and assembles the supervisor.
    pub fn build(self) -> Result<Supervisor> {
        let mut workers: HashMap<String, Arc<dyn Agent>> = HashMap::new();
        for worker in self.workers {
            let name = worker.name().to_string();
            if name.trim().is_empty() {
                return Err(Error::InvalidConfiguration(
                    "worker agents must have a non-empty name".to_string(),
                ));
            }
            if name == self.supervisor_name {
                return Err(Error::InvalidConfiguration(format!(
                    "worker name '{name}' collides with the supervisor name"
                )));
            }
            if workers.insert(name.clone(), worker).is_some() {
                return Err(Error::InvalidConfiguration(format!(
                    "agent with name '{name}' already exists, agent names must be unique"
                )));
            }
        }

        let registry = ToolRegistry::new();
        for tool in &self.tools {
            registry.register(Arc::clone(tool));
        }
        let worker_names: Vec<String> = workers.keys().cloned().collect();
        for name in &worker_names {
            registry.register(Arc::new(HandoffTool::new(name.clone())));
        }

        // Sequential tool calls only: a handoff must not race other calls.
        let executor = ReactAgent::new(
            self.supervisor_name.clone(),
            self.provider,
            Arc::new(registry),
            self.config,
        )
        .with_handoff_agents(worker_names)
        .with_parallel_tool_calls(false)
        .with_message_tagging(self.tag_messages);

        Ok(Supervisor {
            executor,
            workers,
            output_mode: self.output_mode,
            add_handoff_back_messages: self.add_handoff_back_messages,
            supervisor_name: self.supervisor_name,
        })
    }
}

/// A supervisor driving a set of named workers.
pub struct Supervisor {
    executor: ReactAgent,
    workers: HashMap<String, Arc<dyn Agent>>,
    output_mode: OutputMode,
    add_handoff_back_messages: bool,
    supervisor_name: String,
}

impl Supervisor {
    pub fn builder(provider: Arc<dyn LLMProvider>) -> SupervisorBuilder {
        SupervisorBuilder::new(provider)
    }

    pub fn worker_names(&self) -> Vec<&str> {
        self.workers.keys().map(String::as_str).collect()
    }

    /// Runs one request end to end and returns the final answer text.
    pub async fn run(&self, prompt: impl Into<String>, context: &mut Context) -> Result<String> {
        let produced = self.invoke(vec![Message::user(prompt)], context).await?;
        let answer = produced
            .iter()
            .rev()
            .find_map(|m| m.text())
            .unwrap_or("No response")
            .to_string();
        Ok(answer)
    }

    fn fold_worker_output(&self, agent_name: &str, mut messages: Vec<Message>) -> Vec<Message> {
        let mut folded = match self.output_mode {
            OutputMode::FullHistory => messages,
            OutputMode::LastMessage => match messages.pop() {
                Some(last) => vec![last],
                None => Vec::new(),
            },
        };
        if self.add_handoff_back_messages {
            let (announcement, acknowledgment) =
                handoff_back_messages(agent_name, &self.supervisor_name);
            folded.push(announcement);
            folded.push(acknowledgment);
        }
        folded
    }
}

#[async_trait]
impl Agent for Supervisor {
    async fn invoke(&self, messages: Vec<Message>, context: &mut Context) -> Result<Vec<Message>> {
        let mut history = messages;
        let start = history.len();

        for cycle in 1..=MAX_HANDOFF_CYCLES {
            let outcome = self.executor.run(&history).await?;
            history.extend(outcome.messages);

            let Some(target) = outcome.handoff else {
                info!(cycle, "supervisor answered without a handoff");
                return Ok(history.split_off(start));
            };

            let worker = self.workers.get(&target).ok_or_else(|| {
                Error::ProcessingFailed(format!("handoff to unknown agent '{target}'"))
            })?;
            info!(cycle, worker = target, "handing off");

            let worker_output = worker.invoke(history.clone(), context).await?;
            history.extend(self.fold_worker_output(&target, worker_output));
        }

        warn!(
            max_cycles = MAX_HANDOFF_CYCLES,
            "handoff cycle cap reached without a final answer"
        );
        Ok(history.split_off(start))
    }

    fn name(&self) -> &str {
        &self.supervisor_name
    }

    async fn shutdown(&self) -> Result<()> {
        for worker in self.workers.values() {
            worker.shutdown().await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use desk_llm::{
        CompletionRequest, CompletionResponse, ContentBlock, LLMError, MessageContent, Role,
        StopReason, TokenUsage,
    };
    use serde_json::json;
    use std::sync::Mutex;

    struct ScriptedProvider {
        responses: Mutex<Vec<CompletionResponse>>,
        saw_parallel_disabled: Mutex<bool>,
    }

    impl ScriptedProvider {
        fn new(mut responses: Vec<CompletionResponse>) -> Self {
            responses.reverse();
            Self {
                responses: Mutex::new(responses),
                saw_parallel_disabled: Mutex::new(false),
            }
        }
    }

    #[async_trait]
    impl LLMProvider for ScriptedProvider {
        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> desk_llm::Result<CompletionResponse> {
            if request.parallel_tool_calls == Some(false) {
                if let Ok(mut seen) = self.saw_parallel_disabled.lock() {
                    *seen = true;
                }
            }
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

    fn handoff_response(target: &str) -> CompletionResponse {
        CompletionResponse {
            message: Message {
                role: Role::Assistant,
                content: Some(MessageContent::Blocks(vec![ContentBlock::ToolUse {
                    id: "call_1".to_string(),
                    name: format!("transfer_to_{target}"),
                    input: json!({}),
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

    /// Worker that replies with a fixed pair of messages.
    struct FixedWorker {
        name: String,
        replies: Vec<Message>,
    }

    #[async_trait]
    impl Agent for FixedWorker {
        async fn invoke(
            &self,
            _messages: Vec<Message>,
            _context: &mut Context,
        ) -> Result<Vec<Message>> {
            Ok(self.replies.clone())
        }

        fn name(&self) -> &str {
            &self.name
        }
    }

    fn engineer_worker() -> Arc<dyn Agent> {
        Arc::new(FixedWorker {
            name: "data_engineer".to_string(),
            replies: vec![
                Message::assistant_named("data_engineer", "fetching"),
                Message::assistant_named("data_engineer", "CPI stored as feed 7"),
            ],
        })
    }

    #[test]
    fn duplicate_worker_names_rejected() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let result = Supervisor::builder(provider)
            .worker(engineer_worker())
            .worker(engineer_worker())
            .build();
        assert!(matches!(result, Err(Error::InvalidConfiguration(_))));
    }

    #[test]
    fn empty_worker_name_rejected() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let result = Supervisor::builder(provider)
            .worker(Arc::new(FixedWorker {
                name: String::new(),
                replies: vec![],
            }))
            .build();
        assert!(matches!(result, Err(Error::InvalidConfiguration(_))));
    }

    #[tokio::test]
    async fn direct_answer_needs_no_handoff() {
        let provider = Arc::new(ScriptedProvider::new(vec![text_response("42")]));
        let supervisor = Supervisor::builder(provider)
            .worker(engineer_worker())
            .build()
            .unwrap();

        let mut context = Context::new();
        let answer = supervisor.run("what is 6*7", &mut context).await.unwrap();
        assert_eq!(answer, "42");
    }

    #[tokio::test]
    async fn handoff_folds_last_message_and_back_pair() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            handoff_response("data_engineer"),
            text_response("CPI is stored, feed 7"),
        ]));
        let supervisor = Supervisor::builder(Arc::clone(&provider) as Arc<dyn LLMProvider>)
            .worker(engineer_worker())
            .build()
            .unwrap();

        let mut context = Context::new();
        let produced = supervisor
            .invoke(vec![Message::user("store cpi")], &mut context)
            .await
            .unwrap();

        // handoff call, acknowledgment, folded last worker message,
        // handoff-back pair, final supervisor answer
        assert_eq!(produced.len(), 6);
        assert_eq!(produced[2].text(), Some("CPI stored as feed 7"));
        assert_eq!(produced[3].name.as_deref(), Some("data_engineer"));
        assert_eq!(
            produced.last().and_then(Message::text),
            Some("CPI is stored, feed 7")
        );
        assert!(*provider.saw_parallel_disabled.lock().unwrap());
    }

    #[tokio::test]
    async fn full_history_mode_keeps_worker_trace() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            handoff_response("data_engineer"),
            text_response("done"),
        ]));
        let supervisor = Supervisor::builder(provider)
            .worker(engineer_worker())
            .output_mode(OutputMode::FullHistory)
            .add_handoff_back_messages(false)
            .build()
            .unwrap();

        let mut context = Context::new();
        let produced = supervisor
            .invoke(vec![Message::user("store cpi")], &mut context)
            .await
            .unwrap();

        // handoff call, acknowledgment, both worker messages, final answer
        assert_eq!(produced.len(), 5);
        assert_eq!(produced[2].text(), Some("fetching"));
        assert_eq!(produced[3].text(), Some("CPI stored as feed 7"));
    }
}
