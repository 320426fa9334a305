//! Supervisor orchestration for marketdesk.
//!
//! A supervisor agent routes work to named react workers through handoff
//! tools. Worker output folds back into the shared message history according
//! to the configured output mode, and the supervisor resumes until it can
//! answer without another handoff.

pub mod handoff;
pub mod prompts;
pub mod react;
pub mod supervisor;
pub mod tags;
pub mod workers;

pub use handoff::{handoff_back_messages, handoff_tool_name, HandoffTool};
pub use react::{ReactAgent, ReactConfig, ReactOutcome};
pub use supervisor::{OutputMode, Supervisor, SupervisorBuilder};
pub use tags::{process_input_message, process_output_message};
pub use workers::{data_analyst, data_engineer, DataServices, DATA_ANALYST, DATA_ENGINEER};
