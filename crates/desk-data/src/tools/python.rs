use std::sync::Arc;

use async_trait::async_trait;
use desk_llm::tools::schema;
use desk_tools::Tool;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::sync::Mutex;
use tracing::warn;

use crate::api::sandbox::{SandboxFile, SandboxSession};
use crate::api::SandboxClient;
use crate::error::DataError;
use crate::tools::parse_params;

const TOOL_NAME: &str = "run_python";

#[derive(Debug, Deserialize)]
struct PythonParams {
    code: Option<String>,
    #[serde(default)]
    write_files: Vec<SandboxFile>,
    #[serde(default)]
    read_files: Vec<String>,
    list_path: Option<String>,
    #[serde(default)]
    kill_session: bool,
}

/// Runs Python code in a persistent remote sandbox. The session is created
/// on first use and keeps interpreter state and files across calls, so the
/// model can build up an analysis step by step.
pub struct RunPythonTool {
    client: Arc<SandboxClient>,
    session: Mutex<Option<SandboxSession>>,
}

impl RunPythonTool {
    pub fn new(client: Arc<SandboxClient>) -> Self {
        Self {
            client,
            session: Mutex::new(None),
        }
    }

    async fn session(
        &self,
        guard: &mut Option<SandboxSession>,
    ) -> crate::error::Result<SandboxSession> {
        if let Some(session) = guard.as_ref() {
            return Ok(session.clone());
        }
        let session = self.client.create_session().await?;
        *guard = Some(session.clone());
        Ok(session)
    }
}

#[async_trait]
impl Tool for RunPythonTool {
    async fn execute(&self, params: Value) -> desk_core::Result<Value> {
        let params: PythonParams = parse_params(TOOL_NAME, params)?;
        let has_work = params.code.is_some()
            || !params.write_files.is_empty()
            || !params.read_files.is_empty()
            || params.list_path.is_some()
            || params.kill_session;
        if !has_work {
            return Err(DataError::InvalidParameter(
                "provide code, files to write or read, a path to list, or kill_session"
                    .to_string(),
            )
            .into_tool_error(TOOL_NAME));
        }

        let mut guard = self.session.lock().await;
        let mut output = Map::new();

        // File staging happens before execution so the code can use the files.
        if !params.write_files.is_empty() {
            let session = self
                .session(&mut guard)
                .await
                .map_err(|err| err.into_tool_error(TOOL_NAME))?;
            let results = self
                .client
                .write_files(&session, &params.write_files)
                .await
                .map_err(|err| err.into_tool_error(TOOL_NAME))?;
            output.insert("write_results".to_string(), Value::Object(results));
        }

        if let Some(code) = &params.code {
            let session = self
                .session(&mut guard)
                .await
                .map_err(|err| err.into_tool_error(TOOL_NAME))?;
            let execution = self
                .client
                .run_code(&session, code)
                .await
                .map_err(|err| err.into_tool_error(TOOL_NAME))?;
            output.insert(
                "execution".to_string(),
                json!({
                    "stdout": execution.stdout,
                    "stderr": execution.stderr,
                    "results": execution.results,
                    "error": execution.error,
                }),
            );
        }

        if !params.read_files.is_empty() {
            let session = self
                .session(&mut guard)
                .await
                .map_err(|err| err.into_tool_error(TOOL_NAME))?;
            // Per-file errors go into the result map so one bad path does
            // not discard the files that were read.
            let mut files = Map::new();
            for path in &params.read_files {
                match self.client.read_file(&session, path).await {
                    Ok(file) => {
                        files.insert(path.clone(), Value::String(file.content));
                    }
                    Err(err) => {
                        warn!(path, %err, "sandbox file read failed");
                        files.insert(path.clone(), json!({ "error": err.to_string() }));
                    }
                }
            }
            output.insert("read_files".to_string(), Value::Object(files));
        }

        if let Some(path) = &params.list_path {
            let session = self
                .session(&mut guard)
                .await
                .map_err(|err| err.into_tool_error(TOOL_NAME))?;
            let entries = self
                .client
                .list_path(&session, path)
                .await
                .map_err(|err| err.into_tool_error(TOOL_NAME))?;
            let listed: Vec<Value> = entries
                .iter()
                .map(|e| json!({ "name": e.name, "is_dir": e.is_dir }))
                .collect();
            output.insert("entries".to_string(), Value::Array(listed));
        }

        if params.kill_session {
            if let Some(session) = guard.take() {
                self.client
                    .kill(&session)
                    .await
                    .map_err(|err| err.into_tool_error(TOOL_NAME))?;
                output.insert("session_killed".to_string(), Value::Bool(true));
            } else {
                output.insert("session_killed".to_string(), Value::Bool(false));
            }
        }

        Ok(Value::Object(output))
    }

    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "Run Python code in a persistent sandboxed interpreter. Variables and \
         files survive between calls. Print any results you want to see. Can \
         also stage files into the sandbox, read files back, list directories, \
         and terminate the session."
    }

    fn input_schema(&self) -> Value {
        schema::object(
            json!({
                "code": schema::string("Python code to execute"),
                "write_files": schema::array(
                    "Files to write into the sandbox before execution",
                    schema::object(
                        json!({
                            "path": schema::string("Destination path in the sandbox"),
                            "content": schema::string("File content"),
                        }),
                        vec!["path", "content"],
                    ),
                ),
                "read_files": schema::array(
                    "Paths to read back from the sandbox after execution",
                    schema::string("Sandbox file path"),
                ),
                "list_path": schema::string("Directory to list in the sandbox"),
                "kill_session": schema::boolean(
                    "Terminate the sandbox session and discard its state",
                ),
            }),
            vec![],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_empty_request() {
        let tool = RunPythonTool::new(Arc::new(SandboxClient::new("http://localhost:0")));
        let err = tool.execute(json!({})).await.unwrap_err();
        assert!(err.to_string().contains("provide code"));
    }

    #[tokio::test]
    async fn kill_without_session_reports_nothing_to_kill() {
        let tool = RunPythonTool::new(Arc::new(SandboxClient::new("http://localhost:0")));
        let result = tool.execute(json!({"kill_session": true})).await.unwrap();
        assert_eq!(result["session_killed"], Value::Bool(false));
    }
}
