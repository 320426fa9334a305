use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::{env_keys, optional_env, require_env};
use crate::error::{DataError, Result};

const DEFAULT_TIMEOUT_SECS: u64 = 300;
const HTTP_TIMEOUT_SECS: u64 = 120;

/// Handle for one remote interpreter session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxSession {
    pub id: String,
}

/// A file staged into or read out of the sandbox filesystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxFile {
    pub path: String,
    pub content: String,
}

/// Result of one code execution inside the sandbox.
#[derive(Debug, Clone, Deserialize)]
pub struct Execution {
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    #[serde(default)]
    pub results: Vec<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DirEntry {
    pub name: String,
    #[serde(default)]
    pub is_dir: bool,
}

/// Client for the remote Python interpreter service. Sessions are created
/// explicitly and keep state (variables, files) between executions until
/// killed or timed out server-side.
pub struct SandboxClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    session_timeout_secs: u64,
}

impl SandboxClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
            base_url: base_url.into(),
            api_key: None,
            session_timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn from_env() -> Result<Self> {
        let mut client = Self::new(require_env(env_keys::SANDBOX_API_URL)?);
        client.api_key = optional_env(env_keys::SANDBOX_API_KEY);
        Ok(client)
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_session_timeout(mut self, timeout_secs: u64) -> Self {
        self.session_timeout_secs = timeout_secs;
        self
    }

    /// Creates a fresh session. The id is generated client-side so retries
    /// of a lost response cannot leak a second session.
    pub async fn create_session(&self) -> Result<SandboxSession> {
        let id = Uuid::new_v4().to_string();
        let body = serde_json::json!({
            "session_id": id,
            "timeout_secs": self.session_timeout_secs,
        });
        self.post::<Value>(&format!("sessions/{id}"), &body).await?;
        info!(session = id, "sandbox session created");
        Ok(SandboxSession { id })
    }

    /// Runs Python code in the session and returns its output.
    pub async fn run_code(&self, session: &SandboxSession, code: &str) -> Result<Execution> {
        debug!(session = session.id, bytes = code.len(), "sandbox exec");
        self.post(
            &format!("sessions/{}/exec", session.id),
            &serde_json::json!({ "code": code }),
        )
        .await
    }

    /// Writes files into the session filesystem. The response maps each path
    /// to "ok" or an error string.
    pub async fn write_files(
        &self,
        session: &SandboxSession,
        files: &[SandboxFile],
    ) -> Result<serde_json::Map<String, Value>> {
        self.post(
            &format!("sessions/{}/files", session.id),
            &serde_json::json!({ "files": files }),
        )
        .await
    }

    /// Reads one file back out of the session.
    pub async fn read_file(&self, session: &SandboxSession, path: &str) -> Result<SandboxFile> {
        self.post(
            &format!("sessions/{}/files/read", session.id),
            &serde_json::json!({ "path": path }),
        )
        .await
    }

    /// Lists a directory in the session filesystem.
    pub async fn list_path(&self, session: &SandboxSession, path: &str) -> Result<Vec<DirEntry>> {
        self.post(
            &format!("sessions/{}/entries", session.id),
            &serde_json::json!({ "path": path }),
        )
        .await
    }

    /// Terminates the session and discards its state.
    pub async fn kill(&self, session: &SandboxSession) -> Result<()> {
        let mut request = self
            .client
            .delete(format!("{}/sessions/{}", self.base_url, session.id));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(DataError::Sandbox(format!(
                "failed to kill session {}: HTTP {}",
                session.id,
                response.status()
            )));
        }
        info!(session = session.id, "sandbox session killed");
        Ok(())
    }

    async fn post<T: serde::de::DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T> {
        let mut request = self
            .client
            .post(format!("{}/{path}", self.base_url))
            .json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(DataError::Sandbox(format!(
                "sandbox returned HTTP {status}: {detail}"
            )));
        }
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn execution_deserializes_with_defaults() {
        let execution: Execution = serde_json::from_value(json!({
            "stdout": "42\n"
        }))
        .unwrap();
        assert_eq!(execution.stdout, "42\n");
        assert_eq!(execution.stderr, "");
        assert!(execution.results.is_empty());
        assert!(execution.error.is_none());
    }

    #[test]
    fn execution_carries_error() {
        let execution: Execution = serde_json::from_value(json!({
            "stdout": "",
            "stderr": "Traceback ...",
            "error": "NameError: name 'x' is not defined"
        }))
        .unwrap();
        assert!(execution.error.is_some());
    }
}
