use thiserror::Error;

/// Errors from the market data connectors and their tools.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("API request failed: {0}")]
    RequestFailed(String),

    #[error("API returned an error: {0}")]
    Api(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("sandbox error: {0}")]
    Sandbox(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] desk_db::DbError),
}

pub type Result<T> = std::result::Result<T, DataError>;

impl DataError {
    /// Maps a connector error into the core tool error, tagged with the
    /// failing tool's name.
    pub fn into_tool_error(self, tool: &str) -> desk_core::Error {
        desk_core::Error::ToolFailed {
            tool: tool.to_string(),
            reason: self.to_string(),
        }
    }
}
