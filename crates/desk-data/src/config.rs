use crate::error::{DataError, Result};

/// Environment variable names used by the connectors.
pub mod env_keys {
    pub const ALPHA_VANTAGE_API_KEY: &str = "ALPHA_VANTAGE_API_KEY";
    pub const TWELVE_DATA_API_KEY: &str = "TWELVE_DATA_API_KEY";
    pub const EODHD_API_KEY: &str = "EODHD_API_KEY";
    pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
    pub const DATABASE_URL: &str = "DATABASE_URL";
    pub const SANDBOX_API_URL: &str = "SANDBOX_API_URL";
    pub const SANDBOX_API_KEY: &str = "SANDBOX_API_KEY";
}

/// Reads a required environment variable, rejecting empty values.
pub fn require_env(key: &str) -> Result<String> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(DataError::Configuration(format!(
            "environment variable {key} is not set"
        ))),
    }
}

/// Reads an optional environment variable, treating empty as unset.
pub fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
