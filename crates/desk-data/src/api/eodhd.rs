use std::time::Duration;

use chrono::NaiveDate;
use serde_json::Value;
use tracing::debug;

use crate::config::{env_keys, require_env};
use crate::error::{DataError, Result};

const DEFAULT_BASE_URL: &str = "https://eodhd.com/api";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_LIMIT: u32 = 1000;

/// Parameters for an economic calendar query. Dates use `YYYY-MM-DD`,
/// country is an ISO 3166 alpha-2 code.
#[derive(Debug, Clone, Default)]
pub struct CalendarQuery {
    pub country: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub limit: Option<u32>,
}

impl CalendarQuery {
    fn validate(&self) -> Result<()> {
        for (field, value) in [("date_from", &self.date_from), ("date_to", &self.date_to)] {
            if let Some(raw) = value {
                NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
                    DataError::InvalidParameter(format!(
                        "{field} must use the YYYY-MM-DD format, got '{raw}'"
                    ))
                })?;
            }
        }
        if let Some(limit) = self.limit {
            if limit == 0 || limit > MAX_LIMIT {
                return Err(DataError::InvalidParameter(format!(
                    "limit must be between 1 and {MAX_LIMIT}, got {limit}"
                )));
            }
        }
        Ok(())
    }
}

/// Client for the EODHD economic events calendar.
pub struct EodhdClient {
    client: reqwest::Client,
    api_token: String,
    base_url: String,
}

impl EodhdClient {
    pub fn new(api_token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
            api_token: api_token.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn from_env() -> Result<Self> {
        Ok(Self::new(require_env(env_keys::EODHD_API_KEY)?))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Fetches scheduled economic events as a JSON array.
    pub async fn economic_events(&self, query: &CalendarQuery) -> Result<Value> {
        query.validate()?;

        let mut params = vec![
            ("api_token", self.api_token.clone()),
            ("fmt", "json".to_string()),
        ];
        if let Some(country) = &query.country {
            params.push(("country", country.clone()));
        }
        if let Some(from) = &query.date_from {
            params.push(("from", from.clone()));
        }
        if let Some(to) = &query.date_to {
            params.push(("to", to.clone()));
        }
        if let Some(limit) = query.limit {
            params.push(("limit", limit.to_string()));
        }

        debug!(country = query.country.as_deref(), "eodhd calendar request");
        let response = self
            .client
            .get(format!("{}/economic-events", self.base_url))
            .query(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DataError::RequestFailed(format!(
                "eodhd returned HTTP {status}"
            )));
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calendar_query_validation() {
        let mut query = CalendarQuery {
            date_from: Some("2024-01-01".to_string()),
            date_to: Some("2024-02-01".to_string()),
            limit: Some(50),
            ..CalendarQuery::default()
        };
        assert!(query.validate().is_ok());

        query.date_from = Some("01/01/2024".to_string());
        assert!(query.validate().is_err());

        query.date_from = None;
        query.limit = Some(0);
        assert!(query.validate().is_err());
    }
}
