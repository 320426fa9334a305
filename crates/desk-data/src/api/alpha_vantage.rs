use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::catalog::{Commodity, EconIndicator};
use crate::config::{env_keys, require_env};
use crate::error::{DataError, Result};

const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co/query";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
// Free tier allowance.
const DEFAULT_REQUESTS_PER_MINUTE: u32 = 5;

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// One economic or commodity series as returned upstream. Values stay as
/// strings here, parsing happens at the persistence boundary.
#[derive(Debug, Clone, Deserialize)]
pub struct EconSeries {
    pub name: Option<String>,
    pub interval: Option<String>,
    pub unit: Option<String>,
    #[serde(default)]
    pub data: Vec<EconSeriesPoint>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EconSeriesPoint {
    pub date: String,
    pub value: String,
}

/// Sort order for news sentiment queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NewsSort {
    #[default]
    Latest,
    Earliest,
    Relevance,
}

impl NewsSort {
    pub fn from_key(key: &str) -> Result<Self> {
        match key.to_ascii_uppercase().as_str() {
            "LATEST" => Ok(Self::Latest),
            "EARLIEST" => Ok(Self::Earliest),
            "RELEVANCE" => Ok(Self::Relevance),
            other => Err(DataError::InvalidParameter(format!(
                "invalid sort '{other}', allowed: LATEST, EARLIEST, RELEVANCE"
            ))),
        }
    }

    fn as_param(self) -> &'static str {
        match self {
            Self::Latest => "LATEST",
            Self::Earliest => "EARLIEST",
            Self::Relevance => "RELEVANCE",
        }
    }
}

/// Parameters for a news sentiment query.
#[derive(Debug, Clone, Default)]
pub struct NewsQuery {
    pub tickers: Vec<String>,
    pub topics: Vec<String>,
    pub time_from: Option<String>,
    pub time_to: Option<String>,
    pub sort: NewsSort,
    pub limit: Option<u32>,
}

impl NewsQuery {
    const MAX_LIMIT: u32 = 1000;

    /// Validates timestamp formats and the limit bound.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [("time_from", &self.time_from), ("time_to", &self.time_to)] {
            if let Some(raw) = value {
                NaiveDateTime::parse_from_str(raw, "%Y%m%dT%H%M").map_err(|_| {
                    DataError::InvalidParameter(format!(
                        "{field} must use the YYYYMMDDTHHMM format, got '{raw}'"
                    ))
                })?;
            }
        }
        if let Some(limit) = self.limit {
            if limit == 0 || limit > Self::MAX_LIMIT {
                return Err(DataError::InvalidParameter(format!(
                    "limit must be between 1 and {}, got {limit}",
                    Self::MAX_LIMIT
                )));
            }
        }
        Ok(())
    }
}

/// Client for the Alpha Vantage query API with a local rate limiter so
/// bursts of tool calls queue instead of burning the daily quota.
pub struct AlphaVantageClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    rate_limiter: Arc<DirectRateLimiter>,
}

impl AlphaVantageClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_rate_limit(api_key, DEFAULT_REQUESTS_PER_MINUTE)
    }

    pub fn with_rate_limit(api_key: impl Into<String>, requests_per_minute: u32) -> Self {
        let per_minute = NonZeroU32::new(requests_per_minute).unwrap_or(NonZeroU32::MIN);
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            rate_limiter: Arc::new(RateLimiter::direct(Quota::per_minute(per_minute))),
        }
    }

    pub fn from_env() -> Result<Self> {
        Ok(Self::new(require_env(env_keys::ALPHA_VANTAGE_API_KEY)?))
    }

    /// Overrides the endpoint, used by tests against a local server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Fetches one economic indicator series.
    pub async fn econ_indicator(
        &self,
        indicator: EconIndicator,
        interval: Option<&str>,
        maturity: Option<&str>,
    ) -> Result<EconSeries> {
        indicator.validate_params(interval, maturity)?;

        let mut params = vec![("function", indicator.function().to_string())];
        if let Some(interval) = interval {
            params.push(("interval", interval.to_string()));
        }
        if let Some(maturity) = maturity {
            params.push(("maturity", maturity.to_string()));
        }

        let body = self.get(&params).await?;
        Ok(serde_json::from_value(body)?)
    }

    /// Fetches one commodity price series.
    pub async fn commodity(&self, commodity: Commodity, interval: &str) -> Result<EconSeries> {
        Commodity::validate_interval(interval)?;
        let params = vec![
            ("function", commodity.function().to_string()),
            ("interval", interval.to_string()),
        ];
        let body = self.get(&params).await?;
        Ok(serde_json::from_value(body)?)
    }

    /// Fetches market news with sentiment scores. The response is passed
    /// through as JSON since the agents consume it directly.
    pub async fn news_sentiment(&self, query: &NewsQuery) -> Result<Value> {
        query.validate()?;

        let mut params = vec![("function", "NEWS_SENTIMENT".to_string())];
        if !query.tickers.is_empty() {
            params.push(("tickers", query.tickers.join(",")));
        }
        if !query.topics.is_empty() {
            params.push(("topics", query.topics.join(",")));
        }
        if let Some(time_from) = &query.time_from {
            params.push(("time_from", time_from.clone()));
        }
        if let Some(time_to) = &query.time_to {
            params.push(("time_to", time_to.clone()));
        }
        params.push(("sort", query.sort.as_param().to_string()));
        if let Some(limit) = query.limit {
            params.push(("limit", limit.to_string()));
        }

        self.get(&params).await
    }

    async fn get(&self, params: &[(&str, String)]) -> Result<Value> {
        self.rate_limiter.until_ready().await;
        debug!(function = params.first().map(|(_, v)| v.as_str()), "alpha vantage request");

        let response = self
            .client
            .get(&self.base_url)
            .query(params)
            .query(&[("apikey", self.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DataError::RequestFailed(format!(
                "alpha vantage returned HTTP {status}"
            )));
        }

        let body: Value = response.json().await?;
        check_payload_errors(&body)?;
        Ok(body)
    }
}

/// The API reports failures inside a 200 response. Rate limit notes and
/// invalid-call messages all arrive this way.
fn check_payload_errors(body: &Value) -> Result<()> {
    for key in ["Error Message", "Note", "Information"] {
        if let Some(message) = body.get(key).and_then(Value::as_str) {
            return Err(DataError::Api(format!("{key}: {message}")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn detects_embedded_error_payloads() {
        let body = json!({"Error Message": "Invalid API call"});
        assert!(check_payload_errors(&body).is_err());

        let body = json!({"Note": "API call frequency exceeded"});
        assert!(check_payload_errors(&body).is_err());

        let body = json!({"Information": "premium endpoint"});
        assert!(check_payload_errors(&body).is_err());

        let body = json!({"name": "CPI", "data": []});
        assert!(check_payload_errors(&body).is_ok());
    }

    #[test]
    fn econ_series_deserializes() {
        let body = json!({
            "name": "Consumer Price Index",
            "interval": "monthly",
            "unit": "index 1982-1984=100",
            "data": [
                {"date": "2024-01-01", "value": "308.417"},
                {"date": "2023-12-01", "value": "."}
            ]
        });
        let series: EconSeries = serde_json::from_value(body).unwrap();
        assert_eq!(series.data.len(), 2);
        assert_eq!(series.data[1].value, ".");
    }

    #[test]
    fn news_query_validation() {
        let mut query = NewsQuery {
            time_from: Some("20240101T0000".to_string()),
            ..NewsQuery::default()
        };
        assert!(query.validate().is_ok());

        query.time_from = Some("2024-01-01".to_string());
        assert!(query.validate().is_err());

        query.time_from = None;
        query.limit = Some(1001);
        assert!(query.validate().is_err());
        query.limit = Some(1000);
        assert!(query.validate().is_ok());
    }

    #[test]
    fn news_sort_parsing() {
        assert_eq!(NewsSort::from_key("latest").unwrap(), NewsSort::Latest);
        assert_eq!(NewsSort::from_key("RELEVANCE").unwrap(), NewsSort::Relevance);
        assert!(NewsSort::from_key("newest").is_err());
    }
}
