use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::config::{env_keys, require_env};
use crate::error::{DataError, Result};

const DEFAULT_BASE_URL: &str = "https://api.twelvedata.com";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

const ALLOWED_INTERVALS: &[&str] = &[
    "1min", "5min", "15min", "30min", "45min", "1h", "2h", "4h", "1day", "1week", "1month",
];
const MAX_OUTPUT_SIZE: u32 = 5000;

/// Metadata block of a time series response.
#[derive(Debug, Clone, Deserialize)]
pub struct TimeSeriesMeta {
    pub symbol: String,
    pub interval: String,
    pub currency: Option<String>,
    pub exchange_timezone: Option<String>,
    pub exchange: Option<String>,
    pub mic_code: Option<String>,
    #[serde(rename = "type")]
    pub instrument_type: Option<String>,
}

/// One raw OHLCV bar. All fields arrive as strings.
#[derive(Debug, Clone, Deserialize)]
pub struct RawBar {
    pub datetime: String,
    #[serde(default)]
    pub open: String,
    #[serde(default)]
    pub high: String,
    #[serde(default)]
    pub low: String,
    #[serde(default)]
    pub close: String,
    #[serde(default)]
    pub volume: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimeSeriesResponse {
    pub meta: TimeSeriesMeta,
    #[serde(default)]
    pub values: Vec<RawBar>,
}

/// Client for the Twelve Data time series API.
pub struct TwelveDataClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl TwelveDataClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn from_env() -> Result<Self> {
        Ok(Self::new(require_env(env_keys::TWELVE_DATA_API_KEY)?))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Fetches OHLCV bars for a symbol. `output_size` caps the number of
    /// bars returned, newest first.
    pub async fn time_series(
        &self,
        symbol: &str,
        interval: &str,
        output_size: Option<u32>,
    ) -> Result<TimeSeriesResponse> {
        validate_interval(interval)?;
        if symbol.trim().is_empty() {
            return Err(DataError::InvalidParameter(
                "symbol must not be empty".to_string(),
            ));
        }
        if let Some(size) = output_size {
            if size == 0 || size > MAX_OUTPUT_SIZE {
                return Err(DataError::InvalidParameter(format!(
                    "output_size must be between 1 and {MAX_OUTPUT_SIZE}, got {size}"
                )));
            }
        }

        let mut params = vec![
            ("symbol", symbol.to_string()),
            ("interval", interval.to_string()),
            ("format", "JSON".to_string()),
            ("apikey", self.api_key.clone()),
        ];
        if let Some(size) = output_size {
            params.push(("outputsize", size.to_string()));
        }

        debug!(symbol, interval, "twelve data request");
        let response = self
            .client
            .get(format!("{}/time_series", self.base_url))
            .query(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DataError::RequestFailed(format!(
                "twelve data returned HTTP {status}"
            )));
        }

        let body: Value = response.json().await?;
        check_payload_errors(&body)?;
        Ok(serde_json::from_value(body)?)
    }
}

fn validate_interval(interval: &str) -> Result<()> {
    if ALLOWED_INTERVALS.contains(&interval) {
        Ok(())
    } else {
        Err(DataError::InvalidParameter(format!(
            "invalid interval '{interval}', allowed: {}",
            ALLOWED_INTERVALS.join(", ")
        )))
    }
}

/// Failures come back as `{"status": "error", "message": ...}` with HTTP 200.
fn check_payload_errors(body: &Value) -> Result<()> {
    if body.get("status").and_then(Value::as_str) == Some("error") {
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return Err(DataError::Api(message.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn interval_validation() {
        assert!(validate_interval("1day").is_ok());
        assert!(validate_interval("1min").is_ok());
        assert!(validate_interval("3min").is_err());
    }

    #[test]
    fn detects_error_status() {
        let body = json!({"status": "error", "message": "symbol not found", "code": 400});
        let err = check_payload_errors(&body).unwrap_err();
        assert!(err.to_string().contains("symbol not found"));

        let body = json!({"status": "ok", "meta": {}, "values": []});
        assert!(check_payload_errors(&body).is_ok());
    }

    #[test]
    fn response_deserializes() {
        let body = json!({
            "meta": {
                "symbol": "AAPL",
                "interval": "1day",
                "currency": "USD",
                "exchange_timezone": "America/New_York",
                "exchange": "NASDAQ",
                "mic_code": "XNGS",
                "type": "Common Stock"
            },
            "values": [
                {"datetime": "2024-03-01", "open": "179.55", "high": "180.53",
                 "low": "177.38", "close": "179.66", "volume": "73450582"}
            ],
            "status": "ok"
        });
        let parsed: TimeSeriesResponse = serde_json::from_value(body).unwrap();
        assert_eq!(parsed.meta.symbol, "AAPL");
        assert_eq!(parsed.meta.instrument_type.as_deref(), Some("Common Stock"));
        assert_eq!(parsed.values.len(), 1);
    }
}
