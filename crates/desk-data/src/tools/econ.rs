use std::sync::Arc;

use async_trait::async_trait;
use desk_db::{parse_econ_point, FeedRepository, NewFeed};
use desk_llm::tools::schema;
use desk_tools::Tool;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{error, info};

use crate::api::alpha_vantage::EconSeries;
use crate::api::AlphaVantageClient;
use crate::catalog::EconIndicator;
use crate::tools::parse_params;

const TOOL_NAME: &str = "get_econ_data";

#[derive(Debug, Deserialize)]
struct EconParams {
    indicator: String,
    interval: Option<String>,
    maturity: Option<String>,
    #[serde(default)]
    write_to_db: bool,
}

/// Fetches a US economic indicator series, optionally persisting it as a
/// data feed.
pub struct EconDataTool {
    client: Arc<AlphaVantageClient>,
    feeds: Option<FeedRepository>,
}

impl EconDataTool {
    pub fn new(client: Arc<AlphaVantageClient>, feeds: Option<FeedRepository>) -> Self {
        Self { client, feeds }
    }

    async fn persist(
        &self,
        indicator: EconIndicator,
        params: &EconParams,
        series: &EconSeries,
        metadata: &mut Map<String, Value>,
    ) {
        let Some(feeds) = &self.feeds else {
            metadata.insert(
                "database_error".to_string(),
                Value::String("database writes are not available to this agent".to_string()),
            );
            return;
        };

        let feed = NewFeed {
            indicator_key: indicator.key().to_string(),
            interval_param: params.interval.clone(),
            maturity_param: params.maturity.clone(),
            api_indicator_name: series.name.clone(),
            api_unit: series.unit.clone(),
        };
        let points: Vec<_> = series
            .data
            .iter()
            .filter_map(|p| parse_econ_point(&p.date, &p.value))
            .collect();

        match feeds.record_feed(&feed, &points).await {
            Ok(outcome) => {
                info!(
                    feed_id = outcome.feed_id,
                    indicator = indicator.key(),
                    "economic data feed stored"
                );
                metadata.insert(
                    "database_status".to_string(),
                    Value::String(format!(
                        "Completed - Feed ID: {}, Points Attempted: {}",
                        outcome.feed_id, outcome.points_attempted
                    )),
                );
            }
            Err(err) => {
                error!(indicator = indicator.key(), %err, "feed write failed");
                if let Err(record_err) = feeds.record_failure(&feed, &err.to_string()).await {
                    error!(%record_err, "could not record feed failure");
                }
                metadata.insert(
                    "database_error".to_string(),
                    Value::String(err.to_string()),
                );
            }
        }
    }
}

#[async_trait]
impl Tool for EconDataTool {
    async fn execute(&self, params: Value) -> desk_core::Result<Value> {
        let params: EconParams = parse_params(TOOL_NAME, params)?;
        let indicator = EconIndicator::from_key(&params.indicator)
            .map_err(|err| err.into_tool_error(TOOL_NAME))?;

        let series = self
            .client
            .econ_indicator(indicator, params.interval.as_deref(), params.maturity.as_deref())
            .await
            .map_err(|err| err.into_tool_error(TOOL_NAME))?;

        let mut metadata = Map::new();
        if let Some(name) = &series.name {
            metadata.insert("name".to_string(), Value::String(name.clone()));
        }
        if let Some(interval) = &series.interval {
            metadata.insert("interval".to_string(), Value::String(interval.clone()));
        }
        if let Some(unit) = &series.unit {
            metadata.insert("unit".to_string(), Value::String(unit.clone()));
        }

        if params.write_to_db {
            self.persist(indicator, &params, &series, &mut metadata).await;
        }

        let data: Vec<Value> = series
            .data
            .iter()
            .map(|p| json!({"date": p.date, "value": p.value}))
            .collect();

        Ok(json!({ "data": data, "metadata": metadata }))
    }

    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "Fetch a US economic indicator time series (GDP, CPI, treasury yields, \
         unemployment, and others). Optionally persist the series to the database \
         as a new data feed."
    }

    fn input_schema(&self) -> Value {
        schema::object(
            json!({
                "indicator": schema::string_enum(
                    "The economic indicator to fetch",
                    EconIndicator::ALL_KEYS,
                ),
                "interval": schema::string(
                    "Reporting interval. real_gdp: quarterly/annual; treasury_yield and \
                     federal_funds_rate: daily/weekly/monthly; cpi: monthly/semiannual. \
                     Other indicators have a fixed cadence and take no interval.",
                ),
                "maturity": schema::string(
                    "Treasury bond maturity, treasury_yield only. \
                     One of 3month, 2year, 5year, 7year, 10year, 30year.",
                ),
                "write_to_db": schema::boolean(
                    "Persist the fetched series to the database as a data feed",
                ),
            }),
            vec!["indicator"],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool() -> EconDataTool {
        EconDataTool::new(Arc::new(AlphaVantageClient::new("test-key")), None)
    }

    #[tokio::test]
    async fn rejects_unknown_indicator() {
        let err = tool()
            .execute(json!({"indicator": "gdp"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unknown indicator"));
    }

    #[tokio::test]
    async fn rejects_invalid_interval_before_any_request() {
        let err = tool()
            .execute(json!({"indicator": "cpi", "interval": "daily"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid interval"));
    }

    #[tokio::test]
    async fn rejects_missing_indicator() {
        let err = tool().execute(json!({})).await.unwrap_err();
        assert!(err.to_string().contains("invalid input"));
    }
}
