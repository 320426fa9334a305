use std::sync::Arc;

use async_trait::async_trait;
use desk_db::{parse_bar, BarMeta, SeriesRepository};
use desk_llm::tools::schema;
use desk_tools::Tool;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{error, info};

use crate::api::twelve_data::TimeSeriesResponse;
use crate::api::TwelveDataClient;
use crate::tools::parse_params;

const TOOL_NAME: &str = "get_time_series";

fn default_interval() -> String {
    "1day".to_string()
}

#[derive(Debug, Deserialize)]
struct SeriesParams {
    symbol: String,
    #[serde(default = "default_interval")]
    interval: String,
    output_size: Option<u32>,
    #[serde(default)]
    write_to_db: bool,
}

/// Fetches OHLCV price history for an instrument, optionally persisting the
/// bars.
pub struct TimeSeriesTool {
    client: Arc<TwelveDataClient>,
    series: Option<SeriesRepository>,
}

impl TimeSeriesTool {
    pub fn new(client: Arc<TwelveDataClient>, series: Option<SeriesRepository>) -> Self {
        Self { client, series }
    }

    async fn persist(&self, response: &TimeSeriesResponse, metadata: &mut Map<String, Value>) {
        let Some(series) = &self.series else {
            metadata.insert(
                "database_error".to_string(),
                Value::String("database writes are not available to this agent".to_string()),
            );
            return;
        };

        let meta = BarMeta {
            symbol: response.meta.symbol.clone(),
            interval: response.meta.interval.clone(),
            currency: response.meta.currency.clone(),
            exchange_timezone: response.meta.exchange_timezone.clone(),
            exchange: response.meta.exchange.clone(),
            mic_code: response.meta.mic_code.clone(),
            instrument_type: response.meta.instrument_type.clone(),
        };
        let bars: Vec<_> = response
            .values
            .iter()
            .filter_map(|v| parse_bar(&v.datetime, &v.open, &v.high, &v.low, &v.close, &v.volume))
            .collect();

        match series.insert_bars(&meta, &bars).await {
            Ok(count) => {
                info!(symbol = meta.symbol, bars = count, "time series stored");
                metadata.insert(
                    "database_status".to_string(),
                    Value::String(format!("Completed - Bars Attempted: {count}")),
                );
            }
            Err(err) => {
                error!(symbol = meta.symbol, %err, "time series write failed");
                metadata.insert("database_error".to_string(), Value::String(err.to_string()));
            }
        }
    }
}

#[async_trait]
impl Tool for TimeSeriesTool {
    async fn execute(&self, params: Value) -> desk_core::Result<Value> {
        let params: SeriesParams = parse_params(TOOL_NAME, params)?;

        let response = self
            .client
            .time_series(&params.symbol, &params.interval, params.output_size)
            .await
            .map_err(|err| err.into_tool_error(TOOL_NAME))?;

        let mut metadata = Map::new();
        metadata.insert(
            "symbol".to_string(),
            Value::String(response.meta.symbol.clone()),
        );
        metadata.insert(
            "interval".to_string(),
            Value::String(response.meta.interval.clone()),
        );
        if let Some(currency) = &response.meta.currency {
            metadata.insert("currency".to_string(), Value::String(currency.clone()));
        }
        if let Some(exchange) = &response.meta.exchange {
            metadata.insert("exchange".to_string(), Value::String(exchange.clone()));
        }
        metadata.insert("bars".to_string(), Value::Number(response.values.len().into()));

        if params.write_to_db {
            self.persist(&response, &mut metadata).await;
        }

        let data: Vec<Value> = response
            .values
            .iter()
            .map(|v| {
                json!({
                    "datetime": v.datetime,
                    "open": v.open,
                    "high": v.high,
                    "low": v.low,
                    "close": v.close,
                    "volume": v.volume,
                })
            })
            .collect();

        Ok(json!({ "data": data, "metadata": metadata }))
    }

    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "Fetch OHLCV price history for a stock, ETF, forex pair, or crypto \
         symbol. Optionally persist the bars to the database."
    }

    fn input_schema(&self) -> Value {
        schema::object(
            json!({
                "symbol": schema::string("Instrument symbol, e.g. AAPL or EUR/USD"),
                "interval": schema::string_enum(
                    "Bar interval, defaults to 1day",
                    &["1min", "5min", "15min", "30min", "45min", "1h", "2h",
                      "4h", "1day", "1week", "1month"],
                ),
                "output_size": schema::integer(
                    "Number of bars to return, newest first, up to 5000",
                ),
                "write_to_db": schema::boolean(
                    "Persist the fetched bars to the database",
                ),
            }),
            vec!["symbol"],
        )
    }
}
