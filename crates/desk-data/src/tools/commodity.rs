use std::sync::Arc;

use async_trait::async_trait;
use desk_llm::tools::schema;
use desk_tools::Tool;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::api::AlphaVantageClient;
use crate::catalog::Commodity;
use crate::tools::parse_params;

const TOOL_NAME: &str = "get_commodity_data";

fn default_interval() -> String {
    "monthly".to_string()
}

#[derive(Debug, Deserialize)]
struct CommodityParams {
    commodity: String,
    #[serde(default = "default_interval")]
    interval: String,
    max_periods: Option<usize>,
}

/// Fetches a global commodity price series (energy, metals, agriculture, or
/// the aggregate index).
pub struct CommodityDataTool {
    client: Arc<AlphaVantageClient>,
}

impl CommodityDataTool {
    pub fn new(client: Arc<AlphaVantageClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for CommodityDataTool {
    async fn execute(&self, params: Value) -> desk_core::Result<Value> {
        let params: CommodityParams = parse_params(TOOL_NAME, params)?;
        let commodity = Commodity::from_key(&params.commodity)
            .map_err(|err| err.into_tool_error(TOOL_NAME))?;

        let series = self
            .client
            .commodity(commodity, &params.interval)
            .await
            .map_err(|err| err.into_tool_error(TOOL_NAME))?;

        // Upstream data is newest first, so a head cut keeps recent periods.
        let mut points = series.data;
        if let Some(max) = params.max_periods {
            if max > 0 {
                points.truncate(max);
            }
        }

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
        metadata.insert("periods".to_string(), Value::Number(points.len().into()));

        let data: Vec<Value> = points
            .iter()
            .map(|p| json!({"date": p.date, "value": p.value}))
            .collect();

        Ok(json!({ "data": data, "metadata": metadata }))
    }

    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "Fetch a global commodity price time series (crude oil, natural gas, \
         metals, agricultural commodities, or the all-commodities index)."
    }

    fn input_schema(&self) -> Value {
        schema::object(
            json!({
                "commodity": schema::string_enum(
                    "The commodity to fetch",
                    Commodity::ALL_KEYS,
                ),
                "interval": schema::string_enum(
                    "Reporting interval, defaults to monthly",
                    Commodity::ALLOWED_INTERVALS,
                ),
                "max_periods": schema::integer(
                    "Maximum number of recent periods to return, useful for \
                     limiting context size",
                ),
            }),
            vec!["commodity"],
        )
    }
}
