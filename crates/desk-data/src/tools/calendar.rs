use std::sync::Arc;

use async_trait::async_trait;
use desk_llm::tools::schema;
use desk_tools::Tool;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::eodhd::CalendarQuery;
use crate::api::EodhdClient;
use crate::tools::parse_params;

const TOOL_NAME: &str = "get_economic_calendar";

#[derive(Debug, Deserialize)]
struct CalendarParams {
    country: Option<String>,
    date_from: Option<String>,
    date_to: Option<String>,
    limit: Option<u32>,
}

/// Fetches scheduled economic events (releases, rate decisions, auctions).
pub struct EconomicCalendarTool {
    client: Arc<EodhdClient>,
}

impl EconomicCalendarTool {
    pub fn new(client: Arc<EodhdClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for EconomicCalendarTool {
    async fn execute(&self, params: Value) -> desk_core::Result<Value> {
        let params: CalendarParams = parse_params(TOOL_NAME, params)?;
        let query = CalendarQuery {
            country: params.country,
            date_from: params.date_from,
            date_to: params.date_to,
            limit: params.limit,
        };

        let events = self
            .client
            .economic_events(&query)
            .await
            .map_err(|err| err.into_tool_error(TOOL_NAME))?;

        let count = events.as_array().map_or(0, Vec::len);
        Ok(json!({
            "data": events,
            "metadata": { "events": count },
        }))
    }

    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "Fetch upcoming and past scheduled economic events such as data \
         releases and central bank decisions, filtered by country and date range."
    }

    fn input_schema(&self) -> Value {
        schema::object(
            json!({
                "country": schema::string(
                    "ISO 3166 alpha-2 country code, e.g. US",
                ),
                "date_from": schema::string("Earliest event date, YYYY-MM-DD"),
                "date_to": schema::string("Latest event date, YYYY-MM-DD"),
                "limit": schema::integer("Maximum number of events, up to 1000"),
            }),
            vec![],
        )
    }
}
