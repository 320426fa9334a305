use std::sync::Arc;

use async_trait::async_trait;
use desk_llm::tools::schema;
use desk_tools::Tool;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::alpha_vantage::{NewsQuery, NewsSort};
use crate::api::AlphaVantageClient;
use crate::tools::parse_params;

const TOOL_NAME: &str = "get_news_sentiment";

#[derive(Debug, Deserialize)]
struct NewsParams {
    #[serde(default)]
    tickers: Vec<String>,
    #[serde(default)]
    topics: Vec<String>,
    time_from: Option<String>,
    time_to: Option<String>,
    sort: Option<String>,
    limit: Option<u32>,
}

/// Fetches market news articles with per-ticker sentiment scores.
pub struct NewsSentimentTool {
    client: Arc<AlphaVantageClient>,
}

impl NewsSentimentTool {
    pub fn new(client: Arc<AlphaVantageClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for NewsSentimentTool {
    async fn execute(&self, params: Value) -> desk_core::Result<Value> {
        let params: NewsParams = parse_params(TOOL_NAME, params)?;

        let sort = match &params.sort {
            Some(key) => NewsSort::from_key(key).map_err(|err| err.into_tool_error(TOOL_NAME))?,
            None => NewsSort::default(),
        };
        let query = NewsQuery {
            tickers: params.tickers,
            topics: params.topics,
            time_from: params.time_from,
            time_to: params.time_to,
            sort,
            limit: params.limit,
        };

        let payload = self
            .client
            .news_sentiment(&query)
            .await
            .map_err(|err| err.into_tool_error(TOOL_NAME))?;

        let items = payload
            .get("items")
            .cloned()
            .unwrap_or_else(|| Value::String("0".to_string()));
        let feed = payload.get("feed").cloned().unwrap_or(Value::Array(vec![]));

        Ok(json!({
            "data": feed,
            "metadata": { "items": items },
        }))
    }

    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "Fetch market news articles with sentiment scores, filtered by ticker \
         symbols, topics, and a time window."
    }

    fn input_schema(&self) -> Value {
        schema::object(
            json!({
                "tickers": schema::array(
                    "Ticker symbols to filter by, e.g. [\"AAPL\", \"MSFT\"]",
                    schema::string("Ticker symbol"),
                ),
                "topics": schema::array(
                    "News topics to filter by, e.g. [\"technology\", \"earnings\"]",
                    schema::string("Topic"),
                ),
                "time_from": schema::string(
                    "Earliest article time, YYYYMMDDTHHMM format",
                ),
                "time_to": schema::string(
                    "Latest article time, YYYYMMDDTHHMM format",
                ),
                "sort": schema::string_enum(
                    "Sort order, defaults to LATEST",
                    &["LATEST", "EARLIEST", "RELEVANCE"],
                ),
                "limit": schema::integer(
                    "Maximum number of articles, up to 1000 (default 50)",
                ),
            }),
            vec![],
        )
    }
}
