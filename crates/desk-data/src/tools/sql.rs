use async_trait::async_trait;
use desk_llm::tools::schema;
use desk_tools::Tool;
use serde::Deserialize;
use desk_db::PgPool;
use serde_json::{json, Map, Value};
use tracing::info;

use crate::error::DataError;
use crate::tools::parse_params;

const TOOL_NAME: &str = "execute_sql";

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct SqlParams {
    sql_query: String,
    #[serde(default)]
    parameters: Map<String, Value>,
    #[serde(default = "default_true")]
    fetch_results: bool,
    #[serde(default = "default_true")]
    commit_transaction: bool,
}

/// Runs an arbitrary SQL statement against the marketdesk database. The
/// outcome, including execution errors, is always returned as data so the
/// model can react to it.
pub struct ExecuteSqlTool {
    pool: PgPool,
}

impl ExecuteSqlTool {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Tool for ExecuteSqlTool {
    async fn execute(&self, params: Value) -> desk_core::Result<Value> {
        let params: SqlParams = parse_params(TOOL_NAME, params)?;
        if params.sql_query.trim().is_empty() {
            return Err(DataError::InvalidParameter("sql_query must not be empty".to_string())
                .into_tool_error(TOOL_NAME));
        }

        info!(
            fetch = params.fetch_results,
            commit = params.commit_transaction,
            "executing sql statement"
        );
        let outcome = desk_db::execute_sql(
            &self.pool,
            &params.sql_query,
            &params.parameters,
            params.fetch_results,
            params.commit_transaction,
        )
        .await;

        serde_json::to_value(outcome)
            .map_err(|err| DataError::from(err).into_tool_error(TOOL_NAME))
    }

    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "Execute a SQL statement against the marketdesk Postgres database. \
         Use :name placeholders with the parameters object for bind values. \
         Set fetch_results to false for INSERT/UPDATE/DELETE; set \
         commit_transaction to false for a dry run that is rolled back."
    }

    fn input_schema(&self) -> Value {
        schema::object(
            json!({
                "sql_query": schema::string(
                    "The SQL statement to execute, with optional :name placeholders",
                ),
                "parameters": schema::map(
                    "Bind values for the :name placeholders in sql_query",
                ),
                "fetch_results": schema::boolean(
                    "Fetch and return result rows (default true, for SELECT)",
                ),
                "commit_transaction": schema::boolean(
                    "Commit after execution (default true); false rolls back",
                ),
            }),
            vec!["sql_query"],
        )
    }
}
