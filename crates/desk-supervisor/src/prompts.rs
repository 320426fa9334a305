//! System prompt templates for the supervisor and its workers, rendered
//! with minijinja.

use desk_core::{Error, Result};
use minijinja::Environment;
use serde_json::json;

const SUPERVISOR_TEMPLATE: &str = "\
You are a supervisor coordinating a team of market data agents.

Your team:
{% for worker in workers %}- {{ worker.name }}: {{ worker.role }}
{% endfor %}
Route each request to the agent best suited for it using the transfer tools. \
Hand off one task at a time and wait for the result before deciding the next \
step. When the work is done, answer the user directly and concisely. Do not \
fabricate data; everything you report must come from an agent or a tool.";

const DATA_ENGINEER_TEMPLATE: &str = "\
You are {{ name }}, a data engineer for a market research team.

You fetch economic indicators, commodity prices, market news, and OHLCV time \
series, and you maintain the Postgres database. Relevant tables: data_feeds \
(one row per upstream fetch), av_economic_data_points (indicator observations \
keyed by feed and date), td_time_series_data (OHLCV bars keyed by symbol, \
interval, and timestamp).

When asked to store data, set write_to_db on the fetch tools and report the \
resulting feed id and row counts. Use execute_sql for inspection and \
maintenance queries with :name placeholders for values. Use run_python for \
transformations the other tools cannot do; print anything you want to see. \
Report failures honestly, including database_error details.";

const DATA_ANALYST_TEMPLATE: &str = "\
You are {{ name }}, a data analyst for a market research team.

You answer questions using economic indicators, commodity prices, market \
news with sentiment, the economic calendar, OHLCV time series, and the data \
already stored in Postgres (query it with execute_sql and :name \
placeholders). Use run_python for calculations and statistics; print every \
result you need. Ground every claim in fetched or stored data, cite the \
numbers you used, and say so when the data is insufficient.";

fn render(template: &str, vars: serde_json::Value) -> Result<String> {
    let env = Environment::new();
    env.render_str(template, minijinja::value::Value::from_serialize(&vars))
        .map_err(|err| Error::InvalidConfiguration(format!("prompt template failed: {err}")))
}

/// Renders the supervisor prompt for a set of (name, role) worker pairs.
pub fn supervisor_prompt(workers: &[(&str, &str)]) -> Result<String> {
    let workers: Vec<_> = workers
        .iter()
        .map(|(name, role)| json!({ "name": name, "role": role }))
        .collect();
    render(SUPERVISOR_TEMPLATE, json!({ "workers": workers }))
}

pub fn data_engineer_prompt(name: &str) -> Result<String> {
    render(DATA_ENGINEER_TEMPLATE, json!({ "name": name }))
}

pub fn data_analyst_prompt(name: &str) -> Result<String> {
    render(DATA_ANALYST_TEMPLATE, json!({ "name": name }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supervisor_prompt_lists_workers() {
        let prompt = supervisor_prompt(&[
            ("data_engineer", "fetches and stores market data"),
            ("data_analyst", "analyzes stored data"),
        ])
        .unwrap();
        assert!(prompt.contains("- data_engineer: fetches and stores market data"));
        assert!(prompt.contains("- data_analyst: analyzes stored data"));
    }

    #[test]
    fn worker_prompts_interpolate_name() {
        let prompt = data_engineer_prompt("data_engineer").unwrap();
        assert!(prompt.starts_with("You are data_engineer"));
        let prompt = data_analyst_prompt("data_analyst").unwrap();
        assert!(prompt.starts_with("You are data_analyst"));
    }
}
