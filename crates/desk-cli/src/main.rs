//! Command-line interface for the marketdesk agent team.

mod fetch;
mod logging;

use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use desk_core::{Agent, Context};
use desk_data::api::{AlphaVantageClient, EodhdClient, SandboxClient, TwelveDataClient};
use desk_llm::providers::OpenAIProvider;
use desk_llm::LLMProvider;
use desk_supervisor::{prompts, workers, OutputMode, Supervisor};
use serde_json::{Map, Value};
use tracing::info;

use crate::fetch::FetchCommand;

#[derive(Parser, Debug)]
#[command(name = "desk")]
#[command(about = "Market research agent desk", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one request through the supervisor and its agent team
    Run {
        /// The request to work on
        prompt: String,
        /// Fold entire worker traces into the history instead of the last message
        #[arg(long)]
        full_history: bool,
    },
    /// Call a data provider directly and print the result
    Fetch {
        #[command(subcommand)]
        what: FetchCommand,
    },
    /// Execute a SQL statement against the marketdesk database
    Sql {
        /// The statement, with optional :name placeholders
        query: String,
        /// Bind values as a JSON object, e.g. '{"id": 7}'
        #[arg(long)]
        params: Option<String>,
        /// Do not fetch result rows
        #[arg(long)]
        no_fetch: bool,
        /// Roll back instead of committing (dry run)
        #[arg(long)]
        no_commit: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    logging::init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Command::Run {
            prompt,
            full_history,
        } => run_supervised(&prompt, full_history).await,
        Command::Fetch { what } => fetch::run(what).await,
        Command::Sql {
            query,
            params,
            no_fetch,
            no_commit,
        } => run_sql(&query, params, !no_fetch, !no_commit).await,
    }
}

async fn run_supervised(prompt: &str, full_history: bool) -> anyhow::Result<()> {
    let provider: Arc<dyn LLMProvider> = Arc::new(OpenAIProvider::from_env()?);
    let pool = fetch::connect_db().await?;

    let services = workers::DataServices {
        alpha_vantage: Arc::new(AlphaVantageClient::from_env()?),
        twelve_data: Arc::new(TwelveDataClient::from_env()?),
        eodhd: Arc::new(EodhdClient::from_env()?),
        sandbox: Arc::new(SandboxClient::from_env()?),
        pool,
    };

    let engineer = workers::data_engineer(Arc::clone(&provider), &services)?;
    let analyst = workers::data_analyst(Arc::clone(&provider), &services)?;

    let supervisor_prompt = prompts::supervisor_prompt(&[
        (
            workers::DATA_ENGINEER,
            "fetches market and economic data and maintains the database",
        ),
        (
            workers::DATA_ANALYST,
            "analyzes fetched and stored data and answers research questions",
        ),
    ])?;

    let output_mode = if full_history {
        OutputMode::FullHistory
    } else {
        OutputMode::LastMessage
    };
    let supervisor = Supervisor::builder(provider)
        .worker(Arc::new(engineer))
        .worker(Arc::new(analyst))
        .prompt(supervisor_prompt)
        .output_mode(output_mode)
        .build()?;

    info!("supervisor assembled, starting request");
    let mut context = Context::new();
    let answer = supervisor.run(prompt, &mut context).await?;
    supervisor.shutdown().await?;

    println!("{answer}");
    Ok(())
}

async fn run_sql(
    query: &str,
    params: Option<String>,
    fetch_results: bool,
    commit: bool,
) -> anyhow::Result<()> {
    let params: Map<String, Value> = match params {
        Some(raw) => serde_json::from_str(&raw).context("params must be a JSON object")?,
        None => Map::new(),
    };

    let pool = fetch::connect_db().await?;
    let outcome = desk_db::execute_sql(&pool, query, &params, fetch_results, commit).await;

    println!("{}: {}", outcome.status, outcome.message);
    if let Some(results) = &outcome.results {
        println!("{}", serde_json::to_string_pretty(results)?);
    }
    Ok(())
}
