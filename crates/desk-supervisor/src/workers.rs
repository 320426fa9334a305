//! Prebuilt workers: the data engineer (fetch and persist) and the data
//! analyst (read-oriented research).

use std::sync::Arc;

use desk_core::Result;
use desk_data::api::{AlphaVantageClient, EodhdClient, SandboxClient, TwelveDataClient};
use desk_data::tools::{
    CommodityDataTool, EconDataTool, EconomicCalendarTool, ExecuteSqlTool, NewsSentimentTool,
    RunPythonTool, TimeSeriesTool,
};
use desk_db::{FeedRepository, PgPool, SeriesRepository};
use desk_llm::LLMProvider;
use desk_tools::ToolRegistry;

use crate::prompts;
use crate::react::{ReactAgent, ReactConfig};

pub const DATA_ENGINEER: &str = "data_engineer";
pub const DATA_ANALYST: &str = "data_analyst";

/// Worker model settings mirror the production deployment.
const WORKER_TEMPERATURE: f32 = 0.1;

/// The shared service clients the workers draw their tools from.
pub struct DataServices {
    pub alpha_vantage: Arc<AlphaVantageClient>,
    pub twelve_data: Arc<TwelveDataClient>,
    pub eodhd: Arc<EodhdClient>,
    pub sandbox: Arc<SandboxClient>,
    pub pool: PgPool,
}

fn worker_config(system_prompt: String) -> ReactConfig {
    ReactConfig {
        system_prompt: Some(system_prompt),
        temperature: Some(WORKER_TEMPERATURE),
        ..ReactConfig::default()
    }
}

/// Builds the data engineer: fetch tools with database persistence enabled,
/// SQL execution, and the Python sandbox.
pub fn data_engineer(
    provider: Arc<dyn LLMProvider>,
    services: &DataServices,
) -> Result<ReactAgent> {
    let registry = ToolRegistry::new();
    registry.register(Arc::new(EconDataTool::new(
        Arc::clone(&services.alpha_vantage),
        Some(FeedRepository::new(services.pool.clone())),
    )));
    registry.register(Arc::new(TimeSeriesTool::new(
        Arc::clone(&services.twelve_data),
        Some(SeriesRepository::new(services.pool.clone())),
    )));
    registry.register(Arc::new(CommodityDataTool::new(Arc::clone(
        &services.alpha_vantage,
    ))));
    registry.register(Arc::new(NewsSentimentTool::new(Arc::clone(
        &services.alpha_vantage,
    ))));
    registry.register(Arc::new(ExecuteSqlTool::new(services.pool.clone())));
    registry.register(Arc::new(RunPythonTool::new(Arc::clone(&services.sandbox))));

    let config = worker_config(prompts::data_engineer_prompt(DATA_ENGINEER)?);
    Ok(ReactAgent::new(
        DATA_ENGINEER,
        provider,
        Arc::new(registry),
        config,
    ))
}

/// Builds the data analyst: the read-oriented toolset. Fetch tools cannot
/// write to the database, and the economic calendar is available.
pub fn data_analyst(
    provider: Arc<dyn LLMProvider>,
    services: &DataServices,
) -> Result<ReactAgent> {
    let registry = ToolRegistry::new();
    registry.register(Arc::new(EconDataTool::new(
        Arc::clone(&services.alpha_vantage),
        None,
    )));
    registry.register(Arc::new(TimeSeriesTool::new(
        Arc::clone(&services.twelve_data),
        None,
    )));
    registry.register(Arc::new(CommodityDataTool::new(Arc::clone(
        &services.alpha_vantage,
    ))));
    registry.register(Arc::new(NewsSentimentTool::new(Arc::clone(
        &services.alpha_vantage,
    ))));
    registry.register(Arc::new(EconomicCalendarTool::new(Arc::clone(
        &services.eodhd,
    ))));
    registry.register(Arc::new(ExecuteSqlTool::new(services.pool.clone())));
    registry.register(Arc::new(RunPythonTool::new(Arc::clone(&services.sandbox))));

    let config = worker_config(prompts::data_analyst_prompt(DATA_ANALYST)?);
    Ok(ReactAgent::new(
        DATA_ANALYST,
        provider,
        Arc::new(registry),
        config,
    ))
}
