//! Direct data-fetch subcommands with tabular output.

use std::sync::Arc;

use anyhow::Context as _;
use clap::Subcommand;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use desk_data::api::alpha_vantage::{NewsQuery, NewsSort};
use desk_data::api::eodhd::CalendarQuery;
use desk_data::api::{AlphaVantageClient, EodhdClient, TwelveDataClient};
use desk_data::catalog::{Commodity, EconIndicator};
use desk_db::{parse_econ_point, FeedRepository, NewFeed};
use serde_json::Value;

#[derive(Subcommand, Debug)]
pub enum FetchCommand {
    /// Fetch an economic indicator series
    Econ {
        /// Indicator key, e.g. cpi or treasury_yield
        indicator: String,
        /// Reporting interval, where the indicator supports one
        #[arg(long)]
        interval: Option<String>,
        /// Treasury maturity, treasury_yield only
        #[arg(long)]
        maturity: Option<String>,
        /// Limit the number of rows printed
        #[arg(long, default_value_t = 25)]
        rows: usize,
        /// Persist the series to the database as a data feed
        #[arg(long)]
        store: bool,
    },
    /// Fetch OHLCV bars for a symbol
    Series {
        /// Instrument symbol, e.g. AAPL
        symbol: String,
        /// Bar interval
        #[arg(long, default_value = "1day")]
        interval: String,
        /// Number of bars, newest first
        #[arg(long)]
        output_size: Option<u32>,
    },
    /// Fetch a commodity price series
    Commodity {
        /// Commodity key, e.g. wti or copper
        commodity: String,
        /// Reporting interval
        #[arg(long, default_value = "monthly")]
        interval: String,
        /// Limit to the most recent periods
        #[arg(long)]
        max_periods: Option<usize>,
    },
    /// Fetch market news with sentiment scores
    News {
        /// Ticker symbols to filter by
        #[arg(long, value_delimiter = ',')]
        tickers: Vec<String>,
        /// Topics to filter by
        #[arg(long, value_delimiter = ',')]
        topics: Vec<String>,
        /// Earliest article time, YYYYMMDDTHHMM
        #[arg(long)]
        time_from: Option<String>,
        /// Latest article time, YYYYMMDDTHHMM
        #[arg(long)]
        time_to: Option<String>,
        /// Sort order
        #[arg(long, default_value = "LATEST")]
        sort: String,
        /// Maximum number of articles
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Fetch the economic events calendar
    Calendar {
        /// ISO 3166 alpha-2 country code
        #[arg(long)]
        country: Option<String>,
        /// Earliest event date, YYYY-MM-DD
        #[arg(long)]
        date_from: Option<String>,
        /// Latest event date, YYYY-MM-DD
        #[arg(long)]
        date_to: Option<String>,
        /// Maximum number of events
        #[arg(long)]
        limit: Option<u32>,
    },
}

pub async fn run(command: FetchCommand) -> anyhow::Result<()> {
    match command {
        FetchCommand::Econ {
            indicator,
            interval,
            maturity,
            rows,
            store,
        } => fetch_econ(&indicator, interval, maturity, rows, store).await,
        FetchCommand::Series {
            symbol,
            interval,
            output_size,
        } => fetch_series(&symbol, &interval, output_size).await,
        FetchCommand::Commodity {
            commodity,
            interval,
            max_periods,
        } => fetch_commodity(&commodity, &interval, max_periods).await,
        FetchCommand::News {
            tickers,
            topics,
            time_from,
            time_to,
            sort,
            limit,
        } => fetch_news(tickers, topics, time_from, time_to, &sort, limit).await,
        FetchCommand::Calendar {
            country,
            date_from,
            date_to,
            limit,
        } => fetch_calendar(country, date_from, date_to, limit).await,
    }
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

async fn fetch_econ(
    indicator_key: &str,
    interval: Option<String>,
    maturity: Option<String>,
    rows: usize,
    store: bool,
) -> anyhow::Result<()> {
    let indicator = EconIndicator::from_key(indicator_key)?;
    let client = AlphaVantageClient::from_env()?;
    let series = client
        .econ_indicator(indicator, interval.as_deref(), maturity.as_deref())
        .await?;

    if let Some(name) = &series.name {
        println!("{name} ({})", series.unit.as_deref().unwrap_or("no unit"));
    }
    let mut table = new_table(vec!["date", "value"]);
    for point in series.data.iter().take(rows) {
        table.add_row(vec![point.date.clone(), point.value.clone()]);
    }
    println!("{table}");

    if store {
        let pool = connect_db().await?;
        let feeds = FeedRepository::new(pool);
        let feed = NewFeed {
            indicator_key: indicator.key().to_string(),
            interval_param: interval,
            maturity_param: maturity,
            api_indicator_name: series.name.clone(),
            api_unit: series.unit.clone(),
        };
        let points: Vec<_> = series
            .data
            .iter()
            .filter_map(|p| parse_econ_point(&p.date, &p.value))
            .collect();
        let outcome = feeds.record_feed(&feed, &points).await?;
        println!(
            "stored feed {} with {} point(s)",
            outcome.feed_id, outcome.points_attempted
        );
    }
    Ok(())
}

async fn fetch_series(symbol: &str, interval: &str, output_size: Option<u32>) -> anyhow::Result<()> {
    let client = TwelveDataClient::from_env()?;
    let response = client.time_series(symbol, interval, output_size).await?;

    println!(
        "{} {} ({})",
        response.meta.symbol,
        response.meta.interval,
        response.meta.exchange.as_deref().unwrap_or("unknown exchange")
    );
    let mut table = new_table(vec!["datetime", "open", "high", "low", "close", "volume"]);
    for bar in &response.values {
        table.add_row(vec![
            bar.datetime.clone(),
            bar.open.clone(),
            bar.high.clone(),
            bar.low.clone(),
            bar.close.clone(),
            bar.volume.clone(),
        ]);
    }
    println!("{table}");
    Ok(())
}

async fn fetch_commodity(
    commodity_key: &str,
    interval: &str,
    max_periods: Option<usize>,
) -> anyhow::Result<()> {
    let commodity = Commodity::from_key(commodity_key)?;
    let client = AlphaVantageClient::from_env()?;
    let series = client.commodity(commodity, interval).await?;

    if let Some(name) = &series.name {
        println!("{name} ({})", series.unit.as_deref().unwrap_or("no unit"));
    }
    let mut points = series.data;
    if let Some(max) = max_periods {
        points.truncate(max);
    }
    let mut table = new_table(vec!["date", "value"]);
    for point in &points {
        table.add_row(vec![point.date.clone(), point.value.clone()]);
    }
    println!("{table}");
    Ok(())
}

async fn fetch_news(
    tickers: Vec<String>,
    topics: Vec<String>,
    time_from: Option<String>,
    time_to: Option<String>,
    sort: &str,
    limit: Option<u32>,
) -> anyhow::Result<()> {
    let client = AlphaVantageClient::from_env()?;
    let query = NewsQuery {
        tickers,
        topics,
        time_from,
        time_to,
        sort: NewsSort::from_key(sort)?,
        limit,
    };
    let payload = client.news_sentiment(&query).await?;

    let feed = payload
        .get("feed")
        .and_then(Value::as_array)
        .context("response carried no news feed")?;
    let mut table = new_table(vec!["time", "sentiment", "title"]);
    for article in feed {
        table.add_row(vec![
            article
                .get("time_published")
                .and_then(Value::as_str)
                .unwrap_or("-")
                .to_string(),
            article
                .get("overall_sentiment_label")
                .and_then(Value::as_str)
                .unwrap_or("-")
                .to_string(),
            article
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or("-")
                .to_string(),
        ]);
    }
    println!("{table}");
    Ok(())
}

async fn fetch_calendar(
    country: Option<String>,
    date_from: Option<String>,
    date_to: Option<String>,
    limit: Option<u32>,
) -> anyhow::Result<()> {
    let client = EodhdClient::from_env()?;
    let query = CalendarQuery {
        country,
        date_from,
        date_to,
        limit,
    };
    let events = client.economic_events(&query).await?;

    let events = events.as_array().context("expected an event array")?;
    let mut table = new_table(vec!["date", "country", "event", "actual", "estimate", "previous"]);
    for event in events {
        table.add_row(vec![
            field(event, "date"),
            field(event, "country"),
            field(event, "type"),
            field(event, "actual"),
            field(event, "estimate"),
            field(event, "previous"),
        ]);
    }
    println!("{table}");
    Ok(())
}

fn field(event: &Value, key: &str) -> String {
    match event.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => "-".to_string(),
    }
}

pub async fn connect_db() -> anyhow::Result<desk_db::PgPool> {
    let url = desk_data::config::require_env(desk_data::config::env_keys::DATABASE_URL)?;
    let pool = desk_db::connect(&url).await?;
    desk_db::ensure_schema(&pool).await?;
    Ok(pool)
}
