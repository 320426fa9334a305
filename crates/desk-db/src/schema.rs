use sqlx::PgPool;
use tracing::debug;

use crate::error::Result;

const CREATE_DATA_FEEDS: &str = r#"
CREATE TABLE IF NOT EXISTS data_feeds (
    feed_id            BIGSERIAL PRIMARY KEY,
    indicator_key      TEXT NOT NULL,
    interval_param     TEXT,
    maturity_param     TEXT,
    api_indicator_name TEXT,
    api_unit           TEXT,
    status             TEXT NOT NULL DEFAULT 'new',
    row_count          BIGINT,
    error_message      TEXT,
    created_at         TIMESTAMPTZ NOT NULL DEFAULT now()
)
"#;

const CREATE_ECON_POINTS: &str = r#"
CREATE TABLE IF NOT EXISTS av_economic_data_points (
    feed_id       BIGINT NOT NULL REFERENCES data_feeds (feed_id),
    data_date     DATE NOT NULL,
    value_numeric DOUBLE PRECISION,
    value_text    TEXT,
    PRIMARY KEY (feed_id, data_date)
)
"#;

const CREATE_TIME_SERIES: &str = r#"
CREATE TABLE IF NOT EXISTS td_time_series_data (
    symbol            TEXT NOT NULL,
    "interval"        TEXT NOT NULL,
    datetime          TIMESTAMP NOT NULL,
    open              DOUBLE PRECISION,
    high              DOUBLE PRECISION,
    low               DOUBLE PRECISION,
    close             DOUBLE PRECISION,
    volume            BIGINT,
    currency          TEXT,
    exchange_timezone TEXT,
    exchange          TEXT,
    mic_code          TEXT,
    "type"            TEXT,
    fetch_timestamp   TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (symbol, "interval", datetime)
)
"#;

/// Creates the marketdesk tables if they do not exist yet. Idempotent, safe
/// to run on every startup.
pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    for ddl in [CREATE_DATA_FEEDS, CREATE_ECON_POINTS, CREATE_TIME_SERIES] {
        sqlx::query(ddl).execute(pool).await?;
    }
    debug!("database schema ensured");
    Ok(())
}
