use chrono::{NaiveDate, NaiveDateTime};
use sqlx::PgPool;
use tracing::{debug, warn};

use crate::error::Result;

/// Metadata shared by every bar of one upstream time-series response.
#[derive(Debug, Clone)]
pub struct BarMeta {
    pub symbol: String,
    pub interval: String,
    pub currency: Option<String>,
    pub exchange_timezone: Option<String>,
    pub exchange: Option<String>,
    pub mic_code: Option<String>,
    pub instrument_type: Option<String>,
}

/// One OHLCV bar.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub datetime: NaiveDateTime,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<i64>,
}

/// Parses a bar timestamp. Intraday intervals come back with a full
/// timestamp, daily and coarser intervals with a bare date.
pub fn parse_bar_datetime(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(dt);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Parses one bar out of the raw string fields. Returns `None` when the
/// timestamp cannot be parsed.
pub fn parse_bar(
    datetime: &str,
    open: &str,
    high: &str,
    low: &str,
    close: &str,
    volume: &str,
) -> Option<Bar> {
    let Some(datetime) = parse_bar_datetime(datetime) else {
        warn!(datetime, "skipping bar with unparseable timestamp");
        return None;
    };
    Some(Bar {
        datetime,
        open: open.trim().parse().ok(),
        high: high.trim().parse().ok(),
        low: low.trim().parse().ok(),
        close: close.trim().parse().ok(),
        volume: volume.trim().parse().ok(),
    })
}

/// Repository over the `td_time_series_data` table.
#[derive(Debug, Clone)]
pub struct SeriesRepository {
    pool: PgPool,
}

impl SeriesRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts the bars for one symbol and interval in a single transaction.
    /// Bars already present for the same `(symbol, interval, datetime)` are
    /// left untouched. Returns the number of bars attempted.
    pub async fn insert_bars(&self, meta: &BarMeta, bars: &[Bar]) -> Result<usize> {
        let mut tx = self.pool.begin().await?;

        for bar in bars {
            sqlx::query(
                "INSERT INTO td_time_series_data \
                 (symbol, \"interval\", datetime, open, high, low, close, volume, \
                  currency, exchange_timezone, exchange, mic_code, \"type\") \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
                 ON CONFLICT (symbol, \"interval\", datetime) DO NOTHING",
            )
            .bind(&meta.symbol)
            .bind(&meta.interval)
            .bind(bar.datetime)
            .bind(bar.open)
            .bind(bar.high)
            .bind(bar.low)
            .bind(bar.close)
            .bind(bar.volume)
            .bind(&meta.currency)
            .bind(&meta.exchange_timezone)
            .bind(&meta.exchange)
            .bind(&meta.mic_code)
            .bind(&meta.instrument_type)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(
            symbol = meta.symbol,
            interval = meta.interval,
            bars = bars.len(),
            "time series stored"
        );
        Ok(bars.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_intraday_timestamp() {
        let bar = parse_bar("2024-03-01 15:30:00", "1.0", "2.0", "0.5", "1.5", "100").unwrap();
        assert_eq!(
            bar.datetime,
            NaiveDate::from_ymd_opt(2024, 3, 1)
                .unwrap()
                .and_hms_opt(15, 30, 0)
                .unwrap()
        );
        assert_eq!(bar.close, Some(1.5));
        assert_eq!(bar.volume, Some(100));
    }

    #[test]
    fn parses_daily_timestamp_at_midnight() {
        let bar = parse_bar("2024-03-01", "1.0", "2.0", "0.5", "1.5", "100").unwrap();
        assert_eq!(
            bar.datetime,
            NaiveDate::from_ymd_opt(2024, 3, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        );
    }

    #[test]
    fn bad_timestamp_skips_bar() {
        assert!(parse_bar("yesterday", "1", "1", "1", "1", "1").is_none());
    }

    #[test]
    fn unparseable_fields_become_none() {
        let bar = parse_bar("2024-03-01", "", "x", "0.5", "1.5", "").unwrap();
        assert_eq!(bar.open, None);
        assert_eq!(bar.high, None);
        assert_eq!(bar.low, Some(0.5));
        assert_eq!(bar.volume, None);
    }
}
