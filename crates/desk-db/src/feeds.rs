use chrono::NaiveDate;
use sqlx::PgPool;
use tracing::{debug, warn};

use crate::error::Result;

const ERROR_MESSAGE_MAX_LEN: usize = 500;

/// A feed row about to be created, describing one upstream fetch.
#[derive(Debug, Clone)]
pub struct NewFeed {
    pub indicator_key: String,
    pub interval_param: Option<String>,
    pub maturity_param: Option<String>,
    pub api_indicator_name: Option<String>,
    pub api_unit: Option<String>,
}

/// A single dated observation belonging to a feed. The raw upstream value is
/// kept alongside the parsed numeric so nothing is lost when the provider
/// sends placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct EconPoint {
    pub data_date: NaiveDate,
    pub value_numeric: Option<f64>,
    pub value_text: String,
}

/// Result of recording a feed and its points.
#[derive(Debug, Clone)]
pub struct FeedOutcome {
    pub feed_id: i64,
    pub points_attempted: usize,
}

/// Parses one upstream data point. Returns `None` when the date cannot be
/// parsed; placeholder values ("." or "none") keep the row but leave the
/// numeric column NULL.
pub fn parse_econ_point(date_str: &str, value_str: &str) -> Option<EconPoint> {
    let data_date = match NaiveDate::parse_from_str(date_str, "%Y-%m-%d") {
        Ok(d) => d,
        Err(err) => {
            warn!(date = date_str, %err, "skipping data point with unparseable date");
            return None;
        }
    };
    Some(EconPoint {
        data_date,
        value_numeric: parse_numeric_value(value_str),
        value_text: value_str.to_string(),
    })
}

fn parse_numeric_value(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed == "." || trimmed.eq_ignore_ascii_case("none") || trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok()
}

fn truncate_error(message: &str) -> String {
    if message.len() <= ERROR_MESSAGE_MAX_LEN {
        return message.to_string();
    }
    let mut end = ERROR_MESSAGE_MAX_LEN;
    while end > 0 && !message.is_char_boundary(end) {
        end -= 1;
    }
    message[..end].to_string()
}

/// Repository over the `data_feeds` and `av_economic_data_points` tables.
#[derive(Debug, Clone)]
pub struct FeedRepository {
    pool: PgPool,
}

impl FeedRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Writes a feed header and all of its points in one transaction, then
    /// marks the feed completed. Re-fetched dates are ignored via the
    /// `(feed_id, data_date)` primary key.
    pub async fn record_feed(&self, feed: &NewFeed, points: &[EconPoint]) -> Result<FeedOutcome> {
        let mut tx = self.pool.begin().await?;

        let feed_id: i64 = sqlx::query_scalar(
            "INSERT INTO data_feeds \
             (indicator_key, interval_param, maturity_param, api_indicator_name, api_unit, status) \
             VALUES ($1, $2, $3, $4, $5, 'new') \
             RETURNING feed_id",
        )
        .bind(&feed.indicator_key)
        .bind(&feed.interval_param)
        .bind(&feed.maturity_param)
        .bind(&feed.api_indicator_name)
        .bind(&feed.api_unit)
        .fetch_one(&mut *tx)
        .await?;

        for point in points {
            sqlx::query(
                "INSERT INTO av_economic_data_points \
                 (feed_id, data_date, value_numeric, value_text) \
                 VALUES ($1, $2, $3, $4) \
                 ON CONFLICT (feed_id, data_date) DO NOTHING",
            )
            .bind(feed_id)
            .bind(point.data_date)
            .bind(point.value_numeric)
            .bind(&point.value_text)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("UPDATE data_feeds SET status = 'completed', row_count = $1 WHERE feed_id = $2")
            .bind(points.len() as i64)
            .bind(feed_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        debug!(feed_id, points = points.len(), "feed recorded");

        Ok(FeedOutcome {
            feed_id,
            points_attempted: points.len(),
        })
    }

    /// Records a failed fetch as its own feed row so the failure is visible
    /// in the feed history. Error messages are truncated to fit the column.
    pub async fn record_failure(&self, feed: &NewFeed, error_message: &str) -> Result<i64> {
        let feed_id: i64 = sqlx::query_scalar(
            "INSERT INTO data_feeds \
             (indicator_key, interval_param, maturity_param, api_indicator_name, api_unit, \
              status, error_message) \
             VALUES ($1, $2, $3, $4, $5, 'error', $6) \
             RETURNING feed_id",
        )
        .bind(&feed.indicator_key)
        .bind(&feed.interval_param)
        .bind(&feed.maturity_param)
        .bind(&feed.api_indicator_name)
        .bind(&feed.api_unit)
        .bind(truncate_error(error_message))
        .fetch_one(&self.pool)
        .await?;
        Ok(feed_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_regular_point() {
        let point = parse_econ_point("2024-01-31", "3.7").unwrap();
        assert_eq!(point.data_date, NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
        assert_eq!(point.value_numeric, Some(3.7));
        assert_eq!(point.value_text, "3.7");
    }

    #[test]
    fn placeholder_values_keep_row_without_numeric() {
        for raw in [".", "none", "None", ""] {
            let point = parse_econ_point("2024-01-31", raw).unwrap();
            assert_eq!(point.value_numeric, None);
            assert_eq!(point.value_text, raw);
        }
    }

    #[test]
    fn unparseable_numeric_is_kept_as_text() {
        let point = parse_econ_point("2024-01-31", "n/a").unwrap();
        assert_eq!(point.value_numeric, None);
        assert_eq!(point.value_text, "n/a");
    }

    #[test]
    fn bad_date_skips_point() {
        assert!(parse_econ_point("January 2024", "1.0").is_none());
        assert!(parse_econ_point("", "1.0").is_none());
    }

    #[test]
    fn error_messages_are_truncated() {
        let long = "x".repeat(600);
        assert_eq!(truncate_error(&long).len(), 500);
        assert_eq!(truncate_error("short"), "short");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let mut long = "é".repeat(251);
        long.push_str("tail");
        let truncated = truncate_error(&long);
        assert!(truncated.len() <= 500);
        assert!(truncated.chars().all(|c| c == 'é'));
    }
}
