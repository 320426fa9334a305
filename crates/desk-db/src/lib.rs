//! Postgres persistence layer for marketdesk.
//!
//! Provides connection pooling, schema bootstrap, typed repositories for
//! economic data feeds and market time series, and a generic SQL execution
//! entry point used by the `execute_sql` tool.

pub mod error;
pub mod feeds;
pub mod pool;
pub mod query;
pub mod schema;
pub mod series;

pub use error::{DbError, Result};
pub use sqlx::PgPool;
pub use feeds::{parse_econ_point, EconPoint, FeedOutcome, FeedRepository, NewFeed};
pub use pool::connect;
pub use query::{execute_sql, SqlOutcome};
pub use schema::ensure_schema;
pub use series::{parse_bar, Bar, BarMeta, SeriesRepository};
