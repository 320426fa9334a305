//! Market data connectors and the agent tools built on top of them.
//!
//! The `api` module holds thin HTTP clients for Alpha Vantage, Twelve Data,
//! EODHD, and the Python sandbox service. The `tools` module wraps them in
//! [`desk_tools::Tool`] implementations that the agents call, together with
//! the generic SQL tool backed by `desk-db`.

pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod tools;

pub use error::{DataError, Result};
