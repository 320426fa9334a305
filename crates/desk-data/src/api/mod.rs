//! HTTP clients for the upstream data providers.

pub mod alpha_vantage;
pub mod eodhd;
pub mod sandbox;
pub mod twelve_data;

pub use alpha_vantage::{AlphaVantageClient, EconSeries, NewsQuery, NewsSort};
pub use eodhd::EodhdClient;
pub use sandbox::{Execution, SandboxClient, SandboxFile, SandboxSession};
pub use twelve_data::{TimeSeriesResponse, TwelveDataClient};
