//! Agent tools. Each tool parses its JSON input, calls the relevant
//! connector or repository, and returns a `{data, metadata}` JSON object.

pub mod calendar;
pub mod commodity;
pub mod econ;
pub mod news;
pub mod python;
pub mod series;
pub mod sql;

pub use calendar::EconomicCalendarTool;
pub use commodity::CommodityDataTool;
pub use econ::EconDataTool;
pub use news::NewsSentimentTool;
pub use python::RunPythonTool;
pub use series::TimeSeriesTool;
pub use sql::ExecuteSqlTool;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::DataError;

/// Deserializes tool input, turning schema violations into a parameter error
/// the model can read and correct.
pub(crate) fn parse_params<T: DeserializeOwned>(
    tool: &str,
    params: Value,
) -> desk_core::Result<T> {
    serde_json::from_value(params).map_err(|err| {
        DataError::InvalidParameter(format!("invalid input: {err}")).into_tool_error(tool)
    })
}
