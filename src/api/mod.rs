//! Coordinate text conversion and result output

pub mod dms;
pub mod formatting;

pub use dms::{decimal_to_dms, dms_to_decimal, format_dms};
pub use formatting::{CsvFormatter, FormattedEstimate, JsonFormatter, OutputFormat, TextFormatter};
