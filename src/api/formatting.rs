//! Estimate output formatting and serialization
//!
//! Text for operators, JSON for tooling and CSV for logging many targets.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::api::dms::decimal_to_dms;
use crate::core::Estimate;
use crate::processing::batch::TargetEstimate;

/// Output format selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Csv,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            other => Err(format!("unknown output format '{}' (expected text, json or csv)", other)),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Text => "text",
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
        };
        f.write_str(name)
    }
}

/// Serializable view of one target's outcome
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormattedEstimate {
    pub target_id: String,
    pub latitude_deg: Option<f64>,
    pub longitude_deg: Option<f64>,
    pub latitude_dms: Option<String>,
    pub longitude_dms: Option<String>,
    /// Present only when the emission time was estimated
    pub emission_time_s: Option<f64>,
    pub converged: bool,
    pub cost: Option<f64>,
    pub rms_residual_s: Option<f64>,
    /// RMS residual times propagation speed
    pub range_error_m: Option<f64>,
    pub iterations: usize,
    pub evaluations: usize,
    pub receiver_count: usize,
    /// Error kind and message when the solve was rejected
    pub error: Option<String>,
}

impl FormattedEstimate {
    pub fn from_estimate(target_id: impl Into<String>, estimate: &Estimate) -> Self {
        let (latitude_dms, longitude_dms) = decimal_to_dms(&estimate.position);
        Self {
            target_id: target_id.into(),
            latitude_deg: Some(estimate.position.latitude()),
            longitude_deg: Some(estimate.position.longitude()),
            latitude_dms: Some(latitude_dms),
            longitude_dms: Some(longitude_dms),
            emission_time_s: estimate.emission_time,
            converged: estimate.converged,
            cost: Some(estimate.cost),
            rms_residual_s: Some(estimate.rms_residual_s),
            range_error_m: Some(estimate.range_error_m()),
            iterations: estimate.iterations,
            evaluations: estimate.evaluations,
            receiver_count: estimate.receiver_count,
            error: None,
        }
    }

    pub fn from_target(target: &TargetEstimate) -> Self {
        match &target.result {
            Ok(estimate) => Self::from_estimate(target.target_id.clone(), estimate),
            Err(e) => Self {
                target_id: target.target_id.clone(),
                latitude_deg: None,
                longitude_deg: None,
                latitude_dms: None,
                longitude_dms: None,
                emission_time_s: None,
                converged: false,
                cost: None,
                rms_residual_s: None,
                range_error_m: None,
                iterations: 0,
                evaluations: 0,
                receiver_count: 0,
                error: Some(format!("{}: {}", e.kind(), e)),
            },
        }
    }
}

/// Human-readable text formatter
#[derive(Debug, Clone, Default)]
pub struct TextFormatter {
    /// One line per target instead of a block
    pub compact: bool,
}

impl TextFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compact() -> Self {
        Self { compact: true }
    }

    pub fn format_text(&self, formatted: &FormattedEstimate) -> String {
        let mut output = String::new();

        if let Some(error) = &formatted.error {
            output.push_str(&format!("Target {}: FAILED ({})", formatted.target_id, error));
            if !self.compact {
                output.push('\n');
            }
            return output;
        }

        let lat = formatted.latitude_deg.unwrap_or_default();
        let lon = formatted.longitude_deg.unwrap_or_default();
        let status = if formatted.converged { "converged" } else { "NOT CONVERGED" };

        if self.compact {
            output.push_str(&format!(
                "{}: {:.6}, {:.6} | {} {} | rms {:.1} m | {}",
                formatted.target_id,
                lat,
                lon,
                formatted.latitude_dms.as_deref().unwrap_or(""),
                formatted.longitude_dms.as_deref().unwrap_or(""),
                formatted.range_error_m.unwrap_or_default(),
                status
            ));
            return output;
        }

        output.push_str(&format!("Target {}:\n", formatted.target_id));
        output.push_str(&format!("  Latitude:   {:.6}° ({})\n", lat, formatted.latitude_dms.as_deref().unwrap_or("")));
        output.push_str(&format!("  Longitude:  {:.6}° ({})\n", lon, formatted.longitude_dms.as_deref().unwrap_or("")));
        if let Some(t0) = formatted.emission_time_s {
            output.push_str(&format!("  Emission:   {:.9} s\n", t0));
        }
        output.push_str("Quality:\n");
        output.push_str(&format!("  Status:     {}\n", status));
        output.push_str(&format!("  Cost:       {:e} s²\n", formatted.cost.unwrap_or_default()));
        output.push_str(&format!("  Range RMS:  {:.2} m\n", formatted.range_error_m.unwrap_or_default()));
        output.push_str(&format!("  Receivers:  {}\n", formatted.receiver_count));
        output.push_str(&format!(
            "  Iterations: {} ({} evaluations)\n",
            formatted.iterations, formatted.evaluations
        ));
        output
    }
}

/// JSON formatter for structured output
#[derive(Debug, Clone, Default)]
pub struct JsonFormatter {
    pub pretty: bool,
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pretty() -> Self {
        Self { pretty: true }
    }

    pub fn format_json(&self, formatted: &FormattedEstimate) -> Result<String, serde_json::Error> {
        if self.pretty {
            serde_json::to_string_pretty(formatted)
        } else {
            serde_json::to_string(formatted)
        }
    }

    /// All targets as one JSON array
    pub fn format_all(&self, formatted: &[FormattedEstimate]) -> Result<String, serde_json::Error> {
        if self.pretty {
            serde_json::to_string_pretty(formatted)
        } else {
            serde_json::to_string(formatted)
        }
    }
}

/// CSV formatter for data logging
#[derive(Debug, Clone)]
pub struct CsvFormatter {
    pub include_header: bool,
}

impl Default for CsvFormatter {
    fn default() -> Self {
        Self { include_header: true }
    }
}

impl CsvFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(&self) -> String {
        "target_id,latitude,longitude,latitude_dms,longitude_dms,emission_time_s,converged,cost,range_error_m,receivers,iterations,evaluations,error"
            .to_string()
    }

    pub fn format_csv(&self, formatted: &FormattedEstimate) -> String {
        fn opt(value: Option<f64>, precision: usize) -> String {
            value.map(|v| format!("{:.*}", precision, v)).unwrap_or_default()
        }

        format!(
            "{},{},{},{},{},{},{},{},{},{},{},{},{}",
            quote(&formatted.target_id),
            opt(formatted.latitude_deg, 6),
            opt(formatted.longitude_deg, 6),
            quote(formatted.latitude_dms.as_deref().unwrap_or("")),
            quote(formatted.longitude_dms.as_deref().unwrap_or("")),
            opt(formatted.emission_time_s, 9),
            formatted.converged,
            formatted.cost.map(|c| format!("{:e}", c)).unwrap_or_default(),
            opt(formatted.range_error_m, 2),
            formatted.receiver_count,
            formatted.iterations,
            formatted.evaluations,
            quote(formatted.error.as_deref().unwrap_or(""))
        )
    }

    /// Header (if enabled) followed by one row per target
    pub fn format_all(&self, formatted: &[FormattedEstimate]) -> String {
        let mut lines = Vec::with_capacity(formatted.len() + 1);
        if self.include_header {
            lines.push(self.header());
        }
        lines.extend(formatted.iter().map(|f| self.format_csv(f)));
        lines.join("\n")
    }
}

/// Quote a CSV field when it contains a separator, quote or newline
fn quote(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::GeoPoint;
    use crate::validation::error::MlatError;

    fn sample_estimate() -> Estimate {
        let position = GeoPoint::new(20.252, 85.815).unwrap();
        Estimate {
            position,
            emission_time: None,
            converged: true,
            cost: 4.0e-18,
            rms_residual_s: 1.0e-9,
            propagation_speed_mps: 299_792_458.0,
            iterations: 120,
            evaluations: 230,
            receiver_count: 5,
            initial_guess: position,
        }
    }

    #[test]
    fn test_formatted_from_estimate() {
        let formatted = FormattedEstimate::from_estimate("T1", &sample_estimate());
        assert_eq!(formatted.latitude_dms.as_deref(), Some("20°15'07\"N"));
        assert_eq!(formatted.longitude_dms.as_deref(), Some("85°48'54\"E"));
        assert!((formatted.range_error_m.unwrap() - 0.299792458).abs() < 1e-9);
        assert!(formatted.error.is_none());
    }

    #[test]
    fn test_text_format() {
        let formatted = FormattedEstimate::from_estimate("T1", &sample_estimate());
        let text = TextFormatter::new().format_text(&formatted);
        println!("{}", text);
        assert!(text.contains("Target T1:"));
        assert!(text.contains("20.252000°"));
        assert!(text.contains("converged"));
        assert!(!text.contains("Emission"));

        let line = TextFormatter::compact().format_text(&formatted);
        assert!(!line.contains('\n'));
        assert!(line.starts_with("T1: 20.252000, 85.815000"));
    }

    #[test]
    fn test_failed_target_text() {
        let target = TargetEstimate {
            target_id: "T2".to_string(),
            result: Err(MlatError::InsufficientReceivers { available: 2, required: 3 }),
        };
        let formatted = FormattedEstimate::from_target(&target);
        let text = TextFormatter::new().format_text(&formatted);
        assert!(text.contains("FAILED"));
        assert!(text.contains("InsufficientReceivers"));
    }

    #[test]
    fn test_json_format() {
        let formatted = FormattedEstimate::from_estimate("T1", &sample_estimate());
        let json = JsonFormatter::new().format_json(&formatted).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["target_id"], "T1");
        assert_eq!(value["converged"], true);
        assert!(value["emission_time_s"].is_null());
        assert!(JsonFormatter::pretty().format_all(&[formatted]).unwrap().contains('\n'));
    }

    #[test]
    fn test_csv_format() {
        let csv = CsvFormatter::new();
        let formatted = FormattedEstimate::from_estimate("T1", &sample_estimate());
        let row = csv.format_csv(&formatted);
        assert_eq!(row.split(',').count(), csv.header().split(',').count());
        assert!(row.starts_with("T1,20.252000,85.815000,"));

        let failed = FormattedEstimate::from_target(&TargetEstimate {
            target_id: "T,2".to_string(),
            result: Err(MlatError::DmsParse { input: "x".to_string() }),
        });
        assert!(csv.format_csv(&failed).starts_with("\"T,2\",,,"));

        let all = csv.format_all(&[formatted]);
        assert_eq!(all.lines().count(), 2);
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("csv".parse::<OutputFormat>().unwrap(), OutputFormat::Csv);
        assert!("xml".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::default().to_string(), "text");
    }
}
