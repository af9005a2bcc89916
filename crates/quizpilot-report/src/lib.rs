//! quizpilot-report — export learned answers.
//!
//! Builds [`ExportRecord`]s from memory or from a graded batch and renders
//! them as JSON or CSV.

pub mod csv;
pub mod json;
pub mod records;

pub use records::{from_graded, from_memory, ExportRecord, GradedExportSummary};

use std::path::Path;

use anyhow::Result;

/// Output format for exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl std::str::FromStr for ExportFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => anyhow::bail!("unknown export format: {other} (expected json or csv)"),
        }
    }
}

/// Render records in the given format.
pub fn render(records: &[ExportRecord], format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Json => json::to_json(records),
        ExportFormat::Csv => csv::to_csv(records),
    }
}

/// Write records in the given format.
pub fn write_export(records: &[ExportRecord], format: ExportFormat, path: &Path) -> Result<()> {
    match format {
        ExportFormat::Json => json::write_json(records, path),
        ExportFormat::Csv => csv::write_csv(records, path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_parsing() {
        assert_eq!("JSON".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert_eq!(" csv ".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert!("xml".parse::<ExportFormat>().is_err());
    }
}
