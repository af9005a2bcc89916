//! JSON output.

use std::path::Path;

use anyhow::Result;

use crate::records::ExportRecord;

/// Render records as a pretty-printed JSON array.
pub fn to_json(records: &[ExportRecord]) -> Result<String> {
    Ok(serde_json::to_string_pretty(records)?)
}

/// Write a JSON export to a file.
pub fn write_json(records: &[ExportRecord], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, to_json(records)?)?;
    Ok(())
}
