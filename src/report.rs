use std::path::Path;

use log::debug;
use serde::Serialize;

use crate::error::ArchiveError;

/// Serializes one uniform row type to a CSV file, header from the row's field
/// names, always a full overwrite. Callers check for rows before calling; a
/// zero-row report is never written.
pub fn write<R: Serialize>(path: &Path, rows: &[R]) -> Result<(), ArchiveError> {
    debug_assert!(!rows.is_empty(), "report rows must be non-empty");

    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    debug!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}
