use std::env;

use log::info;

use crate::archive::IaClient;
use crate::error::ArchiveError;
use crate::report;
use crate::types::{ErrorLog, SizeReportRow};
use crate::ui::Console;

const REPORT_FILE: &str = "filesize_report.csv";

const UNITS: [&str; 6] = ["Bytes", "KB", "MB", "GB", "TB", "PB"];

/// Sums PDF sizes across every item, prints the summary, and optionally
/// exports the per-item rows to `filesize_report.csv` in the working
/// directory.
pub async fn run(
    console: &dyn Console,
    archive: &IaClient,
    query: &str,
    items: &[String],
    errors: &mut ErrorLog,
) -> Result<(), ArchiveError> {
    console.status("\nCalculating total PDF file sizes...");

    let mut rows = Vec::new();
    let mut total_size: u64 = 0;
    let progress = console.progress(items.len() as u64, "Checking");

    for item_id in items {
        match archive.metadata(item_id).await {
            Ok(metadata) => {
                let pdf_files: Vec<_> = metadata
                    .files
                    .iter()
                    .filter(|file| file.name.ends_with(".pdf"))
                    .collect();
                let pdf_count = pdf_files.len();
                let item_size: u64 = pdf_files.iter().map(|file| file.size).sum();
                total_size += item_size;

                rows.push(SizeReportRow {
                    item_id: item_id.clone(),
                    title: metadata.metadata.title,
                    pdf_count,
                    size_bytes: item_size,
                    size_formatted: format_file_size(item_size as i64),
                });
            }
            Err(e) => {
                errors.record(format!(
                    "Failed to get metadata for item: {}. Error: {}",
                    item_id, e
                ));
            }
        }
        progress.tick();
    }
    progress.finish("Size calculation complete!");

    errors.print_recent(console, &format!("\nEncountered {} errors:", errors.len()));

    let pdf_total: usize = rows.iter().map(|row| row.pdf_count).sum();
    console.status("\n=== File Size Summary ===");
    console.line(&format!("Search Query: {}", query));
    console.line(&format!("Total Items Scanned: {}", items.len()));
    console.line(&format!("Total PDF Files: {}", pdf_total));
    console.line(&format!("Total Size: {}", format_file_size(total_size as i64)));
    console.line("");

    if console.confirm("Export detailed size report to CSV?").await? {
        if rows.is_empty() {
            console.notice("Nothing to export; no items produced a report row.");
        } else {
            let path = env::current_dir()?.join(REPORT_FILE);
            report::write(&path, &rows)?;
            console.status(&format!("Size report exported to: {}", path.display()));
        }
    }

    info!(
        "Size check finished: {} rows, {} errors, {} bytes",
        rows.len(),
        errors.len(),
        total_size
    );
    Ok(())
}

/// Formats a byte count with base-1024 units and two decimals; zero or
/// negative input renders as "0 Bytes". The unit index comes from the bit
/// length of the count, clamped at PB.
pub fn format_file_size(bytes: i64) -> String {
    if bytes <= 0 {
        return "0 Bytes".to_string();
    }
    let bits = 64 - bytes.leading_zeros() as usize;
    let power = ((bits - 1) / 10).min(UNITS.len() - 1);
    let size = bytes as f64 / 1024f64.powi(power as i32);
    format!("{:.2} {}", size, UNITS[power])
}
