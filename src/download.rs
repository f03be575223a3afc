use std::env;
use std::path::{Path, PathBuf};

use log::{debug, info};
use tokio::fs;

use crate::archive::IaClient;
use crate::error::ArchiveError;
use crate::report;
use crate::types::{DownloadMetadataRow, ErrorLog, ItemMetadata};
use crate::ui::Console;

const METADATA_FILE: &str = "internet_archive_metadata.csv";
const PDF_GLOB: &str = "*.pdf";

/// Downloads every item's PDFs into `destination` and writes one metadata row
/// per relocated file to `<destination>/internet_archive_metadata.csv`.
pub async fn run(
    console: &dyn Console,
    archive: &IaClient,
    query: &str,
    items: &[String],
    destination: &Path,
    errors: &mut ErrorLog,
) -> Result<(), ArchiveError> {
    let cwd = env::current_dir()?;
    let location = if destination == cwd.as_path() {
        "Current directory".to_string()
    } else {
        format!("Directory: {}", destination.display())
    };

    console.status("\nDownload Settings:");
    console.line(&format!("  Search Query: {}", query));
    console.line(&format!("  Items found: {}", items.len()));
    console.line(&format!("  Download location: {}", location));
    console.line("");

    if !console.confirm("Proceed with download?").await? {
        console.notice("Download cancelled.");
        return Ok(());
    }

    console.status("\nStarting download and metadata collection...");

    let mut rows = Vec::new();
    let progress = console.progress(items.len() as u64, "Downloading");
    for item_id in items {
        process_item(archive, item_id, destination, &mut rows, errors).await;
        progress.tick();
    }
    progress.finish("Download and metadata collection complete!");

    errors.print_recent(
        console,
        &format!("\nEncountered {} errors during download:", errors.len()),
    );

    if rows.is_empty() {
        console.alert("No items were successfully processed or downloaded.");
        return Ok(());
    }

    let csv_path = destination.join(METADATA_FILE);
    report::write(&csv_path, &rows)?;

    console.status("\n=== Download Summary ===");
    console.line(&format!(
        "Successfully processed {} files from {} items.",
        rows.len(),
        items.len()
    ));
    console.line(&format!("PDFs saved to: {}", destination.display()));
    console.line(&format!("Metadata file created: {}", csv_path.display()));

    info!("Download finished: {} rows, {} errors", rows.len(), errors.len());
    Ok(())
}

// One item, every failure contained: nothing from here may abort the run.
async fn process_item(
    archive: &IaClient,
    item_id: &str,
    destination: &Path,
    rows: &mut Vec<DownloadMetadataRow>,
    errors: &mut ErrorLog,
) {
    let metadata = match archive.metadata(item_id).await {
        Ok(metadata) => metadata,
        Err(e) => {
            debug!("Metadata fetch failed for {}: {}", item_id, e);
            errors.record(format!("Failed to get metadata for item: {}", item_id));
            return;
        }
    };

    if let Err(e) = fetch_item_pdfs(archive, item_id, destination, &metadata, rows).await {
        errors.record(format!("Failed to process item: {}. Error: {}", item_id, e));
    }
}

async fn fetch_item_pdfs(
    archive: &IaClient,
    item_id: &str,
    destination: &Path,
    metadata: &ItemMetadata,
    rows: &mut Vec<DownloadMetadataRow>,
) -> Result<(), ArchiveError> {
    archive.download(item_id, PDF_GLOB).await?;

    // The tool stages under ./<item_id>; nothing there means nothing matched.
    let staging = env::current_dir()?.join(item_id);
    if !staging.is_dir() {
        debug!("No staging directory for {}; nothing retrieved", item_id);
        return Ok(());
    }

    let moved = relocate_pdfs(&staging, destination, item_id, metadata, rows).await;
    // Best-effort cleanup even when relocation failed mid-item.
    let _ = fs::remove_dir_all(&staging).await;
    moved
}

async fn relocate_pdfs(
    staging: &Path,
    destination: &Path,
    item_id: &str,
    metadata: &ItemMetadata,
    rows: &mut Vec<DownloadMetadataRow>,
) -> Result<(), ArchiveError> {
    let mut names = Vec::new();
    let mut entries = fs::read_dir(staging).await?;
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if name.ends_with(".pdf") {
            names.push(name);
        }
    }
    names.sort();

    for name in names {
        let target = unique_destination(destination, &name);
        let file_name = target
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&name)
            .to_string();
        rows.push(DownloadMetadataRow {
            item_id: item_id.to_string(),
            file_name,
            title: metadata.metadata.title.clone(),
            creator: metadata.metadata.creator.clone(),
            publisher: metadata.metadata.publisher.clone(),
            date: metadata.metadata.date.clone(),
            subject: metadata.metadata.subject.clone(),
            language: metadata.metadata.language.clone(),
            description: metadata.metadata.description.clone(),
            call_number: metadata.metadata.call_number.clone(),
        });
        fs::rename(staging.join(&name), &target).await?;
    }
    Ok(())
}

/// Picks a collision-free path in `dir` for `name`, appending " (1)", " (2)",
/// ... before the extension until the name is unused. Never overwrites.
fn unique_destination(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if !candidate.exists() {
        return candidate;
    }

    let path_name = Path::new(name);
    let stem = path_name
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name);
    let extension = path_name.extension().and_then(|e| e.to_str());

    let mut index = 1;
    loop {
        let renamed = match extension {
            Some(ext) => format!("{} ({}).{}", stem, index, ext),
            None => format!("{} ({})", stem, index),
        };
        let next = dir.join(renamed);
        if !next.exists() {
            return next;
        }
        index += 1;
    }
}

/// Cleans a user-entered folder name: disallowed path characters, whitespace,
/// and control characters map to underscores, runs collapse to one, and
/// leading/trailing underscores are trimmed. May return an empty string.
pub fn sanitize_dir_name(raw: &str) -> String {
    let mut sanitized = String::new();
    let mut previous_underscore = false;

    for ch in raw.trim().chars() {
        let mapped = match ch {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_whitespace() || c.is_control() => '_',
            c => c,
        };

        if mapped == '_' {
            if !previous_underscore {
                sanitized.push('_');
                previous_underscore = true;
            }
        } else {
            sanitized.push(mapped);
            previous_underscore = false;
        }
    }

    sanitized.trim_matches('_').to_string()
}
