mod archive;
mod cli;
mod download;
mod error;
mod report;
mod size_check;
mod types;
mod ui;

use std::env;
use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::{error, info};

use archive::IaClient;
use cli::Cli;
use error::ArchiveError;
use types::ErrorLog;
use ui::{build_console, Console};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    info!("Starting Internet Archive downloader");

    let cli = Cli::parse();
    let console = build_console(cli.plain);

    let outcome = tokio::select! {
        outcome = run(console.as_ref()) => outcome,
        _ = tokio::signal::ctrl_c() => {
            // A prompt may still hold a blocking stdin read; exit directly so
            // runtime shutdown does not wait on it.
            console.notice("\nOperation cancelled by user.");
            let _ = std::io::stdout().flush();
            std::process::exit(0);
        }
    };

    match outcome {
        Ok(()) => {
            console.heading("\nFinished.");
            Ok(())
        }
        Err(e) => {
            error!("Run failed: {}", e);
            report_failure(console.as_ref(), &e);
            Err(e.into())
        }
    }
}

async fn run(console: &dyn Console) -> Result<(), ArchiveError> {
    let archive = IaClient::detect().await?;

    console.heading("=== Internet Archive Downloader ===");
    console.line("");
    console.notice("Examples of search queries:");
    console.line("  title:(\"Statutes of the Province of Ontario\") AND collection:(ontario_council_university_libraries)");
    console.line("  creator:\"Ontario\" AND mediatype:texts");
    console.line("  collection:americana AND date:[1800 TO 1900]");
    console.line("");

    let query = prompt_query(console).await?;

    console.notice("\nSearching Internet Archive...");
    let items = archive.search(&query).await?;
    if items.is_empty() {
        return Err(ArchiveError::NoResults(query));
    }
    console.status(&format!("Found {} items matching your search.", items.len()));

    let mut errors = ErrorLog::default();
    match prompt_action(console).await? {
        Action::SizeCheck => size_check::run(console, &archive, &query, &items, &mut errors).await,
        Action::Download => {
            let destination = prompt_destination(console).await?;
            download::run(console, &archive, &query, &items, &destination, &mut errors).await
        }
    }
}

enum Action {
    SizeCheck,
    Download,
}

async fn prompt_query(console: &dyn Console) -> Result<String, ArchiveError> {
    loop {
        let query = console
            .prompt("Enter your Internet Archive search query")
            .await?;
        if !query.is_empty() {
            return Ok(query);
        }
        console.alert("Please enter a valid search query.");
    }
}

async fn prompt_action(console: &dyn Console) -> Result<Action, ArchiveError> {
    console.notice("\nChoose an action:");
    console.line("1. Check total PDF file size only");
    console.line("2. Download PDFs and create metadata CSV");
    console.line("");

    loop {
        match console.prompt("Enter your choice (1 or 2)").await?.as_str() {
            "1" => return Ok(Action::SizeCheck),
            "2" => return Ok(Action::Download),
            _ => console.alert("Please enter 1 or 2."),
        }
    }
}

async fn prompt_destination(console: &dyn Console) -> Result<PathBuf, ArchiveError> {
    console.notice("\nDownload Directory Options:");
    console.line("  - Press Enter to download to current directory");
    console.line("  - Or enter a folder name to create/use a subdirectory");
    console.line("");

    let raw = console
        .prompt("Enter download directory name (or press Enter for current directory)")
        .await?;
    let name = download::sanitize_dir_name(&raw);
    if name.is_empty() {
        return Ok(env::current_dir()?);
    }

    let path = env::current_dir()?.join(name);
    if path.is_dir() {
        return Ok(path);
    }
    match tokio::fs::create_dir_all(&path).await {
        Ok(()) => {
            console.status(&format!("Created directory: {}", path.display()));
            Ok(path)
        }
        Err(e) => {
            console.alert(&format!("Error creating directory '{}': {}", path.display(), e));
            console.notice("Using current directory instead.");
            Ok(env::current_dir()?)
        }
    }
}

fn report_failure(console: &dyn Console, e: &ArchiveError) {
    match e {
        ArchiveError::CliMissing => {
            console.alert("Error: The Internet Archive CLI tool ('ia') is not installed or not in your PATH.");
            console.notice("Please install it by running: pip install internetarchive");
        }
        ArchiveError::NoResults(query) => {
            console.alert(&format!("No items found for the search query: {}", query));
            console.alert("Please check your search syntax and try again.");
        }
        ArchiveError::CommandError { command: "search", .. } => {
            console.alert(&format!("\nError searching Internet Archive: {}", e));
        }
        _ => {
            console.alert(&format!("\nAn unexpected error occurred: {}", e));
        }
    }
}
