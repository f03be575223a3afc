use std::path::PathBuf;
use std::process::Output;

use log::{debug, info};
use serde_json::Value;
use tokio::process::Command;

use crate::error::ArchiveError;
use crate::types::ItemMetadata;

/// Wrapper over the external `ia` binary. All remote access goes through it;
/// output is captured, never streamed to the terminal.
pub struct IaClient {
    binary: PathBuf,
}

impl IaClient {
    /// Locates `ia` on PATH and confirms it runs. Anything short of a clean
    /// `--version` exit means the tool is unusable.
    pub async fn detect() -> Result<Self, ArchiveError> {
        let binary = which::which("ia").map_err(|_| ArchiveError::CliMissing)?;
        let client = Self { binary };
        let probe = client
            .run(&["--version"])
            .await
            .map_err(|_| ArchiveError::CliMissing)?;
        if !probe.status.success() {
            return Err(ArchiveError::CliMissing);
        }
        info!(
            "Found ia {} at {}",
            String::from_utf8_lossy(&probe.stdout).trim(),
            client.binary.display()
        );
        Ok(client)
    }

    /// Runs `ia search <query> --itemlist` and returns the item ids in result
    /// order. The query is passed as a single argument so the service's own
    /// boolean/field grammar survives untouched.
    pub async fn search(&self, query: &str) -> Result<Vec<String>, ArchiveError> {
        let output = self.run(&["search", query, "--itemlist"]).await?;
        if !output.status.success() {
            return Err(command_error("search", &output.stderr));
        }
        Ok(parse_item_list(&String::from_utf8_lossy(&output.stdout)))
    }

    pub async fn metadata(&self, item_id: &str) -> Result<ItemMetadata, ArchiveError> {
        let output = self.run(&["metadata", item_id]).await?;
        if !output.status.success() {
            return Err(command_error("metadata", &output.stderr));
        }
        parse_metadata(&output.stdout)
    }

    /// Retrieves an item's matching files. The tool stages them under a
    /// subdirectory of the working directory named after the item id.
    pub async fn download(&self, item_id: &str, glob: &str) -> Result<(), ArchiveError> {
        let output = self
            .run(&["download", item_id, &format!("--glob={}", glob)])
            .await?;
        if !output.status.success() {
            return Err(command_error("download", &output.stderr));
        }
        Ok(())
    }

    async fn run(&self, args: &[&str]) -> Result<Output, ArchiveError> {
        debug!("Running {} {}", self.binary.display(), args.join(" "));
        let output = Command::new(&self.binary).args(args).output().await?;
        Ok(output)
    }
}

fn command_error(command: &'static str, stderr: &[u8]) -> ArchiveError {
    let stderr = String::from_utf8_lossy(stderr).trim().to_string();
    let stderr = if stderr.is_empty() {
        "no error output".to_string()
    } else {
        stderr
    };
    ArchiveError::CommandError { command, stderr }
}

fn parse_item_list(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

// `ia metadata` prints `{}` for unknown items; an empty document counts as a
// failed lookup, the same as malformed JSON.
fn parse_metadata(raw: &[u8]) -> Result<ItemMetadata, ArchiveError> {
    let value: Value = serde_json::from_slice(raw)?;
    let populated = value
        .as_object()
        .map(|fields| !fields.is_empty())
        .unwrap_or(false);
    if !populated {
        return Err(ArchiveError::EmptyMetadata);
    }
    Ok(serde_json::from_value(value)?)
}
