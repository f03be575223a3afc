use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("the 'ia' command was not found on PATH")]
    CliMissing,

    #[error("ia {command} failed: {stderr}")]
    CommandError {
        command: &'static str,
        stderr: String,
    },

    #[error("No items found for the search query: {0}")]
    NoResults(String),

    #[error("item returned an empty metadata record")]
    EmptyMetadata,

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}
