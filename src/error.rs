use std::path::PathBuf;

use thiserror::Error;

/// Fatal conditions that short-circuit a scan before any findings are produced.
///
/// Everything else (per-blob I/O failures, per-task panics, metadata-extractor
/// errors) is swallowed at the orchestrator boundary and logged instead of
/// surfaced here.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("repository path does not exist: {0}")]
    RepoPathMissing(PathBuf),

    #[error("rule config {path} could not be read: {source}")]
    RuleFileUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("rule config {path} is not valid JSON: {source}")]
    RuleFileMalformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
