use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::warn;

use super::FeedRecord;

/// Trait that every game-data source must implement.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Return every record currently available, oldest first.
    async fn fetch_records(&self) -> Result<Vec<FeedRecord>>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}

/// Reads one JSON `FeedRecord` per line. The file is re-read on every fetch,
/// so an external writer can keep appending while the monitor polls it.
pub struct JsonlFileSource {
    path: PathBuf,
    name: String,
}

impl JsonlFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = format!("jsonl:{}", path.display());
        JsonlFileSource { path, name }
    }
}

/// Parse a JSON-lines body, skipping blank and malformed lines.
pub fn parse_records(body: &str, origin: &str) -> Vec<FeedRecord> {
    body.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(i, line)| match serde_json::from_str::<FeedRecord>(line) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("{}: skipping malformed line {}: {}", origin, i + 1, e);
                None
            }
        })
        .collect()
}

#[async_trait]
impl SnapshotSource for JsonlFileSource {
    async fn fetch_records(&self) -> Result<Vec<FeedRecord>> {
        let body = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("reading feed {}", self.path.display()))?;
        Ok(parse_records(&body, &self.name))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
