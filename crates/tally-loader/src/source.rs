//! State sources.

use std::future::Future;
use std::path::PathBuf;

use tally_types::State;

/// Error reported by a source for a single attempt.
pub type SourceError = Box<dyn std::error::Error + Send + Sync>;

/// Something that can produce the state at a given block.
///
/// Implementors provide the I/O. A failed attempt is retried by the loader,
/// so `fetch` should not retry on its own.
pub trait StateSource {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Fetch principal balances at `block`.
    fn fetch(&self, block: u64) -> impl Future<Output = Result<State, SourceError>> + Send;
}

/// Reads `<dir>/<block>.json`.
#[derive(Clone, Debug)]
pub struct FileSource {
    name: String,
    dir: PathBuf,
}

impl FileSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            name: dir.display().to_string(),
            dir,
        }
    }

    fn path(&self, block: u64) -> PathBuf {
        self.dir.join(format!("{block}.json"))
    }
}

impl StateSource for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(&self, block: u64) -> impl Future<Output = Result<State, SourceError>> + Send {
        let path = self.path(block);
        async move {
            let bytes = tokio::fs::read(&path).await?;
            let state: State = serde_json::from_slice(&bytes)?;
            Ok::<_, SourceError>(state)
        }
    }
}
