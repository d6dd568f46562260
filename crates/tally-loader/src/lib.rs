//! # tally-loader
//!
//! Fetches a [`tally_types::State`] from several redundant sources and only
//! trusts it when enough of them agree.
//!
//! The actual I/O is behind the [`StateSource`] trait so the quorum logic can
//! be exercised without a network. [`FileSource`] reads snapshots exported
//! to disk.
//!
//! ## Modules
//!
//! - [`source`] — the source trait and the file-backed source
//! - [`quorum`] — concurrent fetch, retries and agreement

pub mod quorum;
pub mod source;

pub use quorum::{load, LoaderConfig};
pub use source::{FileSource, SourceError, StateSource};

/// Error types for state loading.
#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    /// Too few sources returned the same state.
    #[error("quorum not met: {agreeing} of {sources} sources agree, {required} required")]
    QuorumNotMet {
        /// Configured quorum.
        required: usize,
        /// Size of the largest agreeing group.
        agreeing: usize,
        /// Number of sources queried.
        sources: usize,
    },

    /// A source kept failing after every retry.
    #[error("source {source_name} failed after {attempts} attempts: {reason}")]
    UpstreamTransport {
        /// Name of the failing source.
        source_name: String,
        /// Attempts made.
        attempts: u32,
        /// Last error reported by the source.
        reason: String,
    },

    /// The loader configuration is unusable.
    #[error("invalid loader config: {0}")]
    InvalidConfig(String),
}

/// Convenience result type for state loading.
pub type Result<T> = std::result::Result<T, LoaderError>;
