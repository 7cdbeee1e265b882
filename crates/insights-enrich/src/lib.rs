//! Concurrent enrichment pipeline and aggregation stages
//!
//! Stage 1 runs one provider call per extracted document under a bounded
//! concurrency limit, substituting deterministic fallbacks for failed
//! units so the result mapping is always complete. Stage 2 fans in over
//! the full Stage-1 output to produce cross-sheet insights, and Stage 3
//! fans in over Stages 1 and 2 to produce the deeper layer. No error in
//! any stage aborts the run; degraded stages return their sentinels.

pub mod aggregate;
pub mod engine;
pub mod pipeline;
pub mod prompts;
pub mod provider;

pub use aggregate::{deepen, summarize};
pub use engine::InsightEngine;
pub use pipeline::EnrichmentPipeline;
pub use provider::{
    decode_string_list, ChatCompletionsProvider, GenerationConstraints, InsightProvider,
    RetryPolicy,
};

/// Error types for enrichment operations.
///
/// All of these are absorbed at the pipeline boundary and converted into
/// fallbacks or sentinels; none propagates out of a stage.
#[derive(Debug, thiserror::Error)]
pub enum EnrichmentError {
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Enrichment call timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),
}

impl EnrichmentError {
    /// Transient faults are worth retrying at the adapter; malformed
    /// content is not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Provider(_) | Self::Timeout(_) => true,
            Self::MalformedResponse(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, EnrichmentError>;
