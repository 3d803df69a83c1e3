use thiserror::Error;

/// Failures that end the watch. Transient per-attempt errors stay inside the
/// query fallback and only surface here once every variant has failed.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("gpu lookup failed for {gpu_type_id:?}: {cause:#}")]
    QueryExhausted {
        gpu_type_id: String,
        cause: anyhow::Error,
    },

    #[error("network volume {volume_id:?} could not be resolved: {cause:#}")]
    ResolutionFailed {
        volume_id: String,
        cause: anyhow::Error,
    },
}
