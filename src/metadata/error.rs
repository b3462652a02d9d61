/// Failure while encoding or decoding run-level metadata
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    /// The metadata document is not valid JSON for the target type
    #[error("invalid metadata JSON: {0}")]
    Json(#[from] serde_json::Error),
}
