//! Projection errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("failed to decode event payload: {0}")]
    Decode(#[from] serde_json::Error),
}
