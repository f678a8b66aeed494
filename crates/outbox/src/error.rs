//! Relay errors.

use store::StoreError;
use thiserror::Error;

use crate::publisher::PublishError;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("publish error: {0}")]
    Publish(#[from] PublishError),
}
