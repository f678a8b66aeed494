//! Core projection trait.

use async_trait::async_trait;
use store::StagedEvent;

use crate::Result;

/// A consumer that folds broker events into a read model.
///
/// Events arrive at-least-once, so `apply` must be idempotent: applying the
/// same event twice leaves the read model exactly as applying it once.
#[async_trait]
pub trait Projection: Send + Sync {
    /// Returns the name of this projection, used in logs.
    fn name(&self) -> &'static str;

    /// Applies a single event to the read model.
    async fn apply(&self, event: &StagedEvent) -> Result<()>;
}
