//! Predictor port.

use async_trait::async_trait;

use crate::domain::{Decision, FeatureSnapshot};
use crate::error::PredictorError;

/// Scores an opportunity before any leg runs.
///
/// An untrained predictor must return a declining decision (see
/// [`Decision::degraded`]) rather than an error. Errors are still
/// tolerated: the engine maps them to a declining decision.
#[async_trait]
pub trait Predictor: Send + Sync {
    async fn predict(&self, features: &FeatureSnapshot) -> Result<Decision, PredictorError>;

    /// Predictor name for logging.
    fn name(&self) -> &'static str;
}
