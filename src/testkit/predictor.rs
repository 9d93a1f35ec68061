//! Predictors with canned answers.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;

use crate::domain::{Decision, FeatureSnapshot};
use crate::error::PredictorError;
use crate::port::Predictor;

/// Returns queued responses in order, then the fallback.
pub struct ScriptedPredictor {
    queue: Mutex<VecDeque<Result<Decision, PredictorError>>>,
    fallback: Decision,
    calls: AtomicUsize,
    seen: Mutex<Vec<FeatureSnapshot>>,
}

impl ScriptedPredictor {
    /// Always approve with the given predicted profit.
    pub fn approving(predicted_profit: Decimal) -> Self {
        Self::with_fallback(Decision::new(
            true,
            0.9,
            predicted_profit,
            0.9,
            0.1,
            "scripted approval",
        ))
    }

    /// Always decline.
    pub fn declining() -> Self {
        Self::with_fallback(Decision::new(
            false,
            0.9,
            Decimal::ZERO,
            0.1,
            0.9,
            "scripted decline",
        ))
    }

    pub fn with_fallback(fallback: Decision) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            fallback,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Queue a one-off response ahead of the fallback.
    pub fn push(&self, response: Result<Decision, PredictorError>) {
        self.queue.lock().push_back(response);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Feature snapshots received so far.
    pub fn seen(&self) -> Vec<FeatureSnapshot> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl Predictor for ScriptedPredictor {
    async fn predict(&self, features: &FeatureSnapshot) -> Result<Decision, PredictorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().push(features.clone());
        self.queue
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(self.fallback.clone()))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
