#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use arbflow::adapter::notifier::NotifierRegistry;
use arbflow::adapter::store::MemoryStore;
use arbflow::application::OrchestrationEngine;
use arbflow::domain::TransactionState;
use arbflow::port::{ExchangeGateway, Predictor};
use arbflow::testkit::gateway::MockGateway;
use arbflow::testkit::notifier::RecordingNotifier;

/// Engine plus handles on its collaborators.
pub struct Harness {
    pub engine: OrchestrationEngine,
    pub notifier: RecordingNotifier,
    pub store: Arc<MemoryStore>,
}

fn build(
    predictor: Arc<dyn Predictor>,
    store: Arc<MemoryStore>,
    gateway: Option<Arc<dyn ExchangeGateway>>,
) -> Harness {
    let notifier = RecordingNotifier::new();
    let registry = NotifierRegistry::new().with(Box::new(notifier.clone()));
    let engine = match gateway {
        Some(gateway) => {
            OrchestrationEngine::with_gateway(predictor, registry, store.clone(), gateway)
        }
        None => OrchestrationEngine::new(predictor, registry, store.clone()),
    };
    Harness {
        engine,
        notifier,
        store,
    }
}

/// Engine without a live gateway; LOCAL runs only.
pub fn local(predictor: Arc<dyn Predictor>) -> Harness {
    build(predictor, Arc::new(MemoryStore::new()), None)
}

/// Engine with `gateway` for REAL runs.
pub fn real(predictor: Arc<dyn Predictor>, gateway: Arc<MockGateway>) -> Harness {
    build(predictor, Arc::new(MemoryStore::new()), Some(gateway))
}

/// Engine over an existing store.
pub fn with_store(predictor: Arc<dyn Predictor>, store: Arc<MemoryStore>) -> Harness {
    build(predictor, store, None)
}

/// Poll until some in-flight transaction reports `state`.
pub async fn wait_for_state(engine: &OrchestrationEngine, state: TransactionState) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if engine.status().active.iter().any(|view| view.state == state) {
            return;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "no transaction reached {state}"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
