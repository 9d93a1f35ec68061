//! Persistence through the engine with the SQLite store.

use std::sync::Arc;

use arbflow::adapter::notifier::{NotifierRegistry, NullNotifier};
use arbflow::adapter::store::{self, SqliteStore};
use arbflow::application::OrchestrationEngine;
use arbflow::config::StoreConfig;
use arbflow::domain::{Decision, ExecutionMode, OutcomeCode};
use arbflow::port::Store;
use arbflow::testkit::predictor::ScriptedPredictor;
use arbflow::testkit::{config, domain};
use rust_decimal_macros::dec;

fn engine_with(predictor: ScriptedPredictor, store: Arc<SqliteStore>) -> OrchestrationEngine {
    OrchestrationEngine::new(
        Arc::new(predictor),
        NotifierRegistry::new().with(Box::new(NullNotifier)),
        store,
    )
}

fn engine(store: Arc<SqliteStore>) -> OrchestrationEngine {
    engine_with(ScriptedPredictor::approving(dec!(4)), store)
}

#[tokio::test]
async fn finished_operations_and_state_are_written() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SqliteStore::open(dir.path().join("arbflow.db")).unwrap());
    let predictor = ScriptedPredictor::declining();
    predictor.push(Ok(Decision::new(true, 0.9, dec!(4), 0.9, 0.1, "go")));
    let engine = engine_with(predictor, Arc::clone(&store));
    engine.start(ExecutionMode::Local, config::run()).await.unwrap();

    let executed = engine.process(domain::profitable()).await.unwrap();
    let rejected = engine.process(domain::profitable()).await.unwrap();
    engine.stop(false).await.unwrap();

    assert_eq!(store.operation_count().unwrap(), 2);
    let records = store.recent_operations(10).unwrap();
    let by_id = |id: String| records.iter().find(|r| r.id == id).unwrap().clone();

    let ok = by_id(executed.id().to_string());
    assert_eq!(ok.outcome, Some(OutcomeCode::Executed));
    assert_eq!(ok.state, "COMPLETED");
    assert_eq!(ok.profit_loss, dec!(4));
    assert!(ok.detail["steps"].as_array().unwrap().len() >= 5);

    let no = by_id(rejected.id().to_string());
    assert_eq!(no.outcome, Some(OutcomeCode::RejectedByPredictor));
    assert!(no.failure_reason.is_some());

    let state = store.load_state().await.unwrap().unwrap();
    assert_eq!(state.stats.total_operations, 2);
    assert_eq!(state.stats.successful_operations, 1);
}

#[tokio::test]
async fn reopening_the_file_resumes_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("resume.db");

    {
        let store = Arc::new(SqliteStore::open(&path).unwrap());
        let engine = engine(store);
        engine.start(ExecutionMode::Local, config::run()).await.unwrap();
        engine.process(domain::profitable()).await.unwrap();
        engine.stop(false).await.unwrap();
    }

    let store = Arc::new(SqliteStore::open(&path).unwrap());
    let engine = engine(store);
    engine.start(ExecutionMode::Local, config::run()).await.unwrap();
    assert_eq!(engine.stats().total_operations, 1);
    assert_eq!(engine.stats().current_balance, dec!(10004));
}

#[test]
fn store_selection_follows_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chosen.db");
    let config = StoreConfig {
        path: Some(path.to_string_lossy().into_owned()),
    };
    store::from_config(&config).unwrap();
    assert!(path.exists());

    store::from_config(&StoreConfig::default()).unwrap();
}
