//! Handler for the `run` command.
//!
//! Reads one JSON opportunity per stdin line and processes each
//! concurrently. On EOF or Ctrl-C the engine drains and the run summary
//! is printed to stdout as JSON.

use std::future::Future;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::adapter::notifier::{LogNotifier, NotifierRegistry};
use crate::adapter::predictor::SpreadPredictor;
use crate::adapter::store;
use crate::application::{OrchestrationEngine, StartOutcome};
use crate::cli::RunArgs;
use crate::config::Config;
use crate::domain::{ExecutionMode, Opportunity, RunSummary};
use crate::error::Result;

/// Execute the run command.
pub async fn execute(args: &RunArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::parse_toml("")?,
    };
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    if args.json_logs {
        config.logging.format = "json".to_string();
    }
    config.init_logging();

    let mode = ExecutionMode::from(args.mode);
    let store = store::from_config(&config.store)?;
    let notifiers = NotifierRegistry::new().with(Box::new(LogNotifier));
    let engine = OrchestrationEngine::with_parts(
        Arc::new(SpreadPredictor::default()),
        notifiers,
        store,
        None,
        config.sandbox.clone(),
    );

    if engine.start(mode, config.run.clone()).await? == StartOutcome::AlreadyRunning {
        warn!("Engine already running");
    }
    info!(mode = %mode, "arbflow started; reading opportunities from stdin");

    let input = BufReader::new(tokio::io::stdin());
    let shutdown = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };
    let summary = serve(&engine, input, shutdown, args.force_stop).await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    info!("arbflow stopped");
    Ok(())
}

/// Feed `input` to the engine until EOF or `shutdown`, then stop it.
///
/// The engine is stopped before the in-flight tasks are joined, so the
/// drain deadline bounds how long shutdown takes.
async fn serve<R, S>(
    engine: &OrchestrationEngine,
    input: R,
    shutdown: S,
    force: bool,
) -> Result<RunSummary>
where
    R: AsyncBufRead + Unpin,
    S: Future<Output = ()>,
{
    let mut tasks = JoinSet::new();
    tokio::select! {
        result = feed(engine, input, &mut tasks) => result?,
        () = shutdown => {
            info!("Shutdown signal received");
        }
    }

    let summary = match engine.stop(force).await {
        Some(report) => report.summary,
        None => engine.summary(),
    };
    while tasks.join_next().await.is_some() {}
    Ok(summary)
}

async fn feed<R>(engine: &OrchestrationEngine, input: R, tasks: &mut JoinSet<()>) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let opportunity: Opportunity = match serde_json::from_str(line) {
            Ok(opportunity) => opportunity,
            Err(e) => {
                warn!(error = %e, "Skipping malformed opportunity");
                continue;
            }
        };
        // admit here, not in the task, so a stop right after EOF drains it
        match engine.submit(opportunity) {
            Ok(submitted) => {
                tasks.spawn(async move {
                    match submitted.wait().await {
                        Ok(tx) => {
                            debug!(tx_id = %tx.id(), state = %tx.state(), "Operation finished");
                        }
                        Err(e) => warn!(error = %e, "Operation not settled"),
                    }
                });
            }
            Err(e) => warn!(error = %e, "Opportunity not processed"),
        }
    }
    debug!(pending = tasks.len(), "Input exhausted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rust_decimal_macros::dec;

    use super::*;
    use crate::adapter::store::MemoryStore;
    use crate::config::RunConfig;
    use crate::testkit::gateway::MockGateway;
    use crate::testkit::predictor::ScriptedPredictor;
    use crate::testkit::{config, domain};

    fn line(opportunity: &Opportunity) -> String {
        format!("{}\n", serde_json::to_string(opportunity).unwrap())
    }

    #[tokio::test]
    async fn eof_stops_within_the_drain_deadline() {
        let gateway = Arc::new(MockGateway::two_venues(
            domain::BUY_VENUE,
            dec!(100),
            domain::SELL_VENUE,
            dec!(104),
        ));
        gateway.hang_withdrawals(true);
        let engine = OrchestrationEngine::with_gateway(
            Arc::new(ScriptedPredictor::approving(dec!(4))),
            NotifierRegistry::new(),
            Arc::new(MemoryStore::new()),
            gateway,
        );
        let run = RunConfig {
            drain_timeout_ms: 200,
            ..config::run()
        };
        engine.start(ExecutionMode::Real, run).await.unwrap();

        let input = line(&domain::profitable());
        let summary = tokio::time::timeout(
            Duration::from_secs(5),
            serve(&engine, input.as_bytes(), std::future::pending(), false),
        )
        .await
        .expect("shutdown must not wait on the stuck transfer")
        .unwrap();

        assert_eq!(summary.total_operations, 1);
        assert_eq!(summary.failed_operations, 1);
        assert!(!engine.is_running());
    }

    #[tokio::test]
    async fn malformed_lines_are_skipped() {
        let engine = OrchestrationEngine::new(
            Arc::new(ScriptedPredictor::approving(dec!(4))),
            NotifierRegistry::new(),
            Arc::new(MemoryStore::new()),
        );
        engine.start(ExecutionMode::Local, config::run()).await.unwrap();

        let input = format!("not json\n\n{}", line(&domain::profitable()));
        let summary = serve(&engine, input.as_bytes(), std::future::pending(), false)
            .await
            .unwrap();

        assert_eq!(summary.total_operations, 1);
        assert_eq!(summary.successful_operations, 1);
    }
}
