//! Orchestration engine.
//!
//! The engine is an explicit value: build it once, then `start` and `stop`
//! runs on it. Cloning yields another handle to the same engine.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use arbflow::adapter::notifier::{LogNotifier, NotifierRegistry};
//! use arbflow::adapter::predictor::SpreadPredictor;
//! use arbflow::adapter::store::MemoryStore;
//! use arbflow::application::OrchestrationEngine;
//! use arbflow::config::RunConfig;
//! use arbflow::domain::ExecutionMode;
//!
//! # async fn run() -> arbflow::Result<()> {
//! let mut notifiers = NotifierRegistry::new();
//! notifiers.register(Box::new(LogNotifier));
//!
//! let engine = OrchestrationEngine::new(
//!     Arc::new(SpreadPredictor::default()),
//!     notifiers,
//!     Arc::new(MemoryStore::new()),
//! );
//! engine.start(ExecutionMode::Local, RunConfig::default()).await?;
//! // engine.process(opportunity).await ...
//! let report = engine.stop(false).await;
//! # Ok(())
//! # }
//! ```

mod drain;
mod process;
mod status;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use tracing::{info, warn};

pub use drain::StopReport;
pub use process::Submitted;
pub use status::EngineStatus;

use crate::adapter::executor::build_executor;
use crate::adapter::notifier::NotifierRegistry;
use crate::application::limiter::ConcurrencyLimiter;
use crate::application::machine::TransactionStateMachine;
use crate::application::policy::{GlobalStopLoss, PolicyEngine, PolicyLimits};
use crate::config::{RunConfig, SandboxConfig};
use crate::domain::{ExecutionMode, OrchestrationStats, RunSummary};
use crate::error::{ProcessError, Result};
use crate::port::notifier::{Event, RunStartedEvent};
use crate::port::{ExchangeGateway, Predictor, StateSnapshot, Store};

/// Result of [`OrchestrationEngine::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    /// A run is already active; nothing changed.
    AlreadyRunning,
}

/// State for one run, shared by every worker of that run.
pub(crate) struct RunContext {
    mode: ExecutionMode,
    config: RunConfig,
    machine: TransactionStateMachine,
    limiter: ConcurrencyLimiter,
    started: Instant,
    started_at: DateTime<Utc>,
    admitted: AtomicU64,
    stopping: AtomicBool,
}

impl RunContext {
    /// Reserve one operation against the run bounds.
    fn reserve_operation(&self) -> std::result::Result<(), ProcessError> {
        if let Some(limit) = self.config.run_duration() {
            if self.started.elapsed() >= limit {
                return Err(ProcessError::RunLimitReached(format!(
                    "run duration of {}s elapsed",
                    limit.as_secs()
                )));
            }
        }
        let max = self.config.max_operations.unwrap_or(u64::MAX);
        self.admitted
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < max).then_some(n + 1)
            })
            .map(|_| ())
            .map_err(|_| ProcessError::RunLimitReached(format!("{max} operations admitted")))
    }

    fn release_operation(&self) {
        self.admitted.fetch_sub(1, Ordering::AcqRel);
    }
}

pub(crate) struct Inner {
    predictor: Arc<dyn Predictor>,
    gateway: Option<Arc<dyn ExchangeGateway>>,
    sandbox: SandboxConfig,
    notifiers: NotifierRegistry,
    store: Arc<dyn Store>,
    run: RwLock<Option<Arc<RunContext>>>,
    stats: Mutex<OrchestrationStats>,
    global_stop_loss: GlobalStopLoss,
    last_runtime: Mutex<Duration>,
}

impl Inner {
    fn current_run(&self) -> Option<Arc<RunContext>> {
        self.run.read().clone()
    }

    fn notify(&self, event: Event) {
        self.notifiers.notify_all(event);
    }
}

/// Runs arbitrage transactions from admission to settlement.
#[derive(Clone)]
pub struct OrchestrationEngine {
    inner: Arc<Inner>,
}

impl OrchestrationEngine {
    /// Create an engine. Nothing runs until [`start`](Self::start).
    #[must_use]
    pub fn new(
        predictor: Arc<dyn Predictor>,
        notifiers: NotifierRegistry,
        store: Arc<dyn Store>,
    ) -> Self {
        Self::with_parts(predictor, notifiers, store, None, SandboxConfig::default())
    }

    /// Create an engine with a live gateway for `REAL` runs.
    #[must_use]
    pub fn with_gateway(
        predictor: Arc<dyn Predictor>,
        notifiers: NotifierRegistry,
        store: Arc<dyn Store>,
        gateway: Arc<dyn ExchangeGateway>,
    ) -> Self {
        Self::with_parts(predictor, notifiers, store, Some(gateway), SandboxConfig::default())
    }

    /// Create an engine with every collaborator spelled out.
    #[must_use]
    pub fn with_parts(
        predictor: Arc<dyn Predictor>,
        notifiers: NotifierRegistry,
        store: Arc<dyn Store>,
        gateway: Option<Arc<dyn ExchangeGateway>>,
        sandbox: SandboxConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                predictor,
                gateway,
                sandbox,
                notifiers,
                store,
                run: RwLock::new(None),
                stats: Mutex::new(OrchestrationStats::new(Default::default())),
                global_stop_loss: GlobalStopLoss::new(),
                last_runtime: Mutex::new(Duration::ZERO),
            }),
        }
    }

    /// Start a run.
    ///
    /// The mode's executor is built once here. Counters resume from the
    /// store when it holds a snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the executor
    /// cannot be built (e.g. `REAL` without a gateway).
    pub async fn start(&self, mode: ExecutionMode, config: RunConfig) -> Result<StartOutcome> {
        if self.inner.run.read().is_some() {
            return Ok(StartOutcome::AlreadyRunning);
        }
        config.validate()?;

        let executor = build_executor(mode, &config, self.inner.gateway.as_ref(), &self.inner.sandbox)?;
        let policy = PolicyEngine::new(PolicyLimits::from(&config));

        let restored = match self.inner.store.load_state().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "Failed to load run state; starting fresh");
                None
            }
        };
        let resumed = restored.is_some();
        let stats = match restored {
            Some(snapshot) => {
                if snapshot.global_stop_loss_tripped {
                    self.inner.global_stop_loss.trip();
                }
                snapshot.stats
            }
            None => OrchestrationStats::new(config.initial_balance),
        };

        let run = Arc::new(RunContext {
            mode,
            machine: TransactionStateMachine::new(executor, policy),
            limiter: ConcurrencyLimiter::new(config.max_concurrent_operations),
            started: Instant::now(),
            started_at: Utc::now(),
            admitted: AtomicU64::new(0),
            stopping: AtomicBool::new(false),
            config,
        });

        {
            let mut slot = self.inner.run.write();
            if slot.is_some() {
                return Ok(StartOutcome::AlreadyRunning);
            }
            *self.inner.stats.lock() = stats.clone();
            *slot = Some(Arc::clone(&run));
        }

        info!(
            mode = %mode,
            balance = %stats.current_balance,
            max_concurrent = run.config.max_concurrent_operations,
            resumed,
            "Orchestration run started"
        );
        self.inner.notify(Event::RunStarted(RunStartedEvent {
            mode,
            balance: stats.current_balance,
            max_concurrent_operations: run.config.max_concurrent_operations,
            resumed,
        }));
        Ok(StartOutcome::Started)
    }

    /// Clear the sticky global stop-loss and persist the cleared state, so
    /// a restart does not trip it again.
    pub async fn reset_global_stop_loss(&self) {
        self.inner.global_stop_loss.reset();
        let snapshot = StateSnapshot::new(self.stats(), false);
        if let Err(e) = self.inner.store.save_state(&snapshot).await {
            warn!(error = %e, "Failed to persist global stop-loss reset");
        }
        info!("Global stop-loss reset");
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.inner
            .current_run()
            .is_some_and(|run| !run.stopping.load(Ordering::SeqCst))
    }

    /// Current counters.
    #[must_use]
    pub fn stats(&self) -> OrchestrationStats {
        self.inner.stats.lock().clone()
    }

    /// Derived figures for the current run, or the last one once stopped.
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        let runtime = match self.inner.current_run() {
            Some(run) => run.started.elapsed(),
            None => *self.inner.last_runtime.lock(),
        };
        self.inner.stats.lock().summary(runtime)
    }
}
