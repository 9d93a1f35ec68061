//! Application layer: policy, leg sequencing, admission and the engine.

pub mod limiter;
pub mod machine;
pub mod orchestration;
pub mod policy;

pub use limiter::ConcurrencyLimiter;
pub use machine::TransactionStateMachine;
pub use orchestration::{EngineStatus, OrchestrationEngine, StartOutcome, StopReport, Submitted};
pub use policy::{GlobalStopLoss, PolicyEngine, PolicyLimits, PostCheck, PreCheck};
