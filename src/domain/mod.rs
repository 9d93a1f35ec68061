//! Exchange-agnostic domain types.

pub mod error;

mod decision;
mod id;
mod mode;
mod money;
mod opportunity;
mod outcome;
mod stats;
mod transaction;

pub use decision::{Decision, DecisionPayload, FeatureSnapshot, FeatureValue};
pub use id::{Symbol, TransactionId, VenueId};
pub use mode::ExecutionMode;
pub use money::{floor_quantity, percent_of, Amount, Price, Quantity, Rate, QUANTITY_SCALE};
pub use opportunity::{Opportunity, OpportunityBuildError, OpportunityBuilder};
pub use outcome::OutcomeCode;
pub use stats::{OrchestrationStats, RunSummary};
pub use transaction::{
    LegLedger, ResidualPosition, StepRecord, Transaction, TransactionState, TransactionView,
};
