//! Gate behavior across ranges of inputs.

use arbflow::application::{PolicyEngine, PolicyLimits, PreCheck};
use arbflow::config::{InvestmentConfig, InvestmentMode, RunConfig};
use arbflow::domain::{Decision, OutcomeCode};
use arbflow::error::ProcessError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn approve(profit: Decimal) -> Decision {
    Decision::new(true, 0.8, profit, 0.8, 0.2, "test")
}

#[test]
fn stop_loss_is_monotonic_in_profit() {
    let investment = dec!(100);
    let mut previous = true;
    let mut pl = dec!(-10);
    while pl <= dec!(10) {
        let breached = PolicyEngine::check_stop_loss(pl, investment, dec!(2));
        // once a profit level clears the stop, every higher one does too
        assert!(previous || !breached, "non-monotonic at {pl}");
        previous = breached;
        pl += dec!(0.25);
    }
    assert!(PolicyEngine::check_stop_loss(dec!(-2.01), investment, dec!(2)));
    assert!(!PolicyEngine::check_stop_loss(dec!(-2), investment, dec!(2)));
}

#[test]
fn pre_check_order_puts_stop_loss_before_take_profit() {
    let run = RunConfig {
        take_profit_pct: Some(dec!(-50)),
        ..RunConfig::default()
    };
    let policy = PolicyEngine::new(PolicyLimits::from(&run));
    // -5 meets the (odd) take-profit but breaches the 2% stop first
    match policy.pre_check(&approve(dec!(-5)), dec!(100)) {
        PreCheck::Reject { outcome, .. } => assert_eq!(outcome, OutcomeCode::RejectedSl),
        other => panic!("expected stop-loss rejection, got {other:?}"),
    }
}

#[test]
fn percentage_sizing_scales_with_balance_and_caps() {
    let run = RunConfig {
        investment: InvestmentConfig {
            mode: InvestmentMode::Percentage,
            amount: dec!(10),
        },
        ..RunConfig::default()
    };
    let policy = PolicyEngine::new(PolicyLimits::from(&run));
    assert_eq!(policy.size_investment(dec!(10000)).unwrap(), dec!(1000));
    assert_eq!(policy.size_investment(dec!(500)).unwrap(), dec!(50));
    assert!(matches!(
        policy.size_investment(dec!(50)),
        Err(ProcessError::InvestmentTooSmall { .. })
    ));
}
