//! Scriptable in-memory exchange.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::domain::{floor_quantity, Amount, Price, Rate, Symbol, VenueId};
use crate::error::GatewayError;
use crate::port::{ExchangeGateway, OrderFill, OrderSide, Quote, WithdrawReceipt};

/// In-memory gateway with per-venue quotes.
///
/// Buys fill at the venue ask, sells at the venue bid. Fees are charged
/// on notional at `fee_rate`; withdrawals charge `withdrawal_fee` in the
/// withdrawn currency. Calls are logged as `"op:venue"` strings, and
/// order and withdrawal amounts alongside them.
pub struct MockGateway {
    quotes: Mutex<HashMap<VenueId, Quote>>,
    balances: Mutex<HashMap<VenueId, Amount>>,
    fee_rate: Rate,
    withdrawal_fee: Amount,
    fill_ratio: Mutex<Decimal>,
    hang_withdrawals: AtomicBool,
    fail_next_order: Mutex<Option<GatewayError>>,
    calls: Mutex<Vec<String>>,
    amounts: Mutex<Vec<(String, Amount)>>,
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGateway {
    /// Fee-free gateway with ample balance everywhere.
    pub fn new() -> Self {
        Self {
            quotes: Mutex::new(HashMap::new()),
            balances: Mutex::new(HashMap::new()),
            fee_rate: Decimal::ZERO,
            withdrawal_fee: Decimal::ZERO,
            fill_ratio: Mutex::new(Decimal::ONE),
            hang_withdrawals: AtomicBool::new(false),
            fail_next_order: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            amounts: Mutex::new(Vec::new()),
        }
    }

    /// Two-venue setup: buy venue asks `ask`, sell venue bids `bid`.
    pub fn two_venues(buy_venue: &str, ask: Price, sell_venue: &str, bid: Price) -> Self {
        let gateway = Self::new();
        gateway.set_quote(buy_venue, ask - dec!(0.01), ask);
        gateway.set_quote(sell_venue, bid, bid + dec!(0.01));
        gateway
    }

    #[must_use]
    pub fn with_fees(mut self, fee_rate: Rate, withdrawal_fee: Amount) -> Self {
        self.fee_rate = fee_rate;
        self.withdrawal_fee = withdrawal_fee;
        self
    }

    pub fn set_quote(&self, venue: &str, bid: Price, ask: Price) {
        self.quotes
            .lock()
            .insert(VenueId::from(venue), Quote { bid, ask });
    }

    pub fn set_balance(&self, venue: &str, amount: Amount) {
        self.balances.lock().insert(VenueId::from(venue), amount);
    }

    /// Fraction of each order that fills.
    pub fn set_fill_ratio(&self, ratio: Decimal) {
        *self.fill_ratio.lock() = ratio;
    }

    /// Make every withdrawal wait forever.
    pub fn hang_withdrawals(&self, hang: bool) {
        self.hang_withdrawals.store(hang, Ordering::SeqCst);
    }

    /// Fail the next market order with `error`.
    pub fn fail_next_order(&self, error: GatewayError) {
        *self.fail_next_order.lock() = Some(error);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Amounts passed to `call` (an `"op:venue"` string), in call order.
    pub fn amounts(&self, call: &str) -> Vec<Amount> {
        self.amounts
            .lock()
            .iter()
            .filter(|(logged, _)| logged == call)
            .map(|(_, amount)| *amount)
            .collect()
    }

    fn log(&self, op: &str, venue: &VenueId) {
        self.calls.lock().push(format!("{op}:{venue}"));
    }

    fn log_amount(&self, op: &str, venue: &VenueId, amount: Amount) {
        self.log(op, venue);
        self.amounts.lock().push((format!("{op}:{venue}"), amount));
    }

    fn quote(&self, venue: &VenueId) -> Result<Quote, GatewayError> {
        self.quotes
            .lock()
            .get(venue)
            .copied()
            .ok_or_else(|| GatewayError::Exchange(format!("no market at {venue}")))
    }
}

#[async_trait]
impl ExchangeGateway for MockGateway {
    async fn get_price(&self, venue: &VenueId, _symbol: &Symbol) -> Result<Quote, GatewayError> {
        self.log("price", venue);
        self.quote(venue)
    }

    async fn get_balance(&self, venue: &VenueId) -> Result<Amount, GatewayError> {
        self.log("balance", venue);
        Ok(self
            .balances
            .lock()
            .get(venue)
            .copied()
            .unwrap_or(dec!(1000000)))
    }

    async fn place_market_order(
        &self,
        venue: &VenueId,
        _symbol: &Symbol,
        side: OrderSide,
        amount: Amount,
    ) -> Result<OrderFill, GatewayError> {
        self.log_amount(&format!("order_{side}"), venue, amount);
        if let Some(error) = self.fail_next_order.lock().take() {
            return Err(error);
        }
        let quote = self.quote(venue)?;
        let ratio = *self.fill_ratio.lock();

        let (price, filled) = match side {
            OrderSide::Buy => {
                let spend = amount * ratio;
                let gross = spend / (quote.ask * (Decimal::ONE + self.fee_rate));
                (quote.ask, floor_quantity(gross))
            }
            OrderSide::Sell => (quote.bid, floor_quantity(amount * ratio)),
        };
        Ok(OrderFill {
            filled_amount: filled,
            avg_price: price,
            fee: filled * price * self.fee_rate,
        })
    }

    async fn withdraw(
        &self,
        venue: &VenueId,
        _currency: &str,
        amount: Amount,
        _destination: &VenueId,
    ) -> Result<WithdrawReceipt, GatewayError> {
        self.log_amount("withdraw", venue, amount);
        if self.hang_withdrawals.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        Ok(WithdrawReceipt {
            fee: self.withdrawal_fee,
        })
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
