//! The reserve: an agent that is also the market it trades on. Grounded on
//! `holofuel/model/trading/reserve.py`. The Python original achieves this
//! with a `reserve(market, agent)` class that inherits both and overrides
//! `market.execute`; Rust composition replaces that with a non-owning
//! [`Market::set_reserve`] handle plus [`Agent::after_market_execute`] (see
//! Design Note "Cyclic ownership" in spec.md §9).

use crate::agent::{Agent, AgentCore};
use crate::error::SimError;
use crate::exchange::Exchange;
use crate::market::Market;
use crate::order::Order;
use crate::types::{AgentId, Price, Symbol};
use rustc_hash::FxHashSet;
use std::collections::BTreeMap;

/// Price (in tenths of a cent, to give it a total order) → quantity still
/// willing to be bought back at that price.
#[derive(Clone, Debug, Default)]
pub struct Ladder(pub BTreeMap<u64, f64>);

fn price_key(price: f64) -> u64 {
    (price * 10_000.0).round() as u64
}

impl Ladder {
    pub fn insert(&mut self, price: f64, amount: f64) {
        self.0.insert(price_key(price), amount);
    }

    fn rungs(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.0.iter().map(|(&k, &v)| (k as f64 / 10_000.0, v))
    }
}

/// An agent that is both a buyer of last resort on its own market (a tiered
/// buy-back ladder, `reserves`) and that market's reserve: its orders never
/// count as outside liquidity for the purpose of book-level matching rules,
/// only as a floor.
pub struct ReserveAgent {
    pub core: AgentCore,
    pub security: Symbol,
    pub reserves: Ladder,
    /// When set, only these agents may sell into the reserve's buy ladder —
    /// a "hosts-only" buy-back restriction (spec.md §8 scenario 3). `None`
    /// means every counterparty is accepted, the base `reserve`'s behavior.
    pub hosts_only: Option<FxHashSet<AgentId>>,
}

impl ReserveAgent {
    pub fn new(identity: impl Into<String>, start: f64, quanta: f64, security: impl Into<Symbol>) -> Self {
        ReserveAgent {
            core: AgentCore::new(identity, start, quanta),
            security: security.into(),
            reserves: Ladder::default(),
            hosts_only: None,
        }
    }

    pub fn with_hosts_only(mut self, hosts: impl IntoIterator<Item = AgentId>) -> Self {
        self.hosts_only = Some(hosts.into_iter().collect());
        self
    }

    /// Posts a buy order for every remaining tranche under the reserve's own
    /// identity, after closing whatever it had resting before.
    fn post_ladder(&mut self, market: &mut Market, now: f64) -> Result<(), SimError> {
        market.close(self.core.id, Some(&self.security))?;
        let rungs: Vec<(f64, f64)> = self.reserves.rungs().collect();
        for (price, amount) in rungs {
            if amount <= 0.0 {
                continue;
            }
            market.buy(self.core.id, amount, Price::Limited(price), now, true)?;
        }
        Ok(())
    }
}

impl Agent for ReserveAgent {
    fn id(&self) -> AgentId {
        self.core.id
    }

    fn identity(&self) -> &str {
        &self.core.identity
    }

    /// Run against the reserve's own market: closes prior orders and reposts
    /// the ladder. `exchange` is unused directly; the reserve acts through
    /// the `Market` handed back to it via `after_market_execute`, matching
    /// the original's `run(exchange=self, now)` signature where `self` is
    /// both agent and market.
    fn run(&mut self, exchange: &mut Exchange, now: f64) -> bool {
        if !self.core.should_run(now) {
            return false;
        }
        if let Some(market) = exchange.market_mut(&self.security) {
            let _ = self.post_ladder(market, now);
        }
        true
    }

    /// Debits the tranche by the matched amount (grounded on
    /// `reserve_lifo.py`'s `reserve.record`: `reserves[order.price] -=
    /// order.amount`, where `order.amount` is the reserve's own matched
    /// order — positive when it is retiring Holo Fuel as a buyer).
    fn record(&mut self, order: Order) {
        let key = price_key(order.price.limited().unwrap_or(0.0));
        self.core.record(order.clone());
        let remaining = self.reserves.0.entry(key).or_insert(0.0);
        *remaining -= order.amount;
        if *remaining <= 0.0 {
            self.reserves.0.remove(&key);
        }
    }

    fn volume(&self, security: Option<&Symbol>, period: Option<f64>, now: Option<f64>) -> (f64, f64) {
        self.core.volume(security, period, now)
    }

    fn balance(&self) -> Option<f64> {
        self.core.balance()
    }

    fn set_balance(&mut self, value: f64) -> Result<(), SimError> {
        self.core.set_balance(value)
    }

    fn buys_from(&self, other: AgentId) -> bool {
        self.hosts_only.as_ref().is_none_or(|hosts| hosts.contains(&other))
    }

    /// After the market this reserve is paired with finishes a batch of
    /// matching, rebuild the ladder from the (possibly debited) `reserves`.
    fn after_market_execute(&mut self, market: &mut Market, now: f64) {
        let _ = self.post_ladder(market, now);
    }
}

/// Extends [`ReserveAgent`] with a supply engine that periodically issues
/// new units for sale, per spec.md §4.6.
pub struct IssuingReserveAgent {
    pub reserve: ReserveAgent,
    pub supply_book_value: f64,
    pub supply_period: f64,
    pub supply_available: f64,
    pub supply_premium: f64,
    pub supply_ratio: f64,
}

impl IssuingReserveAgent {
    pub fn new(
        identity: impl Into<String>,
        start: f64,
        quanta: f64,
        security: impl Into<Symbol>,
        supply_book_value: f64,
        supply_available: f64,
    ) -> Self {
        IssuingReserveAgent {
            reserve: ReserveAgent::new(identity, start, quanta, security),
            supply_book_value,
            supply_period: crate::numerics::HOUR,
            supply_available,
            supply_premium: 1.0,
            supply_ratio: 1.0,
        }
    }

    fn post_supply(&mut self, market: &mut Market, now: f64) -> Result<(), SimError> {
        let (buy_vol, sell_vol) = self.reserve.core.volume(None, Some(self.supply_period), Some(now));
        let remaining = self.supply_available - (sell_vol - buy_vol);
        if remaining > 0.0 {
            market.sell(
                self.reserve.core.id,
                remaining,
                Price::Limited(self.supply_book_value * self.supply_premium),
                now,
                true,
            )?;
        }
        Ok(())
    }
}

impl Agent for IssuingReserveAgent {
    fn id(&self) -> AgentId {
        self.reserve.core.id
    }

    fn identity(&self) -> &str {
        self.reserve.identity()
    }

    fn run(&mut self, exchange: &mut Exchange, now: f64) -> bool {
        if !self.reserve.core.should_run(now) {
            return false;
        }
        if let Some(market) = exchange.market_mut(&self.reserve.security) {
            let _ = self.reserve.post_ladder(market, now);
            let _ = self.post_supply(market, now);
        }
        true
    }

    fn record(&mut self, order: Order) {
        self.reserve.record(order);
    }

    fn volume(&self, security: Option<&Symbol>, period: Option<f64>, now: Option<f64>) -> (f64, f64) {
        self.reserve.volume(security, period, now)
    }

    fn balance(&self) -> Option<f64> {
        self.reserve.balance()
    }

    fn set_balance(&mut self, value: f64) -> Result<(), SimError> {
        self.reserve.set_balance(value)
    }

    fn buys_from(&self, other: AgentId) -> bool {
        self.reserve.buys_from(other)
    }

    fn after_market_execute(&mut self, market: &mut Market, now: f64) {
        let _ = self.reserve.post_ladder(market, now);
        let _ = self.post_supply(market, now);
    }
}
