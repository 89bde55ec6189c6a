//! The base agent contract and the registry that owns every agent in a run.
//!
//! Orders and trade records carry only an [`AgentId`]; the market and the
//! exchange never hold a reference to an agent. The [`AgentRegistry`] is the
//! one place that maps an id back to a mutable `dyn Agent`, and it is the
//! engine (or a test) that owns it — grounded on Design Note "Agent identity
//! & ledger mutation" in spec.md §9.

use crate::error::SimError;
use crate::exchange::Exchange;
use crate::market::Market;
use crate::order::Order;
use crate::types::{AgentId, Symbol};
use rustc_hash::FxHashMap;
use std::collections::VecDeque;

/// Resolves whether a prospective (buyer, seller) pair may trade, per
/// spec.md §4.1.1. Implemented by [`AgentRegistry`]; the market never
/// inspects an agent directly, only through this oracle.
pub trait Compatibility {
    fn compatible(&self, buyer: AgentId, seller: AgentId) -> bool;
}

/// Behavior every participant in a simulation must provide.
pub trait Agent {
    fn id(&self) -> AgentId;
    fn identity(&self) -> &str;

    /// Returns true iff the agent should act this tick; see
    /// [`AgentCore::should_run`] for the gating contract.
    fn run(&mut self, exchange: &mut Exchange, now: f64) -> bool;

    /// Folds a matched trade into this agent's ledger.
    fn record(&mut self, order: Order);

    /// `(buy_volume, sell_volume)` over `[now - period, now]`, optionally
    /// filtered by security. `period`/`now` of `None` scan the whole log.
    fn volume(&self, security: Option<&Symbol>, period: Option<f64>, now: Option<f64>) -> (f64, f64);

    fn balance(&self) -> Option<f64>;
    fn set_balance(&mut self, value: f64) -> Result<(), SimError>;

    /// Counterparty predicate: may this agent sell to `other`? Default
    /// compatible with everyone.
    fn sells_to(&self, _other: AgentId) -> bool {
        true
    }

    /// Counterparty predicate: may this agent buy from `other`? Default
    /// compatible with everyone.
    fn buys_from(&self, _other: AgentId) -> bool {
        true
    }

    /// Hook invoked once, after a market this agent is paired with (see
    /// [`Market::set_reserve`]) finishes a batch of matching. The base
    /// agent does nothing; `ReserveAgent`/`IssuingReserveAgent` override it
    /// to rebuild their buy ladder (spec.md §4.5 `execute`).
    fn after_market_execute(&mut self, _market: &mut Market, _now: f64) {}
}

/// Shared bookkeeping every concrete agent (`BasicAgent`, `Actor`,
/// `ReserveAgent`) delegates to: the ledger, the run-gate, and volume
/// accounting from spec.md §4.3.
#[derive(Debug)]
pub struct AgentCore {
    pub id: AgentId,
    pub identity: String,
    pub currency_preference: Option<Symbol>,
    pub trades: VecDeque<Order>,
    pub assets: FxHashMap<Symbol, f64>,
    pub balances: FxHashMap<Symbol, f64>,
    pub last_run_time: Option<f64>,
    pub start: f64,
    pub quanta: f64,
}

impl AgentCore {
    pub fn new(identity: impl Into<String>, start: f64, quanta: f64) -> Self {
        AgentCore {
            id: AgentId::fresh(),
            identity: identity.into(),
            currency_preference: None,
            trades: VecDeque::new(),
            assets: FxHashMap::default(),
            balances: FxHashMap::default(),
            last_run_time: None,
            start,
            quanta,
        }
    }

    /// `start` defaulted to `quanta * u` for some `u` in `[0, 1)`, so a
    /// population sharing a quanta desynchronizes (spec.md §4.3).
    pub fn new_desynchronized(identity: impl Into<String>, quanta: f64, jitter: f64) -> Self {
        Self::new(identity, quanta * jitter, quanta)
    }

    /// The run-gate contract from spec.md §4.3: false until `now >= start`;
    /// true (ignoring `quanta`) on the first qualifying tick; thereafter
    /// true only once `now - last_run_time >= quanta`.
    pub fn should_run(&mut self, now: f64) -> bool {
        if now < self.start {
            return false;
        }
        match self.last_run_time {
            None => {
                self.last_run_time = Some(now);
                true
            }
            Some(last) if now - last >= self.quanta => {
                self.last_run_time = Some(now);
                true
            }
            _ => false,
        }
    }

    pub fn record(&mut self, order: Order) {
        if self.currency_preference.is_none() {
            self.currency_preference = Some(order.currency.clone());
        }
        *self.assets.entry(order.security.clone()).or_insert(0.0) += order.amount;
        if let Some(price) = order.price.limited() {
            *self.balances.entry(order.currency.clone()).or_insert(0.0) -= order.amount * price;
        }
        log::debug!(
            "{} recorded {} (assets[{}]={}, balance[{}]={:?})",
            self.identity,
            order,
            order.security,
            self.assets.get(&order.security).copied().unwrap_or(0.0),
            order.currency,
            self.balances.get(&order.currency),
        );
        self.trades.push_back(order);
    }

    pub fn volume(&self, security: Option<&Symbol>, period: Option<f64>, now: Option<f64>) -> (f64, f64) {
        let horizon = match (period, now) {
            (Some(p), Some(n)) => Some(n - p),
            _ => None,
        };
        let mut buy = 0.0;
        let mut sell = 0.0;
        for order in self.trades.iter().rev() {
            if let Some(h) = horizon {
                if order.time < h {
                    break;
                }
            }
            if let Some(sec) = security {
                if &order.security != sec {
                    continue;
                }
            }
            if order.amount > 0.0 {
                buy += order.amount;
            } else {
                sell += -order.amount;
            }
        }
        (buy, sell)
    }

    pub fn balance(&self) -> Option<f64> {
        self.currency_preference
            .as_ref()
            .map(|cur| self.balances.get(cur).copied().unwrap_or(0.0))
    }

    pub fn set_balance(&mut self, value: f64) -> Result<(), SimError> {
        let cur = self.currency_preference.clone().ok_or(SimError::NoCurrency)?;
        let prior = self.balances.insert(cur.clone(), value);
        if let Some(p) = prior {
            if p != 0.0 {
                log::warn!("{} overwrote nonzero balance[{}] {} -> {}", self.identity, cur, p, value);
            }
        }
        Ok(())
    }
}

/// A minimal concrete agent with no needs/reserve behavior: useful for
/// tests and for simple liquidity providers.
pub struct BasicAgent {
    pub core: AgentCore,
}

impl BasicAgent {
    pub fn new(identity: impl Into<String>, start: f64, quanta: f64) -> Self {
        BasicAgent {
            core: AgentCore::new(identity, start, quanta),
        }
    }
}

impl Agent for BasicAgent {
    fn id(&self) -> AgentId {
        self.core.id
    }

    fn identity(&self) -> &str {
        &self.core.identity
    }

    fn run(&mut self, _exchange: &mut Exchange, now: f64) -> bool {
        self.core.should_run(now)
    }

    fn record(&mut self, order: Order) {
        self.core.record(order);
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
}

/// Owns every agent in a run, keyed by [`AgentId`]. This is the only place
/// an `AgentId` is resolved back to a mutable agent.
#[derive(Default)]
pub struct AgentRegistry {
    agents: FxHashMap<AgentId, Box<dyn Agent>>,
    order: Vec<AgentId>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        AgentRegistry::default()
    }

    /// Inserts an agent and returns its id, preserving insertion order for
    /// `Engine::cycle`'s round-robin scheduling.
    pub fn insert(&mut self, agent: Box<dyn Agent>) -> AgentId {
        let id = agent.id();
        self.agents.insert(id, agent);
        self.order.push(id);
        id
    }

    pub fn get(&self, id: AgentId) -> Option<&dyn Agent> {
        self.agents.get(&id).map(|b| b.as_ref())
    }

    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut (dyn Agent + 'static)> {
        self.agents.get_mut(&id).map(|b| b.as_mut())
    }

    /// Insertion-ordered ids, for round-robin scheduling.
    pub fn ids(&self) -> &[AgentId] {
        &self.order
    }

    pub fn run(&mut self, id: AgentId, exchange: &mut Exchange, now: f64) -> bool {
        self.agents
            .get_mut(&id)
            .map(|a| a.run(exchange, now))
            .unwrap_or(false)
    }

    pub fn record(&mut self, id: AgentId, order: Order) {
        if let Some(agent) = self.agents.get_mut(&id) {
            agent.record(order);
        }
    }

    pub fn after_market_execute(&mut self, id: AgentId, market: &mut Market, now: f64) {
        if let Some(agent) = self.agents.get_mut(&id) {
            agent.after_market_execute(market, now);
        }
    }
}

impl Compatibility for AgentRegistry {
    fn compatible(&self, buyer: AgentId, seller: AgentId) -> bool {
        let seller_ok = self.get(seller).map(|a| a.sells_to(buyer)).unwrap_or(true);
        let buyer_ok = self.get(buyer).map(|a| a.buys_from(seller)).unwrap_or(true);
        seller_ok && buyer_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Price;

    fn order(amount: f64, agent: AgentId) -> Order {
        Order::new(Symbol::new("HOT"), Price::Limited(1.0), Symbol::new("USD"), 0.0, amount, agent)
    }

    #[test]
    fn run_gate_first_call_always_fires() {
        let mut core = AgentCore::new("a", 10.0, 5.0);
        assert!(!core.should_run(5.0));
        assert!(core.should_run(10.0));
        assert_eq!(core.last_run_time, Some(10.0));
    }

    #[test]
    fn run_gate_requires_full_quanta() {
        let mut core = AgentCore::new("a", 0.0, 5.0);
        assert!(core.should_run(0.0));
        assert!(!core.should_run(3.0));
        assert!(core.should_run(5.0));
    }

    #[test]
    fn record_updates_assets_and_balance() {
        let mut core = AgentCore::new("a", 0.0, 1.0);
        core.record(order(10.0, AgentId(1)));
        assert_eq!(core.assets[&Symbol::new("HOT")], 10.0);
        assert_eq!(core.balances[&Symbol::new("USD")], -10.0);
        assert_eq!(core.currency_preference, Some(Symbol::new("USD")));
    }

    #[test]
    fn volume_splits_buy_and_sell() {
        let mut core = AgentCore::new("a", 0.0, 1.0);
        core.record(order(10.0, AgentId(1)));
        core.record(order(-4.0, AgentId(1)));
        let (buy, sell) = core.volume(None, None, None);
        assert_eq!(buy, 10.0);
        assert_eq!(sell, 4.0);
    }

    #[test]
    fn registry_compatibility_defaults_true() {
        let mut reg = AgentRegistry::new();
        let a = reg.insert(Box::new(BasicAgent::new("a", 0.0, 1.0)));
        let b = reg.insert(Box::new(BasicAgent::new("b", 0.0, 1.0)));
        assert!(reg.compatible(a, b));
    }

    #[test]
    fn set_balance_without_currency_fails() {
        let mut core = AgentCore::new("a", 0.0, 1.0);
        assert_eq!(core.set_balance(5.0), Err(SimError::NoCurrency));
    }
}
