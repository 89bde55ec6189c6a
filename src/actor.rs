//! The need-driven economic agent: an agent whose demand for securities is
//! expressed as a list of recurring [`Need`]s rather than hand-written
//! strategy code. Grounded on `holofuel/model/trading/actor.py`'s `actor`
//! class.

use crate::agent::{Agent, AgentCore};
use crate::error::SimError;
use crate::exchange::Exchange;
use crate::numerics::scale;
use crate::order::Order;
use crate::types::{Price, Symbol};
use rustc_hash::FxHashMap;

/// A recurring requirement to hold `amount` of `security`, consumed every
/// `cycle` and prioritized against other needs by `priority` (lower first)
/// then `deadline`.
#[derive(Clone, Debug)]
pub struct Need {
    pub priority: i64,
    pub deadline: Option<f64>,
    pub security: Symbol,
    pub cycle: f64,
    pub amount: f64,
}

impl Need {
    pub fn new(priority: i64, security: impl Into<Symbol>, cycle: f64, amount: f64) -> Self {
        Need {
            priority,
            deadline: None,
            security: security.into(),
            cycle,
            amount,
        }
    }
}

/// An agent that maintains a target portfolio by buying to satisfy
/// [`Need`]s, funding shortfalls from its balance, and raising capital by
/// selling excess holdings when necessary (spec.md §4.4).
pub struct Actor {
    pub core: AgentCore,
    pub needs: Vec<Need>,
    pub target: FxHashMap<Symbol, f64>,
    pub minimum_balance: f64,
}

impl Actor {
    pub fn new(identity: impl Into<String>, start: f64, quanta: f64, minimum_balance: f64) -> Self {
        Actor {
            core: AgentCore::new(identity, start, quanta),
            needs: Vec::new(),
            target: FxHashMap::default(),
            minimum_balance,
        }
    }

    pub fn with_need(mut self, need: Need) -> Self {
        self.needs.push(need);
        self
    }

    /// Reference price for a security: the best of bid, ask, last, floored
    /// at zero. `0.0` if the market has no quotes yet.
    fn reference_price(exchange: &Exchange, security: &Symbol) -> f64 {
        let quotes = exchange.price(security);
        let mut best = 0.0f64;
        for order in [quotes.bid, quotes.ask, quotes.last].into_iter().flatten() {
            if let Some(p) = order.price.limited() {
                best = best.max(p);
            }
        }
        best
    }

    /// spec.md §4.4.1: walks needs in priority order, rescheduling and
    /// issuing a buy order sized and priced by urgency for each shortfall.
    fn acquire_needs(&mut self, exchange: &mut Exchange, now: f64) -> Result<(), SimError> {
        self.needs.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then(a.deadline.partial_cmp(&b.deadline).unwrap_or(std::cmp::Ordering::Equal))
        });

        for idx in 0..self.needs.len() {
            let (security, cycle, amount, deadline) = {
                let need = &self.needs[idx];
                (need.security.clone(), need.cycle, need.amount, need.deadline)
            };

            let due = deadline.is_none_or(|d| d <= now);
            if due {
                if deadline.is_some() {
                    *self.target.entry(security.clone()).or_insert(0.0) += amount;
                }
                let base = deadline.unwrap_or(now);
                self.needs[idx].deadline = Some(base + cycle);
            }

            let deadline = self.needs[idx].deadline.unwrap();
            let target = self.target.get(&security).copied().unwrap_or(0.0);
            let held = self.core.assets.get(&security).copied().unwrap_or(0.0);
            let short = amount + target - held;

            if short <= 0.0 {
                exchange.close(self.core.id, Some(&security))?;
                continue;
            }

            let proportion = 1.0 - (deadline - now) / cycle;
            let factor = scale(proportion, (0.0, 1.0), (0.90, 1.05), false, 1.0);
            let reference = Self::reference_price(exchange, &security);
            let offer = factor * reference.max(0.0);

            let currency = self
                .core
                .currency_preference
                .clone()
                .unwrap_or_else(|| security.clone());
            let order = Order::new(security, Price::Limited(offer), currency, now, short, self.core.id);
            exchange.enter(order, true)?;
        }
        Ok(())
    }

    /// spec.md §4.4.2, using the simplified `value − balance` form (the
    /// `minimum − minimum` term in the literal formula is a no-op; see
    /// DESIGN.md).
    fn cover_balance(&mut self, exchange: &mut Exchange, now: f64) -> Result<(), SimError> {
        let open = exchange.orders(Some(self.core.id), None);
        let value: f64 = open
            .iter()
            .filter_map(|o| o.price.limited().map(|p| o.amount * p))
            .sum();
        let balance = self.core.balance().unwrap_or(0.0);
        if balance - value < self.minimum_balance {
            let exclude: Vec<Symbol> = open.iter().map(|o| o.security.clone()).collect();
            let shortfall = value - balance + self.minimum_balance;
            self.raise_capital(shortfall, exchange, &exclude, now)?;
        }
        Ok(())
    }

    /// spec.md §4.4.3: sells excess holdings (by reference value, largest
    /// first) at market price until `value` worth of capital is raised.
    fn raise_capital(
        &mut self,
        value: f64,
        exchange: &mut Exchange,
        exclude: &[Symbol],
        now: f64,
    ) -> Result<(), SimError> {
        if value <= 0.0 {
            return Ok(());
        }
        let mut excess: Vec<(Symbol, f64)> = self
            .core
            .assets
            .iter()
            .filter(|(sec, _)| !exclude.contains(sec))
            .filter_map(|(sec, &held)| {
                let price = Self::reference_price(exchange, sec);
                if price <= 0.0 {
                    return None;
                }
                let target = self.target.get(sec).copied().unwrap_or(0.0);
                let excess_qty = held - target;
                if excess_qty <= 0.0 {
                    return None;
                }
                Some((sec.clone(), price * excess_qty))
            })
            .collect();
        excess.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let mut remaining = value;
        for (security, excess_value) in excess {
            if remaining <= 0.0 {
                break;
            }
            let held = self.core.assets.get(&security).copied().unwrap_or(0.0);
            let target = self.target.get(&security).copied().unwrap_or(0.0);
            let available = held - target;
            let sell_qty = (remaining / excess_value).ceil().min(available);
            if sell_qty <= 0.0 {
                continue;
            }
            let price = excess_value / available;
            let currency = self
                .core
                .currency_preference
                .clone()
                .unwrap_or_else(|| security.clone());
            let order = Order::new(security, Price::Market, currency, now, -sell_qty, self.core.id);
            exchange.enter(order, true)?;
            remaining -= sell_qty * price;
        }
        Ok(())
    }

    /// The original performs no portfolio rebalancing beyond needs and
    /// capital-raising; kept as an explicit hook for subclasses/tests.
    fn fix_portfolio(&mut self, _exchange: &mut Exchange, _now: f64) {}
}

impl Agent for Actor {
    fn id(&self) -> crate::types::AgentId {
        self.core.id
    }

    fn identity(&self) -> &str {
        &self.core.identity
    }

    fn run(&mut self, exchange: &mut Exchange, now: f64) -> bool {
        if !self.core.should_run(now) {
            return false;
        }
        let _ = self.acquire_needs(exchange, now);
        let _ = self.cover_balance(exchange, now);
        self.fix_portfolio(exchange, now);
        true
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentRegistry;

    fn actor_with_need() -> Actor {
        Actor::new("a", 0.0, 1.0, 0.0).with_need(Need::new(0, "HOT", 10.0, 5.0))
    }

    #[test]
    fn first_tick_schedules_need_without_shortfall_order() {
        let mut actor = actor_with_need();
        let mut exchange = Exchange::new("USD");
        actor.core.currency_preference = Some(Symbol::new("USD"));
        assert!(actor.run(&mut exchange, 0.0));
        assert_eq!(actor.needs[0].deadline, Some(10.0));
        assert_eq!(actor.target.get(&Symbol::new("HOT")).copied(), None);
    }

    #[test]
    fn shortfall_after_deadline_enters_buy_order() {
        let mut actor = actor_with_need();
        actor.core.currency_preference = Some(Symbol::new("USD"));
        let mut exchange = Exchange::new("USD");
        actor.run(&mut exchange, 0.0);
        actor.core.last_run_time = Some(10.0);
        actor.run(&mut exchange, 10.0);
        let open = exchange.orders(Some(actor.core.id), None);
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].amount, 5.0);
    }

    #[test]
    fn cover_balance_raises_capital_from_excess_holdings() {
        let mut actor = Actor::new("a", 0.0, 1.0, 100.0);
        actor.core.currency_preference = Some(Symbol::new("USD"));
        actor.core.assets.insert(Symbol::new("HOT"), 50.0);
        actor.core.balances.insert(Symbol::new("USD"), 0.0);
        let mut exchange = Exchange::new("USD");
        let mut reg = AgentRegistry::new();
        let buyer = reg.insert(Box::new(crate::agent::BasicAgent::new("b", 0.0, 1.0)));
        exchange
            .enter(Order::new(Symbol::new("HOT"), Price::Limited(2.0), Symbol::new("USD"), 0.0, 1.0, buyer), false)
            .unwrap();
        actor.cover_balance(&mut exchange, 0.0).unwrap();
        let open = exchange.orders(Some(actor.core.id), None);
        assert!(open.iter().any(|o| o.amount < 0.0));
    }
}
