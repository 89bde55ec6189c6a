//! A thin router from security to market. Grounded on the donor's
//! `MultiExchange` (`src/multi_exchange.rs`), generalized from its lazy
//! `HashMap::entry` creation to spec.md §4.2's currency-checked
//! lazy-creation-on-`enter` contract, and to insertion-ordered iteration for
//! `execute`.

use crate::agent::AgentRegistry;
use crate::error::SimError;
use crate::market::Market;
use crate::order::Order;
use crate::types::{AgentId, Symbol};

/// Routes orders to the market for their security, creating markets lazily.
pub struct Exchange {
    currency: Symbol,
    /// Insertion-ordered: `execute` must iterate markets in the order they
    /// were first created (spec.md §4.2). The security universe is small
    /// enough that linear lookup by name is simpler than maintaining a
    /// parallel index, and is not a hot path.
    markets: Vec<(Symbol, Market)>,
}

impl Exchange {
    pub fn new(currency: impl Into<Symbol>) -> Self {
        Exchange {
            currency: currency.into(),
            markets: Vec::new(),
        }
    }

    fn position(&self, security: &Symbol) -> Option<usize> {
        self.markets.iter().position(|(s, _)| s == security)
    }

    pub fn market(&self, security: &Symbol) -> Option<&Market> {
        self.position(security).map(|i| &self.markets[i].1)
    }

    pub fn market_mut(&mut self, security: &Symbol) -> Option<&mut Market> {
        if let Some(i) = self.position(security) {
            Some(&mut self.markets[i].1)
        } else {
            None
        }
    }

    /// Lazily creates a market for `security`, failing if its currency
    /// doesn't match the exchange's.
    pub fn get_or_create(&mut self, security: &Symbol, currency: &Symbol) -> Result<&mut Market, SimError> {
        if self.position(security).is_none() {
            if currency != &self.currency {
                return Err(SimError::WrongCurrency);
            }
            self.markets.push((security.clone(), Market::new(security.clone(), currency.clone())));
        }
        let i = self.position(security).unwrap();
        Ok(&mut self.markets[i].1)
    }

    pub fn enter(&mut self, order: Order, update: bool) -> Result<(), SimError> {
        let security = order.security.clone();
        let currency = order.currency.clone();
        self.get_or_create(&security, &currency)?.enter(order, update)
    }

    /// Closes `agent`'s orders on every market, or only on `security` if
    /// given.
    pub fn close(&mut self, agent: AgentId, security: Option<&Symbol>) -> Result<(), SimError> {
        match security {
            Some(sec) => {
                if let Some(m) = self.market_mut(sec) {
                    m.close(agent, Some(sec))?;
                }
                Ok(())
            }
            None => {
                for (_, m) in self.markets.iter_mut() {
                    let name = m.name.clone();
                    m.close(agent, Some(&name))?;
                }
                Ok(())
            }
        }
    }

    pub fn orders(&self, agent: Option<AgentId>, security: Option<&Symbol>) -> Vec<Order> {
        match security {
            Some(sec) => self.market(sec).map(|m| m.orders(agent)).unwrap_or_default(),
            None => self.markets.iter().flat_map(|(_, m)| m.orders(agent)).collect(),
        }
    }

    pub fn price(&self, security: &Symbol) -> crate::market::MarketPrices {
        self.market(security).map(|m| m.price()).unwrap_or_default()
    }

    /// Drives every market's matching to exhaustion, in insertion order,
    /// recording trades into `registry` and invoking any paired reserve's
    /// post-execute hook.
    pub fn execute_all(&mut self, now: f64, registry: &mut AgentRegistry) -> Vec<(Order, Order)> {
        let mut all = Vec::new();
        for (_, market) in self.markets.iter_mut() {
            let trades = market.execute(now, &*registry);
            for (buy, sell) in &trades {
                registry.record(buy.agent, buy.clone());
                registry.record(sell.agent, sell.clone());
            }
            if let Some(reserve_id) = market.paired_reserve() {
                registry.after_market_execute(reserve_id, market, now);
            }
            all.extend(trades);
        }
        all
    }

    pub fn securities(&self) -> impl Iterator<Item = &Symbol> {
        self.markets.iter().map(|(s, _)| s)
    }
}
