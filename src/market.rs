//! A single-security continuous double auction: the order book and the
//! matching loop. Grounded on `holofuel/model/trading/exchgs.py`'s `market`
//! class, restructured around Rust ownership per Design Note "Mid-iteration
//! book mutation" (spec.md §9): matching is an explicit "match one trade"
//! step, not a lazy generator over a concurrently-mutated collection.

use crate::agent::Compatibility;
use crate::error::SimError;
use crate::order::Order;
use crate::types::{AgentId, Price, Symbol};

/// `{bid, ask, last}`: the market's current priced best-buy, best-sell, and
/// most recent trade. Any may be absent.
#[derive(Clone, Debug, Default)]
pub struct MarketPrices {
    pub bid: Option<Order>,
    pub ask: Option<Order>,
    pub last: Option<Order>,
}

fn crosses(buy: &Price, sell: &Price) -> bool {
    match (buy, sell) {
        (Price::Market, _) | (_, Price::Market) => true,
        (Price::Limited(b), Price::Limited(s)) => *s <= *b,
    }
}

/// A market for one security, denominated in one currency.
pub struct Market {
    pub name: Symbol,
    pub currency: Symbol,
    buying: Vec<Order>,
    selling: Vec<Order>,
    last: Option<Order>,
    transaction_counter: u64,
    next_entry_seq: u64,
    /// The agent, if any, paired with this market as a reserve (Design Note
    /// "Cyclic ownership"). The market holds only the id, never the agent.
    reserve: Option<AgentId>,
}

impl Market {
    pub fn new(name: impl Into<Symbol>, currency: impl Into<Symbol>) -> Self {
        Market {
            name: name.into(),
            currency: currency.into(),
            buying: Vec::new(),
            selling: Vec::new(),
            last: None,
            transaction_counter: 0,
            next_entry_seq: 0,
            reserve: None,
        }
    }

    pub fn set_reserve(&mut self, agent: AgentId) {
        self.reserve = Some(agent);
    }

    pub fn paired_reserve(&self) -> Option<AgentId> {
        self.reserve
    }

    pub fn transaction_counter(&self) -> u64 {
        self.transaction_counter
    }

    fn buy_key(o: &Order) -> (f64, f64) {
        (o.price.buy_key(), o.time)
    }

    fn sell_key(o: &Order) -> (f64, f64) {
        (o.price.sell_key(), -o.time)
    }

    /// Scans the sell book for a resting order from `order.agent` that
    /// would immediately cross it. Self-trade check at entry (spec.md
    /// §4.1.2); identity alone decides the match, per Design Note on
    /// `buy_matches`'s redundant compatibility check.
    fn buy_matches(&self, order: &Order) -> Option<&Order> {
        self.selling
            .iter()
            .find(|s| s.agent == order.agent && crosses(&order.price, &s.price))
    }

    fn sell_matches(&self, order: &Order) -> Option<&Order> {
        self.buying
            .iter()
            .find(|b| b.agent == order.agent && crosses(&b.price, &order.price))
    }

    /// Inserts `order`. If `update`, first removes every resting order by
    /// `order.agent` on this market (Invariant A). Otherwise, rejects the
    /// order with `SelfTradeError` if it would immediately cross one of the
    /// agent's own resting orders.
    pub fn enter(&mut self, mut order: Order, update: bool) -> Result<(), SimError> {
        if order.security != self.name {
            return Err(SimError::WrongSecurity);
        }
        if order.currency != self.currency {
            return Err(SimError::WrongCurrency);
        }

        if update {
            self.close(order.agent, None)?;
        } else if order.amount > 0.0 {
            if self.buy_matches(&order).is_some() {
                return Err(SimError::SelfTradeError);
            }
        } else if self.sell_matches(&order).is_some() {
            return Err(SimError::SelfTradeError);
        }

        order.entry_seq = self.next_entry_seq;
        self.next_entry_seq += 1;

        if order.amount > 0.0 {
            let key = Self::buy_key(&order);
            let idx = self
                .buying
                .partition_point(|o| Self::buy_key(o) <= key);
            self.buying.insert(idx, order);
        } else {
            let key = Self::sell_key(&order);
            let idx = self
                .selling
                .partition_point(|o| Self::sell_key(o) <= key);
            self.selling.insert(idx, order);
        }
        Ok(())
    }

    pub fn buy(&mut self, agent: AgentId, amount: f64, price: Price, now: f64, update: bool) -> Result<(), SimError> {
        let order = Order::new(self.name.clone(), price, self.currency.clone(), now, amount.abs(), agent);
        self.enter(order, update)
    }

    pub fn sell(&mut self, agent: AgentId, amount: f64, price: Price, now: f64, update: bool) -> Result<(), SimError> {
        let order = Order::new(self.name.clone(), price, self.currency.clone(), now, -amount.abs(), agent);
        self.enter(order, update)
    }

    /// Removes every resting order by `agent`. If `security` is given it
    /// must name this market, or the call fails with `WrongSecurity`.
    pub fn close(&mut self, agent: AgentId, security: Option<&Symbol>) -> Result<(), SimError> {
        if let Some(sec) = security {
            if sec != &self.name {
                return Err(SimError::WrongSecurity);
            }
        }
        self.buying.retain(|o| o.agent != agent);
        self.selling.retain(|o| o.agent != agent);
        Ok(())
    }

    /// All currently resting orders, optionally filtered by agent.
    pub fn orders(&self, agent: Option<AgentId>) -> Vec<Order> {
        self.buying
            .iter()
            .chain(self.selling.iter())
            .filter(|o| agent.is_none_or(|a| o.agent == a))
            .cloned()
            .collect()
    }

    pub fn price(&self) -> MarketPrices {
        MarketPrices {
            bid: self.buying.iter().rev().find(|o| !o.price.is_market()).cloned(),
            ask: self.selling.iter().find(|o| !o.price.is_market()).cloned(),
            last: self.last.clone(),
        }
    }

    /// Diagonal search outward from the best bid/best ask, per spec.md
    /// §4.1 step 1: try the best-against-best pair first, then combinations
    /// one step further from either origin, until a crossing and
    /// compatible pair is found or the book is exhausted.
    fn find_match(&self, compat: &dyn Compatibility) -> Option<(usize, usize)> {
        let bn = self.buying.len();
        let sn = self.selling.len();
        if bn == 0 || sn == 0 {
            return None;
        }
        let max_depth = (bn - 1) + (sn - 1);
        for depth in 0..=max_depth {
            let bi_offset_max = depth.min(bn - 1);
            for bi_offset in 0..=bi_offset_max {
                if depth < bi_offset {
                    continue;
                }
                let ai_offset = depth - bi_offset;
                if ai_offset >= sn {
                    continue;
                }
                let bi = bn - 1 - bi_offset;
                let ai = ai_offset;
                let buy = &self.buying[bi];
                let sell = &self.selling[ai];
                if crosses(&buy.price, &sell.price) && compat.compatible(buy.agent, sell.agent) {
                    return Some((bi, ai));
                }
            }
        }
        None
    }

    /// Rule 3a-e: resolves the trade price between a matched pair.
    fn resolve_price(&self, buy: &Order, sell: &Order) -> Option<f64> {
        let buyer_first = buy.entry_seq < sell.entry_seq;
        let primary = if buyer_first { &sell.price } else { &buy.price };
        if let Some(p) = primary.limited() {
            return Some(p);
        }
        let secondary = if buyer_first { &buy.price } else { &sell.price };
        if let Some(p) = secondary.limited() {
            return Some(p);
        }
        let from_book = if buyer_first {
            self.selling.iter().find_map(|o| o.price.limited())
        } else {
            self.buying.iter().rev().find_map(|o| o.price.limited())
        };
        if from_book.is_some() {
            return from_book;
        }
        self.last.as_ref().and_then(|l| l.price.limited())
    }

    /// Executes exactly one trade, mutating the book, or returns `None` if
    /// no trade is currently possible (including the case where a price
    /// cannot be resolved at all, per rule 3e: "abandon this match and
    /// stop").
    pub fn match_one(&mut self, now: f64, compat: &dyn Compatibility) -> Option<(Order, Order)> {
        let (bi, ai) = self.find_match(compat)?;
        let buy_order = self.buying[bi].clone();
        let sell_order = self.selling[ai].clone();
        let price = self.resolve_price(&buy_order, &sell_order)?;
        let amount = buy_order.amount.min(-sell_order.amount);

        let mut buy_trade = buy_order.with_amount(amount);
        buy_trade.price = Price::Limited(price);
        buy_trade.time = now;
        let mut sell_trade = sell_order.with_amount(-amount);
        sell_trade.price = Price::Limited(price);
        sell_trade.time = now;

        self.last = Some(buy_trade.clone());
        self.transaction_counter += 1;

        if buy_order.amount - amount <= 0.0 {
            self.buying.remove(bi);
        } else {
            self.buying[bi] = buy_order.with_amount(buy_order.amount - amount);
        }
        if -sell_order.amount - amount <= 0.0 {
            self.selling.remove(ai);
        } else {
            self.selling[ai] = sell_order.with_amount(sell_order.amount + amount);
        }

        Some((buy_trade, sell_trade))
    }

    /// Drives `match_one` to exhaustion, without recording into any agent
    /// ledger. Exposed for composing with `execute_all`/tests.
    pub fn execute(&mut self, now: f64, compat: &dyn Compatibility) -> Vec<(Order, Order)> {
        let mut out = Vec::new();
        while let Some(pair) = self.match_one(now, compat) {
            out.push(pair);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentRegistry;

    fn market() -> Market {
        Market::new("HOT", "USD")
    }

    #[test]
    fn no_match_when_book_one_sided() {
        let mut m = market();
        m.buy(AgentId(1), 10.0, Price::Limited(1.0), 0.0, false).unwrap();
        let reg = AgentRegistry::new();
        assert!(m.execute(0.0, &reg).is_empty());
    }

    #[test]
    fn full_fill_at_resting_price() {
        let mut m = market();
        m.sell(AgentId(1), 100.0, Price::Limited(4.0), 1.0, false).unwrap();
        m.buy(AgentId(2), 100.0, Price::Limited(4.0), 2.0, false).unwrap();
        let reg = AgentRegistry::new();
        let trades = m.execute(3.0, &reg);
        assert_eq!(trades.len(), 1);
        let (buy, sell) = &trades[0];
        assert_eq!(buy.amount, 100.0);
        assert_eq!(sell.amount, -100.0);
        assert_eq!(buy.price, Price::Limited(4.0));
        assert!(m.orders(None).is_empty());
    }

    #[test]
    fn partial_fill_leaves_remainder() {
        let mut m = market();
        m.sell(AgentId(1), 100.0, Price::Limited(4.0), 1.0, false).unwrap();
        m.buy(AgentId(2), 40.0, Price::Limited(4.0), 2.0, false).unwrap();
        let reg = AgentRegistry::new();
        let trades = m.execute(3.0, &reg);
        assert_eq!(trades.len(), 1);
        let remaining = m.orders(None);
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].amount, -60.0);
    }

    #[test]
    fn self_trade_rejected_at_entry() {
        let mut m = market();
        m.sell(AgentId(1), 100.0, Price::Limited(4.0), 1.0, false).unwrap();
        let err = m.buy(AgentId(1), 50.0, Price::Limited(4.0), 2.0, false).unwrap_err();
        assert_eq!(err, SimError::SelfTradeError);
    }

    #[test]
    fn update_true_replaces_prior_orders() {
        let mut m = market();
        m.buy(AgentId(1), 10.0, Price::Limited(1.0), 0.0, true).unwrap();
        m.buy(AgentId(1), 20.0, Price::Limited(1.0), 1.0, true).unwrap();
        let open = m.orders(Some(AgentId(1)));
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].amount, 20.0);
    }

    #[test]
    fn book_ordering_buy_side_market_orders_last() {
        let mut m = market();
        m.buy(AgentId(1), 10.0, Price::Limited(5.0), 0.0, false).unwrap();
        m.buy(AgentId(2), 10.0, Price::Market, 1.0, false).unwrap();
        let open = m.orders(None);
        // best bid (market) must be last in insertion-sorted buying book
        assert!(open.last().unwrap().price.is_market());
    }

    #[test]
    fn wrong_security_rejected() {
        let mut m = market();
        let order = Order::new(Symbol::new("OTHER"), Price::Limited(1.0), Symbol::new("USD"), 0.0, 1.0, AgentId(1));
        assert_eq!(m.enter(order, false).unwrap_err(), SimError::WrongSecurity);
    }

    #[test]
    fn wrong_currency_rejected() {
        let mut m = market();
        let order = Order::new(Symbol::new("HOT"), Price::Limited(1.0), Symbol::new("EUR"), 0.0, 1.0, AgentId(1));
        assert_eq!(m.enter(order, false).unwrap_err(), SimError::WrongCurrency);
    }

    #[test]
    fn worked_order_book_example() {
        // spec.md §8 scenario 5, in entry-call order (not `time` order):
        // B buy 500@4.05 t2; E sell 100@4.10 t5; D sell 200@4.01 t3;
        // A sell 250@4.00 t1; C sell 200@4.00 t2.
        let mut m = market();
        let (b, e, d, a, c) = (AgentId(1), AgentId(2), AgentId(3), AgentId(4), AgentId(5));
        m.buy(b, 500.0, Price::Limited(4.05), 2.0, false).unwrap();
        m.sell(e, 100.0, Price::Limited(4.10), 5.0, false).unwrap();
        m.sell(d, 200.0, Price::Limited(4.01), 3.0, false).unwrap();
        m.sell(a, 250.0, Price::Limited(4.00), 1.0, false).unwrap();
        m.sell(c, 200.0, Price::Limited(4.00), 2.0, false).unwrap();

        let reg = AgentRegistry::new();
        let trades = m.execute(10.0, &reg);
        assert_eq!(trades.len(), 3);

        // B entered first of all five (lowest entry_seq), so it is "first"
        // against every counterparty: rule 3a applies throughout, price is
        // always the resting seller's own ask.
        assert_eq!(trades[0].0.amount, 200.0);
        assert_eq!(trades[0].0.price, Price::Limited(4.00));
        assert_eq!(trades[0].1.agent, c);

        assert_eq!(trades[1].0.amount, 250.0);
        assert_eq!(trades[1].0.price, Price::Limited(4.00));
        assert_eq!(trades[1].1.agent, a);

        assert_eq!(trades[2].0.amount, 50.0);
        assert_eq!(trades[2].0.price, Price::Limited(4.01));
        assert_eq!(trades[2].1.agent, d);

        let remaining = m.orders(None);
        assert_eq!(remaining.len(), 2);
        let d_rest = remaining.iter().find(|o| o.agent == d).unwrap();
        assert_eq!(d_rest.amount, -150.0);
        let e_rest = remaining.iter().find(|o| o.agent == e).unwrap();
        assert_eq!(e_rest.amount, -100.0);
    }

    #[test]
    fn incompatible_counterparty_is_skipped() {
        struct OnlyHost;
        impl Compatibility for OnlyHost {
            fn compatible(&self, buyer: AgentId, _seller: AgentId) -> bool {
                buyer == AgentId(99)
            }
        }
        let mut m = market();
        m.buy(AgentId(1), 10.0, Price::Limited(5.0), 0.0, false).unwrap();
        m.sell(AgentId(2), 10.0, Price::Limited(5.0), 1.0, false).unwrap();
        let compat = OnlyHost;
        assert!(m.execute(1.0, &compat).is_empty());
        assert_eq!(m.orders(None).len(), 2);
    }
}
