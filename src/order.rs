//! The order/trade record: a single immutable entry in a market's book.
//!
//! Unlike a conventional limit-order book, entries here are never mutated in
//! place. A partial fill replaces the resting entry with a smaller one of
//! the same id lineage; book mutation is wholesale replacement, mirroring
//! the original `trade_t` namedtuple (`holofuel/model/trading/exchgs.py`).

use crate::types::{AgentId, Price, Symbol};
use std::fmt;

/// Buy or sell, carried as the sign of [`Order::amount`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

/// An entry in a market's order book, or a completed trade once matched.
///
/// `amount` is signed: positive for a buy, negative for a sell; its
/// magnitude is the quantity. A market order carries `price ==
/// Price::Market`.
#[derive(Clone, Debug)]
pub struct Order {
    pub security: Symbol,
    pub price: Price,
    pub currency: Symbol,
    pub time: f64,
    pub amount: f64,
    pub agent: AgentId,
    /// Monotonic counter stamped by the market on a successful `enter`,
    /// distinct from `time`: test fixtures often assign `time` values out
    /// of call order, but the match price-precedence rule (spec.md §4.1
    /// step 3a/b) needs "who actually entered first," so it is resolved
    /// against this counter rather than against `time`. Zero until entered.
    pub entry_seq: u64,
}

impl Order {
    pub fn new(
        security: Symbol,
        price: Price,
        currency: Symbol,
        time: f64,
        amount: f64,
        agent: AgentId,
    ) -> Self {
        debug_assert!(amount != 0.0, "an order must have a nonzero amount");
        Order {
            security,
            price,
            currency,
            time,
            amount,
            agent,
            entry_seq: 0,
        }
    }

    pub fn side(&self) -> Side {
        if self.amount > 0.0 {
            Side::Buy
        } else {
            Side::Sell
        }
    }

    pub fn quantity(&self) -> f64 {
        self.amount.abs()
    }

    /// Returns a copy of this order with `amount` replaced, preserving
    /// everything else (price, time, agent). Used to shrink a resting order
    /// to its unfilled remainder after a partial match.
    pub fn with_amount(&self, amount: f64) -> Order {
        Order {
            amount,
            ..self.clone()
        }
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {:+.4} {} @ {} ({})",
            self.time, self.security, self.amount, self.currency, self.price, self.agent
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ord(amount: f64) -> Order {
        Order::new(
            Symbol::new("HOT"),
            Price::Limited(1.0),
            Symbol::new("USD"),
            0.0,
            amount,
            AgentId(1),
        )
    }

    #[test]
    fn positive_amount_is_buy() {
        assert_eq!(ord(10.0).side(), Side::Buy);
        assert_eq!(ord(-10.0).side(), Side::Sell);
    }

    #[test]
    fn quantity_is_absolute_value() {
        assert_eq!(ord(-10.0).quantity(), 10.0);
    }

    #[test]
    fn with_amount_preserves_other_fields() {
        let o = ord(10.0);
        let shrunk = o.with_amount(4.0);
        assert_eq!(shrunk.amount, 4.0);
        assert_eq!(shrunk.security, o.security);
        assert_eq!(shrunk.agent, o.agent);
    }

    #[test]
    fn opposite_side_round_trips() {
        assert_eq!(Side::Buy.opposite(), Side::Sell);
        assert_eq!(Side::Sell.opposite(), Side::Buy);
    }
}
