//! Core value types shared across the simulator: interned symbols, the
//! market-or-limited price tag, and the small integer handles used in place
//! of owned references.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

/// An interned name for a security or currency.
///
/// Cheap to clone and compare; holds the string itself rather than a real
/// interning table, since the simulator's symbol universe is tiny and
/// string equality is not a hot path. Kept as its own type (rather than a
/// bare `String`) so call sites read as "this is a market identifier," not
/// "this is arbitrary text."
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Symbol(pub String);

impl Symbol {
    pub fn new(name: impl Into<String>) -> Self {
        Symbol(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Symbol(s.to_string())
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Symbol(s)
    }
}

/// A non-owning handle to an agent, resolved through an `AgentRegistry`.
///
/// Orders and trade records carry an `AgentId`, never a reference to the
/// agent itself: the matching engine must not know or care what kind of
/// agent placed an order, and an agent's own bookkeeping (recording a fill,
/// rebuilding a reserve ladder) happens strictly after the match, once the
/// registry resolves the id back to a mutable agent.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct AgentId(pub u64);

static NEXT_AGENT_ID: AtomicU64 = AtomicU64::new(1);

impl AgentId {
    /// Allocates a fresh, process-unique id.
    pub fn fresh() -> Self {
        AgentId(NEXT_AGENT_ID.fetch_add(1, AtomicOrdering::Relaxed))
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "agent#{}", self.0)
    }
}

/// An order's price: either a market order (fill at whatever the book
/// offers) or a limit at a specific value.
///
/// Replaces the NaN/`None` sentinel the original model used for "no limit
/// set" with a tagged variant, so a market order can never be mistaken for,
/// or silently compared against, an actual price.
#[derive(Clone, Copy, Debug)]
pub enum Price {
    /// Take whatever price the book offers.
    Market,
    /// Limited to this value or better.
    Limited(f64),
}

impl Price {
    /// Sort key for the buy side: market orders compare as `+infinity` so
    /// they always outrank any limit and sit at the end of an
    /// ascending-sorted buy book (best bid last).
    pub fn buy_key(&self) -> f64 {
        match self {
            Price::Market => f64::INFINITY,
            Price::Limited(p) => *p,
        }
    }

    /// Sort key for the sell side: market orders compare as `-infinity` so
    /// they always outrank any limit and sit at the front of an
    /// ascending-sorted sell book (best ask first).
    pub fn sell_key(&self) -> f64 {
        match self {
            Price::Market => f64::NEG_INFINITY,
            Price::Limited(p) => *p,
        }
    }

    pub fn is_market(&self) -> bool {
        matches!(self, Price::Market)
    }

    pub fn limited(&self) -> Option<f64> {
        match self {
            Price::Market => None,
            Price::Limited(p) => Some(*p),
        }
    }
}

impl PartialEq for Price {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Price::Market, Price::Market) => true,
            (Price::Limited(a), Price::Limited(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Price::Market => write!(f, "MKT"),
            Price::Limited(p) => write!(f, "{:.4}", p),
        }
    }
}
