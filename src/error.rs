//! The simulator's error taxonomy.
//!
//! Only conditions the caller must handle become `SimError` variants. A book
//! with nothing to match against is not an error (the matcher silently
//! stops); an over-volume query is logged and ignored at its one call site
//! rather than propagated; a negative reserve tranche is a programming
//! error and trips a `debug_assert!`, not a `Result`.

use thiserror::Error;

/// Failure conditions raised by order entry, agent balance updates, and
/// world construction.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum SimError {
    /// An order's currency does not match the market or agent's currency.
    #[error("wrong currency")]
    WrongCurrency,
    /// An order's security does not match the market it was entered on.
    #[error("wrong security")]
    WrongSecurity,
    /// An agent's own buy and sell orders would cross each other.
    #[error("self-trade rejected")]
    SelfTradeError,
    /// An agent attempted a balance operation with no currency configured.
    #[error("no currency configured for this agent")]
    NoCurrency,
    /// `WorldRealtime` does not support a fixed quantum.
    #[error("a realtime world cannot use a fixed quantum")]
    RealtimeQuantumForbidden,
}
