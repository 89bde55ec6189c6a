//! # holobourse
//!
//! A discrete-event, multi-agent market simulator used to model the
//! economics of a wealth-backed, value-stable currency. Virtual time
//! advances in fixed quanta; on each quantum, autonomous agents place or
//! cancel orders on one or more markets, and a central matching engine
//! resolves overlapping orders into executed trades. Specialized reserve
//! agents inject liquidity by continuously re-posting buy orders from a
//! price-indexed inventory, or by issuing a capped stream of sell orders at
//! a premium over book value.
//!
//! ## Quick start
//!
//! ```
//! use holobourse::{Agent, AgentRegistry, BasicAgent, Engine, Exchange, Order, Price, Symbol, World};
//!
//! let world = World::new(0.0, 1.0, 1.0);
//! let mut exchange = Exchange::new("USD");
//! let mut registry = AgentRegistry::new();
//! let buyer = registry.insert(Box::new(BasicAgent::new("buyer", 0.0, 1.0)));
//! let seller = registry.insert(Box::new(BasicAgent::new("seller", 0.0, 1.0)));
//!
//! exchange
//!     .enter(Order::new(Symbol::new("HOT"), Price::Limited(1.0), Symbol::new("USD"), 0.0, 10.0, buyer), false)
//!     .unwrap();
//! exchange
//!     .enter(Order::new(Symbol::new("HOT"), Price::Limited(1.0), Symbol::new("USD"), 0.0, -10.0, seller), false)
//!     .unwrap();
//!
//! let mut engine = Engine::new(world, exchange, registry);
//! engine.cycle(0.0);
//! assert_eq!(engine.registry.get(buyer).unwrap().balance(), Some(-10.0));
//! ```

pub mod actor;
pub mod agent;
pub mod control;
pub mod engine;
pub mod error;
pub mod exchange;
pub mod market;
pub mod numerics;
pub mod order;
pub mod reserve;
pub mod types;
pub mod world;

pub use actor::{Actor, Need};
pub use agent::{Agent, AgentCore, AgentRegistry, BasicAgent, Compatibility};
pub use control::{Controller, Gains, OutputLimits};
pub use engine::{Engine, EngineStatus};
pub use error::SimError;
pub use exchange::Exchange;
pub use market::{Market, MarketPrices};
pub use numerics::{Clock, WallClock, DAY, HOUR, MINUTE, MONTH, SECOND, YEAR};
pub use order::{Order, Side};
pub use reserve::{IssuingReserveAgent, Ladder, ReserveAgent};
pub use types::{AgentId, Price, Symbol};
pub use world::{World, WorldRealtime};
