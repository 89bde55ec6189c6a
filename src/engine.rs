//! Drives the main loop: pull `now` from a [`World`], let every agent act,
//! then settle the tick's matching. Grounded on
//! `holofuel/model/engine.py`'s `engine`/`engine_status`.

use crate::agent::AgentRegistry;
use crate::exchange::Exchange;
use crate::world::World;

/// Runs a fixed-quantum simulation to completion.
pub struct Engine {
    pub world: World,
    pub exchange: Exchange,
    pub registry: AgentRegistry,
}

impl Engine {
    pub fn new(world: World, exchange: Exchange, registry: AgentRegistry) -> Self {
        Engine { world, exchange, registry }
    }

    /// Runs every agent and settles matching for one tick.
    pub fn cycle(&mut self, now: f64) {
        let ids: Vec<_> = self.registry.ids().to_vec();
        for id in ids {
            self.registry.run(id, &mut self.exchange, now);
        }
        self.exchange.execute_all(now, &mut self.registry);
    }

    pub fn run(&mut self) {
        while !self.world.finished() {
            let now = self.world.now;
            self.cycle(now);
            self.world.advance();
        }
    }
}

/// Wraps [`Engine::run`] with a status callback fired once per
/// `status_period` boundary crossed, plus a final call with `None` on exit
/// (the original's `engine_status.__exit__` hook, given an explicit name
/// here rather than relying on context-manager teardown; see DESIGN.md).
pub struct EngineStatus<F: FnMut(Option<f64>)> {
    pub engine: Engine,
    pub status_period: f64,
    callback: F,
    last_bucket: Option<i64>,
}

impl<F: FnMut(Option<f64>)> EngineStatus<F> {
    pub fn new(engine: Engine, status_period: f64, callback: F) -> Self {
        EngineStatus {
            engine,
            status_period,
            callback,
            last_bucket: None,
        }
    }

    pub fn run(&mut self) {
        while !self.engine.world.finished() {
            let now = self.engine.world.now;
            let bucket = (now / self.status_period).floor() as i64;
            if self.last_bucket != Some(bucket) {
                self.last_bucket = Some(bucket);
                (self.callback)(Some(now));
            }
            self.engine.cycle(now);
            self.engine.world.advance();
        }
        (self.callback)(None);
    }
}
