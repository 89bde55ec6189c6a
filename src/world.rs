//! Virtual-time generators driving the engine's main loop. Grounded on
//! `holofuel/model/world.py`'s `world`/`world_realtime` pair.

use crate::error::SimError;
use crate::numerics::Clock;

/// A fixed-quantum virtual clock: `now` starts at `start` and advances by
/// exactly `quanta` each step, independent of wall-clock time.
pub struct World {
    pub start: f64,
    pub duration: f64,
    pub quanta: f64,
    pub now: f64,
}

impl World {
    pub fn new(start: f64, duration: f64, quanta: f64) -> Self {
        World {
            start,
            duration,
            quanta,
            now: start,
        }
    }

    pub fn advance(&mut self) {
        self.now += self.quanta;
    }

    pub fn finished(&self) -> bool {
        self.now >= self.start + self.duration
    }

    /// Iterates `now` values from `start` up to (exclusive of) the first
    /// value `>= start + duration`.
    pub fn periods(&mut self) -> WorldPeriods<'_> {
        WorldPeriods { world: self, done: false }
    }
}

pub struct WorldPeriods<'a> {
    world: &'a mut World,
    done: bool,
}

impl<'a> Iterator for WorldPeriods<'a> {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        if self.done || self.world.finished() {
            self.done = true;
            return None;
        }
        let now = self.world.now;
        self.world.advance();
        Some(now)
    }
}

/// A virtual clock scaled against real wall-clock time: `now` advances at
/// `scale` virtual seconds per real second, rather than in fixed steps.
/// Cannot use a fixed quanta; [`World::periods`]'s equivalent here is
/// driven by repeatedly sampling `advance`.
pub struct WorldRealtime<C: Clock> {
    pub clock: C,
    pub start: f64,
    pub duration: f64,
    pub scale: f64,
    pub now: f64,
    wall_start: f64,
}

impl<C: Clock> WorldRealtime<C> {
    pub fn new(clock: C, start: f64, duration: f64, scale: f64) -> Self {
        let wall_start = clock.now();
        WorldRealtime {
            clock,
            start,
            duration,
            scale,
            now: start,
            wall_start,
        }
    }

    /// Constructs directly, rejecting a fixed quanta — `WorldRealtime` has
    /// no quanta concept and the constructor signature shares an error path
    /// with `World` for callers that build either variant generically.
    pub fn try_new(clock: C, start: f64, duration: f64, scale: f64, quanta: Option<f64>) -> Result<Self, SimError> {
        if quanta.is_some() {
            return Err(SimError::RealtimeQuantumForbidden);
        }
        Ok(Self::new(clock, start, duration, scale))
    }

    pub fn advance(&mut self) {
        let wall_now = self.clock.now();
        self.now = self.start + (wall_now - self.wall_start) * self.scale;
    }

    pub fn finished(&self) -> bool {
        self.now >= self.start + self.duration
    }

    /// Changes `scale` while preserving the current `now`, by synthesizing a
    /// new virtual `start` and wall-clock origin as of this instant.
    pub fn rescale(&mut self, scale: f64) {
        self.start = self.now;
        self.wall_start = self.clock.now();
        self.scale = scale;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numerics::SECOND;

    #[derive(Default)]
    struct FakeClock {
        t: std::cell::Cell<f64>,
    }

    impl Clock for FakeClock {
        fn now(&self) -> f64 {
            self.t.get()
        }
    }

    #[test]
    fn world_periods_advances_by_quanta_and_stops() {
        let mut world = World::new(0.0, 10.0, 5.0);
        let periods: Vec<f64> = world.periods().collect();
        assert_eq!(periods, vec![0.0, 5.0]);
    }

    #[test]
    fn realtime_advance_tracks_wall_clock_scaled() {
        let clock = FakeClock::default();
        clock.t.set(100.0);
        let mut world = WorldRealtime::new(clock, 0.0, 1000.0 * SECOND, 2.0);
        world.clock.t.set(105.0);
        world.advance();
        assert_eq!(world.now, 10.0);
    }

    #[test]
    fn rescale_preserves_now() {
        let clock = FakeClock::default();
        clock.t.set(0.0);
        let mut world = WorldRealtime::new(clock, 0.0, 1000.0, 1.0);
        world.clock.t.set(10.0);
        world.advance();
        assert_eq!(world.now, 10.0);
        world.rescale(4.0);
        world.clock.t.set(15.0);
        world.advance();
        assert_eq!(world.now, 30.0);
    }

    #[test]
    fn try_new_rejects_fixed_quanta() {
        let clock = FakeClock::default();
        let result = WorldRealtime::try_new(clock, 0.0, 100.0, 1.0, Some(5.0));
        assert_eq!(result.err(), Some(SimError::RealtimeQuantumForbidden));
    }
}
