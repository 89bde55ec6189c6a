//! A PID loop with integral anti-windup and bumpless transfer, grounded on
//! `holofuel/model/control/pid.py`'s `controller`.

use crate::numerics::clamp;

/// Proportional, integral, and derivative gains.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Gains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

impl Gains {
    pub fn new(kp: f64, ki: f64, kd: f64) -> Self {
        Gains { kp, ki, kd }
    }
}

/// Output saturation limits; `None` on either side means unbounded.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct OutputLimits {
    pub lo: Option<f64>,
    pub hi: Option<f64>,
}

/// A PID loop. Construction performs a bumpless transfer so the first
/// `loop_` call does not produce a step change in output.
#[derive(Debug)]
pub struct Controller {
    pub gains: Gains,
    pub limits: OutputLimits,
    setpoint: f64,
    process: f64,
    output: f64,
    now: f64,
    p: f64,
    i: f64,
    d: f64,
}

impl Controller {
    pub fn new(gains: Gains, setpoint: f64, process: f64, output: f64, limits: OutputLimits, now: f64) -> Self {
        let mut c = Controller {
            gains,
            limits,
            setpoint,
            process,
            output,
            now,
            p: 0.0,
            i: 0.0,
            d: 0.0,
        };
        c.bumpless(Some(setpoint), Some(process), Some(output), Some(now));
        c
    }

    /// Recomputes `P`/`I`/`D` so that, with an unchanged setpoint and
    /// process value, the next `loop_` call produces no differential
    /// output. `I` is solved backward from the current output.
    pub fn bumpless(&mut self, setpoint: Option<f64>, process: Option<f64>, output: Option<f64>, now: Option<f64>) {
        if let Some(s) = setpoint {
            self.setpoint = s;
        }
        if let Some(p) = process {
            self.process = p;
        }
        if let Some(o) = output {
            self.output = o;
        }
        if let Some(n) = now {
            self.now = n;
        }

        self.p = self.setpoint - self.process;
        self.i = if self.gains.ki != 0.0 {
            (self.output - self.p * self.gains.kp) / self.gains.ki
        } else {
            0.0
        };
        self.d = 0.0;
    }

    /// Advances the loop to `now`, optionally moving the setpoint or
    /// process value, and returns the (possibly saturated) drive.
    pub fn loop_(&mut self, setpoint: Option<f64>, process: Option<f64>, now: f64) -> f64 {
        let mut d_setpoint = 0.0;
        if let Some(s) = setpoint {
            d_setpoint = s - self.setpoint;
            self.setpoint = s;
        }
        if let Some(p) = process {
            self.process = p;
        }
        if now > self.now {
            let dt = now - self.now;
            self.now = now;
            let p = self.setpoint - self.process;
            let i = self.i + p * dt;
            let d = (p - self.p - d_setpoint) / dt;
            self.output = p * self.gains.kp + i * self.gains.ki + d * self.gains.kd;
            self.p = p;
            let windup_low = self.limits.lo.is_some_and(|lo| self.output < lo) && i < self.i;
            let windup_high = self.limits.hi.is_some_and(|hi| self.output > hi) && i > self.i;
            if !windup_low && !windup_high {
                self.i = i;
            }
            self.d = d;
        }
        self.drive()
    }

    /// The output clamped to `limits`, or the raw output if unbounded.
    pub fn drive(&self) -> f64 {
        if self.limits.lo.is_none() && self.limits.hi.is_none() {
            self.output
        } else {
            clamp(self.output, self.limits.lo, self.limits.hi)
        }
    }

    pub fn output(&self) -> f64 {
        self.output
    }
}
