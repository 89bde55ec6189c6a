//! Time constants and the small numeric helpers the rest of the crate leans
//! on: range scaling, tolerance comparison, clamping, and a natural-sort key.
//!
//! Grounded on `holofuel/model/__init__.py`'s `near`, `clamp`, `scale`, and
//! `natural` helpers.

use std::cmp::Ordering;
use std::time::{SystemTime, UNIX_EPOCH};

/// One second, in the simulator's time unit (seconds).
pub const SECOND: f64 = 1.0;
/// One minute.
pub const MINUTE: f64 = 60.0 * SECOND;
/// One hour.
pub const HOUR: f64 = 60.0 * MINUTE;
/// One day.
pub const DAY: f64 = 24.0 * HOUR;
/// One (Gregorian-average) year: 365 days plus a leap-day quarter.
pub const YEAR: f64 = 365.25 * DAY;
/// One month, as a twelfth of a year.
pub const MONTH: f64 = YEAR / 12.0;

/// A source of wall-clock time, injectable so tests never depend on the
/// real clock. [`WallClock`] is the only production implementation.
pub trait Clock {
    fn now(&self) -> f64;
}

/// The real wall clock, in seconds since the Unix epoch.
#[derive(Clone, Copy, Debug, Default)]
pub struct WallClock;

impl Clock for WallClock {
    fn now(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before Unix epoch")
            .as_secs_f64()
    }
}

/// True if `a` and `b` are within `significance` of each other, relative to
/// their magnitude (falls back to absolute comparison near zero).
pub fn near(a: f64, b: f64, significance: f64) -> bool {
    let scale = a.abs().max(b.abs()).max(1.0);
    (a - b).abs() <= significance * scale
}

/// `near` with the default significance of `1e-4`.
pub fn near_default(a: f64, b: f64) -> bool {
    near(a, b, 1e-4)
}

/// Clamp `val` to `[lo, hi]`. Either bound may be absent to leave that side
/// unclamped.
pub fn clamp(val: f64, lo: Option<f64>, hi: Option<f64>) -> f64 {
    let mut v = val;
    if let Some(lo) = lo {
        v = v.max(lo);
    }
    if let Some(hi) = hi {
        v = v.min(hi);
    }
    v
}

/// Map `val` from domain `dom` to range `rng`, optionally raised to
/// `exponent` before scaling and optionally clamped to `rng` afterward.
///
/// `dom` and `rng` are `(low, high)` pairs; `dom.0` may be greater than
/// `dom.1` to invert the mapping.
pub fn scale(val: f64, dom: (f64, f64), rng: (f64, f64), clamped: bool, exponent: f64) -> f64 {
    let (d0, d1) = dom;
    let (r0, r1) = rng;
    let span = d1 - d0;
    let proportion = if span == 0.0 { 0.0 } else { (val - d0) / span };
    let proportion = if exponent != 1.0 {
        proportion.signum() * proportion.abs().powf(exponent)
    } else {
        proportion
    };
    let out = r0 + proportion * (r1 - r0);
    if clamped {
        let (lo, hi) = if r0 <= r1 { (r0, r1) } else { (r1, r0) };
        clamp(out, Some(lo), Some(hi))
    } else {
        out
    }
}

/// One token of a natural-sort key: runs of digits compare numerically,
/// everything else compares as text. Numeric tokens sort before textual
/// ones at the same position.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum NaturalToken {
    Num(u64),
    Text(String),
}

/// A natural-sort key for `s`: `"item2"` sorts before `"item10"`.
pub fn natural_key(s: &str) -> Vec<NaturalToken> {
    let mut tokens = Vec::new();
    let mut chars = s.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_ascii_digit() {
            let mut digits = String::new();
            while let Some(&d) = chars.peek() {
                if d.is_ascii_digit() {
                    digits.push(d);
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(NaturalToken::Num(digits.parse().unwrap_or(u64::MAX)));
        } else {
            let mut text = String::new();
            while let Some(&d) = chars.peek() {
                if d.is_ascii_digit() {
                    break;
                }
                text.push(d);
                chars.next();
            }
            tokens.push(NaturalToken::Text(text));
        }
    }
    tokens
}

/// Compares two strings by their natural-sort key.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    natural_key(a).cmp(&natural_key(b))
}
