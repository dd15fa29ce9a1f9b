//! Closed-loop interval correction.

use crate::error::{Error, Result};
use tracing::debug;

/// Hard fences on the per-byte interval, in microseconds. Crossing either
/// one is a fatal, user-visible error rather than a silent clamp.
pub const MIN_INTERVAL_US: u64 = 10;
pub const MAX_INTERVAL_US: u64 = 1_000_000;

/// Correction factors: shrink the interval when the cushion is filling
/// (output lagging behind input), grow it when the cushion is draining.
pub const SPEED_UP: f64 = 0.95;
pub const SLOW_DOWN: f64 = 1.05;

/// Net input-vs-output imbalance, in bytes, that triggers a correction.
pub const DRIFT_LIMIT: i64 = 1024;

/// Current per-byte emission interval plus the correction law.
///
/// A fixed-rate pacer (regular-file input) never moves: a file has no
/// arrival rate to track, so the configured interval is authoritative.
#[derive(Debug, Clone)]
pub struct Pacer {
    interval_us: u64,
    fixed_rate: bool,
}

impl Pacer {
    pub fn new(interval_us: u64, fixed_rate: bool) -> Self {
        Self {
            interval_us,
            fixed_rate,
        }
    }

    pub fn interval_us(&self) -> u64 {
        self.interval_us
    }

    pub fn is_fixed_rate(&self) -> bool {
        self.fixed_rate
    }

    /// Scale the interval by `factor` and fence it, returning the new
    /// interval; the caller re-arms the timer with it. The fences are
    /// checked on the scaled value before truncation so a crossing cannot
    /// hide behind integer rounding.
    pub fn correct(&mut self, factor: f64) -> Result<u64> {
        if self.fixed_rate {
            return Ok(self.interval_us);
        }
        let scaled = self.interval_us as f64 * factor;
        if scaled < MIN_INTERVAL_US as f64 {
            return Err(Error::RateCeiling);
        }
        if scaled > MAX_INTERVAL_US as f64 {
            return Err(Error::RateFloor);
        }
        let prev = self.interval_us;
        self.interval_us = scaled as u64;
        debug!(prev, next = self.interval_us, factor, "interval corrected");
        Ok(self.interval_us)
    }

    pub fn speed_up(&mut self) -> Result<u64> {
        self.correct(SPEED_UP)
    }

    pub fn slow_down(&mut self) -> Result<u64> {
        self.correct(SLOW_DOWN)
    }
}
