//! Top-level control loop: ingestion, cushioning, and paced emission.

use crate::error::{Error, Result};
use crate::estimate;
use crate::pacer::{Pacer, DRIFT_LIMIT, MAX_INTERVAL_US, SLOW_DOWN, SPEED_UP};
use crate::ring::DelayRing;
use crate::timer::TickTimer;
use crossbeam_channel::{select, Receiver};
use std::io::Write;
use std::time::Duration;
use tracing::{debug, trace};

/// Where the engine is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Estimating,
    Streaming,
    Draining,
    Done,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Microseconds per output byte. `None` means estimate the rate from
    /// one second of live input.
    pub interval_us: Option<u64>,
    /// Input is a regular file: the configured rate is authoritative and
    /// corrections are disabled.
    pub fixed_rate: bool,
    /// Delay ring capacity in bytes.
    pub ring_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            interval_us: None,
            fixed_rate: false,
            ring_capacity: DelayRing::DEFAULT_CAPACITY,
        }
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub bytes_out: u64,
    pub corrections: u64,
    pub final_interval_us: u64,
}

/// The stream engine: owns the ring, the byte feed, the tick timer, and
/// the output sink, and moves through `Estimating -> Streaming -> Draining
/// -> Done`.
pub struct StreamEngine<W: Write> {
    config: EngineConfig,
    bytes: Receiver<u8>,
    timer: TickTimer,
    out: W,
    ring: DelayRing,
    phase: Phase,
    /// Net bytes-in minus bytes-out since the last correction; the
    /// controller's error signal.
    bytes_buffered: i64,
    bytes_out: u64,
    corrections: u64,
}

impl<W: Write> StreamEngine<W> {
    pub fn new(config: EngineConfig, bytes: Receiver<u8>, timer: TickTimer, out: W) -> Self {
        let ring = DelayRing::new(config.ring_capacity);
        Self {
            config,
            bytes,
            timer,
            out,
            ring,
            phase: Phase::Estimating,
            bytes_buffered: 0,
            bytes_out: 0,
            corrections: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Run to completion: resolve the initial interval, stream until the
    /// input ends, then drain the ring.
    pub fn run(&mut self) -> Result<RunReport> {
        let interval_us = self.initial_interval()?;
        let mut pacer = Pacer::new(interval_us, self.config.fixed_rate);

        self.enter(Phase::Streaming);
        self.timer
            .arm_periodic(Duration::from_micros(pacer.interval_us()))?;
        self.stream(&mut pacer)?;

        self.enter(Phase::Draining);
        self.drain()?;

        self.enter(Phase::Done);
        Ok(RunReport {
            bytes_out: self.bytes_out,
            corrections: self.corrections,
            final_interval_us: pacer.interval_us(),
        })
    }

    fn initial_interval(&mut self) -> Result<u64> {
        match self.config.interval_us {
            Some(us) if us == 0 || us >= MAX_INTERVAL_US => {
                Err(Error::InvalidInterval(us.to_string()))
            }
            Some(us) => {
                self.prime(us);
                Ok(us)
            }
            None if self.config.fixed_rate => Err(Error::IntervalRequired),
            None => estimate::estimate_interval(&self.bytes, &self.timer, &mut self.ring),
        }
    }

    /// Pre-fill the ring with about one second of data so the first ticks
    /// have bytes to emit.
    fn prime(&mut self, interval_us: u64) {
        let want = 1_000_000 / interval_us + 1;
        for _ in 0..want {
            match self.bytes.recv() {
                Ok(b) => self.ring.push(b),
                Err(_) => break,
            }
        }
        trace!(buffered = self.ring.len(), "ring primed");
    }

    /// Streaming loop: service ticks and arriving bytes until the input
    /// disconnects. Both events are polled every iteration; the select
    /// picks randomly among ready channels, so neither side can starve the
    /// other.
    fn stream(&mut self, pacer: &mut Pacer) -> Result<()> {
        let ticks = self.timer.ticks().clone();
        let bytes = self.bytes.clone();
        loop {
            select! {
                recv(ticks) -> tick => {
                    if tick.is_err() {
                        return Err(Error::TimerGone);
                    }
                    self.on_tick(pacer)?;
                }
                recv(bytes) -> byte => match byte {
                    Ok(b) => {
                        self.bytes_buffered += 1;
                        // Possible eviction under sustained overrun; an
                        // accepted degradation, not an error.
                        self.ring.push(b);
                    }
                    Err(_) => return Ok(()), // end of stream
                },
            }

            // Bang-bang correction, fired only at threshold crossings.
            if self.bytes_buffered > DRIFT_LIMIT {
                self.correct(pacer, SPEED_UP)?;
                self.bytes_buffered = 0;
            } else if self.bytes_buffered < -DRIFT_LIMIT {
                self.correct(pacer, SLOW_DOWN)?;
                self.bytes_buffered = 0;
            }
        }
    }

    /// One elapsed timer period: exactly one byte of output demand.
    fn on_tick(&mut self, pacer: &mut Pacer) -> Result<()> {
        self.bytes_buffered -= 1;
        match self.ring.pop() {
            Some(b) => self.emit(b)?,
            None => {
                // The pacer has outrun the data; slow down immediately
                // instead of waiting for the drift threshold.
                trace!("tick with empty ring, forcing slow-down");
                self.correct(pacer, SLOW_DOWN)?;
            }
        }
        Ok(())
    }

    /// Apply one correction step and re-arm the timer if the interval
    /// moved. A fixed-rate pacer reports no movement, so the timer is left
    /// alone.
    fn correct(&mut self, pacer: &mut Pacer, factor: f64) -> Result<()> {
        let prev = pacer.interval_us();
        let next = pacer.correct(factor)?;
        if next != prev {
            self.corrections += 1;
            self.timer.arm_periodic(Duration::from_micros(next))?;
        }
        Ok(())
    }

    /// Input is finished: emit one buffered byte per tick until the ring
    /// reports empty. The interval stays frozen at its last streaming
    /// value.
    fn drain(&mut self) -> Result<()> {
        while self.timer.ticks().recv().is_ok() {
            match self.ring.pop() {
                Some(b) => self.emit(b)?,
                None => return Ok(()),
            }
        }
        Err(Error::TimerGone)
    }

    fn emit(&mut self, byte: u8) -> Result<()> {
        // Flush per byte: every tick's emission must be immediately
        // observable downstream.
        self.out.write_all(&[byte])?;
        self.out.flush()?;
        self.bytes_out += 1;
        Ok(())
    }

    fn enter(&mut self, phase: Phase) {
        debug!(from = ?self.phase, to = ?phase, "phase transition");
        self.phase = phase;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::{bounded, unbounded};

    fn make_engine(
        interval_us: Option<u64>,
        fixed_rate: bool,
        bytes: Receiver<u8>,
    ) -> StreamEngine<Vec<u8>> {
        let config = EngineConfig {
            interval_us,
            fixed_rate,
            ..Default::default()
        };
        let timer = TickTimer::spawn().unwrap();
        StreamEngine::new(config, bytes, timer, Vec::new())
    }

    #[test]
    fn test_file_source_without_interval_is_fatal() {
        let (tx, rx) = bounded::<u8>(1);
        let mut engine = make_engine(None, true, rx);
        assert!(matches!(engine.run(), Err(Error::IntervalRequired)));
        drop(tx);
    }

    #[test]
    fn test_out_of_range_interval_is_rejected() {
        let (_tx, rx) = bounded::<u8>(1);
        let mut engine = make_engine(Some(0), false, rx);
        assert!(matches!(engine.run(), Err(Error::InvalidInterval(_))));

        let (_tx2, rx) = bounded::<u8>(1);
        let mut engine2 = make_engine(Some(1_000_000), false, rx);
        assert!(matches!(engine2.run(), Err(Error::InvalidInterval(_))));
    }

    #[test]
    fn test_empty_stream_without_interval_fails_estimation() {
        let (tx, rx) = bounded::<u8>(1);
        drop(tx);
        let mut engine = make_engine(None, false, rx);
        assert!(matches!(engine.run(), Err(Error::NotEnoughInput)));
        assert!(engine.out.is_empty());
    }

    #[test]
    fn test_tick_on_empty_ring_forces_slow_down() {
        let (_tx, rx) = bounded::<u8>(1);
        let mut engine = make_engine(Some(1_000), false, rx);
        let mut pacer = Pacer::new(1_000, false);

        engine.on_tick(&mut pacer).unwrap();

        assert_eq!(pacer.interval_us(), 1_050);
        assert_eq!(engine.bytes_buffered, -1);
        assert_eq!(engine.corrections, 1);
        assert!(engine.out.is_empty());
    }

    #[test]
    fn test_tick_emits_oldest_buffered_byte() {
        let (_tx, rx) = bounded::<u8>(1);
        let mut engine = make_engine(Some(1_000), false, rx);
        let mut pacer = Pacer::new(1_000, false);
        engine.ring.push(7);
        engine.ring.push(8);

        engine.on_tick(&mut pacer).unwrap();

        assert_eq!(engine.out, vec![7]);
        assert_eq!(pacer.interval_us(), 1_000);
        assert_eq!(engine.corrections, 0);
    }

    #[test]
    fn test_fixed_rate_underrun_leaves_timer_alone() {
        let (_tx, rx) = bounded::<u8>(1);
        let mut engine = make_engine(Some(1_000), true, rx);
        let mut pacer = Pacer::new(1_000, true);

        engine.on_tick(&mut pacer).unwrap();

        assert_eq!(pacer.interval_us(), 1_000);
        assert_eq!(engine.corrections, 0);
    }

    #[test]
    fn test_drain_emits_residue_in_order() {
        let (tx, rx) = unbounded();
        drop(tx);
        let mut engine = make_engine(Some(1_000), false, rx);
        engine
            .timer
            .arm_periodic(Duration::from_micros(500))
            .unwrap();
        for b in [1u8, 2, 3, 4, 5] {
            engine.ring.push(b);
        }

        engine.drain().unwrap();

        assert_eq!(engine.out, vec![1, 2, 3, 4, 5]);
        assert!(engine.ring.is_empty());
    }
}
