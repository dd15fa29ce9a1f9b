//! Periodic tick source driving paced emission.
//!
//! A dedicated thread owns the schedule and delivers [`Tick`]s over a
//! bounded(1) channel. The thread touches no other state, so a tick that
//! has not been consumed yet simply coalesces with the next one -- the same
//! semantics as the pending flag an async timer notification would set.

use crate::error::{Error, Result};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// One firing of the output timer: the demand to emit exactly one byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick;

enum Schedule {
    Periodic { delay: Duration, period: Duration },
    OneShot { delay: Duration },
    Disarm,
}

/// Re-armable periodic/one-shot timer.
///
/// Dropping the handle disconnects the command channel and stops the
/// thread.
pub struct TickTimer {
    commands: Sender<Schedule>,
    ticks: Receiver<Tick>,
}

impl TickTimer {
    pub fn spawn() -> Result<Self> {
        let (commands, command_rx) = bounded(4);
        let (tick_tx, ticks) = bounded(1);
        thread::Builder::new()
            .name("tick-timer".to_string())
            .spawn(move || timer_thread(command_rx, tick_tx))?;
        Ok(Self { commands, ticks })
    }

    /// First tick after one `period`, then one every `period` thereafter.
    /// Replaces any previous schedule.
    pub fn arm_periodic(&self, period: Duration) -> Result<()> {
        self.send(Schedule::Periodic {
            delay: period,
            period,
        })
    }

    /// A single tick after `delay`, then silence until re-armed.
    pub fn arm_oneshot(&self, delay: Duration) -> Result<()> {
        self.send(Schedule::OneShot { delay })
    }

    pub fn disarm(&self) -> Result<()> {
        self.send(Schedule::Disarm)
    }

    pub fn ticks(&self) -> &Receiver<Tick> {
        &self.ticks
    }

    fn send(&self, schedule: Schedule) -> Result<()> {
        self.commands.send(schedule).map_err(|_| Error::TimerGone)
    }
}

fn timer_thread(commands: Receiver<Schedule>, ticks: Sender<Tick>) {
    // (deadline, period); no period means one-shot.
    let mut armed: Option<(Instant, Option<Duration>)> = None;
    loop {
        match armed {
            None => match commands.recv() {
                Ok(schedule) => apply(schedule, &mut armed),
                Err(_) => break,
            },
            Some((deadline, period)) => {
                let now = Instant::now();
                if now >= deadline {
                    // A tick still pending on the channel absorbs this one.
                    let _ = ticks.try_send(Tick);
                    // Advance from the previous deadline, not from now, so
                    // the cadence does not drift under scheduling jitter.
                    armed = period.map(|p| (deadline + p, Some(p)));
                    continue;
                }
                match commands.recv_timeout(deadline - now) {
                    Ok(schedule) => apply(schedule, &mut armed),
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        }
    }
    debug!("tick timer thread exiting");
}

fn apply(schedule: Schedule, armed: &mut Option<(Instant, Option<Duration>)>) {
    *armed = match schedule {
        Schedule::Periodic { delay, period } => {
            trace!(?period, "timer armed periodic");
            Some((Instant::now() + delay, Some(period)))
        }
        Schedule::OneShot { delay } => {
            trace!(?delay, "timer armed one-shot");
            Some((Instant::now() + delay, None))
        }
        Schedule::Disarm => {
            trace!("timer disarmed");
            None
        }
    };
}
