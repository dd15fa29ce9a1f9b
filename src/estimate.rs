//! Initial rate estimation against live input.

use crate::error::{Error, Result};
use crate::ring::DelayRing;
use crate::timer::TickTimer;
use crossbeam_channel::{select, Receiver};
use std::time::Duration;
use tracing::debug;

/// Length of the sampling window.
pub const SAMPLE_WINDOW: Duration = Duration::from_micros(999_999);

/// Largest byte count the window can express at microsecond-per-byte
/// granularity.
const MAX_WINDOW_BYTES: u64 = 999_999;

/// Derive the per-byte output interval by timing live input for about one
/// second. Bytes read during the window land in `ring`, so nothing is lost
/// to the measurement. Used only for streaming sources with no explicit
/// interval; a window with fewer than 1 or more than 999 999 bytes is
/// fatal.
pub fn estimate_interval(
    bytes: &Receiver<u8>,
    timer: &TickTimer,
    ring: &mut DelayRing,
) -> Result<u64> {
    sample(bytes, timer, ring, SAMPLE_WINDOW)
}

pub(crate) fn sample(
    bytes: &Receiver<u8>,
    timer: &TickTimer,
    ring: &mut DelayRing,
    window: Duration,
) -> Result<u64> {
    // One byte up front, untimed, to absorb upstream start-up latency.
    if let Ok(byte) = bytes.recv() {
        ring.push(byte);
    }

    timer.arm_oneshot(window)?;
    let mut bytes_read: u64 = 0;
    let window_closed = loop {
        select! {
            recv(timer.ticks()) -> tick => match tick {
                Ok(_) => break true,
                Err(_) => return Err(Error::TimerGone),
            },
            recv(bytes) -> byte => match byte {
                Ok(b) => {
                    bytes_read += 1;
                    ring.push(b);
                }
                // End of stream. A tick that fired in the same instant is
                // still sitting in the channel; it closed the window.
                Err(_) => break timer.ticks().try_recv().is_ok(),
            },
        }
    };

    if !window_closed || bytes_read < 1 {
        return Err(Error::NotEnoughInput);
    }
    if bytes_read > MAX_WINDOW_BYTES {
        return Err(Error::InputRateTooHigh);
    }
    let interval_us = 1_000_000 / bytes_read;
    debug!(bytes_read, interval_us, "input rate estimated");
    Ok(interval_us)
}
