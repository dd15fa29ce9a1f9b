//! Crate-level error type.
//!
//! Every variant is terminal by design: the binary reports it on stderr and
//! exits with status 1. Ring eviction and under-run corrections are part of
//! the normal feedback loop and never surface here.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A correction pushed the interval below the 10 us fence.
    #[error("maximum output rate is 100KB/sec")]
    RateCeiling,

    /// A correction pushed the interval past the one-second fence.
    #[error("minimum output rate is 1B/sec")]
    RateFloor,

    /// The sampling window closed with no data, or the input ended before
    /// the window did.
    #[error("not enough input to estimate data rate")]
    NotEnoughInput,

    /// More bytes arrived in the sampling window than a microsecond-per-byte
    /// interval can express.
    #[error("input data rate is too high")]
    InputRateTooHigh,

    /// A regular file has no arrival rate to estimate.
    #[error("an interval must be given when reading from a regular file")]
    IntervalRequired,

    #[error("invalid interval '{0}': must be an integer greater than 0 and less than 1e6")]
    InvalidInterval(String),

    #[error("tick timer stopped unexpectedly")]
    TimerGone,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
