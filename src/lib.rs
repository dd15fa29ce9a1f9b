//! # pacebuf - adaptive byte-stream pacing
//!
//! Reshapes a bursty byte stream into a steadily paced one. Incoming bytes
//! are cushioned in a fixed-capacity [`DelayRing`] and emitted one per
//! timer tick; the tick period is either given explicitly (microseconds per
//! byte) or estimated from one second of live input, and is then corrected
//! by ±5% whenever the ring drifts more than 1024 bytes out of balance.
//!
//! ## Architecture
//!
//! - [`DelayRing`] - fixed-capacity ring; push evicts the oldest byte when
//!   full, pop returns `None` when empty.
//! - [`TickTimer`] - re-armable periodic/one-shot timer on a dedicated
//!   thread, delivering coalescing ticks over a bounded(1) channel.
//! - [`Pacer`] - the correction law: ×0.95 / ×1.05 steps fenced to
//!   [10, 1 000 000) microseconds per byte.
//! - [`estimate_interval`] - initial rate estimation for streaming sources.
//! - [`StreamEngine`] - the control loop tying the above together, moving
//!   through `Estimating -> Streaming -> Draining -> Done`.
//!
//! ## Quick start
//!
//! ```no_run
//! use pacebuf::{spawn_reader, EngineConfig, StreamEngine, TickTimer};
//! use std::io;
//!
//! # fn main() -> pacebuf::Result<()> {
//! let bytes = spawn_reader(io::stdin())?;
//! let timer = TickTimer::spawn()?;
//! let config = EngineConfig {
//!     interval_us: Some(10_000), // 100 bytes per second
//!     ..Default::default()
//! };
//! let mut engine = StreamEngine::new(config, bytes, timer, io::stdout().lock());
//! let report = engine.run()?;
//! eprintln!("emitted {} bytes", report.bytes_out);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub use error::{Error, Result};

mod ring;
pub use ring::DelayRing;

mod timer;
pub use timer::{Tick, TickTimer};

mod pacer;
pub use pacer::{Pacer, DRIFT_LIMIT, MAX_INTERVAL_US, MIN_INTERVAL_US, SLOW_DOWN, SPEED_UP};

mod estimate;
pub use estimate::{estimate_interval, SAMPLE_WINDOW};

mod source;
pub use source::{is_regular_file, spawn_reader};

mod engine;
pub use engine::{EngineConfig, Phase, RunReport, StreamEngine};
