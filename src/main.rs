//! pacebuf binary: pace stdin onto stdout.

use clap::Parser;
use pacebuf::{is_regular_file, spawn_reader, EngineConfig, StreamEngine, TickTimer};
use std::io;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

const INTERVAL_CONSTRAINT: [&str; 3] = [
    "If given, the first argument must be an integer greater than 0",
    "and less than 1e6 which specifies the number of microseconds ",
    "between bytes of output.",
];

/// Pace stdin onto stdout at a steady, adaptively corrected byte rate.
#[derive(Debug, Parser)]
#[command(name = "pacebuf", version, about)]
struct Cli {
    /// Microseconds to wait between output bytes (e.g. 10000 for 100 B/s).
    /// Omit it to estimate the rate from one second of live input; in that
    /// case stdin must not be a regular file.
    ///
    /// Hyphen values are accepted here so a negative number reaches
    /// interval validation and gets the constraint message instead of an
    /// unknown-flag error.
    #[arg(value_name = "INTERVAL_US", allow_hyphen_values = true)]
    interval: Option<String>,
}

fn main() -> ExitCode {
    // Logs go to stderr: stdout is the data stream.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let interval_us = match cli.interval.as_deref().map(parse_interval) {
        Some(Ok(us)) => Some(us),
        Some(Err(())) => {
            eprint!("Invalid argument.  ");
            for line in INTERVAL_CONSTRAINT {
                eprintln!("{line}");
            }
            return ExitCode::FAILURE;
        }
        None => None,
    };

    match run(interval_us) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(interval_us: Option<u64>) -> pacebuf::Result<()> {
    let fixed_rate = is_regular_file(io::stdin())?;
    let bytes = spawn_reader(io::stdin())?;
    let timer = TickTimer::spawn()?;

    let config = EngineConfig {
        interval_us,
        fixed_rate,
        ..Default::default()
    };
    let mut engine = StreamEngine::new(config, bytes, timer, io::stdout().lock());
    let report = engine.run()?;
    debug!(?report, "stream complete");
    Ok(())
}

fn parse_interval(raw: &str) -> Result<u64, ()> {
    match raw.parse::<u64>() {
        Ok(us) if us > 0 && us < 1_000_000 => Ok(us),
        _ => Err(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_interval_accepts_range() {
        assert_eq!(parse_interval("1"), Ok(1));
        assert_eq!(parse_interval("10000"), Ok(10_000));
        assert_eq!(parse_interval("999999"), Ok(999_999));
    }

    #[test]
    fn test_parse_interval_rejects_out_of_range_and_garbage() {
        assert!(parse_interval("0").is_err());
        assert!(parse_interval("1000000").is_err());
        assert!(parse_interval("-5").is_err());
        assert!(parse_interval("12x").is_err());
        assert!(parse_interval("").is_err());
    }

    #[test]
    fn test_cli_positional_interval() {
        let cli = Cli::parse_from(["pacebuf", "10000"]);
        assert_eq!(cli.interval.as_deref(), Some("10000"));

        let cli = Cli::parse_from(["pacebuf"]);
        assert!(cli.interval.is_none());
    }

    #[test]
    fn test_cli_negative_interval_reaches_validation() {
        // "-5" must parse as a value, not an unknown flag, so the user
        // sees the interval constraint message rather than clap's error.
        let cli = Cli::try_parse_from(["pacebuf", "-5"]).unwrap();
        assert_eq!(cli.interval.as_deref(), Some("-5"));
        assert!(parse_interval("-5").is_err());
    }
}
