//! Input side: byte feed and source-kind probe.

use crate::error::Result;
use crossbeam_channel::{bounded, Receiver, Sender};
use std::io::{self, BufReader, Read};
use std::thread;
use tracing::debug;

/// Queue depth between the reader thread and the control loop. Kept small
/// on purpose: the elastic cushion is the delay ring, not this channel.
const FEED_DEPTH: usize = 256;

/// Spawn a thread pumping `input` into a bounded channel one byte at a
/// time. End of stream (or a read error) is signalled by dropping the
/// sender, which disconnects the channel.
pub fn spawn_reader<R>(input: R) -> Result<Receiver<u8>>
where
    R: Read + Send + 'static,
{
    let (tx, rx) = bounded(FEED_DEPTH);
    thread::Builder::new()
        .name("byte-reader".to_string())
        .spawn(move || pump(input, tx))?;
    Ok(rx)
}

fn pump<R: Read>(input: R, tx: Sender<u8>) {
    let mut input = BufReader::new(input);
    let mut byte = [0u8; 1];
    loop {
        match input.read(&mut byte) {
            Ok(0) => break,
            Ok(_) => {
                if tx.send(byte[0]).is_err() {
                    // Consumer is gone; nothing left to feed.
                    break;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => {
                debug!(error = %e, "input read failed, treating as end of stream");
                break;
            }
        }
    }
}

/// True when `fd` refers to a regular (seekable) file. A regular file has
/// no live arrival rate, so the engine treats its configured interval as
/// authoritative.
#[cfg(unix)]
pub fn is_regular_file<F: std::os::fd::AsFd>(fd: F) -> Result<bool> {
    // dup(2) so the probe never consumes the caller's descriptor.
    let owned = fd.as_fd().try_clone_to_owned()?;
    let meta = std::fs::File::from(owned).metadata()?;
    Ok(meta.file_type().is_file())
}

#[cfg(not(unix))]
pub fn is_regular_file<F>(_fd: F) -> Result<bool> {
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_reader_feeds_bytes_then_disconnects() {
        let rx = spawn_reader(Cursor::new(vec![10u8, 20, 30])).unwrap();
        assert_eq!(rx.recv().unwrap(), 10);
        assert_eq!(rx.recv().unwrap(), 20);
        assert_eq!(rx.recv().unwrap(), 30);
        assert!(rx.recv().is_err());
    }

    #[test]
    fn test_reader_empty_input_disconnects_immediately() {
        let rx = spawn_reader(Cursor::new(Vec::new())).unwrap();
        assert!(rx.recv().is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_regular_file_probe() {
        use std::io::Write as _;

        let mut file = tempfile::tempfile().unwrap();
        file.write_all(b"x").unwrap();
        assert!(is_regular_file(&file).unwrap());

        let null = std::fs::File::open("/dev/null").unwrap();
        assert!(!is_regular_file(&null).unwrap());
    }
}
