//! Operator input producer.
//!
//! Reading stdin blocks, and a blocking read parked inside the Tokio runtime
//! would keep the runtime from shutting down after the session ends.  The
//! reader therefore runs on its own OS thread and hands completed lines to
//! the session over a Tokio `mpsc` channel with `blocking_send`.
//!
//! A read error (for example a line that is not valid UTF-8) is logged and
//! the offending line skipped; the thread keeps reading.  It only stops at
//! end of input or when the session has dropped the receiving end.

use std::io::{self, BufRead};
use std::thread::{self, JoinHandle};

use tokio::sync::mpsc;
use tracing::{debug, error};

/// Capacity of the line channel between the reader thread and the session.
pub const COMMAND_QUEUE_CAPACITY: usize = 16;

/// Spawns a thread that pushes every line of `reader` into `tx`.
///
/// # Errors
///
/// Returns the I/O error if the OS refuses to create the thread.
pub fn spawn_line_reader<R>(reader: R, tx: mpsc::Sender<String>) -> io::Result<JoinHandle<()>>
where
    R: BufRead + Send + 'static,
{
    thread::Builder::new()
        .name("command-reader".to_string())
        .spawn(move || read_lines(reader, &tx))
}

fn read_lines<R: BufRead>(reader: R, tx: &mpsc::Sender<String>) {
    for line in reader.lines() {
        match line {
            Ok(line) => {
                if tx.blocking_send(line).is_err() {
                    debug!("session stopped accepting commands");
                    return;
                }
            }
            Err(e) => error!("failed to read command: {e}"),
        }
    }
    debug!("command input reached end of file");
}
