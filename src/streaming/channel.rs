//! Running a parse on a background thread.

use std::iter::FusedIterator;
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};

use crate::error::Result;
use crate::event::ParseEvent;

use super::EventStream;

impl EventStream {
    /// Moves the parse onto a worker thread and returns the receiving end.
    ///
    /// At most `capacity` events are buffered ahead of the consumer, so a
    /// slow consumer throttles decoding. Dropping the receiver stops the
    /// worker after its next send and closes the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker thread cannot be spawned.
    pub fn spawn(self, capacity: usize) -> Result<EventReceiver> {
        let (tx, rx) = mpsc::sync_channel(capacity.max(1));
        let handle = thread::Builder::new()
            .name("chatimport-parse".to_string())
            .spawn(move || {
                for event in self {
                    if tx.send(event).is_err() {
                        tracing::debug!("event receiver dropped, stopping parse");
                        break;
                    }
                }
            })?;

        Ok(EventReceiver {
            rx,
            handle: Some(handle),
        })
    }
}

/// Consumer side of a spawned [`EventStream`].
///
/// Yields the same events in the same order as the stream itself.
#[derive(Debug)]
pub struct EventReceiver {
    rx: Receiver<ParseEvent>,
    handle: Option<JoinHandle<()>>,
}

impl Iterator for EventReceiver {
    type Item = ParseEvent;

    fn next(&mut self) -> Option<Self::Item> {
        match self.rx.recv() {
            Ok(event) => Some(event),
            Err(_) => {
                // The worker has hung up; reap it.
                if let Some(handle) = self.handle.take() {
                    if handle.join().is_err() {
                        tracing::error!("parse worker panicked");
                    }
                }
                None
            }
        }
    }
}

impl FusedIterator for EventReceiver {}
