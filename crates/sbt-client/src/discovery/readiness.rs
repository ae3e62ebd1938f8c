//! Polls for the server descriptor until it appears or a deadline passes.

use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use super::locator::{ConnectionDescriptor, DescriptorSource};
use crate::error::ClientError;

/// Waits for a starting server to publish its descriptor.
///
/// The interval between polls is constant; startup takes seconds, so there is
/// nothing to gain from backing off.
#[derive(Debug, Clone, Copy)]
pub struct ReadinessWaiter {
    poll_interval: Duration,
}

impl ReadinessWaiter {
    #[must_use]
    pub const fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }

    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Polls `source` until it yields a well-formed descriptor.
    ///
    /// A corrupt descriptor counts as "not yet ready" because a starting
    /// server may still be writing it.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Timeout`] once `timeout` has elapsed without a
    /// descriptor, and propagates IO failures other than corruption. A
    /// `timeout` too large to represent as an instant never elapses.
    pub fn await_ready<S>(
        &self,
        source: &S,
        timeout: Duration,
    ) -> Result<ConnectionDescriptor, ClientError>
    where
        S: DescriptorSource + ?Sized,
    {
        let started = Instant::now();
        let deadline = started.checked_add(timeout);
        let mut polls = 0_u32;
        loop {
            polls += 1;
            match source.locate() {
                Ok(Some(descriptor)) => {
                    debug!(
                        polls,
                        waited_ms = started.elapsed().as_millis(),
                        socket = %descriptor.socket,
                        "server descriptor ready"
                    );
                    return Ok(descriptor);
                }
                Ok(None) => {}
                Err(ClientError::CorruptState { reason, .. }) => {
                    debug!(%reason, "server descriptor incomplete, polling again");
                }
                Err(error) => return Err(error),
            }

            let pause = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(ClientError::Timeout {
                            path: source.descriptor_path().to_path_buf(),
                            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                        });
                    }
                    self.poll_interval.min(deadline - now)
                }
                None => self.poll_interval,
            };
            debug!(
                waited_ms = started.elapsed().as_millis(),
                "waiting for sbt server"
            );
            thread::sleep(pause);
        }
    }
}
