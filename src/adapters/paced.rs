//! Inter-command pacing.
//!
//! Many instruments need a settle interval after each command before they
//! accept the next one. `Paced` wraps a transport and holds every operation
//! until the settle interval since the previous operation has elapsed.
use super::Transport;
use crate::error::TransportError;
use std::time::{Duration, Instant};
use tracing::trace;

/// Transport wrapper that enforces a settle delay between operations.
pub struct Paced<T> {
    inner: T,
    settle: Duration,
    ready_at: Option<Instant>,
}

impl<T: Transport> Paced<T> {
    /// Wrap `inner`; the first operation is never delayed.
    pub fn new(inner: T, settle: Duration) -> Self {
        Self {
            inner,
            settle,
            ready_at: None,
        }
    }

    /// Configured settle interval.
    pub fn settle_delay(&self) -> Duration {
        self.settle
    }

    /// Borrow the wrapped transport.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the wrapped transport, bypassing pacing.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Unwrap the transport.
    pub fn into_inner(self) -> T {
        self.inner
    }

    fn wait_ready(&self) {
        if let Some(ready_at) = self.ready_at {
            let now = Instant::now();
            if ready_at > now {
                let wait = ready_at - now;
                trace!(wait_ms = wait.as_millis() as u64, "settling before next command");
                std::thread::sleep(wait);
            }
        }
    }

    // Failed operations still start a settle window; the instrument may have
    // received part of the command.
    fn mark_done(&mut self) {
        self.ready_at = Some(Instant::now() + self.settle);
    }
}

impl<T: Transport> Transport for Paced<T> {
    fn send(&mut self, command: &str) -> Result<(), TransportError> {
        self.wait_ready();
        let result = self.inner.send(command);
        self.mark_done();
        result
    }

    fn query(&mut self, command: &str) -> Result<String, TransportError> {
        self.wait_ready();
        let result = self.inner.query(command);
        self.mark_done();
        result
    }
}
