//! Mock transport adapter for testing
//!
//! Lets drivers be exercised without physical hardware. It provides:
//! - Scripted replies per command string (persistent or one-shot)
//! - One-shot failure injection
//! - Call logging for test verification
//!
//! The adapter is usually moved into a driver, so inspection happens through
//! a [`MockHandle`] that shares its state.

use super::Transport;
use crate::error::TransportError;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::trace;

/// One recorded transport operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    /// Command sent with no reply expected.
    Send(String),
    /// Command sent as a query.
    Query(String),
}

impl MockCall {
    /// Command text, whichever kind of call it was.
    pub fn command(&self) -> &str {
        match self {
            MockCall::Send(c) | MockCall::Query(c) => c,
        }
    }
}

#[derive(Default)]
struct MockState {
    replies: HashMap<String, String>,
    queued: HashMap<String, VecDeque<String>>,
    fail_next: Option<TransportError>,
    calls: Vec<MockCall>,
}

/// Mock transport adapter
///
/// # Example
///
/// ```
/// use daq_bindings::adapters::{MockAdapter, Transport};
///
/// let (mut adapter, handle) = MockAdapter::pair();
/// handle.reply("*IDN?", "LSCI,MODEL218S,0,1.0");
/// assert_eq!(adapter.query("*IDN?").unwrap(), "LSCI,MODEL218S,0,1.0");
/// assert_eq!(handle.call_count(), 1);
/// ```
pub struct MockAdapter {
    handle: MockHandle,
}

impl MockAdapter {
    /// Create a new mock adapter with no scripted replies
    pub fn new() -> Self {
        Self {
            handle: MockHandle::default(),
        }
    }

    /// Create an adapter together with a handle for scripting and inspection
    pub fn pair() -> (Self, MockHandle) {
        let adapter = Self::new();
        let handle = adapter.handle();
        (adapter, handle)
    }

    /// Get a handle sharing this adapter's state
    pub fn handle(&self) -> MockHandle {
        self.handle.clone()
    }
}

impl Default for MockAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MockAdapter {
    fn send(&mut self, command: &str) -> Result<(), TransportError> {
        let mut state = self.handle.state();
        state.calls.push(MockCall::Send(command.to_string()));
        if let Some(err) = state.fail_next.take() {
            return Err(err);
        }
        trace!(command, "mock send");
        Ok(())
    }

    fn query(&mut self, command: &str) -> Result<String, TransportError> {
        let mut state = self.handle.state();
        state.calls.push(MockCall::Query(command.to_string()));
        if let Some(err) = state.fail_next.take() {
            return Err(err);
        }

        let queued = state
            .queued
            .get_mut(command)
            .and_then(VecDeque::pop_front);
        let reply = queued.or_else(|| state.replies.get(command).cloned());

        match reply {
            Some(reply) => {
                trace!(command, reply = %reply, "mock query");
                Ok(reply)
            }
            // An unscripted command behaves like an instrument that never
            // answers.
            None => Err(TransportError::Timeout {
                command: command.to_string(),
                waited_ms: 0,
            }),
        }
    }
}

/// Shared view of a [`MockAdapter`]'s script and call log.
#[derive(Clone, Default)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockHandle {
    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reply to `command` with `reply` on every query
    pub fn reply(&self, command: impl Into<String>, reply: impl Into<String>) {
        self.state().replies.insert(command.into(), reply.into());
    }

    /// Queue a reply used once, ahead of any persistent reply
    pub fn reply_once(&self, command: impl Into<String>, reply: impl Into<String>) {
        self.state()
            .queued
            .entry(command.into())
            .or_default()
            .push_back(reply.into());
    }

    /// Fail the next operation with `error`
    pub fn fail_next(&self, error: TransportError) {
        self.state().fail_next = Some(error);
    }

    /// Get a copy of the call log for verification
    pub fn calls(&self) -> Vec<MockCall> {
        self.state().calls.clone()
    }

    /// Commands in call order, regardless of kind
    pub fn commands(&self) -> Vec<String> {
        self.state()
            .calls
            .iter()
            .map(|c| c.command().to_string())
            .collect()
    }

    /// Number of recorded calls.
    pub fn call_count(&self) -> usize {
        self.state().calls.len()
    }

    /// Clear the call log
    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }
}
