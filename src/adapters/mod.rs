//! Transport adapters: the send/query boundary to the instrument channel.
//!
//! Bindings only rely on the two primitives of [`Transport`]. Everything
//! about the physical channel (opening a port, baud rate, VISA sessions) is
//! the caller's business; adapters here wrap an already opened channel.
//!
//! - [`StreamAdapter`] speaks line-terminated text over any `Read + Write`
//!   stream (a `serialport::SerialPort`, a `TcpStream`, ...).
//! - [`Paced`] enforces the settle delay between consecutive operations.
//! - [`MockAdapter`] replays scripted replies for tests.

use crate::error::TransportError;

pub mod mock_adapter;
pub mod paced;
pub mod stream_adapter;

pub use mock_adapter::{MockAdapter, MockCall, MockHandle};
pub use paced::Paced;
pub use stream_adapter::StreamAdapter;

/// Request/response primitives used by command-definition functions.
///
/// Implementations are not reentrant: one operation completes before the
/// next starts, which `&mut self` enforces.
pub trait Transport: Send {
    /// Fire-and-forget write.
    fn send(&mut self, command: &str) -> Result<(), TransportError>;

    /// Write, then read one reply.
    fn query(&mut self, command: &str) -> Result<String, TransportError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&mut self, command: &str) -> Result<(), TransportError> {
        (**self).send(command)
    }

    fn query(&mut self, command: &str) -> Result<String, TransportError> {
        (**self).query(command)
    }
}
