//! Non-blocking socket primitives, the `OpenRTI` address scheme, and the
//! cooperative single-threaded socket event dispatcher.

pub mod dispatcher;
pub mod error;
pub mod socket;
pub mod url;

pub use dispatcher::{Dispatcher, EventId, InsertHandle, Readiness, SocketEvent, WakeupHandle};
pub use error::TransportError;
pub use socket::{connect, Connection, Listener};
pub use url::{parse as parse_address, Address, Scheme};
