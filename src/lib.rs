#![warn(rust_2018_idioms)]
#![warn(clippy::pedantic)]

//! Single-flight ICMP echo sessions.
//!
//! A [`Session`] owns one ICMPv4 socket and sends one Echo Request at a
//! time. [`Session::ping`] blocks the calling thread until the matching
//! Echo Reply arrives, the timeout elapses, or the socket fails; callers
//! that need non-blocking behavior run it on their own thread. A second
//! `ping` issued while one is in flight fails immediately with
//! [`PingError::AlreadyInProgress`] instead of queuing.
//!
//! ```no_run
//! use ping_session::{Session, SocketType, TIMEOUT_DEFAULT};
//!
//! let session = Session::open(SocketType::Dgram)?;
//! let payload = [0u8; 56];
//! let n = session.ping("127.0.0.1", TIMEOUT_DEFAULT, 0, &payload)?;
//! assert_eq!(n, 56);
//! session.close()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod flight;
mod icmp;
mod ping_error;
mod session;

pub use icmp::v4::{IcmpSocket, Socket, SocketType};
pub use ping_error::{PingError, ProtocolError, SocketError};
pub use session::{
    Session, PAYLOAD_SIZE_LIMIT, SEQUENCE_MAX, TIMEOUT_DEFAULT, TIMEOUT_MAX, TIMEOUT_MIN,
};
