use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use rand::Rng;

use crate::flight::FlightFlag;
use crate::icmp::v4::{decode_echo_reply, encode_echo_request, IcmpSocket, Socket, SocketType};
use crate::{PingError, ProtocolError, SocketError};

/// Smallest accepted `ping` timeout.
pub const TIMEOUT_MIN: Duration = Duration::from_millis(1000);
/// Largest accepted `ping` timeout.
pub const TIMEOUT_MAX: Duration = Duration::from_millis(36000);
pub const TIMEOUT_DEFAULT: Duration = Duration::from_millis(10000);
/// Largest accepted sequence number.
pub const SEQUENCE_MAX: u16 = 32767;
/// Payloads must be strictly shorter than this.
pub const PAYLOAD_SIZE_LIMIT: usize = 65535;

/// Largest IPv4 datagram; big enough for any reply.
const RECV_BUFFER_SIZE: usize = 65535;

/// A blocked receive waits in slices this long, so a concurrent `close`
/// and the deadline are both observed promptly.
const RECV_POLL_SLICE: Duration = Duration::from_millis(100);

/// One ICMP echo session: one socket, one fixed identifier, at most one
/// request in flight.
///
/// All methods take `&self`; a session can be shared across threads, e.g.
/// one thread blocked in [`Session::ping`] while another calls
/// [`Session::close`] to abort it.
pub struct Session<S: Socket = IcmpSocket> {
    socket: S,
    identifier: u16,
    flight: FlightFlag,
    closed: AtomicBool,
}

impl Session<IcmpSocket> {
    /// Opens the OS socket for a new session.
    ///
    /// # Errors
    ///
    /// [`SocketError`] with the underlying OS error on permission or
    /// resource failure.
    pub fn open(socket_type: SocketType) -> Result<Self, SocketError> {
        let socket = IcmpSocket::new(socket_type).map_err(|e| SocketError::new("socket", e))?;
        Ok(Session::with_socket(socket))
    }
}

impl<S: Socket> Session<S> {
    pub(crate) fn with_socket(socket: S) -> Self {
        let identifier = socket
            .fixed_identifier()
            .unwrap_or_else(|| rand::thread_rng().gen::<u16>());
        tracing::trace!(identifier, "session created");
        Session {
            socket,
            identifier,
            flight: FlightFlag::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// The 16-bit echo identifier fixed for this session's lifetime.
    pub fn identifier(&self) -> u16 {
        self.identifier
    }

    /// Whether an echo exchange is currently in flight. A caller can poll
    /// this instead of racing into [`PingError::AlreadyInProgress`].
    pub fn is_in_progress(&self) -> bool {
        self.flight.is_set()
    }

    /// Sends one Echo Request and blocks until the matching reply, the
    /// timeout, or a socket failure. Returns the echoed payload length.
    ///
    /// # Errors
    ///
    /// - [`PingError::InvalidArgument`] on out-of-bounds input, before any
    ///   I/O is attempted.
    /// - [`PingError::AlreadyInProgress`] when another `ping` is in flight.
    /// - [`PingError::Timeout`] when no reply arrives within `timeout`.
    /// - [`PingError::SocketFailure`] on OS-level failure, including one
    ///   induced by a concurrent [`Session::close`].
    /// - [`PingError::Protocol`] when a reply fails validation or does not
    ///   correlate with the request.
    pub fn ping(
        &self,
        destination: &str,
        timeout: Duration,
        sequence: u16,
        payload: &[u8],
    ) -> Result<usize, PingError> {
        if destination.is_empty() {
            return Err(PingError::InvalidArgument("destination is empty"));
        }
        if timeout < TIMEOUT_MIN || timeout > TIMEOUT_MAX {
            return Err(PingError::InvalidArgument("timeout out of bounds"));
        }
        if sequence > SEQUENCE_MAX {
            return Err(PingError::InvalidArgument("sequence out of bounds"));
        }
        if payload.len() >= PAYLOAD_SIZE_LIMIT {
            return Err(PingError::InvalidArgument("payload of 64 KiB or more"));
        }
        let dest: Ipv4Addr = destination
            .parse()
            .map_err(|_| PingError::InvalidArgument("destination is not an IPv4 address"))?;

        if self.closed.load(Ordering::Acquire) {
            return Err(SocketError::closed().into());
        }

        let _guard = self
            .flight
            .try_acquire()
            .ok_or(PingError::AlreadyInProgress)?;
        // The guard's drop returns the session to idle on every path out.
        self.exchange(dest, timeout, sequence, payload)
    }

    /// Releases the session. Idempotent and terminal: later `ping` calls
    /// fail, and one already blocked observes a socket failure promptly
    /// instead of hanging. Does not wait for an in-flight exchange.
    ///
    /// # Errors
    ///
    /// [`SocketError`] when the OS rejects the shutdown; the session still
    /// counts as released afterwards.
    pub fn close(&self) -> Result<(), SocketError> {
        // First close wins; later calls are no-ops.
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        tracing::trace!(identifier = self.identifier, "session closed");
        match self.socket.shutdown() {
            Ok(()) => Ok(()),
            // Unconnected datagram sockets report ENOTCONN here on some
            // systems; the descriptor is still released on drop.
            Err(e) if e.kind() == std::io::ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(SocketError::new("shutdown", e)),
        }
    }

    fn exchange(
        &self,
        dest: Ipv4Addr,
        timeout: Duration,
        sequence: u16,
        payload: &[u8],
    ) -> Result<usize, PingError> {
        let addr: socket2::SockAddr = SocketAddr::new(IpAddr::V4(dest), 0).into();
        let request = encode_echo_request(self.identifier, sequence, payload);
        self.socket
            .send_to(&request, &addr)
            .map_err(|e| SocketError::new("sendto", e))?;
        tracing::debug!(%dest, sequence, len = request.len(), "echo request sent");

        let started = Instant::now();
        let deadline = started + timeout;
        let mut buf = vec![0u8; RECV_BUFFER_SIZE];
        let mut retried = false;
        loop {
            if self.closed.load(Ordering::Acquire) {
                return Err(SocketError::closed().into());
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(PingError::Timeout);
            }
            match self
                .socket
                .try_recv_from(&mut buf, remaining.min(RECV_POLL_SLICE))
            {
                // Slice elapsed quietly; loop around to re-check the
                // deadline and the closed flag.
                Ok(None) => {}
                Err(e) => return Err(SocketError::new("recvfrom", e).into()),
                Ok(Some((n, from))) => {
                    let reply = decode_echo_reply(&buf[..n])?;
                    if from != IpAddr::V4(dest)
                        || reply.identifier != self.identifier
                        || reply.sequence != sequence
                    {
                        tracing::warn!(
                            %from,
                            identifier = reply.identifier,
                            sequence = reply.sequence,
                            "discarding reply that does not match the request"
                        );
                        if retried {
                            return Err(ProtocolError::Mismatch.into());
                        }
                        // One more receive within the remaining budget.
                        retried = true;
                        continue;
                    }
                    tracing::debug!(%from, sequence, elapsed = ?started.elapsed(), "echo reply received");
                    return Ok(reply.payload.len());
                }
            }
        }
    }
}
