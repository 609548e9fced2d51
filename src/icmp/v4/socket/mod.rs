use std::io;
use std::net::IpAddr;
use std::time::Duration;

mod icmp_socket;
pub use icmp_socket::IcmpSocket;

/// Which kind of ICMPv4 socket a session opens.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SocketType {
    /// `SOCK_DGRAM` with `IPPROTO_ICMP`. No root required on Linux when the
    /// group is within `net.ipv4.ping_group_range`; the kernel assigns the
    /// echo identifier and delivers only this socket's replies.
    Dgram,
    /// `SOCK_RAW`. Requires elevated privileges; received datagrams carry
    /// the outer IPv4 header, which the implementation strips.
    Raw,
}

/// The OS socket seam. One datagram per `try_recv_from` call; buffering of
/// multiple outstanding replies is not needed because at most one request
/// is in flight per socket.
pub trait Socket: Send + Sync {
    fn send_to(&self, buf: &[u8], addr: &socket2::SockAddr) -> io::Result<usize>;

    /// Waits at most `timeout` for one datagram and writes the ICMP content
    /// (any network-layer header already stripped) into `buf`. `Ok(None)`
    /// when the timeout elapsed without traffic.
    fn try_recv_from(
        &self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> io::Result<Option<(usize, IpAddr)>>;

    /// Echo identifier the OS stamps on outgoing requests, when the socket
    /// type fixes one.
    fn fixed_identifier(&self) -> Option<u16>;

    /// Wakes any thread blocked in `try_recv_from`; it observes an error,
    /// not a hang.
    fn shutdown(&self) -> io::Result<()>;
}
