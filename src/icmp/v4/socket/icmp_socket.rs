use super::{Socket, SocketType};
use pnet_packet::ipv4::Ipv4Packet;
use socket2::{Domain, Protocol, Type};
use std::io;
use std::net::{IpAddr, Ipv4Addr, Shutdown, SocketAddr};
use std::time::Duration;

/// ICMPv4 socket over `socket2`, datagram or raw.
pub struct IcmpSocket {
    socket: socket2::Socket,
    kind: SocketType,
}

impl IcmpSocket {
    pub fn new(kind: SocketType) -> io::Result<Self> {
        tracing::trace!(?kind, "creating ICMPv4 socket");
        let ty = match kind {
            SocketType::Dgram => Type::DGRAM,
            SocketType::Raw => Type::RAW,
        };
        let socket = socket2::Socket::new(Domain::IPV4, ty, Some(Protocol::ICMPV4))?;
        if kind == SocketType::Dgram {
            // The kernel picks the echo identifier at bind time and rewrites
            // it into every outgoing request; bind now so the session can
            // read it back through `fixed_identifier`.
            socket.bind(&SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)).into())?;
        }
        Ok(IcmpSocket { socket, kind })
    }
}

impl Socket for IcmpSocket {
    fn send_to(&self, buf: &[u8], addr: &socket2::SockAddr) -> io::Result<usize> {
        self.socket.send_to(buf, addr)
    }

    fn try_recv_from(
        &self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> io::Result<Option<(usize, IpAddr)>> {
        // A sub-millisecond value would truncate to a zero timeval and put
        // the socket back into blocking mode.
        self.socket
            .set_read_timeout(Some(timeout.max(Duration::from_millis(1))))?;

        // Socket2 gives a safety guaranty which allows us to do an unsafe
        // cast from `&mut [u8]` to `&mut [std::mem::MaybeUninit<u8>]`:
        // https://docs.rs/socket2/0.4.7/socket2/struct.Socket.html#method.recv
        let recv_result = self
            .socket
            .recv_from(unsafe { &mut *(buf as *mut [u8] as *mut [std::mem::MaybeUninit<u8>]) });
        let (n, addr) = match recv_result {
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                return Ok(None)
            }
            Err(e) => return Err(e),
            Ok(ok) => ok,
        };
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionAborted,
                "socket was shut down",
            ));
        }
        let ip = addr
            .as_socket_ipv4()
            .map(|a| IpAddr::V4(*a.ip()))
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "peer address is not IPv4"))?;

        match self.kind {
            SocketType::Dgram => Ok(Some((n, ip))),
            SocketType::Raw => {
                // On a raw socket we get the whole IP packet; hand back only
                // the ICMP content.
                let header_len = {
                    let packet = Ipv4Packet::new(&buf[..n]).ok_or_else(|| {
                        io::Error::new(io::ErrorKind::InvalidData, "short IPv4 packet")
                    })?;
                    usize::from(packet.get_header_length()) * 4
                };
                if header_len == 0 || header_len > n {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        "bad IPv4 header length",
                    ));
                }
                buf.copy_within(header_len..n, 0);
                Ok(Some((n - header_len, ip)))
            }
        }
    }

    fn fixed_identifier(&self) -> Option<u16> {
        match self.kind {
            SocketType::Raw => None,
            SocketType::Dgram => self
                .socket
                .local_addr()
                .ok()
                .and_then(|a| a.as_socket_ipv4())
                .map(|a| a.port()),
        }
    }

    fn shutdown(&self) -> io::Result<()> {
        self.socket.shutdown(Shutdown::Both)
    }
}
