mod packet;
pub(crate) use packet::{decode_echo_reply, encode_echo_request};

mod socket;
pub use socket::{IcmpSocket, Socket, SocketType};

#[cfg(test)]
pub(crate) use socket::tests as socket_tests;
