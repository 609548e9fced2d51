use pnet_packet::icmp::echo_reply::EchoReplyPacket;
use pnet_packet::icmp::echo_request::MutableEchoRequestPacket;
use pnet_packet::icmp::{checksum, IcmpCode, IcmpPacket, IcmpTypes};
use pnet_packet::Packet;

use crate::ProtocolError;

/// Type, code, checksum, identifier, sequence (RFC 792 echo header).
pub(crate) const HEADER_SIZE: usize = 8;

/// The fields of one decoded Echo Reply.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct EchoReply {
    pub(crate) identifier: u16,
    pub(crate) sequence: u16,
    pub(crate) payload: Vec<u8>,
}

/// Lays out an Echo Request (type 8, code 0) with the payload verbatim and
/// the checksum written into the header. Deterministic, no I/O.
pub(crate) fn encode_echo_request(identifier: u16, sequence: u16, payload: &[u8]) -> Vec<u8> {
    let buf = vec![0u8; HEADER_SIZE + payload.len()];
    let mut packet =
        MutableEchoRequestPacket::owned(buf).expect("buffer holds at least the echo header");
    packet.set_icmp_type(IcmpTypes::EchoRequest);
    packet.set_icmp_code(IcmpCode::new(0));
    packet.set_identifier(identifier);
    packet.set_sequence_number(sequence);
    packet.set_payload(payload);

    let sum = checksum(&IcmpPacket::new(packet.packet()).expect("packet was just built"));
    packet.set_checksum(sum);
    packet.packet().to_vec()
}

/// Validates a received datagram as an Echo Reply. The caller has already
/// stripped any outer IPv4 header; `bytes` starts at the ICMP header.
pub(crate) fn decode_echo_reply(bytes: &[u8]) -> Result<EchoReply, ProtocolError> {
    if bytes.len() < HEADER_SIZE {
        return Err(ProtocolError::Truncated);
    }
    let icmp = IcmpPacket::new(bytes).ok_or(ProtocolError::Truncated)?;
    // Re-summing the packet must reproduce the checksum it carries,
    // i.e. the one's-complement fold over the whole datagram is zero.
    if checksum(&icmp) != icmp.get_checksum() {
        return Err(ProtocolError::ChecksumMismatch);
    }
    if icmp.get_icmp_type() != IcmpTypes::EchoReply {
        return Err(ProtocolError::UnexpectedType(icmp.get_icmp_type().0));
    }
    let reply = EchoReplyPacket::new(bytes).ok_or(ProtocolError::Truncated)?;
    Ok(EchoReply {
        identifier: reply.get_identifier(),
        sequence: reply.get_sequence_number(),
        payload: reply.payload().to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::icmp::v4::socket_tests::echo_reply_frame;

    #[test]
    fn request_wire_layout() {
        let bytes = encode_echo_request(0xABCD, 7, &[0x11, 0x22]);

        assert_eq!(bytes.len(), HEADER_SIZE + 2);
        assert_eq!(bytes[0], 8); // type: echo request
        assert_eq!(bytes[1], 0); // code
        assert_eq!(&bytes[4..6], &[0xAB, 0xCD]); // identifier, big-endian
        assert_eq!(&bytes[6..8], &[0x00, 0x07]); // sequence, big-endian
        assert_eq!(&bytes[8..], &[0x11, 0x22]);
        assert_ne!(&bytes[2..4], &[0x00, 0x00]); // checksum was filled in
    }

    #[test]
    fn reply_round_trip_recovers_all_fields() {
        let payload: Vec<u8> = (0u8..56).collect();
        let frame = echo_reply_frame(0x1234, 3, &payload);

        let reply = decode_echo_reply(&frame).unwrap();

        assert_eq!(reply.identifier, 0x1234);
        assert_eq!(reply.sequence, 3);
        assert_eq!(reply.payload, payload);
    }

    #[test]
    fn flipping_one_payload_byte_breaks_the_checksum() {
        let mut frame = echo_reply_frame(0x1234, 3, &[0u8; 56]);
        frame[20] ^= 0x01;

        assert_eq!(
            decode_echo_reply(&frame),
            Err(ProtocolError::ChecksumMismatch)
        );
    }

    #[test]
    fn short_datagram_is_truncated() {
        assert_eq!(
            decode_echo_reply(&[0u8; HEADER_SIZE - 1]),
            Err(ProtocolError::Truncated)
        );
        assert_eq!(decode_echo_reply(&[]), Err(ProtocolError::Truncated));
    }

    #[test]
    fn echo_request_is_an_unexpected_type() {
        // A raw socket on loopback hands us back our own request.
        let frame = encode_echo_request(0x1234, 0, &[0u8; 8]);

        assert_eq!(
            decode_echo_reply(&frame),
            Err(ProtocolError::UnexpectedType(8))
        );
    }

    #[test]
    fn empty_payload_round_trips() {
        let frame = echo_reply_frame(1, 0, &[]);
        let reply = decode_echo_reply(&frame).unwrap();
        assert!(reply.payload.is_empty());
    }
}
