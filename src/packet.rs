//! Wire format of a single rcon packet.
//!
//! ```text
//! i32 size | i32 id | i32 type | body | 0x00 0x00
//! ```
//!
//! All integers are little-endian, and `size` counts everything after
//! itself.
use crate::error::{RconError, Result};

/// Length of the `size` field that prefixes every frame.
pub const HEADER_LEN: usize = 4;

/// Upper bound for a declared size. The server never sends frames this
/// large, so anything above is treated as a garbled header.
pub const MAX_PACKET_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    // SERVERDATA_AUTH
    Auth,
    // SERVERDATA_EXECCOMMAND,
    Exec,
    // SERVERDATA_AUTH_RESPONSE
    AuthResponse,
    // SERVERDATA_RESPONSE_VALUE
    Response,
}

impl PacketType {
    pub fn value(&self) -> i32 {
        match self {
            PacketType::Auth => 3,
            PacketType::Exec => 2,
            PacketType::AuthResponse => 2,
            PacketType::Response => 0,
        }
    }

    pub fn to_le_bytes(&self) -> [u8; 4] {
        self.value().to_le_bytes()
    }
}

/// Incoming type values. `2` is ambiguous on the wire; coming from the
/// server it is always an auth response.
impl TryFrom<i32> for PacketType {
    type Error = RconError;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            3 => Ok(PacketType::Auth),
            2 => Ok(PacketType::AuthResponse),
            0 => Ok(PacketType::Response),
            other => Err(RconError::UnknownPacketType(other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    id: i32,
    packet_type: PacketType,
    body: Vec<u8>,
}

impl Packet {
    /// id + type + the two terminating null bytes.
    pub const BASE_PACKET_SIZE: usize = 10;

    /// Builds an outgoing packet. Fails if `body` holds anything but 7-bit
    /// ascii, since the server mangles multi-byte text, or a NUL, which the
    /// server takes for the end of the body.
    pub fn new(id: i32, packet_type: PacketType, body: &str) -> Result<Self> {
        if let Some((offset, &byte)) = body
            .as_bytes()
            .iter()
            .enumerate()
            .find(|(_, b)| !b.is_ascii() || **b == 0)
        {
            return Err(RconError::EncodingError { offset, byte });
        }

        Ok(Packet {
            id,
            packet_type,
            body: body.as_bytes().to_vec(),
        })
    }

    // Since the only one of these values that can change in length is the body,
    // an easy way to calculate the size of a packet is to find the byte-length
    // of the packet body, then add 10 to it.
    pub fn size(&self) -> i32 {
        (self.body.len() + Self::BASE_PACKET_SIZE) as i32
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn packet_type(&self) -> PacketType {
        self.packet_type
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn into_body(self) -> Vec<u8> {
        self.body
    }

    pub fn pack(&self) -> Vec<u8> {
        // Size, ID, Type, Body, Terminator
        let mut payload = Vec::with_capacity(HEADER_LEN + self.size() as usize);
        payload.extend_from_slice(&self.size().to_le_bytes());
        payload.extend_from_slice(&self.id.to_le_bytes());
        payload.extend_from_slice(&self.packet_type.to_le_bytes());
        payload.extend_from_slice(&self.body);
        // null terminate the body (C++ interop 🤢), then null terminate the entire package
        payload.extend_from_slice(&[0u8, 0u8]);
        payload
    }

    /// Reads the `size` field of a frame header and returns how many bytes
    /// should follow it, or `None` if the header is short or implausible.
    pub fn declared_len(header: &[u8]) -> Option<usize> {
        let size = i32::from_le_bytes(header.get(..HEADER_LEN)?.try_into().ok()?);
        let size = usize::try_from(size).ok()?;
        (Self::BASE_PACKET_SIZE..=MAX_PACKET_SIZE)
            .contains(&size)
            .then_some(size)
    }

    /// Body bytes of a frame, even one that doesn't decode: everything after
    /// the id and type fields, minus the last two (terminator) bytes.
    pub fn body_region(raw: &[u8]) -> &[u8] {
        let start = (HEADER_LEN + 8).min(raw.len());
        let end = raw.len().saturating_sub(2).max(start);
        &raw[start..end]
    }

    /// Parses one complete frame. `raw` must hold exactly the bytes the
    /// header declares; a short or long remainder is a [RconError::SizeMismatch],
    /// which is how a truncated response shows up.
    pub fn unpack(raw: &[u8]) -> Result<Self> {
        let declared = Self::declared_len(raw).ok_or(RconError::MalformedPacketHeader)?;
        let rest = &raw[HEADER_LEN..];
        if rest.len() != declared {
            return Err(RconError::SizeMismatch {
                declared,
                received: rest.len(),
            });
        }

        let id = i32::from_le_bytes([rest[0], rest[1], rest[2], rest[3]]);
        let packet_type = PacketType::try_from(i32::from_le_bytes([
            rest[4], rest[5], rest[6], rest[7],
        ]))?;

        let (body, terminator) = rest[8..].split_at(declared - Self::BASE_PACKET_SIZE);
        if terminator != [0, 0] {
            return Err(RconError::MissingTerminator);
        }

        Ok(Packet {
            id,
            packet_type,
            body: body.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(id: i32, body: &[u8]) -> Vec<u8> {
        let mut raw = Vec::new();
        raw.extend_from_slice(&((body.len() + 10) as i32).to_le_bytes());
        raw.extend_from_slice(&id.to_le_bytes());
        raw.extend_from_slice(&0i32.to_le_bytes());
        raw.extend_from_slice(body);
        raw.extend_from_slice(&[0, 0]);
        raw
    }

    #[test]
    fn pack_layout_is_little_endian() {
        let packet = Packet::new(0x0102_0304, PacketType::Exec, "info").unwrap();
        assert_eq!(
            packet.pack(),
            vec![
                14, 0, 0, 0, // size
                4, 3, 2, 1, // id
                2, 0, 0, 0, // type
                b'i', b'n', b'f', b'o', 0, 0,
            ]
        );
    }

    #[test]
    fn ascii_bodies_survive_pack_and_unpack() {
        for body in ["", "info", "broadcast hello_world", "showplayers\n", "~!@#$%^&*()\t"] {
            let packet = Packet::new(-7, PacketType::Response, body).unwrap();
            let decoded = Packet::unpack(&packet.pack()).unwrap();
            assert_eq!(decoded.id(), -7);
            assert_eq!(decoded.packet_type(), PacketType::Response);
            assert_eq!(decoded.body(), body.as_bytes());
        }
    }

    #[test]
    fn non_ascii_is_rejected() {
        let err = Packet::new(1, PacketType::Exec, "broadcast héllo").unwrap_err();
        match err {
            RconError::EncodingError { offset, byte } => {
                assert_eq!(offset, 11);
                assert!(byte >= 0x80);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn nul_is_rejected() {
        let err = Packet::new(1, PacketType::Exec, "broadcast a\0b").unwrap_err();
        assert!(matches!(
            err,
            RconError::EncodingError {
                offset: 11,
                byte: 0
            }
        ));
    }

    #[test]
    fn body_region_skips_id_type_and_terminator() {
        let mut raw = response(0, b"Welcome\n");
        assert_eq!(Packet::body_region(&raw), b"Welcome\n");
        let last = raw.len() - 1;
        raw[last] = b'!';
        assert_eq!(Packet::body_region(&raw), b"Welcome\n");
        assert_eq!(Packet::body_region(&raw[..6]), b"");
    }

    #[test]
    fn truncated_frame_is_a_size_mismatch() {
        let raw = response(0, b"name,playeruid,steamid\n");
        let err = Packet::unpack(&raw[..raw.len() - 5]).unwrap_err();
        assert!(matches!(
            err,
            RconError::SizeMismatch {
                declared: 33,
                received: 28
            }
        ));
    }

    #[test]
    fn trailing_bytes_are_a_size_mismatch() {
        let mut raw = response(0, b"OK\n");
        raw.push(b'x');
        assert!(matches!(
            Packet::unpack(&raw),
            Err(RconError::SizeMismatch { .. })
        ));
    }

    #[test]
    fn missing_terminator() {
        let mut raw = response(0, b"OK\n");
        let last = raw.len() - 1;
        raw[last] = b'!';
        assert!(matches!(
            Packet::unpack(&raw),
            Err(RconError::MissingTerminator)
        ));
    }

    #[test]
    fn unknown_type() {
        let mut raw = response(0, b"OK\n");
        raw[8] = 7;
        assert!(matches!(
            Packet::unpack(&raw),
            Err(RconError::UnknownPacketType(7))
        ));
    }

    #[test]
    fn header_bounds() {
        assert_eq!(Packet::declared_len(&[1, 2]), None);
        assert_eq!(Packet::declared_len(&9i32.to_le_bytes()), None);
        assert_eq!(Packet::declared_len(&(-1i32).to_le_bytes()), None);
        assert_eq!(Packet::declared_len(&10i32.to_le_bytes()), Some(10));
        assert!(matches!(
            Packet::unpack(&[0, 0]),
            Err(RconError::MalformedPacketHeader)
        ));
    }
}
