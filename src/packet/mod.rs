//! ADB packet codec
//!
//! Wire format (all fields little-endian):
//! ```text
//! +----------+----------+----------+----------------+----------+----------+
//! | command  |   arg0   |   arg1   | payload_length | checksum |  magic   |
//! |  (u32)   |  (u32)   |  (u32)   |     (u32)      |  (u32)   |  (i32)   |
//! +----------+----------+----------+----------------+----------+----------+
//! |                       payload (payload_length bytes)                  |
//! +-----------------------------------------------------------------------+
//! ```
//!
//! `magic` is always the bitwise complement of `command` and acts as a
//! structural integrity check independent of the payload checksum. The
//! checksum is the wrapping sum of all payload bytes; whether it is
//! computed and verified depends on the protocol version negotiated at
//! handshake time (see [`crate::mux`]).

use bytes::Bytes;
use thiserror::Error;

/// Size of the fixed packet header in bytes
pub const HEADER_SIZE: usize = 24;

/// Packet codec errors
#[derive(Debug, Error)]
pub enum PacketError {
    #[error("Malformed header: expected {HEADER_SIZE} bytes, got {0}")]
    MalformedHeader(usize),

    #[error("Unknown command: {0:#010x}")]
    UnknownCommand(u32),

    #[error("Checksum mismatch: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },
}

/// ADB protocol commands
///
/// Each value is the 4-byte ASCII tag interpreted as a little-endian u32.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Command {
    /// Connection handshake
    Connect = 0x4e58_4e43, // 'CNXN'
    /// Authentication challenge/response
    Auth = 0x4854_5541, // 'AUTH'
    /// Channel open request
    Open = 0x4e45_504f, // 'OPEN'
    /// Acknowledge (channel open or data receipt)
    Okay = 0x5941_4b4f, // 'OKAY'
    /// Channel data
    Write = 0x4554_5257, // 'WRTE'
    /// Channel close
    Close = 0x4553_4c43, // 'CLSE'
}

impl TryFrom<u32> for Command {
    type Error = PacketError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0x4e58_4e43 => Ok(Command::Connect),
            0x4854_5541 => Ok(Command::Auth),
            0x4e45_504f => Ok(Command::Open),
            0x5941_4b4f => Ok(Command::Okay),
            0x4554_5257 => Ok(Command::Write),
            0x4553_4c43 => Ok(Command::Close),
            _ => Err(PacketError::UnknownCommand(value)),
        }
    }
}

/// Compute the payload checksum: unsigned sum of all bytes mod 2^32
pub fn checksum(payload: &[u8]) -> u32 {
    payload
        .iter()
        .fold(0u32, |sum, &b| sum.wrapping_add(u32::from(b)))
}

/// The fixed 24-byte packet header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    /// Raw command word (may not be a known [`Command`])
    pub command: u32,
    pub arg0: u32,
    pub arg1: u32,
    pub payload_length: u32,
    pub checksum: u32,
    pub magic: i32,
}

impl PacketHeader {
    /// Decode a header from the start of `buf`
    pub fn decode(buf: &[u8]) -> Result<Self, PacketError> {
        if buf.len() < HEADER_SIZE {
            return Err(PacketError::MalformedHeader(buf.len()));
        }

        let word = |i: usize| u32::from_le_bytes([buf[i], buf[i + 1], buf[i + 2], buf[i + 3]]);

        Ok(Self {
            command: word(0),
            arg0: word(4),
            arg1: word(8),
            payload_length: word(12),
            checksum: word(16),
            magic: word(20) as i32,
        })
    }

    /// Encode the header into its 24-byte wire form
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.command.to_le_bytes());
        buf[4..8].copy_from_slice(&self.arg0.to_le_bytes());
        buf[8..12].copy_from_slice(&self.arg1.to_le_bytes());
        buf[12..16].copy_from_slice(&self.payload_length.to_le_bytes());
        buf[16..20].copy_from_slice(&self.checksum.to_le_bytes());
        buf[20..24].copy_from_slice(&self.magic.to_le_bytes());
        buf
    }

    /// Check the magic invariant: `magic == command XOR 0xFFFFFFFF`
    ///
    /// A header failing this check is protocol noise, not a fatal error.
    pub fn magic_ok(&self) -> bool {
        self.magic == (self.command ^ 0xffff_ffff) as i32
    }
}

/// A protocol packet
#[derive(Debug, Clone)]
pub struct Packet {
    pub command: Command,
    pub arg0: u32,
    pub arg1: u32,
    /// Checksum as carried on the wire; zero for sessions that skip it
    pub checksum: u32,
    pub payload: Bytes,
}

impl Packet {
    /// Create a packet with its payload checksum computed
    pub fn new(command: Command, arg0: u32, arg1: u32, payload: Bytes) -> Self {
        let checksum = checksum(&payload);
        Self {
            command,
            arg0,
            arg1,
            checksum,
            payload,
        }
    }

    /// Create a packet with checksum zero, for sessions that negotiated
    /// checksum-free operation
    pub fn unchecked(command: Command, arg0: u32, arg1: u32, payload: Bytes) -> Self {
        Self {
            command,
            arg0,
            arg1,
            checksum: 0,
            payload,
        }
    }

    /// Build the wire header for this packet
    pub fn header(&self) -> PacketHeader {
        let command = self.command as u32;
        PacketHeader {
            command,
            arg0: self.arg0,
            arg1: self.arg1,
            payload_length: self.payload.len() as u32,
            checksum: self.checksum,
            magic: (command ^ 0xffff_ffff) as i32,
        }
    }

    /// Verify the carried checksum against the payload
    pub fn verify_checksum(&self) -> Result<(), PacketError> {
        let actual = checksum(&self.payload);
        if actual != self.checksum {
            return Err(PacketError::ChecksumMismatch {
                expected: self.checksum,
                actual,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_tags_are_ascii() {
        // Each command word must read back as its ASCII tag
        assert_eq!(&(Command::Connect as u32).to_le_bytes(), b"CNXN");
        assert_eq!(&(Command::Auth as u32).to_le_bytes(), b"AUTH");
        assert_eq!(&(Command::Open as u32).to_le_bytes(), b"OPEN");
        assert_eq!(&(Command::Okay as u32).to_le_bytes(), b"OKAY");
        assert_eq!(&(Command::Write as u32).to_le_bytes(), b"WRTE");
        assert_eq!(&(Command::Close as u32).to_le_bytes(), b"CLSE");
    }

    #[test]
    fn test_checksum_is_byte_sum() {
        assert_eq!(checksum(b""), 0);
        assert_eq!(checksum(b"hi\n"), 0x68 + 0x69 + 0x0a);

        let payload: Vec<u8> = (0..=255).collect();
        assert_eq!(checksum(&payload), (0..=255u32).sum::<u32>());
    }

    #[test]
    fn test_checksum_wraps() {
        let payload = vec![0xffu8; 1 << 25];
        // 2^25 * 255 overflows u32; must wrap, not panic
        let expected = (255u64 * (1 << 25) % (1 << 32)) as u32;
        assert_eq!(checksum(&payload), expected);
    }

    #[test]
    fn test_header_roundtrip() {
        let packet = Packet::new(Command::Open, 7, 0, Bytes::from_static(b"shell:\0"));
        let header = packet.header();
        let decoded = PacketHeader::decode(&header.encode()).unwrap();

        assert_eq!(decoded, header);
        assert_eq!(decoded.payload_length, 7);
        assert_eq!(decoded.checksum, checksum(b"shell:\0"));
        assert!(decoded.magic_ok());
    }

    #[test]
    fn test_short_header_is_malformed() {
        let err = PacketHeader::decode(&[0u8; 10]).unwrap_err();
        assert!(matches!(err, PacketError::MalformedHeader(10)));
    }

    #[test]
    fn test_magic_is_command_complement() {
        for command in [
            Command::Connect,
            Command::Auth,
            Command::Open,
            Command::Okay,
            Command::Write,
            Command::Close,
        ] {
            let header = Packet::unchecked(command, 0, 0, Bytes::new()).header();
            assert!(header.magic_ok());
            assert_eq!(header.magic, !(command as u32) as i32);
        }
    }

    #[test]
    fn test_corrupted_magic_detected() {
        let mut header = Packet::new(Command::Write, 1, 2, Bytes::from_static(b"x")).header();
        header.magic ^= 1;
        assert!(!header.magic_ok());
    }

    #[test]
    fn test_verify_checksum() {
        let good = Packet::new(Command::Write, 1, 2, Bytes::from_static(b"data"));
        good.verify_checksum().unwrap();

        let bad = Packet {
            checksum: 42,
            ..good
        };
        assert!(matches!(
            bad.verify_checksum(),
            Err(PacketError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_unknown_command_rejected() {
        assert!(Command::try_from(0xdead_beef).is_err());
        assert!(Command::try_from(Command::Okay as u32).is_ok());
    }
}
