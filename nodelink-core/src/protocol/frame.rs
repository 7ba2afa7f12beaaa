use core::fmt;

use super::{error::ParseResult, *};

/// A single protocol frame.
///
/// The checksum is not a field: `to_bytes` derives it from the other fields
/// and `from_bytes` refuses any buffer whose embedded value disagrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub header: Header,
    pub command: Command,
    pub length: u16,
    pub reserved0: u16,
    pub reserved1: u16,
    pub reserved2: u16,
    pub payload: i16,
    pub trailer: Trailer,
}

impl Frame {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        header: Header,
        command: Command,
        length: u16,
        reserved0: u16,
        reserved1: u16,
        reserved2: u16,
        payload: i16,
        trailer: Trailer,
    ) -> Self {
        Self {
            header,
            command,
            length,
            reserved0,
            reserved1,
            reserved2,
            payload,
            trailer,
        }
    }

    /// Temperature report tagged with `identity`, as sent on every sampling tick.
    pub fn report(identity: NodeIdentity, payload: i16) -> Self {
        Self::new(
            identity.header(),
            Command::SHOW_TEMP,
            2,
            0,
            0,
            0,
            payload,
            identity.trailer(),
        )
    }

    pub fn from_bytes(bytes: &[u8]) -> ParseResult<Self> {
        if bytes.len() < FRAME_SIZE {
            return Err(FrameError::TooShort {
                needed: FRAME_SIZE,
                available: bytes.len(),
            });
        }

        let expected = checksum_of(bytes);
        let actual = checksum(&bytes[..CHECKSUM_OFFSET]);
        if expected != actual {
            return Err(FrameError::ChecksumMismatch { expected, actual });
        }

        Ok(Self {
            header: Header::try_from(bytes[HEADER_OFFSET])?,
            command: Command(bytes[COMMAND_OFFSET]),
            length: read_u16(bytes, LENGTH_OFFSET),
            reserved0: read_u16(bytes, RESERVED0_OFFSET),
            reserved1: read_u16(bytes, RESERVED1_OFFSET),
            reserved2: read_u16(bytes, RESERVED2_OFFSET),
            payload: i16::from_le_bytes([bytes[PAYLOAD_OFFSET], bytes[PAYLOAD_OFFSET + 1]]),
            trailer: Trailer::try_from(bytes[TRAILER_OFFSET])?,
        })
    }

    pub fn to_bytes(&self) -> [u8; FRAME_SIZE] {
        let mut bytes = [0u8; FRAME_SIZE];

        bytes[HEADER_OFFSET] = self.header as u8;
        bytes[COMMAND_OFFSET] = self.command.0;
        write_u16(&mut bytes, LENGTH_OFFSET, self.length);
        write_u16(&mut bytes, RESERVED0_OFFSET, self.reserved0);
        write_u16(&mut bytes, RESERVED1_OFFSET, self.reserved1);
        write_u16(&mut bytes, RESERVED2_OFFSET, self.reserved2);
        bytes[PAYLOAD_OFFSET..PAYLOAD_OFFSET + 2].copy_from_slice(&self.payload.to_le_bytes());
        bytes[TRAILER_OFFSET] = self.trailer as u8;

        let crc = checksum(&bytes[..CHECKSUM_OFFSET]);
        bytes[CHECKSUM_OFFSET..].copy_from_slice(&crc.to_le_bytes());

        bytes
    }
}

/// The checksum embedded in a serialized frame.
///
/// `bytes` must hold at least `FRAME_SIZE` bytes.
pub fn checksum_of(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([
        bytes[CHECKSUM_OFFSET],
        bytes[CHECKSUM_OFFSET + 1],
        bytes[CHECKSUM_OFFSET + 2],
        bytes[CHECKSUM_OFFSET + 3],
    ])
}

fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

fn write_u16(bytes: &mut [u8], offset: usize, value: u16) {
    bytes[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "header={:#04X} command={} length={} reserved=[{}, {}, {}] payload={} trailer={:#04X}",
            self.header as u8,
            self.command,
            self.length,
            self.reserved0,
            self.reserved1,
            self.reserved2,
            self.payload,
            self.trailer as u8,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node_b_report() -> Frame {
        Frame::new(
            Header::NodeB,
            Command::SHOW_TEMP,
            2,
            0,
            0,
            0,
            23,
            Trailer::NodeB,
        )
    }

    /// Re-seal a tampered buffer so only the field under test is wrong.
    fn reseal(bytes: &mut [u8; FRAME_SIZE]) {
        let crc = checksum(&bytes[..CHECKSUM_OFFSET]);
        bytes[CHECKSUM_OFFSET..].copy_from_slice(&crc.to_le_bytes());
    }

    #[test]
    fn node_b_report_scenario() {
        let frame = node_b_report();
        let bytes = frame.to_bytes();

        assert_eq!(bytes.len(), 24);
        assert_eq!(bytes[0], 0x1B);
        assert_eq!(bytes[1], 0xEE);
        assert_eq!(&bytes[2..4], &[2, 0]);
        assert_eq!(&bytes[10..12], &[23, 0]);
        assert_eq!(bytes[12], 0x22);
        assert_eq!(checksum_of(&bytes), checksum(&bytes[0..20]));
        assert_eq!(Frame::from_bytes(&bytes), Ok(frame));
    }

    #[test]
    fn report_uses_identity_sentinels() {
        assert_eq!(Frame::report(NodeIdentity::NodeB, 23), node_b_report());

        let a = Frame::report(NodeIdentity::NodeA, -4);
        assert_eq!(a.header, Header::NodeA);
        assert_eq!(a.trailer, Trailer::NodeA);
        assert_eq!(a.payload, -4);
    }

    #[test]
    fn round_trip_preserves_every_field() {
        let frames = [
            node_b_report(),
            Frame::new(
                Header::NodeA,
                Command(0x01),
                u16::MAX,
                0xBEEF,
                1,
                0x8000,
                i16::MIN,
                Trailer::NodeA,
            ),
            Frame::new(
                Header::NodeA,
                Command(0x00),
                0,
                0,
                0,
                0,
                i16::MAX,
                Trailer::NodeB,
            ),
        ];

        for frame in frames {
            assert_eq!(Frame::from_bytes(&frame.to_bytes()), Ok(frame));
        }
    }

    #[test]
    fn padding_is_zero() {
        let bytes = Frame::report(NodeIdentity::NodeA, -1).to_bytes();
        assert!(bytes[TRAILER_OFFSET + 1..CHECKSUM_OFFSET].iter().all(|&b| b == 0));
    }

    #[test]
    fn any_flipped_bit_is_detected() {
        let bytes = node_b_report().to_bytes();

        for byte in 0..CHECKSUM_OFFSET {
            for bit in 0..8 {
                let mut corrupted = bytes;
                corrupted[byte] ^= 1 << bit;

                assert!(
                    matches!(
                        Frame::from_bytes(&corrupted),
                        Err(FrameError::ChecksumMismatch { .. })
                    ),
                    "flip of byte {byte} bit {bit} went unnoticed"
                );
            }
        }
    }

    #[test]
    fn corrupted_checksum_is_detected() {
        let mut bytes = node_b_report().to_bytes();
        bytes[FRAME_SIZE - 1] ^= 0x80;

        assert!(matches!(
            Frame::from_bytes(&bytes),
            Err(FrameError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn short_input_is_rejected() {
        let bytes = node_b_report().to_bytes();

        for len in 0..FRAME_SIZE {
            assert_eq!(
                Frame::from_bytes(&bytes[..len]),
                Err(FrameError::TooShort {
                    needed: FRAME_SIZE,
                    available: len,
                })
            );
        }
    }

    #[test]
    fn trailing_bytes_are_ignored() {
        let frame = node_b_report();
        let mut long = [0xFFu8; FRAME_SIZE + 8];
        long[..FRAME_SIZE].copy_from_slice(&frame.to_bytes());

        assert_eq!(Frame::from_bytes(&long), Ok(frame));
    }

    #[test]
    fn foreign_header_is_rejected_even_with_valid_checksum() {
        let mut bytes = node_b_report().to_bytes();
        bytes[HEADER_OFFSET] = 0x7F;
        reseal(&mut bytes);

        assert_eq!(
            Frame::from_bytes(&bytes),
            Err(FrameError::UnknownSentinel(0x7F))
        );
    }

    #[test]
    fn foreign_trailer_is_rejected_even_with_valid_checksum() {
        let mut bytes = node_b_report().to_bytes();
        bytes[TRAILER_OFFSET] = 0x1B;
        reseal(&mut bytes);

        assert_eq!(
            Frame::from_bytes(&bytes),
            Err(FrameError::UnknownSentinel(0x1B))
        );
    }

    #[test]
    fn size_is_fixed_for_extreme_payloads() {
        for payload in [i16::MIN, -1, 0, 1, i16::MAX] {
            let bytes = Frame::report(NodeIdentity::NodeB, payload).to_bytes();
            assert_eq!(bytes.len(), FRAME_SIZE);
            assert_eq!(
                Frame::from_bytes(&bytes).map(|f| f.payload),
                Ok(payload)
            );
        }
    }

    #[test]
    fn display_lists_fields() {
        let text = node_b_report().to_string();
        assert_eq!(
            text,
            "header=0x1B command=show-temp length=2 reserved=[0, 0, 0] payload=23 trailer=0x22"
        );
    }
}
