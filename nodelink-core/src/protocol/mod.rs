mod error;
mod frame;
mod integrity;
mod sentinel;

pub use error::{FrameError, ParseResult};
pub use frame::{Frame, checksum_of};
pub use integrity::{CRC32, checksum};
pub use sentinel::{Command, Header, NodeIdentity, Trailer};

// frame layout : header(1) + command(1) + length(2) + reserved(3 * 2) + payload(2)
//                + trailer(1) + padding(7) + crc32(4)

/// Size of every frame on the wire.
pub const FRAME_SIZE: usize = 24;
/// Offset of the checksum; the checksum covers `[0..CHECKSUM_OFFSET)`.
pub const CHECKSUM_OFFSET: usize = 20;
pub const CHECKSUM_SIZE: usize = 4;

pub(crate) const HEADER_OFFSET: usize = 0;
pub(crate) const COMMAND_OFFSET: usize = 1;
pub(crate) const LENGTH_OFFSET: usize = 2;
pub(crate) const RESERVED0_OFFSET: usize = 4;
pub(crate) const RESERVED1_OFFSET: usize = 6;
pub(crate) const RESERVED2_OFFSET: usize = 8;
pub(crate) const PAYLOAD_OFFSET: usize = 10;
pub(crate) const TRAILER_OFFSET: usize = 12;

const _: () = assert!(TRAILER_OFFSET < CHECKSUM_OFFSET);
const _: () = assert!(CHECKSUM_OFFSET + CHECKSUM_SIZE == FRAME_SIZE);
