#![cfg_attr(not(test), no_std)]

pub mod address;
pub mod protocol;

pub use address::{AddressParseError, PeerAddress};
pub use protocol::{
    CHECKSUM_OFFSET, CHECKSUM_SIZE, Command, FRAME_SIZE, Frame, FrameError, Header, NodeIdentity,
    ParseResult, Trailer, checksum, checksum_of,
};
