use core::fmt;

use serde::{Deserialize, Serialize};

use super::FrameError;

/// Node class written in the first byte of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Header {
    NodeA = 0x1A,
    NodeB = 0x1B,
}

impl TryFrom<u8> for Header {
    type Error = FrameError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x1A => Ok(Header::NodeA),
            0x1B => Ok(Header::NodeB),
            _ => Err(FrameError::UnknownSentinel(value)),
        }
    }
}

/// End-of-frame marker, one per node class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Trailer {
    NodeA = 0x11,
    NodeB = 0x22,
}

impl TryFrom<u8> for Trailer {
    type Error = FrameError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x11 => Ok(Trailer::NodeA),
            0x22 => Ok(Trailer::NodeB),
            _ => Err(FrameError::UnknownSentinel(value)),
        }
    }
}

/// Operation or report code carried in the second byte.
///
/// Codes are not a closed set: anything the peer sends is carried through
/// unchanged and left to the consumer to interpret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Command(pub u8);

impl Command {
    /// Temperature report, the command both nodes send every sampling tick.
    pub const SHOW_TEMP: Command = Command(0xEE);
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Command::SHOW_TEMP => f.write_str("show-temp"),
            Command(code) => write!(f, "{code:#04X}"),
        }
    }
}

/// Identity of a node on the link. Both ends agree on these out of band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeIdentity {
    NodeA,
    NodeB,
}

impl NodeIdentity {
    pub const fn header(self) -> Header {
        match self {
            NodeIdentity::NodeA => Header::NodeA,
            NodeIdentity::NodeB => Header::NodeB,
        }
    }

    pub const fn trailer(self) -> Trailer {
        match self {
            NodeIdentity::NodeA => Trailer::NodeA,
            NodeIdentity::NodeB => Trailer::NodeB,
        }
    }
}

impl fmt::Display for NodeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeIdentity::NodeA => f.write_str("NODE A"),
            NodeIdentity::NodeB => f.write_str("NODE B"),
        }
    }
}
