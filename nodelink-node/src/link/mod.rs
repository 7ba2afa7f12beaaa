pub mod mock;
pub mod udp;

use std::sync::Arc;

use async_trait::async_trait;
use nodelink_core::{FRAME_SIZE, PeerAddress};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::PeerConfig;

#[derive(Debug, Clone, thiserror::Error)]
pub enum LinkError {
    #[error("peer {0} is not registered")]
    UnknownPeer(PeerAddress),

    #[error("IO error: {0}")]
    Io(Arc<std::io::Error>),

    #[error("link rejected the frame")]
    Rejected,

    #[error("link closed")]
    Closed,

    #[error("link driver error: {0}")]
    Driver(String),
}

impl From<std::io::Error> for LinkError {
    fn from(err: std::io::Error) -> Self {
        LinkError::Io(Arc::new(err))
    }
}

/// Bytes delivered by the link, before any frame validation.
#[derive(Debug, Clone)]
pub struct RawInbound {
    pub source: PeerAddress,
    pub bytes: Vec<u8>,
}

/// The addressed, connectionless link a node talks over.
///
/// This is the seam to the radio driver: implementations own address
/// configuration and the physical transmission.
#[async_trait]
pub trait LinkDriver: Send + Sync + 'static {
    /// Make `peer` reachable. Called at most once per address by [`crate::Transport`].
    async fn add_peer(&self, peer: &PeerConfig) -> Result<(), LinkError>;

    /// Put one frame on the air.
    ///
    /// Resolves once the link reports the outcome of the transmission.
    async fn transmit(&self, dest: PeerAddress, frame: [u8; FRAME_SIZE]) -> Result<(), LinkError>;

    /// Start delivering inbound byte strings from any sender.
    ///
    /// Delivery runs until the cancellation token is cancelled.
    async fn start(
        &self,
        cancel: CancellationToken,
    ) -> Result<mpsc::Receiver<RawInbound>, LinkError>;
}
