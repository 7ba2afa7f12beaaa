use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use nodelink_core::{FRAME_SIZE, PeerAddress};
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{LinkDriver, LinkError, RawInbound};
use crate::config::PeerConfig;

const INBOUND_QUEUE_DEPTH: usize = 32;

/// In-memory link that records what it is asked to do.
///
/// Transmissions succeed unless failure is switched on with
/// [`MockLink::fail_transmissions`]. Inbound traffic is whatever the caller
/// hands to [`MockLink::inject`].
pub struct MockLink {
    airtime: Duration,
    failing: AtomicBool,
    peers: Mutex<Vec<PeerConfig>>,
    sent: Mutex<Vec<(PeerAddress, [u8; FRAME_SIZE])>>,
    inbound_tx: mpsc::Sender<RawInbound>,
    inbound_rx: Mutex<Option<mpsc::Receiver<RawInbound>>>,
}

impl MockLink {
    pub fn new() -> Self {
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_QUEUE_DEPTH);

        Self {
            airtime: Duration::ZERO,
            failing: AtomicBool::new(false),
            peers: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
            inbound_tx,
            inbound_rx: Mutex::new(Some(inbound_rx)),
        }
    }

    /// Delay every transmission by `airtime` before reporting its outcome.
    pub fn with_airtime(mut self, airtime: Duration) -> Self {
        self.airtime = airtime;
        self
    }

    pub fn fail_transmissions(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Deliver `bytes` as if `source` had sent them.
    pub async fn inject(&self, source: PeerAddress, bytes: Vec<u8>) -> Result<(), LinkError> {
        self.inbound_tx
            .send(RawInbound { source, bytes })
            .await
            .map_err(|_| LinkError::Closed)
    }

    /// Peers passed to `add_peer`, in call order.
    pub async fn peers(&self) -> Vec<PeerConfig> {
        self.peers.lock().await.clone()
    }

    /// Frames passed to `transmit`, in call order.
    pub async fn sent(&self) -> Vec<(PeerAddress, [u8; FRAME_SIZE])> {
        self.sent.lock().await.clone()
    }
}

impl Default for MockLink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LinkDriver for MockLink {
    async fn add_peer(&self, peer: &PeerConfig) -> Result<(), LinkError> {
        self.peers.lock().await.push(peer.clone());
        Ok(())
    }

    async fn transmit(&self, dest: PeerAddress, frame: [u8; FRAME_SIZE]) -> Result<(), LinkError> {
        if !self.airtime.is_zero() {
            tokio::time::sleep(self.airtime).await;
        }

        self.sent.lock().await.push((dest, frame));
        debug!(%dest, "Mock transmission");

        if self.failing.load(Ordering::SeqCst) {
            return Err(LinkError::Rejected);
        }
        Ok(())
    }

    async fn start(
        &self,
        cancel: CancellationToken,
    ) -> Result<mpsc::Receiver<RawInbound>, LinkError> {
        let mut injected = self.inbound_rx.lock().await.take().ok_or(LinkError::Closed)?;
        let (tx, rx) = mpsc::channel(INBOUND_QUEUE_DEPTH);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!("Mock link receiver shutting down");
                        break;
                    }
                    raw = injected.recv() => {
                        let Some(raw) = raw else { break };
                        if tx.send(raw).await.is_err() {
                            break;
                        }
                    }
                }
            }
        });

        Ok(rx)
    }
}
