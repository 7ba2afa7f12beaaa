use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use nodelink_core::address::ADDRESS_LEN;
use nodelink_core::{FRAME_SIZE, PeerAddress};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::{LinkDriver, LinkError, RawInbound};
use crate::config::PeerConfig;

const INBOUND_QUEUE_DEPTH: usize = 32;
const MAX_DATAGRAM_SIZE: usize = 250;

/// Addressed link emulated over UDP.
///
/// Every datagram starts with the sender's physical address so the receiver
/// can report where a frame came from, the way the radio driver does.
pub struct UdpLink {
    socket: Arc<UdpSocket>,
    local: PeerAddress,
    routes: HashMap<PeerAddress, SocketAddr>,
}

impl UdpLink {
    pub async fn bind(
        bind: SocketAddr,
        local: PeerAddress,
        routes: HashMap<PeerAddress, SocketAddr>,
    ) -> Result<Self, LinkError> {
        let socket = UdpSocket::bind(bind).await?;
        info!(%bind, %local, routes = routes.len(), "UDP link bound");

        Ok(Self {
            socket: Arc::new(socket),
            local,
            routes,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, LinkError> {
        Ok(self.socket.local_addr()?)
    }

    fn route(&self, peer: &PeerAddress) -> Result<SocketAddr, LinkError> {
        self.routes
            .get(peer)
            .copied()
            .ok_or(LinkError::UnknownPeer(*peer))
    }
}

#[async_trait]
impl LinkDriver for UdpLink {
    async fn add_peer(&self, peer: &PeerConfig) -> Result<(), LinkError> {
        let route = self.route(&peer.address)?;
        info!(peer = %peer.address, channel = peer.channel, %route, "Peer added");
        Ok(())
    }

    async fn transmit(&self, dest: PeerAddress, frame: [u8; FRAME_SIZE]) -> Result<(), LinkError> {
        let route = self.route(&dest)?;

        let mut datagram = [0u8; ADDRESS_LEN + FRAME_SIZE];
        datagram[..ADDRESS_LEN].copy_from_slice(&self.local.octets());
        datagram[ADDRESS_LEN..].copy_from_slice(&frame);

        let n = self.socket.send_to(&datagram, route).await?;
        if n != datagram.len() {
            return Err(LinkError::Driver(format!(
                "short datagram: wrote {n} of {} bytes",
                datagram.len()
            )));
        }

        debug!(%dest, %route, "Datagram sent");
        Ok(())
    }

    async fn start(
        &self,
        cancel: CancellationToken,
    ) -> Result<mpsc::Receiver<RawInbound>, LinkError> {
        let (tx, rx) = mpsc::channel(INBOUND_QUEUE_DEPTH);

        tokio::spawn(run_receive_loop(Arc::clone(&self.socket), tx, cancel));

        Ok(rx)
    }
}

#[instrument(name = "udp_receiver", skip_all)]
async fn run_receive_loop(
    socket: Arc<UdpSocket>,
    tx: mpsc::Sender<RawInbound>,
    cancel: CancellationToken,
) {
    let mut buf = [0u8; MAX_DATAGRAM_SIZE];

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("UDP link receiver shutting down");
                break;
            }
            received = socket.recv_from(&mut buf) => {
                let (n, from) = match received {
                    Ok(v) => v,
                    Err(e) => {
                        error!(error = %e, "Failed to receive datagram");
                        continue;
                    }
                };

                let Some(raw) = split_datagram(&buf[..n]) else {
                    warn!(%from, len = n, "Datagram too short to carry a source address");
                    continue;
                };

                if tx.send(raw).await.is_err() {
                    info!("Inbound channel closed, receiver shutting down");
                    break;
                }
            }
        }
    }
}

fn split_datagram(datagram: &[u8]) -> Option<RawInbound> {
    if datagram.len() < ADDRESS_LEN {
        return None;
    }

    let mut source = [0u8; ADDRESS_LEN];
    source.copy_from_slice(&datagram[..ADDRESS_LEN]);

    Some(RawInbound {
        source: PeerAddress::new(source),
        bytes: datagram[ADDRESS_LEN..].to_vec(),
    })
}
