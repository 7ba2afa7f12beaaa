use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;
use nodelink_core::{FRAME_SIZE, Frame, FrameError, PeerAddress};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::attempt::{AttemptId, SendAttempt, SendOutcome, SendReport, Serialized, Submitted};
use crate::config::PeerConfig;
use crate::link::{LinkDriver, LinkError, RawInbound};

const INBOUND_QUEUE_DEPTH: usize = 32;

/// A delivery from the link after frame validation.
#[derive(Debug, Clone)]
pub struct Inbound {
    pub source: PeerAddress,
    pub received_at: jiff::Timestamp,
    pub frame: Result<Frame, FrameError>,
}

/// Pushes serialized frames onto the link and reports how each one fared.
pub struct Transport<L: LinkDriver> {
    link: Arc<L>,
    peers: Arc<DashMap<PeerAddress, PeerConfig>>,
    registering: tokio::sync::Mutex<()>,
    next_attempt: AtomicU32,
    reports: Mutex<ReportSink>,
}

/// Where send reports go. Nothing is kept until someone subscribes.
#[derive(Default)]
struct ReportSink {
    tx: Option<mpsc::UnboundedSender<SendReport>>,
    handed_out: bool,
}

impl<L: LinkDriver> Transport<L> {
    pub fn new(link: L) -> Self {
        Self::with_shared_link(Arc::new(link))
    }

    pub fn with_shared_link(link: Arc<L>) -> Self {
        Self {
            link,
            peers: Arc::new(DashMap::new()),
            registering: tokio::sync::Mutex::new(()),
            next_attempt: AtomicU32::new(0),
            reports: Mutex::new(ReportSink::default()),
        }
    }

    pub fn link(&self) -> &Arc<L> {
        &self.link
    }

    /// Make `peer` reachable. Registering an address twice is a no-op.
    pub async fn register_peer(&self, peer: &PeerConfig) -> Result<(), LinkError> {
        // held across add_peer so concurrent callers see one registration
        let _guard = self.registering.lock().await;

        if self.peers.contains_key(&peer.address) {
            debug!(peer = %peer.address, "Peer already registered");
            return Ok(());
        }

        self.link.add_peer(peer).await?;
        self.peers.insert(peer.address, peer.clone());
        info!(peer = %peer.address, channel = peer.channel, "Peer registered");

        Ok(())
    }

    pub fn is_registered(&self, address: &PeerAddress) -> bool {
        self.peers.contains_key(address)
    }

    /// Start a new attempt for `frame`.
    pub fn begin(&self, dest: PeerAddress, frame: Frame) -> SendAttempt {
        let id = AttemptId(self.next_attempt.fetch_add(1, Ordering::Relaxed));
        SendAttempt::new(id, dest, frame)
    }

    /// Hand `bytes` to the link without waiting for the transmission.
    pub fn send(&self, dest: PeerAddress, bytes: [u8; FRAME_SIZE]) -> Submitted {
        let id = AttemptId(self.next_attempt.fetch_add(1, Ordering::Relaxed));
        self.submit(Serialized { id, dest, bytes })
    }

    /// Hand a serialized attempt to the link without waiting for the transmission.
    ///
    /// The outcome arrives exactly once on the returned handle and exactly
    /// once on the send-result stream. Nothing is retried.
    pub fn submit(&self, attempt: Serialized) -> Submitted {
        let Serialized { id, dest, bytes } = attempt;
        let (done_tx, done_rx) = oneshot::channel();

        let link = Arc::clone(&self.link);
        let registered = self.is_registered(&dest);
        let reports = self
            .reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .tx
            .clone();

        tokio::spawn(async move {
            let outcome = if !registered {
                SendOutcome::Failed(LinkError::UnknownPeer(dest))
            } else {
                match link.transmit(dest, bytes).await {
                    Ok(()) => SendOutcome::Confirmed,
                    Err(e) => SendOutcome::Failed(e),
                }
            };

            if let Some(reports) = reports {
                let _ = reports.send(SendReport {
                    attempt: id,
                    dest,
                    outcome: outcome.clone(),
                });
            }
            let _ = done_tx.send(outcome);
        });

        debug!(attempt = %id, %dest, "Frame submitted");

        Submitted {
            id,
            dest,
            completion: done_rx,
        }
    }

    /// The send-result stream. Handed out once; later calls return `None`.
    ///
    /// Only sends submitted after this call are reported on it.
    pub fn on_send_result(&self) -> Option<mpsc::UnboundedReceiver<SendReport>> {
        let mut sink = self.reports.lock().unwrap_or_else(PoisonError::into_inner);
        if sink.handed_out {
            return None;
        }

        let (tx, rx) = mpsc::unbounded_channel();
        sink.tx = Some(tx);
        sink.handed_out = true;
        Some(rx)
    }

    /// Start receiving and validating inbound frames.
    ///
    /// Every delivery produces one [`Inbound`]; frames that fail validation
    /// are logged and carried as errors, never as data.
    pub async fn on_receive(
        &self,
        cancel: CancellationToken,
    ) -> Result<mpsc::Receiver<Inbound>, LinkError> {
        let raw_rx = self.link.start(cancel.clone()).await?;
        let (tx, rx) = mpsc::channel(INBOUND_QUEUE_DEPTH);

        tokio::spawn(run_deserializer(raw_rx, tx, cancel));

        Ok(rx)
    }
}

async fn run_deserializer(
    mut raw_rx: mpsc::Receiver<RawInbound>,
    tx: mpsc::Sender<Inbound>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            raw = raw_rx.recv() => {
                let Some(raw) = raw else { break };

                let frame = Frame::from_bytes(&raw.bytes);
                if let Err(e) = &frame {
                    warn!(source = %raw.source, len = raw.bytes.len(), error = %e, "Discarding inbound frame");
                }

                let inbound = Inbound {
                    source: raw.source,
                    received_at: jiff::Timestamp::now(),
                    frame,
                };

                if tx.send(inbound).await.is_err() {
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::mock::MockLink;
    use async_trait::async_trait;
    use nodelink_core::NodeIdentity;
    use std::sync::atomic::AtomicUsize;

    /// Driver whose `add_peer` suspends before completing.
    #[derive(Default)]
    struct YieldingLink {
        add_peer_calls: AtomicUsize,
    }

    #[async_trait]
    impl LinkDriver for YieldingLink {
        async fn add_peer(&self, _peer: &PeerConfig) -> Result<(), LinkError> {
            self.add_peer_calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            Ok(())
        }

        async fn transmit(
            &self,
            _dest: PeerAddress,
            _frame: [u8; FRAME_SIZE],
        ) -> Result<(), LinkError> {
            Ok(())
        }

        async fn start(
            &self,
            _cancel: CancellationToken,
        ) -> Result<mpsc::Receiver<RawInbound>, LinkError> {
            Err(LinkError::Closed)
        }
    }

    fn peer() -> PeerConfig {
        PeerConfig {
            address: PeerAddress::new([0x40, 0x91, 0x51, 0xbf, 0xf5, 0x94]),
            channel: 1,
        }
    }

    #[tokio::test]
    async fn registration_is_idempotent() -> Result<(), LinkError> {
        let transport = Transport::new(MockLink::new());

        transport.register_peer(&peer()).await?;
        transport.register_peer(&peer()).await?;

        assert!(transport.is_registered(&peer().address));
        assert_eq!(transport.link().peers().await.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_registration_reaches_driver_once() -> Result<(), LinkError> {
        let transport = Transport::new(YieldingLink::default());

        let (peer_a, peer_b) = (peer(), peer());
        let (first, second) = tokio::join!(
            transport.register_peer(&peer_a),
            transport.register_peer(&peer_b)
        );
        first?;
        second?;

        assert_eq!(transport.link().add_peer_calls.load(Ordering::SeqCst), 1);
        assert!(transport.is_registered(&peer().address));
        Ok(())
    }

    #[tokio::test]
    async fn reports_are_not_kept_without_subscriber() -> Result<(), LinkError> {
        let transport = Transport::new(MockLink::new());
        transport.register_peer(&peer()).await?;

        let bytes = Frame::report(NodeIdentity::NodeB, 3).to_bytes();
        for _ in 0..100 {
            assert!(transport.send(peer().address, bytes).outcome().await.is_confirmed());
        }

        let mut reports = transport.on_send_result().expect("first subscription");
        assert!(reports.try_recv().is_err());

        let submitted = transport.send(peer().address, bytes);
        let id = submitted.id();
        assert!(submitted.outcome().await.is_confirmed());

        assert_eq!(reports.recv().await.map(|r| r.attempt), Some(id));
        assert!(reports.try_recv().is_err());
        Ok(())
    }

    #[tokio::test]
    async fn confirmed_send_reports_once() -> Result<(), LinkError> {
        let transport = Transport::new(MockLink::new());
        transport.register_peer(&peer()).await?;
        let mut reports = transport.on_send_result().expect("first subscription");

        let bytes = nodelink_core::Frame::report(NodeIdentity::NodeB, 23).to_bytes();
        let submitted = transport.send(peer().address, bytes);
        let id = submitted.id();

        assert!(submitted.outcome().await.is_confirmed());

        let report = reports.recv().await.expect("one report");
        assert_eq!(report.attempt, id);
        assert!(report.outcome.is_confirmed());
        assert!(reports.try_recv().is_err());

        assert_eq!(transport.link().sent().await, vec![(peer().address, bytes)]);
        Ok(())
    }

    #[tokio::test]
    async fn failed_transmission_is_not_retried() -> Result<(), LinkError> {
        let transport = Transport::new(MockLink::new());
        transport.register_peer(&peer()).await?;
        transport.link().fail_transmissions(true);

        let bytes = Frame::report(NodeIdentity::NodeB, 1).to_bytes();
        let outcome = transport.send(peer().address, bytes).outcome().await;

        assert!(matches!(outcome, SendOutcome::Failed(LinkError::Rejected)));
        assert_eq!(transport.link().sent().await.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn unregistered_peer_fails() {
        let transport = Transport::new(MockLink::new());
        let stranger = PeerAddress::new([1, 2, 3, 4, 5, 6]);

        let bytes = Frame::report(NodeIdentity::NodeA, 1).to_bytes();
        let outcome = transport.send(stranger, bytes).outcome().await;

        assert!(matches!(outcome, SendOutcome::Failed(LinkError::UnknownPeer(a)) if a == stranger));
        assert!(transport.link().sent().await.is_empty());
    }

    #[tokio::test]
    async fn send_result_stream_is_handed_out_once() {
        let transport = Transport::new(MockLink::new());
        assert!(transport.on_send_result().is_some());
        assert!(transport.on_send_result().is_none());
    }

    #[tokio::test]
    async fn attempt_ids_are_distinct() -> Result<(), LinkError> {
        let transport = Transport::new(MockLink::new());
        transport.register_peer(&peer()).await?;

        let frame = Frame::report(NodeIdentity::NodeB, 5);
        let first = transport.submit(transport.begin(peer().address, frame).serialize());
        let second = transport.submit(transport.begin(peer().address, frame).serialize());

        assert_ne!(first.id(), second.id());
        assert!(first.outcome().await.is_confirmed());
        assert!(second.outcome().await.is_confirmed());
        Ok(())
    }
}
