use std::sync::Arc;
use std::time::Duration;

use nodelink_core::{Frame, NodeIdentity, PeerAddress};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::attempt::{SendOutcome, SendReport, Submitted};
use crate::config::{NodeConfig, PeerConfig};
use crate::link::LinkDriver;
use crate::sensor::Sensor;
use crate::transport::{Inbound, Transport};

/// Periodic sample, build, send.
pub struct Session<S: Sensor, L: LinkDriver> {
    identity: NodeIdentity,
    peer: PeerAddress,
    interval: Duration,
    sensor: S,
    transport: Arc<Transport<L>>,
}

impl<S: Sensor, L: LinkDriver> Session<S, L> {
    pub fn new(
        node: &NodeConfig,
        peer: &PeerConfig,
        sensor: S,
        transport: Arc<Transport<L>>,
    ) -> Self {
        Self {
            identity: node.identity,
            peer: peer.address,
            interval: node.sample_interval(),
            sensor,
            transport,
        }
    }

    /// Sample once and submit the report.
    ///
    /// Returns the submission handle, or `None` when the sensor could not be
    /// read. The send is never awaited here.
    pub async fn tick(&self) -> Option<Submitted> {
        let value = match self.sensor.read().await {
            Ok(value) => value,
            Err(e) => {
                warn!(sensor = self.sensor.name(), error = %e, "Sensor read failed, skipping sample");
                return None;
            }
        };

        info!(value, "Sampled");

        let attempt = self.transport.begin(self.peer, Frame::report(self.identity, value));
        Some(self.transport.submit(attempt.serialize()))
    }

    #[instrument(name = "session", skip_all, fields(identity = %self.identity, peer = %self.peer))]
    pub async fn run(self, cancel: CancellationToken) {
        info!(interval_ms = self.interval.as_millis() as u64, "Session loop started");

        let mut interval = tokio::time::interval(self.interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Session loop shutting down");
                    break;
                }
                _ = interval.tick() => {
                    let _ = self.tick().await;
                }
            }
        }
    }
}

/// Log the outcome of every send, until the stream ends or `cancel` fires.
pub async fn run_send_monitor(
    mut reports: mpsc::UnboundedReceiver<SendReport>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            report = reports.recv() => {
                let Some(report) = report else { break };
                match report.outcome {
                    SendOutcome::Confirmed => {
                        info!(attempt = %report.attempt, dest = %report.dest, "Send succeeded");
                    }
                    SendOutcome::Failed(e) => {
                        warn!(attempt = %report.attempt, dest = %report.dest, error = %e, "Send failed");
                    }
                }
            }
        }
    }
}

/// Log every inbound delivery, until the stream ends or `cancel` fires.
pub async fn run_inbound_monitor(mut inbound: mpsc::Receiver<Inbound>, cancel: CancellationToken) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            received = inbound.recv() => {
                let Some(received) = received else { break };
                match received.frame {
                    Ok(frame) => {
                        info!(source = %received.source, at = %received.received_at, %frame, "Frame received");
                    }
                    Err(e) => {
                        debug!(source = %received.source, error = %e, "Invalid frame dropped");
                    }
                }
            }
        }
    }
}
